//! Product grid filtering and sorting.
//!
//! [`visible_products`] narrows the catalog by search text, category and price
//! range, then orders what is left by the selected [`SortKey`]. Every sort is
//! stable, so ties keep catalog order.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::catalog::{Catalog, ALL_CATEGORIES};
use crate::domain::aggregates::{Badge, Product};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("Invalid price range: minimum {min} is above maximum {max}")]
    InvalidPriceRange { min: Decimal, max: Decimal },

    #[error("Unknown sort key: {0}")]
    UnknownSortKey(String),

    #[error("Invalid {field}: {value:?} is not a price")]
    InvalidPrice { field: &'static str, value: String },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    #[default]
    Featured,
    Newest,
    PriceLow,
    PriceHigh,
    Rating,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [Self::Featured, Self::Newest, Self::PriceLow, Self::PriceHigh, Self::Rating];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Featured => "featured",
            Self::Newest => "newest",
            Self::PriceLow => "price-low",
            Self::PriceHigh => "price-high",
            Self::Rating => "rating",
        }
    }

    fn apply(self, products: &mut [&Product]) {
        match self {
            Self::Featured => {}
            Self::Newest => products.sort_by_key(|p| !p.has_badge(&Badge::New)),
            Self::PriceLow => products.sort_by(|a, b| a.price().cmp(&b.price())),
            Self::PriceHigh => products.sort_by(|a, b| b.price().cmp(&a.price())),
            Self::Rating => products.sort_by(|a, b| b.rating().cmp(&a.rating())),
        }
    }
}

impl FromStr for SortKey {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| FilterError::UnknownSortKey(s.to_string()))
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive price bounds with `min <= max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PriceRange {
    min: Decimal,
    max: Decimal,
}

impl PriceRange {
    pub fn new(min: Decimal, max: Decimal) -> Result<Self, FilterError> {
        if min > max {
            return Err(FilterError::InvalidPriceRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// Every non-negative price.
    pub fn unbounded() -> Self {
        Self { min: Decimal::ZERO, max: Decimal::MAX }
    }

    pub fn min(&self) -> Decimal {
        self.min
    }

    pub fn max(&self) -> Decimal {
        self.max
    }

    pub fn contains(&self, price: Decimal) -> bool {
        self.min <= price && price <= self.max
    }
}

impl Default for PriceRange {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterState {
    pub search_query: String,
    pub selected_category: String,
    pub price_range: PriceRange,
    pub sort_key: SortKey,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            search_query: String::new(),
            selected_category: ALL_CATEGORIES.to_string(),
            price_range: PriceRange::unbounded(),
            sort_key: SortKey::Featured,
        }
    }
}

impl FilterState {
    /// The reset state for `catalog`: everything visible, catalog order.
    pub fn for_catalog(catalog: &Catalog) -> Self {
        Self { price_range: catalog.price_bounds(), ..Self::default() }
    }

    pub fn reset(&mut self, catalog: &Catalog) {
        *self = Self::for_catalog(catalog);
    }

    fn restricts_category(&self) -> bool {
        !self.selected_category.is_empty() && self.selected_category != ALL_CATEGORIES
    }
}

/// Products of `products` that pass `state`, in display order.
pub fn visible_products<'a>(products: &'a [Product], state: &FilterState) -> Vec<&'a Product> {
    let needle = state.search_query.to_lowercase();

    let mut visible: Vec<&Product> = products
        .iter()
        .filter(|p| p.matches_query(&needle))
        .filter(|p| !state.restricts_category() || p.category() == state.selected_category)
        .filter(|p| state.price_range.contains(p.price()))
        .collect();

    state.sort_key.apply(&mut visible);

    debug!(
        search = %state.search_query,
        category = %state.selected_category,
        sort = %state.sort_key,
        visible = visible.len(),
        total = products.len(),
        "Recomputed product grid"
    );
    visible
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GridState {
    /// The catalog itself is empty.
    NoData,
    /// Filters excluded every product; offer a reset.
    NoMatches,
    Populated,
}

#[derive(Clone, Debug)]
pub struct GridView<'a> {
    pub products: Vec<&'a Product>,
    pub catalog_size: usize,
}

impl<'a> GridView<'a> {
    pub fn new(catalog: &'a Catalog, state: &FilterState) -> Self {
        Self { products: visible_products(catalog.products(), state), catalog_size: catalog.len() }
    }

    pub fn state(&self) -> GridState {
        match (self.catalog_size, self.products.len()) {
            (0, _) => GridState::NoData,
            (_, 0) => GridState::NoMatches,
            _ => GridState::Populated,
        }
    }
}
