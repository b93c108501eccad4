//! Product Aggregate
//!
//! Products are supplied by the catalog source and never change after loading.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::domain::value_objects::ProductId;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    id: ProductId,
    name: String,
    price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    original_price: Option<Decimal>,
    image: String,
    category: String,
    rating: Decimal,
    reviews: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    badge: Option<Badge>,
    description: String,
}

/// Promotional tag shown on a product card.
///
/// Labels outside the known set are kept verbatim in [`Badge::Other`] so they
/// render as written instead of being dropped.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Badge {
    Sale,
    New,
    BestSeller,
    Trending,
    Premium,
    Other(String),
}

impl Badge {
    pub fn label(&self) -> &str {
        match self {
            Self::Sale => "Sale",
            Self::New => "New",
            Self::BestSeller => "Best Seller",
            Self::Trending => "Trending",
            Self::Premium => "Premium",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for Badge {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Sale" => Self::Sale,
            "New" => Self::New,
            "Best Seller" => Self::BestSeller,
            "Trending" => Self::Trending,
            "Premium" => Self::Premium,
            _ => Self::Other(label),
        }
    }
}

impl From<&str> for Badge {
    fn from(label: &str) -> Self { Self::from(label.to_string()) }
}

impl From<Badge> for String {
    fn from(badge: Badge) -> Self {
        match badge {
            Badge::Other(label) => label,
            known => known.label().to_string(),
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.label()) }
}

impl Product {
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Decimal, category: impl Into<String>) -> Self {
        Self {
            id: id.into(), name: name.into(), price, original_price: None, image: String::new(),
            category: category.into(), rating: Decimal::ZERO, reviews: 0, badge: None, description: String::new(),
        }
    }

    pub fn with_original_price(mut self, original_price: Decimal) -> Self { self.original_price = Some(original_price); self }
    pub fn with_badge(mut self, badge: impl Into<Badge>) -> Self { self.badge = Some(badge.into()); self }
    pub fn with_rating(mut self, rating: Decimal, reviews: u32) -> Self { self.rating = rating; self.reviews = reviews; self }
    pub fn with_image(mut self, image: impl Into<String>) -> Self { self.image = image.into(); self }
    pub fn with_description(mut self, description: impl Into<String>) -> Self { self.description = description.into(); self }

    pub fn id(&self) -> ProductId { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn price(&self) -> Decimal { self.price }
    pub fn original_price(&self) -> Option<Decimal> { self.original_price }
    pub fn image(&self) -> &str { &self.image }
    pub fn category(&self) -> &str { &self.category }
    pub fn rating(&self) -> Decimal { self.rating }
    pub fn reviews(&self) -> u32 { self.reviews }
    pub fn badge(&self) -> Option<&Badge> { self.badge.as_ref() }
    pub fn description(&self) -> &str { &self.description }

    pub fn has_badge(&self, badge: &Badge) -> bool { self.badge.as_ref() == Some(badge) }

    /// Whole-percent markdown from the original price, rounded half away from zero.
    /// Zero when there is no original price.
    pub fn discount_percent(&self) -> u32 {
        match self.original_price {
            Some(original) if original > Decimal::ZERO => ((original - self.price) / original * Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_u32()
                .unwrap_or(0),
            _ => 0,
        }
    }

    pub fn is_deal(&self) -> bool { self.has_badge(&Badge::Sale) || self.original_price.is_some() }

    /// `needle` must already be lowercased.
    pub fn matches_query(&self, needle: &str) -> bool {
        needle.is_empty()
            || self.name.to_lowercase().contains(needle)
            || self.category.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
    }

    pub fn validate(&self) -> Result<(), ProductError> {
        if self.price < Decimal::ZERO { return Err(ProductError::NegativePrice); }
        if let Some(original) = self.original_price {
            if original <= self.price { return Err(ProductError::OriginalPriceNotHigher); }
        }
        if self.rating < Decimal::ZERO || self.rating > Decimal::from(5) { return Err(ProductError::RatingOutOfRange); }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductError {
    #[error("price must not be negative")]
    NegativePrice,
    #[error("original price must be higher than the price")]
    OriginalPriceNotHigher,
    #[error("rating must be between 0 and 5")]
    RatingOutOfRange,
}
