//! Catalog store.
//!
//! Holds the fixed product list loaded at startup, plus the lookups derived
//! from it: category counts, the price bounds used to reset filters, and the
//! deals selection.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::domain::aggregates::{Product, ProductError};
use crate::domain::value_objects::ProductId;
use crate::filter::PriceRange;

/// Synthetic category that matches every product.
pub const ALL_CATEGORIES: &str = "All";

const BUNDLED_PRODUCTS: &str = include_str!("../../data/products.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("Malformed catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate product id {0}")]
    DuplicateId(ProductId),

    #[error("Invalid product {id}: {source}")]
    InvalidProduct { id: ProductId, source: ProductError },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Category {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    products: Vec<Product>,
    index: HashMap<ProductId, usize>,
    currency: String,
}

impl Catalog {
    pub fn new(products: Vec<Product>, currency: &str) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(products.len());
        for (position, product) in products.iter().enumerate() {
            product
                .validate()
                .map_err(|source| CatalogError::InvalidProduct { id: product.id(), source })?;
            if index.insert(product.id(), position).is_some() {
                return Err(CatalogError::DuplicateId(product.id()));
            }
        }
        Ok(Self { products, index, currency: currency.to_string() })
    }

    pub fn from_json(json: &str, currency: &str) -> Result<Self, CatalogError> {
        Self::new(serde_json::from_str(json)?, currency)
    }

    /// The storefront's built-in product list.
    pub fn bundled(currency: &str) -> Result<Self, CatalogError> {
        Self::from_json(BUNDLED_PRODUCTS, currency)
    }

    /// Reads `path` when given, otherwise falls back to the bundled list.
    pub fn load(path: Option<&Path>, currency: &str) -> Result<Self, CatalogError> {
        let catalog = match path {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .map_err(|source| CatalogError::Io { path: path.to_path_buf(), source })?;
                Self::from_json(&json, currency)?
            }
            None => Self::bundled(currency)?,
        };
        info!(products = catalog.len(), source = ?path, "Catalog loaded");
        Ok(catalog)
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn get(&self, id: ProductId) -> Option<&Product> {
        self.index.get(&id).and_then(|&position| self.products.get(position))
    }

    pub fn contains(&self, id: ProductId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// `All` first, then each category in order of first appearance.
    pub fn categories(&self) -> Vec<Category> {
        let mut categories = vec![Category { name: ALL_CATEGORIES.to_string(), count: self.products.len() }];
        for product in &self.products {
            match categories.iter_mut().skip(1).find(|c| c.name == product.category()) {
                Some(category) => category.count += 1,
                None => categories.push(Category { name: product.category().to_string(), count: 1 }),
            }
        }
        categories
    }

    /// Lowest to highest current price; `[0, 0]` when empty.
    pub fn price_bounds(&self) -> PriceRange {
        let prices = self.products.iter().map(Product::price);
        let min = prices.clone().min().unwrap_or(Decimal::ZERO);
        let max = prices.max().unwrap_or(Decimal::ZERO);
        PriceRange::new(min, max).unwrap_or_default()
    }

    /// Sale-badged or marked-down products in catalog order, at most `limit`.
    pub fn deals(&self, limit: usize) -> Vec<&Product> {
        self.products.iter().filter(|p| p.is_deal()).take(limit).collect()
    }
}
