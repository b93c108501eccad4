//! ShopLux Storefront
//!
//! Storefront engine behind the ShopLux product pages.
//!
//! ## Features
//! - Fixed product catalog with category counts and deals
//! - Search, category, price-range filtering and sorting for the product grid
//! - Shopping cart with add-time price snapshots
//! - Sign-up/sign-in session over an external identity provider
//! - JSON HTTP API over all of the above

use thiserror::Error;

pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod filter;
pub mod session;

pub use catalog::{Catalog, Category, ALL_CATEGORIES};
pub use domain::aggregates::{Badge, Cart, CartLine, Product};
pub use domain::value_objects::{Money, ProductId, Quantity};
pub use filter::{visible_products, FilterState, GridState, GridView, PriceRange, SortKey};
pub use session::ShopSession;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("Product {0} not found")]
    ProductNotFound(ProductId),

    #[error(transparent)]
    Catalog(#[from] catalog::CatalogError),

    #[error(transparent)]
    Filter(#[from] filter::FilterError),

    #[error(transparent)]
    Validation(#[from] auth::ValidationError),

    #[error(transparent)]
    Auth(#[from] auth::AuthError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
