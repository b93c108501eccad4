//! Aggregates module
pub mod product;
pub mod cart;

pub use product::{Badge, Product, ProductError};
pub use cart::{Cart, CartLine};
