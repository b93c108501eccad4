//! Per-visitor state.
//!
//! A [`ShopSession`] owns one visitor's cart and grid filters. It is created
//! when the visitor arrives and dropped when the session ends; every change
//! goes through its methods.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::auth::{AuthProvider, AuthSession};
use crate::catalog::Catalog;
use crate::domain::aggregates::{Cart, CartLine, Product};
use crate::domain::value_objects::ProductId;
use crate::filter::{FilterState, GridView};
use crate::{Result, StorefrontError};

#[derive(Debug, Clone)]
pub struct ShopSession {
    cart: Cart,
    filter: FilterState,
}

/// A cart line next to the live catalog entry, if the product still exists.
#[derive(Debug, Clone, Copy)]
pub struct HydratedLine<'a> {
    pub line: &'a CartLine,
    pub product: Option<&'a Product>,
}

impl ShopSession {
    pub fn new(catalog: &Catalog) -> Self {
        Self { cart: Cart::new(catalog.currency()), filter: FilterState::for_catalog(catalog) }
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn cart_mut(&mut self) -> &mut Cart {
        &mut self.cart
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: FilterState) {
        self.filter = filter;
    }

    pub fn reset_filters(&mut self, catalog: &Catalog) {
        self.filter.reset(catalog);
    }

    pub fn visible<'a>(&self, catalog: &'a Catalog) -> GridView<'a> {
        GridView::new(catalog, &self.filter)
    }

    /// Adds one unit of a catalog product. Unknown ids leave the cart untouched.
    pub fn add_to_cart(&mut self, catalog: &Catalog, product_id: ProductId) -> Result<()> {
        let product = catalog.get(product_id).ok_or(StorefrontError::ProductNotFound(product_id))?;
        self.cart.add_item(product);
        debug!(
            product_id = %product_id,
            total_items = self.cart.total_items(),
            total_price = %self.cart.total_price(),
            "Added to cart"
        );
        Ok(())
    }

    pub fn hydrated_cart<'a>(&'a self, catalog: &'a Catalog) -> Vec<HydratedLine<'a>> {
        self.cart
            .lines()
            .iter()
            .map(|line| {
                let product = catalog.get(line.product_id);
                if product.is_none() {
                    warn!(product_id = %line.product_id, "Cart line refers to a product missing from the catalog");
                }
                HydratedLine { line, product }
            })
            .collect()
    }
}

/// Everything the service keeps for one visitor.
pub struct SessionHandle<P> {
    shop: Mutex<ShopSession>,
    last_seen: Mutex<Instant>,
    pub auth: AuthSession<P>,
}

impl<P: AuthProvider> SessionHandle<P> {
    pub fn new(catalog: &Catalog, provider: Arc<P>) -> Self {
        Self {
            shop: Mutex::new(ShopSession::new(catalog)),
            last_seen: Mutex::new(Instant::now()),
            auth: AuthSession::new(provider),
        }
    }

    /// Shop operations never leave partial state, so a poisoned lock is still usable.
    pub fn shop(&self) -> MutexGuard<'_, ShopSession> {
        self.shop.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks the session as used now.
    pub fn touch(&self) {
        *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    pub fn last_seen(&self) -> Instant {
        *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn idle_for(&self) -> Duration {
        self.last_seen().elapsed()
    }
}
