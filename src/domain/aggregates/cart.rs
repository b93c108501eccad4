//! Cart Aggregate
//!
//! One line per product. Lines carry a snapshot of the product taken when it
//! was first added, so catalog changes never reprice an existing cart.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use crate::domain::aggregates::Product;
use crate::domain::events::{CartEvent, DomainEvent};
use crate::domain::value_objects::{Money, ProductId, Quantity};

#[derive(Clone, Debug)]
pub struct Cart {
    id: Uuid,
    currency: String,
    lines: Vec<CartLine>,
    total_items: u64,
    total_price: Money,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub image: String,
    pub category: String,
    pub quantity: Quantity,
}

impl CartLine {
    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity.value()) }
}

impl Cart {
    pub fn new(currency: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(), currency: currency.to_string(), lines: vec![],
            total_items: 0, total_price: Money::zero(currency),
            created_at: now, updated_at: now, events: vec![],
        }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn lines(&self) -> &[CartLine] { &self.lines }
    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> { self.lines.iter().find(|l| l.product_id == product_id) }
    pub fn total_items(&self) -> u64 { self.total_items }
    pub fn total_price(&self) -> &Money { &self.total_price }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// Adds one unit of `product`, merging into an existing line.
    pub fn add_item(&mut self, product: &Product) {
        let quantity = match self.lines.iter().position(|l| l.product_id == product.id()) {
            Some(index) => {
                let existing = &mut self.lines[index];
                existing.quantity = existing.quantity.increment();
                existing.quantity
            }
            None => {
                self.lines.push(CartLine {
                    product_id: product.id(),
                    name: product.name().to_string(),
                    unit_price: Money::new(product.price(), &self.currency),
                    image: product.image().to_string(),
                    category: product.category().to_string(),
                    quantity: Quantity::ONE,
                });
                Quantity::ONE
            }
        };
        self.recalculate();
        self.raise_event(CartEvent::ItemAdded { cart_id: self.id, product_id: product.id(), quantity: quantity.value() });
    }

    /// Drops the whole line. Absent ids are ignored.
    pub fn remove_item(&mut self, product_id: ProductId) {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        if self.lines.len() == before { return; }
        self.recalculate();
        self.raise_event(CartEvent::ItemRemoved { cart_id: self.id, product_id });
    }

    /// Zero or negative removes the line, values past `u32::MAX` saturate;
    /// absent ids are ignored.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: i64) {
        let Some(quantity) = Quantity::from_signed(quantity) else {
            self.remove_item(product_id);
            return;
        };
        let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) else { return };
        line.quantity = quantity;
        self.recalculate();
        self.raise_event(CartEvent::QuantityChanged { cart_id: self.id, product_id, quantity: quantity.value() });
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.recalculate();
        self.raise_event(CartEvent::Cleared { cart_id: self.id });
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    fn recalculate(&mut self) {
        self.total_items = self.lines.iter().map(|l| u64::from(l.quantity.value())).sum();
        self.total_price = self.lines.iter().fold(Money::zero(&self.currency), |acc, l| acc.add(&l.line_total()).unwrap_or(acc));
        self.updated_at = Utc::now();
    }

    fn raise_event(&mut self, e: CartEvent) { self.events.push(DomainEvent::Cart(e)); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn headphones() -> Product { Product::new(1, "Premium Wireless Headphones", Decimal::new(29999, 2), "Electronics") }
    fn watch() -> Product { Product::new(4, "Smart Watch Pro", Decimal::new(44999, 2), "Electronics") }

    #[test]
    fn test_cart_operations() {
        let mut cart = Cart::new("USD");
        cart.add_item(&headphones());
        cart.add_item(&headphones());
        cart.add_item(&watch());
        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.total_items(), 3);
        assert_eq!(cart.line(ProductId::new(1)).unwrap().quantity.value(), 2); // Merged
        assert_eq!(cart.total_price().amount(), Decimal::new(104997, 2));
    }

    #[test]
    fn test_set_quantity_zero_removes_line() {
        let mut a = Cart::new("USD");
        a.add_item(&headphones());
        a.add_item(&watch());
        let mut b = a.clone();
        a.set_quantity(ProductId::new(1), 0);
        b.remove_item(ProductId::new(1));
        assert_eq!(a.lines(), b.lines());
        assert_eq!(a.total_items(), 1);
        a.set_quantity(ProductId::new(4), -2);
        assert!(a.is_empty());
        assert_eq!(a.total_price().amount(), Decimal::ZERO);
    }

    #[test]
    fn test_set_quantity_updates_totals() {
        let mut cart = Cart::new("USD");
        cart.add_item(&watch());
        cart.set_quantity(ProductId::new(4), 5);
        assert_eq!(cart.total_items(), 5);
        assert_eq!(cart.total_price().amount(), Decimal::new(224995, 2));
        cart.set_quantity(ProductId::new(99), 3);
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn test_set_quantity_beyond_u32_keeps_line() {
        let mut cart = Cart::new("USD");
        cart.add_item(&headphones());
        cart.set_quantity(ProductId::new(1), 5_000_000_000);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.line(ProductId::new(1)).unwrap().quantity.value(), u32::MAX);
        assert_eq!(cart.total_items(), u64::from(u32::MAX));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = Cart::new("USD");
        cart.add_item(&watch());
        cart.take_events();
        cart.remove_item(ProductId::new(7));
        assert_eq!(cart.total_items(), 1);
        assert!(cart.take_events().is_empty());
    }

    #[test]
    fn test_lines_keep_add_time_snapshot() {
        let mut cart = Cart::new("USD");
        cart.add_item(&headphones());
        let repriced = Product::new(1, "Premium Wireless Headphones", Decimal::new(9999, 2), "Electronics");
        cart.add_item(&repriced);
        assert_eq!(cart.line(ProductId::new(1)).unwrap().unit_price.amount(), Decimal::new(29999, 2));
        assert_eq!(cart.total_price().amount(), Decimal::new(59998, 2));
    }

    #[test]
    fn test_events() {
        let mut cart = Cart::new("USD");
        cart.add_item(&watch());
        cart.add_item(&watch());
        cart.clear();
        let events = cart.take_events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1], DomainEvent::Cart(CartEvent::ItemAdded { cart_id: cart.id(), product_id: ProductId::new(4), quantity: 2 }));
        assert_eq!(events[2].name(), "cart.cleared");
        assert!(cart.take_events().is_empty());
    }
}
