//! Domain events
use crate::domain::value_objects::ProductId;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomainEvent {
    Cart(CartEvent),
    Auth(AuthEvent),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CartEvent {
    ItemAdded { cart_id: Uuid, product_id: ProductId, quantity: u32 },
    QuantityChanged { cart_id: Uuid, product_id: ProductId, quantity: u32 },
    ItemRemoved { cart_id: Uuid, product_id: ProductId },
    Cleared { cart_id: Uuid },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthEvent {
    SignedUp { user_id: Uuid },
    SignedIn { user_id: Uuid },
    SignedOut { user_id: Uuid },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cart(CartEvent::ItemAdded { .. }) => "cart.item_added",
            Self::Cart(CartEvent::QuantityChanged { .. }) => "cart.quantity_changed",
            Self::Cart(CartEvent::ItemRemoved { .. }) => "cart.item_removed",
            Self::Cart(CartEvent::Cleared { .. }) => "cart.cleared",
            Self::Auth(AuthEvent::SignedUp { .. }) => "auth.signed_up",
            Self::Auth(AuthEvent::SignedIn { .. }) => "auth.signed_in",
            Self::Auth(AuthEvent::SignedOut { .. }) => "auth.signed_out",
        }
    }
}
