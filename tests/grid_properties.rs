//! Property-based tests for the grid engine and the cart.

use proptest::prelude::*;
use rust_decimal::Decimal;

use shoplux_storefront::{
    visible_products, Badge, Cart, Catalog, FilterState, PriceRange, Product, ProductId, SortKey,
};

const CATEGORIES: [&str; 3] = ["Electronics", "Fashion", "Footwear"];

prop_compose! {
    fn product(id: u32)(
        cents in 0i64..100_000,
        markup in proptest::option::of(1i64..50_000),
        category in 0usize..CATEGORIES.len(),
        rating in 0i64..=50,
        new in any::<bool>(),
    ) -> Product {
        let price = Decimal::new(cents, 2);
        let mut p = Product::new(id, format!("Item {id}"), price, CATEGORIES[category])
            .with_rating(Decimal::new(rating, 1), 0);
        if let Some(markup) = markup {
            p = p.with_original_price(price + Decimal::new(markup, 2));
        }
        if new {
            p = p.with_badge(Badge::New);
        }
        p
    }
}

fn catalog() -> impl Strategy<Value = Catalog> {
    (0usize..20)
        .prop_flat_map(|n| (0..n as u32).map(product).collect::<Vec<_>>())
        .prop_map(|products| Catalog::new(products, "USD").unwrap())
}

fn ids(products: &[&Product]) -> Vec<ProductId> {
    products.iter().map(|p| p.id()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn reset_state_is_identity(catalog in catalog()) {
        let state = FilterState::for_catalog(&catalog);
        let visible = visible_products(catalog.products(), &state);
        let all: Vec<ProductId> = catalog.products().iter().map(|p| p.id()).collect();
        prop_assert_eq!(ids(&visible), all);
    }

    #[test]
    fn category_selection_includes_exactly_its_products(catalog in catalog(), pick in 0usize..CATEGORIES.len()) {
        let mut state = FilterState::for_catalog(&catalog);
        state.selected_category = CATEGORIES[pick].to_string();
        let visible = ids(&visible_products(catalog.products(), &state));
        for p in catalog.products() {
            prop_assert_eq!(visible.contains(&p.id()), p.category() == CATEGORIES[pick]);
        }
    }

    #[test]
    fn filters_commute_with_sorting(catalog in catalog(), sort in 0usize..SortKey::ALL.len(), min in 0i64..100_000, span in 0i64..100_000) {
        let mut state = FilterState::for_catalog(&catalog);
        state.price_range = PriceRange::new(Decimal::new(min, 2), Decimal::new(min + span, 2)).unwrap();
        let featured = visible_products(catalog.products(), &state);
        state.sort_key = SortKey::ALL[sort];
        let sorted = visible_products(catalog.products(), &state);

        let mut a = ids(&featured);
        let mut b = ids(&sorted);
        a.sort();
        b.sort();
        prop_assert_eq!(a, b);
        prop_assert!(sorted.iter().all(|p| state.price_range.contains(p.price())));
    }

    #[test]
    fn price_low_reversed_is_price_high(catalog in catalog()) {
        let mut prices: Vec<Decimal> = catalog.products().iter().map(|p| p.price()).collect();
        prices.sort();
        prices.dedup();
        prop_assume!(prices.len() == catalog.len());

        let mut state = FilterState::for_catalog(&catalog);
        state.sort_key = SortKey::PriceLow;
        let mut low = ids(&visible_products(catalog.products(), &state));
        state.sort_key = SortKey::PriceHigh;
        let high = ids(&visible_products(catalog.products(), &state));
        low.reverse();
        prop_assert_eq!(low, high);
    }

    #[test]
    fn newest_is_stable_partition(catalog in catalog()) {
        let mut state = FilterState::for_catalog(&catalog);
        state.sort_key = SortKey::Newest;
        let visible = visible_products(catalog.products(), &state);
        let (new, rest): (Vec<&Product>, Vec<&Product>) =
            catalog.products().iter().partition(|p| p.has_badge(&Badge::New));
        let expected: Vec<ProductId> = new.iter().chain(rest.iter()).map(|p| p.id()).collect();
        prop_assert_eq!(ids(&visible), expected);
    }

    #[test]
    fn cart_totals_track_lines(catalog in catalog(), ops in proptest::collection::vec((0u32..20, -2i64..5, 0u8..3), 0..40)) {
        prop_assume!(!catalog.is_empty());
        let mut cart = Cart::new("USD");
        for (raw_id, quantity, op) in ops {
            let id = ProductId::new(raw_id % catalog.len() as u32);
            match op {
                0 => cart.add_item(catalog.get(id).unwrap()),
                1 => cart.set_quantity(id, quantity),
                _ => cart.remove_item(id),
            }
            let sum: u64 = cart.lines().iter().map(|l| u64::from(l.quantity.value())).sum();
            let price: Decimal = cart.lines().iter().map(|l| l.line_total().amount()).sum();
            prop_assert_eq!(cart.total_items(), sum);
            prop_assert_eq!(cart.total_price().amount(), price);
            prop_assert!(cart.lines().iter().all(|l| l.quantity.value() >= 1));
            let mut seen: Vec<ProductId> = cart.lines().iter().map(|l| l.product_id).collect();
            seen.sort();
            seen.dedup();
            prop_assert_eq!(seen.len(), cart.lines().len());
        }
    }

    #[test]
    fn discount_is_a_percentage(catalog in catalog()) {
        for p in catalog.products() {
            let discount = p.discount_percent();
            prop_assert!(discount <= 100);
            if p.original_price().is_none() {
                prop_assert_eq!(discount, 0);
            }
        }
    }
}
