//! Cart behavior against the in-memory store: reservations, waitlist
//! fallback, discount re-validation, pricing.

use livecart_commerce::cart::CartAddOutcome;
use livecart_commerce::discount::{Discount, DiscountRejection};
use livecart_commerce::storage::{DiscountStore, WaitlistStore};
use livecart_commerce::testing::TestHarness;
use livecart_commerce::waitlist::WaitlistReason;

#[tokio::test]
async fn add_snapshots_price_and_reserves_a_unit() {
    let h = TestHarness::new();
    let customer = h.seed_customer("cust_1");
    let variant = h.seed_variant("var_tee", 2_500, 3);

    let outcome = h.cart.add_item(&customer, &variant).await.unwrap();
    let CartAddOutcome::Added { item, cart } = outcome else {
        panic!("expected an added item");
    };
    assert_eq!(item.unit_price, h.money(2_500));
    assert_eq!(cart.items.len(), 1);
    assert_eq!(h.store.stock_level(&variant), 2);

    // Two units of the same variant are two rows.
    h.cart.add_item(&customer, &variant).await.unwrap();
    let view = h.cart.view(&customer, None).await.unwrap();
    assert_eq!(view.items.len(), 2);
    assert_eq!(view.pricing.subtotal, h.money(5_000));
    assert_eq!(h.store.stock_level(&variant), 1);
}

#[tokio::test]
async fn exhausted_stock_waitlists_instead_of_failing() {
    let h = TestHarness::new();
    let customer = h.seed_customer("cust_1");
    let variant = h.seed_variant("var_rare", 9_900, 0);

    let outcome = h.cart.add_item(&customer, &variant).await.unwrap();
    let CartAddOutcome::Waitlisted { entry, cart } = outcome else {
        panic!("expected a waitlist fallback");
    };
    assert_eq!(entry.reason, WaitlistReason::OutOfStock);
    assert!(cart.items.is_empty());
    assert_eq!(h.store.stock_level(&variant), 0);

    let waiting = h.store.waitlist_for(&customer).await.unwrap();
    assert_eq!(waiting.len(), 1);

    let names: Vec<String> = h
        .outbox
        .pending_events()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert!(names.contains(&"waitlist.added".to_string()));

    // The entry can be cleared again.
    let removed = h.store.remove_waitlist(&customer, &entry.id).await.unwrap();
    assert_eq!(removed.map(|e| e.id), Some(entry.id));
}

#[tokio::test]
async fn concurrent_adds_on_last_unit_serialize() {
    let h = TestHarness::new();
    let alice = h.seed_customer("cust_alice");
    let bob = h.seed_customer("cust_bob");
    let variant = h.seed_variant("var_last", 4_000, 1);

    let cart_a = h.cart.clone();
    let cart_b = h.cart.clone();
    let (variant_a, variant_b) = (variant.clone(), variant.clone());
    let (alice2, bob2) = (alice.clone(), bob.clone());

    let (a, b) = tokio::join!(
        tokio::spawn(async move { cart_a.add_item(&alice2, &variant_a).await }),
        tokio::spawn(async move { cart_b.add_item(&bob2, &variant_b).await }),
    );
    let outcomes = [a.unwrap().unwrap(), b.unwrap().unwrap()];

    let added = outcomes
        .iter()
        .filter(|o| matches!(o, CartAddOutcome::Added { .. }))
        .count();
    let waitlisted = outcomes
        .iter()
        .filter(|o| matches!(o, CartAddOutcome::Waitlisted { .. }))
        .count();
    assert_eq!((added, waitlisted), (1, 1));
    // Never negative, and the one unit is accounted for exactly once.
    assert_eq!(h.store.stock_level(&variant), 0);
}

#[tokio::test]
async fn add_then_remove_is_inventory_net_zero() {
    let h = TestHarness::new();
    let customer = h.seed_customer("cust_1");
    let variant = h.seed_variant("var_tee", 2_500, 5);

    let outcome = h.cart.add_item(&customer, &variant).await.unwrap();
    let CartAddOutcome::Added { item, .. } = outcome else {
        panic!("expected an added item");
    };
    assert_eq!(h.store.stock_level(&variant), 4);

    let view = h.cart.remove_item(&customer, &item.id).await.unwrap();
    assert!(view.items.is_empty());
    assert_eq!(h.store.stock_level(&variant), 5);
}

#[tokio::test]
async fn removal_wins_even_when_restock_fails() {
    let h = TestHarness::new();
    let customer = h.seed_customer("cust_1");
    let variant = h.seed_variant("var_tee", 2_500, 1);

    let outcome = h.cart.add_item(&customer, &variant).await.unwrap();
    let CartAddOutcome::Added { item, .. } = outcome else {
        panic!("expected an added item");
    };

    h.store.fail_releases(true);
    let view = h.cart.remove_item(&customer, &item.id).await.unwrap();
    assert!(view.items.is_empty());
    // The unit is lost until reconciliation runs; a task was queued for it.
    assert_eq!(h.store.stock_level(&variant), 0);
    let names: Vec<String> = h
        .outbox
        .pending_events()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert!(names.contains(&"inventory.reconcile".to_string()));
}

#[tokio::test]
async fn rejected_code_leaves_cart_untouched() {
    let h = TestHarness::new();
    let customer = h.seed_customer("cust_1");
    let variant = h.seed_variant("var_tee", 2_500, 5);
    h.cart.add_item(&customer, &variant).await.unwrap();

    let outcome = h.cart.apply_discount(&customer, "NOPE").await.unwrap();
    assert_eq!(outcome.rejection, Some(DiscountRejection::NotFound));
    assert!(outcome.cart.applied_discount.is_none());
    assert_eq!(outcome.cart.pricing.discount, h.money(0));
}

#[tokio::test]
async fn discount_drops_when_subtotal_falls_below_minimum() {
    let h = TestHarness::new();
    let customer = h.seed_customer("cust_1");
    let variant = h.seed_variant("var_tee", 3_000, 5);
    h.store
        .insert_discount(
            Discount::percentage("BULK15", "15% off $50+", 15.0, h.now())
                .with_minimum_subtotal(h.money(5_000)),
        )
        .await
        .unwrap();

    let first = h.cart.add_item(&customer, &variant).await.unwrap();
    h.cart.add_item(&customer, &variant).await.unwrap();

    let applied = h.cart.apply_discount(&customer, "bulk15").await.unwrap();
    assert!(applied.rejection.is_none());
    assert_eq!(applied.cart.pricing.discount, h.money(900));

    // Dropping below the minimum evicts the discount on the next pricing
    // pass and surfaces the reason.
    let CartAddOutcome::Added { item, .. } = first else {
        panic!("expected an added item");
    };
    let view = h.cart.remove_item(&customer, &item.id).await.unwrap();
    assert_eq!(
        view.dropped_discount,
        Some(DiscountRejection::MinimumNotMet {
            required: h.money(5_000)
        })
    );
    assert!(view.applied_discount.is_none());
    assert_eq!(view.pricing.discount, h.money(0));

    // And it stays gone on subsequent reads.
    let view = h.cart.view(&customer, None).await.unwrap();
    assert!(view.applied_discount.is_none());
    assert!(view.dropped_discount.is_none());
}

#[tokio::test]
async fn discount_amount_tracks_live_subtotal() {
    let h = TestHarness::new();
    let customer = h.seed_customer("cust_1");
    let variant = h.seed_variant("var_tee", 2_000, 5);
    h.store
        .insert_discount(Discount::percentage("SAVE10", "10% off", 10.0, h.now()))
        .await
        .unwrap();

    h.cart.add_item(&customer, &variant).await.unwrap();
    let applied = h.cart.apply_discount(&customer, "SAVE10").await.unwrap();
    assert_eq!(applied.cart.pricing.discount, h.money(200));

    // Adding another unit doubles the subtotal; the cached amount follows.
    h.cart.add_item(&customer, &variant).await.unwrap();
    let view = h.cart.view(&customer, None).await.unwrap();
    assert_eq!(view.pricing.discount, h.money(400));
    assert_eq!(
        view.applied_discount.as_ref().map(|d| d.amount),
        Some(h.money(400))
    );
}

#[tokio::test]
async fn view_never_returns_a_negative_total() {
    let h = TestHarness::new();
    let customer = h.seed_customer("cust_1");
    let variant = h.seed_variant("var_cheap", 100, 5);
    h.store
        .insert_discount(Discount::fixed_amount(
            "HUGE",
            "Way too big",
            h.money(50_000),
            h.now(),
        ))
        .await
        .unwrap();

    h.cart.add_item(&customer, &variant).await.unwrap();
    let applied = h.cart.apply_discount(&customer, "HUGE").await.unwrap();
    assert!(applied.rejection.is_none());

    let view = h.cart.view(&customer, None).await.unwrap();
    assert!(view.pricing.total.cents >= 0);
    // Fixed discounts cap at the subtotal.
    assert_eq!(view.pricing.discount, h.money(100));
}
