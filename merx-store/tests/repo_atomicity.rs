//! Storage-level guarantees: atomic stock movements, all-or-nothing order
//! creation, transactional cancellation and settlement.

use std::sync::Arc;

use uuid::Uuid;

use merx_catalog::InventoryLedger;
use merx_core::repository::{CatalogStore, OrderStore, PaymentStore};
use merx_core::{DomainError, StoreError};
use merx_shared::models::catalog::NewProduct;
use merx_shared::models::order::{FulfillmentStatus, NewOrder, NewOrderItem};
use merx_shared::models::payment::{NewPayment, PaymentStatus};
use merx_store::{Db, SqliteCatalogStore, SqliteOrderStore, SqlitePaymentStore};

async fn setup() -> (Db, SqliteCatalogStore, SqliteOrderStore, SqlitePaymentStore) {
    let db = Db::memory().await.expect("open in-memory db");
    db.migrate().await.expect("run migrations");
    let catalog = SqliteCatalogStore::new(db.pool.clone());
    let orders = SqliteOrderStore::new(db.pool.clone());
    let payments = SqlitePaymentStore::new(db.pool.clone());
    (db, catalog, orders, payments)
}

async fn seed_product(catalog: &SqliteCatalogStore, price_cents: i64, stock: i64) -> Uuid {
    catalog
        .create_product(&NewProduct { name: "Widget".into(), price_cents, stock })
        .await
        .expect("create product")
        .id
}

fn order_for(product_id: Uuid, quantity: i64, unit_price_cents: i64) -> NewOrder {
    NewOrder {
        customer_id: "cust-1".into(),
        items: vec![NewOrderItem { product_id, quantity, unit_price_cents }],
        total_cents: quantity * unit_price_cents,
        payment_method: Some("alpha".into()),
        shipping_address: "1 Main St".into(),
        phone: "555-0100".into(),
    }
}

#[tokio::test]
async fn adjust_stock_is_exact_and_guarded() {
    let (_db, catalog, _orders, _payments) = setup().await;
    let id = seed_product(&catalog, 500, 10).await;

    assert_eq!(catalog.adjust_stock(id, -3).await.unwrap(), 7);
    assert_eq!(catalog.adjust_stock(id, 3).await.unwrap(), 10);

    let err = catalog.adjust_stock(id, -11).await.unwrap_err();
    match err {
        StoreError::InsufficientStock { requested, available, .. } => {
            assert_eq!(requested, 11);
            assert_eq!(available, 10);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // Stock untouched by the failed decrement.
    assert_eq!(catalog.get_product(id).await.unwrap().unwrap().stock, 10);

    assert!(matches!(
        catalog.adjust_stock(Uuid::new_v4(), -1).await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn failed_line_item_rolls_back_earlier_reservations() {
    let (_db, catalog, orders, _payments) = setup().await;
    let product_a = seed_product(&catalog, 500, 10).await;
    let product_b = seed_product(&catalog, 300, 5).await;

    let new_order = NewOrder {
        customer_id: "cust-1".into(),
        items: vec![
            NewOrderItem { product_id: product_a, quantity: 2, unit_price_cents: 500 },
            NewOrderItem { product_id: product_b, quantity: 999, unit_price_cents: 300 },
        ],
        total_cents: 2 * 500 + 999 * 300,
        payment_method: None,
        shipping_address: "1 Main St".into(),
        phone: "555-0100".into(),
    };

    let err = orders.create_order(&new_order).await.unwrap_err();
    assert!(matches!(err, StoreError::InsufficientStock { .. }));

    // Product A's reservation was rolled back with the transaction.
    assert_eq!(catalog.get_product(product_a).await.unwrap().unwrap().stock, 10);
    assert_eq!(catalog.get_product(product_b).await.unwrap().unwrap().stock, 5);
}

#[tokio::test]
async fn order_total_survives_price_changes() {
    let (_db, catalog, orders, _payments) = setup().await;
    let id = seed_product(&catalog, 500, 10).await;

    let order = orders.create_order(&order_for(id, 3, 500)).await.unwrap();
    assert_eq!(order.total_cents, 1500);

    catalog.update_product(id, None, Some(9999)).await.unwrap();

    let reloaded = orders.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(reloaded.total_cents, 1500);
    assert_eq!(reloaded.items[0].unit_price_cents, 500);
}

#[tokio::test]
async fn cancel_restores_reserved_quantities_exactly() {
    let (_db, catalog, orders, _payments) = setup().await;
    let id = seed_product(&catalog, 500, 10).await;

    let order = orders.create_order(&order_for(id, 4, 500)).await.unwrap();
    assert_eq!(catalog.get_product(id).await.unwrap().unwrap().stock, 6);

    let cancelled = orders.cancel_order(order.id).await.unwrap();
    assert_eq!(cancelled.fulfillment_status, FulfillmentStatus::Cancelled);
    assert_eq!(catalog.get_product(id).await.unwrap().unwrap().stock, 10);

    // A second cancel must not release stock again.
    assert!(matches!(orders.cancel_order(order.id).await, Err(StoreError::Conflict(_))));
    assert_eq!(catalog.get_product(id).await.unwrap().unwrap().stock, 10);
}

#[tokio::test]
async fn shipped_orders_cannot_be_cancelled() {
    let (_db, catalog, orders, _payments) = setup().await;
    let id = seed_product(&catalog, 500, 10).await;

    let order = orders.create_order(&order_for(id, 2, 500)).await.unwrap();
    orders
        .update_statuses(order.id, FulfillmentStatus::Shipped, PaymentStatus::Pending)
        .await
        .unwrap();

    assert!(matches!(orders.cancel_order(order.id).await, Err(StoreError::Conflict(_))));
    // No stock came back.
    assert_eq!(catalog.get_product(id).await.unwrap().unwrap().stock, 8);
}

#[tokio::test]
async fn settlement_is_transactional_and_single_shot() {
    let (_db, catalog, orders, payments) = setup().await;
    let id = seed_product(&catalog, 500, 10).await;
    let order = orders.create_order(&order_for(id, 3, 500)).await.unwrap();

    let new_payment = NewPayment {
        order_id: order.id,
        transaction_id: "txn-1".into(),
        gateway: "alpha".into(),
        amount_cents: order.total_cents,
        gateway_response: Some("approved".into()),
    };

    let (paid, payment) = orders.settle_payment(order.id, &new_payment).await.unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Completed);
    // The coupling rule: pending fulfillment advanced to processing.
    assert_eq!(paid.fulfillment_status, FulfillmentStatus::Processing);
    assert_eq!(payment.status, PaymentStatus::Completed);

    // A second settlement is refused and no duplicate row appears.
    assert!(matches!(
        orders.settle_payment(order.id, &new_payment).await,
        Err(StoreError::Conflict(_))
    ));
    assert_eq!(payments.list_payments_for_order(order.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn refund_propagates_to_order() {
    let (_db, catalog, orders, payments) = setup().await;
    let id = seed_product(&catalog, 500, 10).await;
    let order = orders.create_order(&order_for(id, 1, 500)).await.unwrap();

    let new_payment = NewPayment {
        order_id: order.id,
        transaction_id: "txn-2".into(),
        gateway: "beta".into(),
        amount_cents: 500,
        gateway_response: None,
    };
    let (_paid, payment) = orders.settle_payment(order.id, &new_payment).await.unwrap();

    let refunded = payments.mark_refunded(payment.id).await.unwrap();
    assert_eq!(refunded.status, PaymentStatus::Refunded);

    let reloaded = orders.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(reloaded.payment_status, PaymentStatus::Refunded);

    // One-directional: refunding twice is a conflict.
    assert!(matches!(payments.mark_refunded(payment.id).await, Err(StoreError::Conflict(_))));
}

#[tokio::test]
async fn concurrent_reservations_never_oversell() {
    let (_db, catalog, _orders, _payments) = setup().await;
    let catalog = Arc::new(catalog);
    let id = seed_product(&catalog, 500, 5).await;

    let store_a: Arc<dyn CatalogStore> = catalog.clone();
    let store_b: Arc<dyn CatalogStore> = catalog.clone();
    let ledger_a = InventoryLedger::new(store_a);
    let ledger_b = InventoryLedger::new(store_b);

    // Both want the full remaining stock; exactly one may win.
    let (first, second) = tokio::join!(ledger_a.reserve(id, 5), ledger_b.reserve(id, 5));

    let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one reservation must win: {first:?} / {second:?}");

    let loser = if first.is_err() { first } else { second };
    assert!(matches!(loser, Err(DomainError::InsufficientStock { available: 0, .. })));

    assert_eq!(catalog.get_product(id).await.unwrap().unwrap().stock, 0);
}
