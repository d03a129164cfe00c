//! Integration tests for the order workflow.
//!
//! These tests run the full service against the in-memory store and verify
//! pricing, stock reservation, lifecycle transitions and transaction rollback.

use std::sync::Arc;

use domain::{
    CatalogService, CreateOrderRequest, DomainError, ErrorKind, LineItemRequest, Money, Order,
    OrderError, OrderId, OrderService, OrderStatus, ProductId,
};
use futures_util::future::join_all;
use store::{CatalogStore, InMemoryStore, NewProduct};

async fn store_with(products: &[(&str, i64, &str, i64)]) -> InMemoryStore {
    let store = InMemoryStore::new();
    for &(name, price_cents, category, quantity) in products {
        store
            .insert_product(None, NewProduct::new(name, price_cents, category, quantity))
            .await
            .unwrap();
    }
    store
}

async fn stock(store: &InMemoryStore, id: i64) -> i64 {
    store
        .get_product(None, ProductId::new(id))
        .await
        .unwrap()
        .unwrap()
        .quantity
}

fn request(items: &[(i64, i64)]) -> CreateOrderRequest {
    CreateOrderRequest::new(
        items
            .iter()
            .map(|&(product_id, quantity)| LineItemRequest::new(product_id, quantity))
            .collect(),
    )
}

fn order_error(result: Result<Order, DomainError>) -> OrderError {
    match result {
        Err(DomainError::Order(err)) => err,
        other => panic!("expected order error, got {other:?}"),
    }
}

mod create_order {
    use super::*;

    #[tokio::test]
    async fn single_regular_product() {
        let store = store_with(&[("Widget", 1000, "Regular", 10)]).await;
        let service = OrderService::new(store.clone());

        let order = service.create_order(request(&[(1, 2)])).await.unwrap();

        assert_eq!(order.id, OrderId::new(1));
        assert_eq!(order.amount, Money::from_dollars(20));
        assert_eq!(order.discount_percent, 0);
        assert_eq!(order.final_amount, Money::from_dollars(20));
        assert_eq!(order.status, OrderStatus::Placed);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].product_id, ProductId::new(1));
        assert_eq!(order.items[0].quantity, 2);
        assert!(order.dispatched_at.is_none());
        assert_eq!(stock(&store, 1).await, 8);
    }

    #[tokio::test]
    async fn three_premium_products_get_discount() {
        let store = store_with(&[
            ("A", 1000, "Premium", 2),
            ("B", 2000, "Premium", 2),
            ("C", 3000, "Premium", 2),
        ])
        .await;
        let service = OrderService::new(store.clone());

        let order = service
            .create_order(request(&[(1, 2), (2, 2), (3, 2)]))
            .await
            .unwrap();

        assert_eq!(order.amount, Money::from_dollars(120));
        assert_eq!(order.discount_percent, 10);
        assert_eq!(order.final_amount, Money::from_dollars(108));
        for id in 1..=3 {
            assert_eq!(stock(&store, id).await, 0);
        }
    }

    #[tokio::test]
    async fn fewer_than_three_premium_products_pay_full_price() {
        let store = store_with(&[
            ("A", 1000, "Premium", 5),
            ("B", 2000, "Premium", 5),
            ("C", 3000, "Regular", 5),
            ("D", 500, "Budget", 5),
        ])
        .await;
        let service = OrderService::new(store);

        for items in [
            vec![(3, 1)],
            vec![(1, 1), (3, 1)],
            vec![(1, 1), (2, 1), (3, 1), (4, 1)],
        ] {
            let order = service.create_order(request(&items)).await.unwrap();
            assert_eq!(order.discount_percent, 0);
            assert_eq!(order.final_amount, order.amount);
        }
    }

    #[tokio::test]
    async fn duplicate_entries_become_one_line_item() {
        let store = store_with(&[
            ("Widget", 1000, "Regular", 10),
            ("Gadget", 500, "Budget", 10),
        ])
        .await;
        let service = OrderService::new(store.clone());

        let order = service
            .create_order(request(&[(2, 1), (1, 2), (2, 3)]))
            .await
            .unwrap();

        let items: Vec<(i64, i64)> = order
            .items
            .iter()
            .map(|item| (item.product_id.as_i64(), item.quantity))
            .collect();
        assert_eq!(items, vec![(1, 2), (2, 4)]);
        assert_eq!(order.amount, Money::from_dollars(40));
        assert_eq!(stock(&store, 2).await, 6);
    }

    #[tokio::test]
    async fn quantity_limit_boundary() {
        let store = store_with(&[("Widget", 100, "Regular", 30)]).await;
        let service = OrderService::new(store.clone());

        service.create_order(request(&[(1, 10)])).await.unwrap();

        let err = order_error(service.create_order(request(&[(1, 11)])).await);
        assert_eq!(
            err,
            OrderError::ProductQuantityExceeded {
                product_id: ProductId::new(1),
                limit: 10,
                asked: 11
            }
        );

        let split = order_error(service.create_order(request(&[(1, 5), (1, 6)])).await);
        assert!(matches!(
            split,
            OrderError::ProductQuantityExceeded { asked: 11, .. }
        ));
        assert_eq!(stock(&store, 1).await, 20);
    }

    #[tokio::test]
    async fn huge_duplicate_quantities_exceed_limit() {
        let store = store_with(&[("Widget", 100, "Regular", 30)]).await;
        let service = OrderService::new(store.clone());

        let result = service
            .create_order(request(&[(1, i64::MAX), (1, 1)]))
            .await;

        assert_eq!(result.as_ref().unwrap_err().kind(), ErrorKind::Validation);
        assert_eq!(
            order_error(result),
            OrderError::ProductQuantityExceeded {
                product_id: ProductId::new(1),
                limit: 10,
                asked: i64::MAX
            }
        );
        assert_eq!(store.order_count().await, 0);
        assert_eq!(stock(&store, 1).await, 30);
    }

    #[tokio::test]
    async fn insufficient_stock_is_rejected() {
        let store = store_with(&[("Widget", 100, "Regular", 4)]).await;
        let service = OrderService::new(store.clone());

        let err = order_error(service.create_order(request(&[(1, 8)])).await);

        assert_eq!(
            err,
            OrderError::ProductQuantityInsufficient {
                product_id: ProductId::new(1),
                remaining: 4,
                asked: 8
            }
        );
        assert_eq!(store.order_count().await, 0);
        assert_eq!(stock(&store, 1).await, 4);
    }

    #[tokio::test]
    async fn unknown_product_rejects_whole_order() {
        let store = store_with(&[("Widget", 100, "Regular", 4)]).await;
        let service = OrderService::new(store.clone());

        let result = service.create_order(request(&[(1, 1), (7, 1)])).await;

        assert_eq!(result.as_ref().unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(
            order_error(result),
            OrderError::ProductNotFound {
                product_id: ProductId::new(7)
            }
        );
        assert_eq!(stock(&store, 1).await, 4);
    }

    #[tokio::test]
    async fn malformed_requests_are_rejected() {
        let store = store_with(&[("Widget", 100, "Regular", 4)]).await;
        let service = OrderService::new(store.clone());

        let empty = order_error(service.create_order(request(&[])).await);
        assert_eq!(empty, OrderError::EmptyOrder);

        let zero = order_error(service.create_order(request(&[(1, 0)])).await);
        assert!(matches!(zero, OrderError::InvalidQuantity { quantity: 0, .. }));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn failed_stock_write_rolls_back_order() {
        let store = store_with(&[("Widget", 1000, "Regular", 10)]).await;
        let service = OrderService::new(store.clone());
        store.set_fail_on_update_quantities(true);

        let result = service.create_order(request(&[(1, 2)])).await;

        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.item_count().await, 0);
        assert_eq!(stock(&store, 1).await, 10);

        store.set_fail_on_update_quantities(false);
        let order = service.create_order(request(&[(1, 2)])).await.unwrap();
        assert_eq!(order.id, OrderId::new(1));
    }

    #[tokio::test]
    async fn concurrent_orders_never_oversell() {
        let store = store_with(&[("Widget", 100, "Regular", 5)]).await;
        let service = Arc::new(OrderService::new(store.clone()));

        let attempts = (0..8).map(|_| {
            let service = Arc::clone(&service);
            async move { service.create_order(request(&[(1, 2)])).await }
        });
        let results = join_all(attempts).await;

        let placed = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(placed, 2);
        for result in results.into_iter().filter(|r| r.is_err()) {
            assert!(matches!(
                order_error(result),
                OrderError::ProductQuantityInsufficient { asked: 2, .. }
            ));
        }
        assert_eq!(stock(&store, 1).await, 1);
    }
}

mod update_status {
    use super::*;

    async fn placed_order() -> (InMemoryStore, OrderService<InMemoryStore>, OrderId) {
        let store = store_with(&[
            ("Widget", 1000, "Regular", 10),
            ("Gadget", 2500, "Premium", 10),
        ])
        .await;
        let service = OrderService::new(store.clone());
        let order = service
            .create_order(request(&[(1, 3), (2, 1)]))
            .await
            .unwrap();
        (store, service, order.id)
    }

    #[tokio::test]
    async fn full_forward_lifecycle() {
        let (_store, service, order_id) = placed_order().await;

        let order = service
            .update_order_status(order_id, "Dispatched")
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Dispatched);
        let dispatched_at = order.dispatched_at.expect("dispatch time set");
        assert_eq!(order.items.len(), 2);

        let order = service
            .update_order_status(order_id, "Completed")
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.dispatched_at, Some(dispatched_at));
    }

    #[tokio::test]
    async fn cancel_restocks_products() {
        let (store, service, order_id) = placed_order().await;
        assert_eq!(stock(&store, 1).await, 7);
        assert_eq!(stock(&store, 2).await, 9);

        let order = service
            .update_order_status(order_id, "Cancelled")
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Cancelled);
        assert!(order.dispatched_at.is_none());
        assert_eq!(stock(&store, 1).await, 10);
        assert_eq!(stock(&store, 2).await, 10);
    }

    #[tokio::test]
    async fn cancel_after_dispatch_restocks_products() {
        let (store, service, order_id) = placed_order().await;

        service
            .update_order_status(order_id, "Dispatched")
            .await
            .unwrap();
        service
            .update_order_status(order_id, "Cancelled")
            .await
            .unwrap();

        assert_eq!(stock(&store, 1).await, 10);
        assert_eq!(stock(&store, 2).await, 10);
    }

    #[tokio::test]
    async fn return_restocks_products() {
        let (store, service, order_id) = placed_order().await;

        for status in ["Dispatched", "Completed", "Returned"] {
            service
                .update_order_status(order_id, status)
                .await
                .unwrap();
        }

        assert_eq!(stock(&store, 1).await, 10);
        assert_eq!(stock(&store, 2).await, 10);
    }

    #[tokio::test]
    async fn restock_adds_to_current_stock() {
        let (store, service, first) = placed_order().await;
        service.create_order(request(&[(1, 5)])).await.unwrap();
        assert_eq!(stock(&store, 1).await, 2);

        service.update_order_status(first, "Cancelled").await.unwrap();

        assert_eq!(stock(&store, 1).await, 5);
    }

    #[tokio::test]
    async fn illegal_transition_changes_nothing() {
        let (store, service, order_id) = placed_order().await;

        let err = order_error(service.update_order_status(order_id, "Completed").await);

        assert_eq!(
            err,
            OrderError::OrderUpdationInvalid {
                order_id,
                current: OrderStatus::Placed,
                requested: OrderStatus::Completed
            }
        );
        let order = service.get_order_details(order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Placed);
        assert_eq!(stock(&store, 1).await, 7);
    }

    #[tokio::test]
    async fn terminal_orders_cannot_move() {
        let (store, service, order_id) = placed_order().await;
        service
            .update_order_status(order_id, "Cancelled")
            .await
            .unwrap();

        for status in ["Placed", "Dispatched", "Cancelled", "Returned"] {
            let err = order_error(service.update_order_status(order_id, status).await);
            assert!(matches!(err, OrderError::OrderUpdationInvalid { .. }));
        }
        assert_eq!(stock(&store, 1).await, 10);
    }

    #[tokio::test]
    async fn unknown_status_is_rejected() {
        let (_store, service, order_id) = placed_order().await;

        let err = order_error(service.update_order_status(order_id, "Shipped").await);

        assert_eq!(
            err,
            OrderError::OrderStatusInvalid {
                order_id,
                status: "Shipped".to_string()
            }
        );
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn missing_order_is_not_found() {
        let (_store, service, _) = placed_order().await;

        let err = order_error(
            service
                .update_order_status(OrderId::new(404), "Dispatched")
                .await,
        );

        assert_eq!(
            err,
            OrderError::OrderNotFound {
                order_id: OrderId::new(404)
            }
        );
    }

    #[tokio::test]
    async fn failed_restock_keeps_status() {
        let (store, service, order_id) = placed_order().await;
        store.set_fail_on_update_quantities(true);

        let result = service.update_order_status(order_id, "Cancelled").await;
        store.set_fail_on_update_quantities(false);

        assert_eq!(result.unwrap_err().kind(), ErrorKind::Infrastructure);
        let order = service.get_order_details(order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Placed);
        assert_eq!(stock(&store, 1).await, 7);
    }
}

mod reads {
    use super::*;

    #[tokio::test]
    async fn order_details_are_stable() {
        let store = store_with(&[("Widget", 1000, "Regular", 10)]).await;
        let service = OrderService::new(store);
        let created = service.create_order(request(&[(1, 2)])).await.unwrap();

        let first = service.get_order_details(created.id).await.unwrap();
        let second = service.get_order_details(created.id).await.unwrap();

        assert_eq!(first, created);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn missing_order_details() {
        let service = OrderService::new(InMemoryStore::new());

        let err = order_error(service.get_order_details(OrderId::new(1)).await);

        assert_eq!(
            err,
            OrderError::OrderNotFound {
                order_id: OrderId::new(1)
            }
        );
    }

    #[tokio::test]
    async fn list_orders_returns_summaries() {
        let store = store_with(&[("Widget", 1000, "Regular", 10)]).await;
        let service = OrderService::new(store);
        assert!(service.list_orders().await.unwrap().is_empty());

        service.create_order(request(&[(1, 1)])).await.unwrap();
        service.create_order(request(&[(1, 2)])).await.unwrap();

        let orders = service.list_orders().await.unwrap();
        assert_eq!(orders.len(), 2);
        assert!(orders.iter().all(|order| order.items.is_empty()));
        assert_eq!(orders[1].amount, Money::from_dollars(20));
    }

    #[tokio::test]
    async fn seeded_catalog_supports_discounted_order() {
        let store = InMemoryStore::seeded();
        let catalog = CatalogService::new(store.clone());
        let service = OrderService::new(store);

        let premium: Vec<ProductId> = catalog
            .list_products()
            .await
            .unwrap()
            .into_iter()
            .filter(|product| product.category.is_premium())
            .map(|product| product.id)
            .take(3)
            .collect();
        let items = premium
            .iter()
            .map(|id| LineItemRequest::new(*id, 1))
            .collect();

        let order = service
            .create_order(CreateOrderRequest::new(items))
            .await
            .unwrap();

        assert_eq!(order.discount_percent, 10);
        assert_eq!(order.final_amount, order.amount.discounted(10));
        let product = catalog.get_product(premium[0]).await.unwrap();
        assert_eq!(product.quantity, 19);
    }
}
