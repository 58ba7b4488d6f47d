mod common;

use axum::http::StatusCode;
use common::*;
use shop_orders::domain::TempOrderStatus;
use shop_orders::OrderError;

#[tokio::test]
async fn share_link_order_snapshots_prices_and_totals() {
    let h = harness();
    let d = h.services.temp_orders.create_temp_order("abc", temp_request(&[(WIDGET, 2)])).await.unwrap();
    assert_eq!(d.temp_order.shop_id, SHOP);
    assert_eq!(d.temp_order.status, TempOrderStatus::Pending);
    assert_eq!(d.temp_order.total_price, 2000);
    assert_eq!(d.temp_order.customer_name, "Jane");
    assert_eq!(d.items.len(), 1);
    assert_eq!((d.items[0].product_id, d.items[0].price, d.items[0].qty), (WIDGET, 1000, 2));
    assert_eq!(d.items[0].product_name, "Widget");
}

#[tokio::test]
async fn several_lines_sum_into_total() {
    let h = harness();
    let d = h
        .services
        .temp_orders
        .create_temp_order("abc", temp_request(&[(WIDGET, 1), (GADGET, 2), (GIZMO, 5)]))
        .await
        .unwrap();
    assert_eq!(d.temp_order.total_price, 1000 + 500 + 200);
    assert_eq!(d.temp_order.total_price, items_sum(&d.items));

    h.catalog.set_product_price(GADGET, 1);
    let stored = h.services.temp_orders.get_temp_order(d.temp_order.id, SHOP).await.unwrap();
    assert_eq!(stored, d);
}

#[tokio::test]
async fn customer_fields_are_trimmed_and_required() {
    let h = harness();
    let mut request = temp_request(&[(WIDGET, 1)]);
    request.customer_name = "  Jane Doe ".into();
    let d = h.services.temp_orders.create_temp_order("abc", request).await.unwrap();
    assert_eq!(d.temp_order.customer_name, "Jane Doe");

    let mut request = temp_request(&[(WIDGET, 1)]);
    request.customer_phone = "   ".into();
    let err = h.services.temp_orders.create_temp_order("abc", request).await.unwrap_err();
    assert!(matches!(err, OrderError::Validation(_)));
    assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn invalid_lines_are_rejected() {
    let h = harness();
    for items in [vec![], vec![(0, 1)], vec![(WIDGET, 0)], vec![(WIDGET, 1), (GADGET, -2)]] {
        let err = h.services.temp_orders.create_temp_order("abc", temp_request(&items)).await.unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)), "items {items:?} gave {err}");
    }
    assert!(h.services.temp_orders.list_temp_orders(SHOP, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_share_token_is_not_found() {
    let h = harness();
    let err = h.services.temp_orders.create_temp_order("nope", temp_request(&[(WIDGET, 1)])).await.unwrap_err();
    assert!(matches!(err, OrderError::ShopNotFound));
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn products_resolve_in_the_token_shop_only() {
    let h = harness();
    let err = h
        .services
        .temp_orders
        .create_temp_order("abc", temp_request(&[(WIDGET, 1), (OTHER_SHOP_PRODUCT, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::ProductNotFound(OTHER_SHOP_PRODUCT)));
    assert!(h.services.temp_orders.list_temp_orders(SHOP, None).await.unwrap().is_empty());

    let d = h.services.temp_orders.create_temp_order("xyz", temp_request(&[(OTHER_SHOP_PRODUCT, 1)])).await.unwrap();
    assert_eq!(d.temp_order.shop_id, OTHER_SHOP);
}

#[tokio::test]
async fn reject_is_final() {
    let h = harness();
    let d = h.services.temp_orders.create_temp_order("abc", temp_request(&[(WIDGET, 1)])).await.unwrap();
    let id = d.temp_order.id;

    let err = h.services.temp_orders.reject_temp_order(id, OTHER_SHOP).await.unwrap_err();
    assert!(matches!(err, OrderError::TempOrderNotFound(_)));

    let rejected = h.services.temp_orders.reject_temp_order(id, SHOP).await.unwrap();
    assert_eq!(rejected.status, TempOrderStatus::Rejected);
    assert!(rejected.updated_at.is_some());

    let err = h.services.temp_orders.reject_temp_order(id, SHOP).await.unwrap_err();
    assert!(matches!(err, OrderError::TempOrderNotPending { status: TempOrderStatus::Rejected, .. }));
    assert_eq!(err.status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn accepted_temp_order_cannot_be_rejected() {
    let h = harness();
    let d = h.services.temp_orders.create_temp_order("abc", temp_request(&[(WIDGET, 1)])).await.unwrap();
    h.services.merge.merge_temp_order(d.temp_order.id, JANE, SHOP, None).await.unwrap();

    let err = h.services.temp_orders.reject_temp_order(d.temp_order.id, SHOP).await.unwrap_err();
    assert!(matches!(err, OrderError::TempOrderNotPending { status: TempOrderStatus::Accepted, .. }));
    let stored = h.services.temp_orders.get_temp_order(d.temp_order.id, SHOP).await.unwrap();
    assert_eq!(stored.temp_order.status, TempOrderStatus::Accepted);
}

#[tokio::test]
async fn review_queue_filters_by_status() {
    let h = harness();
    let a = h.services.temp_orders.create_temp_order("abc", temp_request(&[(WIDGET, 1)])).await.unwrap();
    let b = h.services.temp_orders.create_temp_order("abc", temp_request(&[(GADGET, 1)])).await.unwrap();
    h.services.temp_orders.reject_temp_order(a.temp_order.id, SHOP).await.unwrap();

    let pending = h.services.temp_orders.list_temp_orders(SHOP, Some(TempOrderStatus::Pending)).await.unwrap();
    assert_eq!(pending.iter().map(|t| t.id).collect::<Vec<_>>(), vec![b.temp_order.id]);
    assert_eq!(h.services.temp_orders.list_temp_orders(SHOP, None).await.unwrap().len(), 2);
    assert!(h.services.temp_orders.list_temp_orders(OTHER_SHOP, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn total_out_of_range_is_rejected() {
    let h = harness();
    let err = h.services.temp_orders.create_temp_order("abc", temp_request(&[(HEIRLOOM, i32::MAX)])).await.unwrap_err();
    assert!(matches!(err, OrderError::TotalOverflow(_)));
    assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(h.services.temp_orders.list_temp_orders(SHOP, None).await.unwrap().is_empty());
}
