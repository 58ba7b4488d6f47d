//! HTTP surface over the order services.
//!
//! Staff routes take the shop from the `X-Shop-Id` header, which the
//! authentication layer in front of this service sets. The public intake route is
//! scoped by its share token instead.

use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{async_trait, Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::catalog::PgCatalog;
use crate::domain::{Order, OrderDetails, OrderPatch, OrderStatus, TempOrder, TempOrderDetails, TempOrderStatus};
use crate::error::OrderError;
use crate::services::{NewTempOrderRequest, Services};
use crate::store::PgStore;

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
}

impl AppState {
    pub fn new(services: Services) -> Self { Self { services } }

    pub fn postgres(pool: sqlx::PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool.clone()));
        Self::new(Services::new(store, Arc::new(PgCatalog::new(pool))))
    }
}

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "shop-orders"})) }))
        .route("/api/v1/orders", get(list_orders).post(create_order))
        .route("/api/v1/orders/:id", get(get_order).patch(update_order).delete(delete_order))
        .route("/api/v1/orders/:id/items", post(add_item))
        .route("/api/v1/orders/:id/items/:item_id", patch(update_item).delete(delete_item))
        .route("/api/v1/public/:share_token/temp-orders", post(create_temp_order))
        .route("/api/v1/temp-orders", get(list_temp_orders))
        .route("/api/v1/temp-orders/:id", get(get_temp_order))
        .route("/api/v1/temp-orders/:id/reject", post(reject_temp_order))
        .route("/api/v1/temp-orders/:id/merge", post(merge_temp_order))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(TimeoutLayer::new(request_timeout)))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Shop the caller acts for.
#[derive(Clone, Copy, Debug)]
pub struct ShopId(pub i64);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ShopId {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-shop-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(ShopId)
            .ok_or((StatusCode::BAD_REQUEST, "missing or invalid X-Shop-Id header".to_string()))
    }
}

type ApiResult<T> = Result<T, OrderError>;

#[derive(Debug, Deserialize)] pub struct OrderFilter { pub status: Option<OrderStatus> }
#[derive(Debug, Deserialize)] pub struct TempOrderFilter { pub status: Option<TempOrderStatus> }
#[derive(Debug, Deserialize)] pub struct CreateOrderRequest { pub customer_id: i64, pub notes: Option<String> }
#[derive(Debug, Deserialize)] pub struct AddItemRequest { pub product_id: i64, pub qty: i32 }
#[derive(Debug, Deserialize)] pub struct UpdateItemRequest { pub qty: i32 }
#[derive(Debug, Deserialize)] pub struct MergeRequest { pub customer_id: i64, pub target_order_id: Option<i64> }

async fn create_order(State(s): State<AppState>, ShopId(shop): ShopId, Json(r): Json<CreateOrderRequest>) -> ApiResult<(StatusCode, Json<Order>)> {
    let order = s.services.orders.create_order(r.customer_id, shop, r.notes).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn list_orders(State(s): State<AppState>, ShopId(shop): ShopId, Query(f): Query<OrderFilter>) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(s.services.orders.list_orders(shop, f.status).await?))
}

async fn get_order(State(s): State<AppState>, ShopId(shop): ShopId, Path(id): Path<i64>) -> ApiResult<Json<OrderDetails>> {
    Ok(Json(s.services.orders.get_order(id, shop).await?))
}

async fn update_order(State(s): State<AppState>, ShopId(shop): ShopId, Path(id): Path<i64>, Json(p): Json<OrderPatch>) -> ApiResult<Json<Order>> {
    Ok(Json(s.services.orders.update_order(id, shop, p).await?))
}

async fn delete_order(State(s): State<AppState>, ShopId(shop): ShopId, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    s.services.orders.delete_order(id, shop).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_item(State(s): State<AppState>, ShopId(shop): ShopId, Path(id): Path<i64>, Json(r): Json<AddItemRequest>) -> ApiResult<(StatusCode, Json<OrderDetails>)> {
    let details = s.services.orders.add_item(id, shop, r.product_id, r.qty).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

async fn update_item(State(s): State<AppState>, ShopId(shop): ShopId, Path((id, item_id)): Path<(i64, i64)>, Json(r): Json<UpdateItemRequest>) -> ApiResult<Json<OrderDetails>> {
    Ok(Json(s.services.orders.update_item(id, shop, item_id, r.qty).await?))
}

async fn delete_item(State(s): State<AppState>, ShopId(shop): ShopId, Path((id, item_id)): Path<(i64, i64)>) -> ApiResult<Json<OrderDetails>> {
    Ok(Json(s.services.orders.delete_item(id, shop, item_id).await?))
}

async fn create_temp_order(State(s): State<AppState>, Path(token): Path<String>, Json(r): Json<NewTempOrderRequest>) -> ApiResult<(StatusCode, Json<TempOrderDetails>)> {
    let details = s.services.temp_orders.create_temp_order(&token, r).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

async fn list_temp_orders(State(s): State<AppState>, ShopId(shop): ShopId, Query(f): Query<TempOrderFilter>) -> ApiResult<Json<Vec<TempOrder>>> {
    Ok(Json(s.services.temp_orders.list_temp_orders(shop, f.status).await?))
}

async fn get_temp_order(State(s): State<AppState>, ShopId(shop): ShopId, Path(id): Path<i64>) -> ApiResult<Json<TempOrderDetails>> {
    Ok(Json(s.services.temp_orders.get_temp_order(id, shop).await?))
}

async fn reject_temp_order(State(s): State<AppState>, ShopId(shop): ShopId, Path(id): Path<i64>) -> ApiResult<Json<TempOrder>> {
    Ok(Json(s.services.temp_orders.reject_temp_order(id, shop).await?))
}

async fn merge_temp_order(State(s): State<AppState>, ShopId(shop): ShopId, Path(id): Path<i64>, Json(r): Json<MergeRequest>) -> ApiResult<Json<OrderDetails>> {
    Ok(Json(s.services.merge.merge_temp_order(id, r.customer_id, shop, r.target_order_id).await?))
}
