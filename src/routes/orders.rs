use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::orders::{CreateOrderRequest, OrderResponse, UpdateOrderStatusRequest},
    error::{AppResult, ErrorData},
    middleware::auth::AuthContext,
    models::Order,
    response::{MessageResponse, Page},
    routes::{
        extract::{AppJson, AppPath, AppQuery},
        params::OrderListQuery,
    },
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/{id}", get(get_order).delete(delete_order))
        .route("/{id}/status", put(update_order_status))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = OrderResponse),
        (status = 400, description = "Invalid order", body = ErrorData),
        (status = 404, description = "Product not found or not available", body = ErrorData),
    ),
    security(()),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<OrderResponse>)> {
    let resp = order_service::create_order(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Orders, newest first", body = Page<Order>),
        (status = 403, description = "Forbidden", body = ErrorData),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppQuery(query): AppQuery<OrderListQuery>,
) -> AppResult<Json<Page<Order>>> {
    let resp = order_service::list_orders(&state, &ctx, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order", body = Order),
        (status = 403, description = "Forbidden", body = ErrorData),
        (status = 404, description = "Order not found", body = ErrorData),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<Order>> {
    let resp = order_service::get_order(&state, &ctx, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = OrderResponse),
        (status = 400, description = "Invalid status", body = ErrorData),
        (status = 403, description = "Forbidden", body = ErrorData),
        (status = 404, description = "Order not found", body = ErrorData),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateOrderStatusRequest>,
) -> AppResult<Json<OrderResponse>> {
    let resp = order_service::update_order_status(&state, &ctx, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order deleted", body = MessageResponse),
        (status = 403, description = "Forbidden", body = ErrorData),
        (status = 404, description = "Order not found", body = ErrorData),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let resp = order_service::delete_order(&state, &ctx, id).await?;
    Ok(Json(resp))
}
