use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{CreateOrderRequest, OrderResponse, UpdateOrderStatusRequest},
    entity::{
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthContext,
    models::{Order, OrderStatus, ProductStatus},
    response::{MessageResponse, Page},
    routes::params::OrderListQuery,
    state::AppState,
    validation::{validate_order_against_product, validate_order_request},
};

/// Cancelling hands the boxes back unless they were already handed back or
/// the order reached the customer.
pub fn restores_on_status_change(current: &str, already_restored: bool, next: OrderStatus) -> bool {
    next == OrderStatus::Cancelled
        && !already_restored
        && current != OrderStatus::Cancelled.as_ref()
        && current != OrderStatus::Delivered.as_ref()
}

/// Deleting hands the boxes back for any order that was not delivered, at
/// most once over the order's life.
pub fn restores_on_delete(current: &str, already_restored: bool) -> bool {
    !already_restored && current != OrderStatus::Delivered.as_ref()
}

/// Give `box_count` units back to the product. A deleted product is skipped.
async fn restore_inventory<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    product_id: Uuid,
    box_count: i32,
) -> AppResult<()> {
    let result = Products::update_many()
        .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(box_count))
        .col_expr(ProdCol::Sold, Expr::col(ProdCol::Sold).sub(box_count))
        .col_expr(ProdCol::UpdatedAt, Expr::current_timestamp().into())
        .filter(ProdCol::Id.eq(product_id))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        tracing::warn!(%order_id, %product_id, "product gone, inventory not restored");
    } else {
        tracing::info!(%order_id, %product_id, box_count, "inventory restored");
    }
    Ok(())
}

fn invalid_status() -> AppError {
    let allowed = OrderStatus::ALL
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(", ");
    AppError::BadRequest(format!("Invalid status. Must be one of: {allowed}"))
}

fn order_not_found() -> AppError {
    AppError::NotFound("Order not found".into())
}

pub async fn create_order(
    state: &AppState,
    payload: CreateOrderRequest,
) -> AppResult<OrderResponse> {
    let draft = validate_order_request(payload)?;

    let txn = state.orm.begin().await?;

    let product = Products::find_by_id(draft.product_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    validate_order_against_product(&draft, product.as_ref())?;
    let product = product.ok_or_else(|| AppError::NotFound("Product not found".into()))?;

    // Conditional decrement: the row lock already serializes writers, the
    // guard keeps stock from going negative if it ever does not.
    let reserved = Products::update_many()
        .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(draft.box_count))
        .col_expr(ProdCol::Sold, Expr::col(ProdCol::Sold).add(draft.box_count))
        .col_expr(ProdCol::UpdatedAt, Expr::current_timestamp().into())
        .filter(ProdCol::Id.eq(product.id))
        .filter(ProdCol::Status.eq(ProductStatus::Active.as_ref()))
        .filter(ProdCol::Stock.gte(draft.box_count))
        .exec(&txn)
        .await?;
    if reserved.rows_affected != 1 {
        return Err(AppError::BadRequest("Insufficient stock".into()));
    }

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product.id),
        product_name: Set(draft.product_name),
        box_count: Set(draft.box_count),
        total_price: Set(draft.total_price),
        full_name: Set(draft.full_name),
        phone: Set(draft.phone),
        address: Set(draft.address),
        note: Set(draft.note),
        status: Set(OrderStatus::Pending.to_string()),
        inventory_restored: Set(false),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        product_id = %order.product_id,
        box_count = order.box_count,
        "order created"
    );
    audit::record(
        &state.pool,
        &AuthContext::Anonymous,
        "order_create",
        "orders",
        serde_json::json!({ "order_id": order.id, "product_id": order.product_id, "box_count": order.box_count }),
    )
    .await;

    Ok(OrderResponse {
        message: "Order placed successfully".into(),
        order: order.into(),
    })
}

pub async fn list_orders(
    state: &AppState,
    ctx: &AuthContext,
    query: OrderListQuery,
) -> AppResult<Page<Order>> {
    ctx.require_admin()?;
    let pagination = query.pagination();

    let mut condition = Condition::all();
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }

    let finder = Orders::find()
        .filter(condition)
        .order_by_desc(OrderCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(pagination.limit as u64)
        .offset(pagination.offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    Ok(Page::new(orders, total, pagination.page, pagination.limit))
}

pub async fn get_order(state: &AppState, ctx: &AuthContext, id: Uuid) -> AppResult<Order> {
    ctx.require_admin()?;
    Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(Order::from)
        .ok_or_else(order_not_found)
}

pub async fn update_order_status(
    state: &AppState,
    ctx: &AuthContext,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<OrderResponse> {
    ctx.require_admin()?;
    let next = payload
        .status
        .as_deref()
        .and_then(|s| s.parse::<OrderStatus>().ok())
        .ok_or_else(invalid_status)?;

    let txn = state.orm.begin().await?;

    let existing = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(order_not_found)?;
    let previous = existing.status.clone();

    let mut active: OrderActive = existing.clone().into();
    if restores_on_status_change(&existing.status, existing.inventory_restored, next) {
        restore_inventory(&txn, existing.id, existing.product_id, existing.box_count).await?;
        active.inventory_restored = Set(true);
    }
    active.status = Set(next.to_string());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, from = %previous, to = %order.status, "order status updated");
    audit::record(
        &state.pool,
        ctx,
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": order.id, "from": previous, "status": order.status }),
    )
    .await;

    Ok(OrderResponse {
        message: "Order status updated successfully".into(),
        order: order.into(),
    })
}

pub async fn delete_order(
    state: &AppState,
    ctx: &AuthContext,
    id: Uuid,
) -> AppResult<MessageResponse> {
    ctx.require_admin()?;

    let txn = state.orm.begin().await?;

    let existing = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(order_not_found)?;

    if restores_on_delete(&existing.status, existing.inventory_restored) {
        restore_inventory(&txn, existing.id, existing.product_id, existing.box_count).await?;
    }

    Orders::delete_by_id(existing.id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(order_id = %existing.id, status = %existing.status, "order deleted");
    audit::record(
        &state.pool,
        ctx,
        "order_delete",
        "orders",
        serde_json::json!({ "order_id": existing.id }),
    )
    .await;

    Ok(MessageResponse::new("Order deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelling_restores_once() {
        for current in ["pending", "confirmed", "shipped"] {
            assert!(restores_on_status_change(current, false, OrderStatus::Cancelled));
            assert!(!restores_on_status_change(current, true, OrderStatus::Cancelled));
        }
        assert!(!restores_on_status_change("cancelled", false, OrderStatus::Cancelled));
        assert!(!restores_on_status_change("delivered", false, OrderStatus::Cancelled));
    }

    #[test]
    fn other_transitions_leave_inventory_alone() {
        for next in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            assert!(!restores_on_status_change("pending", false, next));
        }
    }

    #[test]
    fn delete_restores_unless_delivered_or_already_restored() {
        assert!(restores_on_delete("pending", false));
        assert!(restores_on_delete("shipped", false));
        assert!(!restores_on_delete("delivered", false));
        assert!(!restores_on_delete("cancelled", true));
    }
}
