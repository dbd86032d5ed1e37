use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Order;

/// Public order submission. Every field is optional on the wire so that a
/// missing field produces the order-specific message instead of a generic
/// deserialization error.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub box_count: Option<i32>,
    pub total_price: Option<i64>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub note: Option<String>,
}

/// An order request that passed the request-only checks.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub product_id: Uuid,
    pub product_name: String,
    pub box_count: i32,
    pub total_price: i64,
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub message: String,
    pub order: Order,
}
