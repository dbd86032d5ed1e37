use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{orders, products};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Display text shown to shop staff for each status.
    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::Pending => "Awaiting confirmation",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Shipped => "In transit",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

/// Label for a stored status code; unknown codes are echoed back unchanged.
pub fn status_label(status: &str) -> String {
    status
        .parse::<OrderStatus>()
        .map(|s| s.label().to_string())
        .unwrap_or_else(|_| status.to_string())
}

/// Price a single order must be submitted at.
///
/// A discount only applies when it is positive and does not exceed the
/// original price; anything else falls back to the original price.
pub fn effective_price(original_price: i64, discounted_price: Option<i64>) -> i64 {
    match discounted_price {
        Some(d) if d > 0 && d <= original_price => d,
        _ => original_price,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub stock: i32,
    pub sold: i32,
    pub origin: String,
    pub product_code: String,
    pub usage: String,
    pub original_price: i64,
    pub discounted_price: Option<i64>,
    pub note: Option<String>,
    pub specification: String,
    pub description: Option<String>,
    pub additional_info: Option<String>,
    pub status: String,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<products::Model> for Product {
    fn from(model: products::Model) -> Self {
        Product {
            id: model.id,
            name: model.name,
            stock: model.stock,
            sold: model.sold,
            origin: model.origin,
            product_code: model.product_code,
            usage: model.usage,
            original_price: model.original_price,
            discounted_price: model.discounted_price,
            note: model.note,
            specification: model.specification,
            description: model.description,
            additional_info: model.additional_info,
            status: model.status,
            images: model.images,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub box_count: i32,
    pub total_price: i64,
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub note: Option<String>,
    pub status: String,
    pub status_label: String,
    pub inventory_restored: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<orders::Model> for Order {
    fn from(model: orders::Model) -> Self {
        Order {
            id: model.id,
            product_id: model.product_id,
            product_name: model.product_name,
            box_count: model.box_count,
            total_price: model.total_price,
            full_name: model.full_name,
            phone: model.phone,
            address: model.address,
            note: model.note,
            status_label: status_label(&model.status),
            status: model.status,
            inventory_restored: model.inventory_restored,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_price_prefers_valid_discount() {
        assert_eq!(effective_price(100_000, None), 100_000);
        assert_eq!(effective_price(100_000, Some(90_000)), 90_000);
        assert_eq!(effective_price(100_000, Some(0)), 100_000);
        assert_eq!(effective_price(100_000, Some(120_000)), 100_000);
    }

    #[test]
    fn every_status_has_a_label() {
        for status in OrderStatus::ALL {
            assert_eq!(status_label(status.as_ref()), status.label());
        }
        assert_eq!(status_label("pending"), "Awaiting confirmation");
        assert_eq!(status_label("lost"), "lost");
    }

    #[test]
    fn statuses_parse_from_wire_names() {
        assert_eq!("cancelled".parse::<OrderStatus>(), Ok(OrderStatus::Cancelled));
        assert!("paid".parse::<OrderStatus>().is_err());
        assert_eq!("inactive".parse::<ProductStatus>(), Ok(ProductStatus::Inactive));
        assert_eq!(OrderStatus::Shipped.to_string(), "shipped");
    }
}
