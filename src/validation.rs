//! Field and business-rule validation, kept apart from persistence.
//!
//! Declarative field constraints live on the DTOs as `validator` derives;
//! [`check`] turns their output into a flat list of [`FieldViolation`]s. The
//! order checks are plain functions because each step has its own message and
//! the sequence is fail-fast.

use std::borrow::Cow;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::orders::{CreateOrderRequest, OrderDraft},
    entity::products::Model as ProductModel,
    error::{AppError, AppResult},
    models::{ProductStatus, effective_price},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub fn violations(errors: &ValidationErrors) -> Vec<FieldViolation> {
    let mut out: Vec<FieldViolation> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .clone()
                    .unwrap_or_else(|| Cow::Owned(format!("{field} is invalid ({})", e.code)));
                FieldViolation::new(field.to_string(), message)
            })
        })
        .collect();
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

/// Run the declarative rules of `value`.
pub fn check<T: Validate>(value: &T) -> AppResult<()> {
    value
        .validate()
        .map_err(|errors| AppError::Validation(violations(&errors)))
}

pub fn check_discount(original_price: i64, discounted_price: Option<i64>) -> AppResult<()> {
    match discounted_price {
        Some(discounted) if discounted > original_price => Err(AppError::BadRequest(
            "Discounted price must not exceed original price".into(),
        )),
        _ => Ok(()),
    }
}

pub fn is_valid_phone(phone: &str) -> bool {
    (10..=11).contains(&phone.len()) && phone.bytes().all(|b| b.is_ascii_digit())
}

pub fn parse_status(status: &str) -> AppResult<ProductStatus> {
    status.parse().map_err(|_| {
        AppError::BadRequest("Product status must be \"active\" or \"inactive\"".into())
    })
}

fn required(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Request-only checks of an order: presence, phone format, box count.
pub fn validate_order_request(req: CreateOrderRequest) -> AppResult<OrderDraft> {
    let missing = || AppError::BadRequest("Please provide all required order fields".into());

    let product_id = required(req.product_id).ok_or_else(missing)?;
    let product_name = required(req.product_name).ok_or_else(missing)?;
    let box_count = req.box_count.ok_or_else(missing)?;
    let total_price = req.total_price.ok_or_else(missing)?;
    let full_name = required(req.full_name).ok_or_else(missing)?;
    let phone = required(req.phone).ok_or_else(missing)?;
    let address = required(req.address).ok_or_else(missing)?;

    if !is_valid_phone(&phone) {
        return Err(AppError::BadRequest(
            "Phone number must have 10 or 11 digits".into(),
        ));
    }

    if box_count < 1 {
        return Err(AppError::BadRequest(
            "Box count must be greater than 0".into(),
        ));
    }

    if total_price < 0 {
        return Err(AppError::BadRequest(
            "Total price must not be negative".into(),
        ));
    }

    let product_id = Uuid::parse_str(&product_id)
        .map_err(|_| AppError::BadRequest("Invalid product id".into()))?;

    Ok(OrderDraft {
        product_id,
        product_name,
        box_count,
        total_price,
        full_name,
        phone,
        address,
        note: required(req.note),
    })
}

/// Checks of an order against the product it references. `product` is the
/// row as read inside the order transaction.
pub fn validate_order_against_product(
    draft: &OrderDraft,
    product: Option<&ProductModel>,
) -> AppResult<()> {
    let product = product
        .filter(|p| p.status == ProductStatus::Active.as_ref())
        .ok_or_else(|| AppError::NotFound("Product not found or not available".into()))?;

    if product.stock < draft.box_count {
        return Err(AppError::BadRequest("Insufficient stock".into()));
    }

    if draft.total_price != effective_price(product.original_price, product.discounted_price) {
        return Err(AppError::BadRequest("Invalid total price".into()));
    }

    Ok(())
}
