use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    entity::products::Model as ProductModel,
    error::{AppError, AppResult},
    models::{Product, ProductStatus},
    validation::FieldViolation,
};

/// Field values of a product record, checked before anything is written.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, max = 100, message = "Product name must not exceed 100 characters"))]
    pub name: String,
    #[validate(range(min = 0, message = "Stock must not be negative"))]
    pub stock: i32,
    #[validate(length(min = 1, max = 50, message = "Origin must not exceed 50 characters"))]
    pub origin: String,
    #[validate(length(min = 1, max = 20, message = "Product code must not exceed 20 characters"))]
    pub product_code: String,
    #[validate(length(min = 1, message = "Usage is required"))]
    pub usage: String,
    #[validate(range(min = 0, message = "Original price must not be negative"))]
    pub original_price: i64,
    #[validate(range(min = 0, message = "Discounted price must not be negative"))]
    pub discounted_price: Option<i64>,
    pub note: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Specification must not exceed 200 characters"))]
    pub specification: String,
    pub description: Option<String>,
    pub additional_info: Option<String>,
    pub status: ProductStatus,
}

impl NewProduct {
    /// The record a patch would produce, so the merged state can be checked
    /// with the same rules as a new product.
    pub fn merged(existing: &ProductModel, patch: &ProductPatch) -> Self {
        let status = match patch.status {
            Some(status) => status,
            None => ProductStatus::from_str(&existing.status).unwrap_or_default(),
        };
        Self {
            name: patch.name.clone().unwrap_or_else(|| existing.name.clone()),
            stock: patch.stock.unwrap_or(existing.stock),
            origin: patch.origin.clone().unwrap_or_else(|| existing.origin.clone()),
            product_code: patch
                .product_code
                .clone()
                .unwrap_or_else(|| existing.product_code.clone()),
            usage: patch.usage.clone().unwrap_or_else(|| existing.usage.clone()),
            original_price: patch.original_price.unwrap_or(existing.original_price),
            discounted_price: patch
                .discounted_price
                .unwrap_or(existing.discounted_price),
            note: patch.note.clone().unwrap_or_else(|| existing.note.clone()),
            specification: patch
                .specification
                .clone()
                .unwrap_or_else(|| existing.specification.clone()),
            description: patch
                .description
                .clone()
                .unwrap_or_else(|| existing.description.clone()),
            additional_info: patch
                .additional_info
                .clone()
                .unwrap_or_else(|| existing.additional_info.clone()),
            status,
        }
    }
}

/// Partial update. `Some(None)` on a nullable field clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub stock: Option<i32>,
    pub origin: Option<String>,
    pub product_code: Option<String>,
    pub usage: Option<String>,
    pub original_price: Option<i64>,
    pub discounted_price: Option<Option<i64>>,
    pub note: Option<Option<String>>,
    pub specification: Option<String>,
    pub description: Option<Option<String>>,
    pub additional_info: Option<Option<String>>,
    pub status: Option<ProductStatus>,
}

/// Text parts of a product multipart form, keyed by their camelCase names.
#[derive(Debug, Clone, Default)]
pub struct ProductForm {
    fields: HashMap<String, String>,
}

impl ProductForm {
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    fn get(&self, name: &str) -> Option<String> {
        self.fields.get(name).map(|v| v.trim().to_string())
    }

    fn text(&self, name: &str) -> Option<String> {
        self.get(name).filter(|v| !v.is_empty())
    }

    fn nullable_text(&self, name: &str) -> Option<Option<String>> {
        self.get(name).map(|v| Some(v).filter(|v| !v.is_empty()))
    }

    fn number<T: FromStr>(
        &self,
        name: &str,
        violations: &mut Vec<FieldViolation>,
    ) -> Option<T> {
        let raw = self.text(name)?;
        match raw.parse::<T>() {
            Ok(v) => Some(v),
            Err(_) => {
                violations.push(FieldViolation::new(
                    name,
                    format!("{name} must be a whole number"),
                ));
                None
            }
        }
    }

    fn status(&self, violations: &mut Vec<FieldViolation>) -> Option<ProductStatus> {
        let raw = self.text("status")?;
        match raw.parse::<ProductStatus>() {
            Ok(s) => Some(s),
            Err(_) => {
                violations.push(FieldViolation::new(
                    "status",
                    "status must be \"active\" or \"inactive\"",
                ));
                None
            }
        }
    }

    pub fn into_new_product(self) -> AppResult<NewProduct> {
        let mut violations = Vec::new();
        let required = |name: &str, label: &str, violations: &mut Vec<FieldViolation>| {
            let value = self.text(name);
            if value.is_none() {
                violations.push(FieldViolation::new(name, format!("{label} is required")));
            }
            value.unwrap_or_default()
        };

        let name = required("name", "Product name", &mut violations);
        let origin = required("origin", "Origin", &mut violations);
        let product_code = required("productCode", "Product code", &mut violations);
        let usage = required("usage", "Usage", &mut violations);
        let specification = required("specification", "Specification", &mut violations);

        let stock = self.number::<i32>("stock", &mut violations).unwrap_or(0);
        let original_price = self.number::<i64>("originalPrice", &mut violations);
        if original_price.is_none() && self.text("originalPrice").is_none() {
            violations.push(FieldViolation::new(
                "originalPrice",
                "Original price is required",
            ));
        }
        let discounted_price = self.number::<i64>("discountedPrice", &mut violations);
        let status = self.status(&mut violations).unwrap_or_default();

        if !violations.is_empty() {
            return Err(AppError::Validation(violations));
        }

        Ok(NewProduct {
            name,
            stock,
            origin,
            product_code,
            usage,
            original_price: original_price.unwrap_or_default(),
            discounted_price,
            note: self.text("note"),
            specification,
            description: self.text("description"),
            additional_info: self.text("additionalInfo"),
            status,
        })
    }

    pub fn into_patch(self) -> AppResult<ProductPatch> {
        let mut violations = Vec::new();

        let discounted_price = match self.get("discountedPrice") {
            None => None,
            Some(raw) if raw.is_empty() => Some(None),
            Some(_) => self
                .number::<i64>("discountedPrice", &mut violations)
                .map(Some),
        };

        let patch = ProductPatch {
            name: self.text("name"),
            stock: self.number("stock", &mut violations),
            origin: self.text("origin"),
            product_code: self.text("productCode"),
            usage: self.text("usage"),
            original_price: self.number("originalPrice", &mut violations),
            discounted_price,
            note: self.nullable_text("note"),
            specification: self.text("specification"),
            description: self.nullable_text("description"),
            additional_info: self.nullable_text("additionalInfo"),
            status: self.status(&mut violations),
        };

        if !violations.is_empty() {
            return Err(AppError::Validation(violations));
        }
        Ok(patch)
    }
}

/// Shape of the multipart body accepted by product create and update.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductFormDoc {
    pub name: String,
    pub stock: i32,
    pub origin: String,
    pub product_code: String,
    pub usage: String,
    pub original_price: i64,
    pub discounted_price: Option<i64>,
    pub note: Option<String>,
    pub specification: String,
    pub description: Option<String>,
    pub additional_info: Option<String>,
    pub status: Option<ProductStatus>,
    /// 1 to 4 image files (jpeg, png, gif, webp, svg), 100MB each at most.
    #[schema(value_type = Vec<String>, format = Binary)]
    pub images: Vec<Vec<u8>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductStatusRequest {
    pub status: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub message: String,
    pub product: Product,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::check;

    fn full_form() -> ProductForm {
        let mut form = ProductForm::default();
        for (k, v) in [
            ("name", "Bird's nest"),
            ("stock", "10"),
            ("origin", "Vietnam"),
            ("productCode", "BN-01"),
            ("usage", "Tonic"),
            ("originalPrice", "100000"),
            ("specification", "6 jars x 70ml"),
        ] {
            form.insert(k, v);
        }
        form
    }

    #[test]
    fn full_form_parses() {
        let product = full_form().into_new_product().unwrap();
        assert_eq!(product.stock, 10);
        assert_eq!(product.original_price, 100_000);
        assert_eq!(product.discounted_price, None);
        assert_eq!(product.status, ProductStatus::Active);
        assert!(check(&product).is_ok());
    }

    #[test]
    fn missing_and_malformed_fields_are_collected() {
        let mut form = full_form();
        form.insert("name", "  ");
        form.insert("stock", "ten");
        let err = form.into_new_product().unwrap_err();
        match err {
            AppError::Validation(v) => {
                let fields: Vec<_> = v.iter().map(|f| f.field.as_str()).collect();
                assert!(fields.contains(&"name"));
                assert!(fields.contains(&"stock"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn length_and_range_rules_apply() {
        let mut form = full_form();
        form.insert("productCode", "X".repeat(21));
        form.insert("stock", "-1");
        let product = form.into_new_product().unwrap();
        let err = check(&product).unwrap_err();
        match err {
            AppError::Validation(v) => {
                assert_eq!(v.len(), 2);
                assert_eq!(v[0].field, "product_code");
                assert_eq!(v[1].field, "stock");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn patch_distinguishes_absent_and_cleared() {
        let mut form = ProductForm::default();
        form.insert("discountedPrice", "");
        form.insert("note", "");
        form.insert("originalPrice", "5000");
        let patch = form.into_patch().unwrap();
        assert_eq!(patch.discounted_price, Some(None));
        assert_eq!(patch.note, Some(None));
        assert_eq!(patch.original_price, Some(5000));
        assert_eq!(patch.name, None);
        assert_eq!(patch.description, None);
    }

    #[test]
    fn patch_rejects_unknown_status() {
        let mut form = ProductForm::default();
        form.insert("status", "hidden");
        assert!(matches!(form.into_patch(), Err(AppError::Validation(_))));
    }
}
