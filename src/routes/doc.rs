use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        orders::{CreateOrderRequest, OrderResponse, UpdateOrderStatusRequest},
        products::{ProductFormDoc, ProductResponse, UpdateProductStatusRequest},
    },
    error::ErrorData,
    models::{Order, OrderStatus, Product, ProductStatus},
    response::{MessageResponse, Page},
    routes::{health, orders, params, products},
    validation::FieldViolation,
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::update_product_status,
        products::delete_product,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        orders::update_order_status,
        orders::delete_order,
    ),
    components(
        schemas(
            Product,
            ProductStatus,
            Order,
            OrderStatus,
            ProductFormDoc,
            ProductResponse,
            UpdateProductStatusRequest,
            CreateOrderRequest,
            UpdateOrderStatusRequest,
            OrderResponse,
            MessageResponse,
            ErrorData,
            FieldViolation,
            params::ProductQuery,
            params::OrderListQuery,
            Page<Product>,
            Page<Order>,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Product catalogue; writes require an admin token"),
        (name = "Orders", description = "Order submission and admin order management"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/products",
            "/api/products/{id}",
            "/api/orders",
            "/api/orders/{id}",
            "/api/orders/{id}/status",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
