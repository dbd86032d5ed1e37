use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::products::{ProductFormDoc, ProductResponse, UpdateProductStatusRequest},
    error::{AppResult, ErrorData},
    middleware::auth::AuthContext,
    models::Product,
    response::{MessageResponse, Page},
    routes::{
        extract::{AppJson, AppPath, AppQuery},
        params::ProductQuery,
    },
    services::product_service,
    state::AppState,
    upload::{MAX_BODY_SIZE, read_product_upload},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/{id}",
            get(get_product)
                .put(update_product)
                .patch(update_product_status)
                .delete(delete_product),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductQuery),
    responses(
        (status = 200, description = "Products, newest first", body = Page<Product>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ProductQuery>,
) -> AppResult<Json<Page<Product>>> {
    let resp = product_service::list_products(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product", body = Product),
        (status = 404, description = "Product not found or not available", body = ErrorData),
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<Product>> {
    let resp = product_service::get_product(&state, &ctx, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body(content = ProductFormDoc, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid fields or images", body = ErrorData),
        (status = 403, description = "Forbidden", body = ErrorData),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    ctx: AuthContext,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<(StatusCode, Json<ProductResponse>)> {
    ctx.require_admin()?;
    let upload = read_product_upload(multipart).await?;
    let input = upload.form.into_new_product()?;
    let resp = product_service::create_product(&state, &ctx, input, upload.images).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body(content = ProductFormDoc, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 400, description = "Invalid fields or images", body = ErrorData),
        (status = 403, description = "Forbidden", body = ErrorData),
        (status = 404, description = "Product not found", body = ErrorData),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppPath(id): AppPath<Uuid>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<ProductResponse>> {
    ctx.require_admin()?;
    let upload = read_product_upload(multipart).await?;
    let patch = upload.form.into_patch()?;
    let resp = product_service::update_product(&state, &ctx, id, patch, upload.images).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = ProductResponse),
        (status = 400, description = "Invalid status", body = ErrorData),
        (status = 403, description = "Forbidden", body = ErrorData),
        (status = 404, description = "Product not found", body = ErrorData),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_product_status(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateProductStatusRequest>,
) -> AppResult<Json<ProductResponse>> {
    let resp = product_service::update_product_status(&state, &ctx, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product deleted", body = MessageResponse),
        (status = 403, description = "Forbidden", body = ErrorData),
        (status = 404, description = "Product not found", body = ErrorData),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    ctx: AuthContext,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let resp = product_service::delete_product(&state, &ctx, id).await?;
    Ok(Json(resp))
}
