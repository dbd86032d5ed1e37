use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::products::{NewProduct, ProductPatch, ProductResponse, UpdateProductStatusRequest},
    entity::products::{ActiveModel, Column, Entity as Products},
    error::{AppError, AppResult},
    middleware::auth::AuthContext,
    models::{Product, ProductStatus},
    response::{MessageResponse, Page},
    routes::params::ProductQuery,
    state::AppState,
    storage::store_all,
    upload::{ImageFile, MAX_FILES, UploadError},
    validation::{check, check_discount, parse_status},
};

fn product_not_found() -> AppError {
    AppError::NotFound("Product not found".into())
}

/// Escape LIKE wildcards so the search term matches literally.
pub fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn check_image_count(images: &[ImageFile]) -> AppResult<()> {
    if images.is_empty() {
        return Err(AppError::BadRequest(
            "At least one product image is required".into(),
        ));
    }
    if images.len() > MAX_FILES {
        return Err(UploadError::TooManyFiles.into());
    }
    Ok(())
}

fn code_taken(product_code: &str) -> AppError {
    AppError::BadRequest(format!("Product code '{product_code}' already exists"))
}

/// A concurrent writer can claim the code between the availability check and
/// the write; the unique index then reports it.
fn map_write_error(err: DbErr, product_code: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => code_taken(product_code),
        _ => err.into(),
    }
}

async fn ensure_code_available(
    state: &AppState,
    product_code: &str,
    except: Option<Uuid>,
) -> AppResult<()> {
    let mut condition = Condition::all().add(Column::ProductCode.eq(product_code));
    if let Some(id) = except {
        condition = condition.add(Column::Id.ne(id));
    }
    let taken = Products::find().filter(condition).count(&state.orm).await? > 0;
    if taken {
        return Err(code_taken(product_code));
    }
    Ok(())
}

/// Every product, whatever its status; visibility only applies to lookups by id.
pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<Page<Product>> {
    let pagination = query.pagination();
    let mut condition = Condition::all();

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        condition = condition.add(Expr::col(Column::Name).ilike(like_pattern(search)));
    }

    let finder = Products::find()
        .filter(condition)
        .order_by_desc(Column::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(pagination.limit as u64)
        .offset(pagination.offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    Ok(Page::new(items, total, pagination.page, pagination.limit))
}

pub async fn get_product(state: &AppState, ctx: &AuthContext, id: Uuid) -> AppResult<Product> {
    let mut finder = Products::find_by_id(id);
    if !ctx.is_admin() {
        finder = finder.filter(Column::Status.eq(ProductStatus::Active.as_ref()));
    }
    finder
        .one(&state.orm)
        .await?
        .map(Product::from)
        .ok_or_else(|| AppError::NotFound("Product not found or not available".into()))
}

/// Validate everything, then upload the images, then insert.
pub async fn create_product(
    state: &AppState,
    ctx: &AuthContext,
    input: NewProduct,
    images: Vec<ImageFile>,
) -> AppResult<ProductResponse> {
    ctx.require_admin()?;
    check_image_count(&images)?;
    check(&input)?;
    check_discount(input.original_price, input.discounted_price)?;
    ensure_code_available(state, &input.product_code, None).await?;

    let image_refs = store_all(state.images.as_ref(), &images).await?;

    let product_code = input.product_code.clone();
    let product = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(input.name),
        stock: Set(input.stock),
        sold: Set(0),
        origin: Set(input.origin),
        product_code: Set(input.product_code),
        usage: Set(input.usage),
        original_price: Set(input.original_price),
        discounted_price: Set(input.discounted_price),
        note: Set(input.note),
        specification: Set(input.specification),
        description: Set(input.description),
        additional_info: Set(input.additional_info),
        status: Set(input.status.to_string()),
        images: Set(image_refs),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await
    .map_err(|err| map_write_error(err, &product_code))?;

    tracing::info!(product_id = %product.id, code = %product.product_code, "product created");
    audit::record(
        &state.pool,
        ctx,
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ProductResponse {
        message: "Product created successfully".into(),
        product: product.into(),
    })
}

pub async fn update_product(
    state: &AppState,
    ctx: &AuthContext,
    id: Uuid,
    patch: ProductPatch,
    images: Vec<ImageFile>,
) -> AppResult<ProductResponse> {
    ctx.require_admin()?;

    // Only a patch carrying both prices is compared; a single price is
    // checked against the field rules alone.
    if let (Some(original), Some(discounted)) = (patch.original_price, patch.discounted_price) {
        check_discount(original, discounted)?;
    }

    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(product_not_found)?;

    check(&NewProduct::merged(&existing, &patch))?;
    if images.len() > MAX_FILES {
        return Err(UploadError::TooManyFiles.into());
    }
    if let Some(code) = patch.product_code.as_deref() {
        ensure_code_available(state, code, Some(id)).await?;
    }

    let image_refs = if images.is_empty() {
        None
    } else {
        Some(store_all(state.images.as_ref(), &images).await?)
    };

    let product_code = patch
        .product_code
        .clone()
        .unwrap_or_else(|| existing.product_code.clone());
    let mut active: ActiveModel = existing.into();
    if let Some(name) = patch.name {
        active.name = Set(name);
    }
    if let Some(stock) = patch.stock {
        active.stock = Set(stock);
    }
    if let Some(origin) = patch.origin {
        active.origin = Set(origin);
    }
    if let Some(code) = patch.product_code {
        active.product_code = Set(code);
    }
    if let Some(usage) = patch.usage {
        active.usage = Set(usage);
    }
    if let Some(original_price) = patch.original_price {
        active.original_price = Set(original_price);
    }
    if let Some(discounted_price) = patch.discounted_price {
        active.discounted_price = Set(discounted_price);
    }
    if let Some(note) = patch.note {
        active.note = Set(note);
    }
    if let Some(specification) = patch.specification {
        active.specification = Set(specification);
    }
    if let Some(description) = patch.description {
        active.description = Set(description);
    }
    if let Some(additional_info) = patch.additional_info {
        active.additional_info = Set(additional_info);
    }
    if let Some(status) = patch.status {
        active.status = Set(status.to_string());
    }
    if let Some(image_refs) = image_refs {
        active.images = Set(image_refs);
    }
    active.updated_at = Set(Utc::now().into());

    let product = active
        .update(&state.orm)
        .await
        .map_err(|err| map_write_error(err, &product_code))?;

    tracing::info!(product_id = %product.id, "product updated");
    audit::record(
        &state.pool,
        ctx,
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ProductResponse {
        message: "Product updated successfully".into(),
        product: product.into(),
    })
}

pub async fn update_product_status(
    state: &AppState,
    ctx: &AuthContext,
    id: Uuid,
    payload: UpdateProductStatusRequest,
) -> AppResult<ProductResponse> {
    ctx.require_admin()?;
    let status = parse_status(payload.status.as_deref().unwrap_or_default())?;

    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(product_not_found)?;

    let mut active: ActiveModel = existing.into();
    active.status = Set(status.to_string());
    active.updated_at = Set(Utc::now().into());
    let product = active.update(&state.orm).await?;

    tracing::info!(product_id = %product.id, status = %product.status, "product status changed");
    audit::record(
        &state.pool,
        ctx,
        "product_status_update",
        "products",
        serde_json::json!({ "product_id": product.id, "status": product.status }),
    )
    .await;

    Ok(ProductResponse {
        message: "Product status updated successfully".into(),
        product: product.into(),
    })
}

/// Orders referencing the product are left untouched.
pub async fn delete_product(
    state: &AppState,
    ctx: &AuthContext,
    id: Uuid,
) -> AppResult<MessageResponse> {
    ctx.require_admin()?;
    let result = Products::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(product_not_found());
    }

    tracing::info!(product_id = %id, "product deleted");
    audit::record(
        &state.pool,
        ctx,
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(MessageResponse::new("Product deleted successfully"))
}
