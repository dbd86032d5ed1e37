use std::sync::Arc;

use axum::body::Bytes;
use tokio::task::JoinSet;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Statement};
use storefront_api::{
    db::{create_pool, orm_from_pool, run_migrations},
    dto::{
        orders::{CreateOrderRequest, UpdateOrderStatusRequest},
        products::{NewProduct, ProductPatch, UpdateProductStatusRequest},
    },
    entity::{audit_logs, products::Entity as Products},
    error::AppError,
    middleware::auth::{ADMIN_ROLE, AuthContext, AuthUser},
    models::{Product, ProductStatus},
    routes::params::{OrderListQuery, ProductQuery},
    services::{order_service, product_service},
    state::AppState,
    storage::LocalImageStorage,
    upload::ImageFile,
};
use uuid::Uuid;

// Integration flow: admin creates a product, the public orders it, admin
// cancels and deletes orders while inventory stays consistent.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn order_lifecycle_keeps_inventory_consistent() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;
    let admin = AuthContext::Admin(AuthUser {
        user_id: Uuid::new_v4(),
        role: ADMIN_ROLE.into(),
    });
    let anonymous = AuthContext::Anonymous;

    let product = product_service::create_product(
        &state,
        &admin,
        new_product("WN-100", 10, 100_000, None),
        vec![image("front.png")],
    )
    .await?
    .product;
    assert_eq!(product.images.len(), 1);
    assert!(product.images[0].starts_with("/uploads/"));

    // Duplicate product codes are refused.
    let err = product_service::create_product(
        &state,
        &admin,
        new_product("WN-100", 1, 1, None),
        vec![image("dup.png")],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // 3 boxes at the effective price.
    let placed = order_service::create_order(&state, order_request(&product, 3, 100_000)).await?;
    assert_eq!(placed.order.status, "pending");
    assert_eq!(placed.order.status_label, "Awaiting confirmation");
    assert_eq!(inventory(&state, product.id).await?, (7, 3));

    // Wrong total leaves the product untouched.
    let err = order_service::create_order(&state, order_request(&product, 1, 90_000))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid total price");
    assert_eq!(inventory(&state, product.id).await?, (7, 3));

    // More boxes than in stock.
    let err = order_service::create_order(&state, order_request(&product, 8, 100_000))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Insufficient stock");
    assert_eq!(inventory(&state, product.id).await?, (7, 3));

    // Unknown product.
    let mut unknown = order_request(&product, 1, 100_000);
    unknown.product_id = Some(Uuid::new_v4().to_string());
    let err = order_service::create_order(&state, unknown).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    // Cancelling hands the boxes back once.
    let order_id = placed.order.id;
    let cancelled = order_service::update_order_status(&state, &admin, order_id, status("cancelled")).await?;
    assert!(cancelled.order.inventory_restored);
    assert_eq!(inventory(&state, product.id).await?, (10, 0));

    order_service::update_order_status(&state, &admin, order_id, status("pending")).await?;
    order_service::update_order_status(&state, &admin, order_id, status("cancelled")).await?;
    assert_eq!(inventory(&state, product.id).await?, (10, 0));

    // Deleting an already restored order does not restore again.
    order_service::delete_order(&state, &admin, order_id).await?;
    assert_eq!(inventory(&state, product.id).await?, (10, 0));
    let err = order_service::get_order(&state, &admin, order_id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    // Delivered orders keep their boxes sold, even on delete.
    let delivered = order_service::create_order(&state, order_request(&product, 2, 100_000)).await?;
    order_service::update_order_status(&state, &admin, delivered.order.id, status("delivered")).await?;
    order_service::update_order_status(&state, &admin, delivered.order.id, status("cancelled")).await?;
    assert_eq!(inventory(&state, product.id).await?, (8, 2));
    order_service::delete_order(&state, &admin, delivered.order.id).await?;
    assert_eq!(inventory(&state, product.id).await?, (8, 2));

    // Deleting a pending order restores. The submitted product name is kept.
    let mut gift = order_request(&product, 1, 100_000);
    gift.product_name = Some("Gift box".into());
    let pending = order_service::create_order(&state, gift).await?;
    assert_eq!(pending.order.product_name, "Gift box");
    assert_eq!(inventory(&state, product.id).await?, (7, 3));
    order_service::delete_order(&state, &admin, pending.order.id).await?;
    assert_eq!(inventory(&state, product.id).await?, (8, 2));

    // Order listing: paging and status filter, admins only.
    for _ in 0..3 {
        order_service::create_order(&state, order_request(&product, 1, 100_000)).await?;
    }
    let page = order_service::list_orders(
        &state,
        &admin,
        OrderListQuery {
            page: Some(2),
            limit: Some(2),
            status: Some("pending".into()),
        },
    )
    .await?;
    assert_eq!(page.total, 3);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.current_page, 2);
    assert_eq!(page.items.len(), 1);
    let err = order_service::list_orders(&state, &anonymous, OrderListQuery::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    // Inactive products stay listed but cannot be fetched by id or ordered by the public.
    product_service::update_product_status(
        &state,
        &admin,
        product.id,
        UpdateProductStatusRequest {
            status: Some("inactive".into()),
        },
    )
    .await?;
    let listed = product_service::list_products(&state, ProductQuery::default()).await?;
    assert!(listed.items.iter().any(|p| p.id == product.id && p.status == "inactive"));
    assert!(product_service::get_product(&state, &admin, product.id).await.is_ok());
    let err = product_service::get_product(&state, &anonymous, product.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    let err = order_service::create_order(&state, order_request(&product, 1, 100_000))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let searched = product_service::list_products(
        &state,
        ProductQuery {
            search: Some("white".into()),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(searched.total, 1);

    // Discount check fires only when both prices arrive together.
    let err = product_service::update_product(
        &state,
        &admin,
        product.id,
        ProductPatch {
            original_price: Some(50_000),
            discounted_price: Some(Some(60_000)),
            ..Default::default()
        },
        Vec::new(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "Discounted price must not exceed original price");

    let updated = product_service::update_product(
        &state,
        &admin,
        product.id,
        ProductPatch {
            discounted_price: Some(Some(120_000)),
            ..Default::default()
        },
        vec![image("side.jpg"), image("back.jpg")],
    )
    .await?
    .product;
    assert_eq!(updated.discounted_price, Some(120_000));
    assert_eq!(updated.images.len(), 2);
    assert_eq!(updated.stock, 5);

    // Concurrent orders never oversell: 8 buyers want 2 boxes each of 5 in stock.
    let scarce = product_service::create_product(
        &state,
        &admin,
        new_product("JR-006", 5, 240_000, None),
        vec![image("jar.png")],
    )
    .await?
    .product;
    let mut buyers = JoinSet::new();
    for _ in 0..8 {
        let state = state.clone();
        let request = order_request(&scarce, 2, 240_000);
        buyers.spawn(async move { order_service::create_order(&state, request).await });
    }
    let mut placed_count = 0;
    let mut refused = 0;
    while let Some(result) = buyers.join_next().await {
        match result? {
            Ok(_) => placed_count += 1,
            Err(err) => {
                assert_eq!(err.to_string(), "Insufficient stock");
                refused += 1;
            }
        }
    }
    assert_eq!((placed_count, refused), (2, 6));
    let (stock, sold) = inventory(&state, scarce.id).await?;
    assert_eq!((stock, sold), (1, 4));
    assert_eq!(stock + sold, 5);

    // Two admins racing for the same product code: one wins, the other gets a 400.
    let (first, second) = tokio::join!(
        product_service::create_product(
            &state,
            &admin,
            new_product("RACE-1", 1, 1_000, None),
            vec![image("a.png")],
        ),
        product_service::create_product(
            &state,
            &admin,
            new_product("RACE-1", 1, 1_000, None),
            vec![image("b.png")],
        ),
    );
    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .any(|r| matches!(r, Err(AppError::BadRequest(msg)) if msg.contains("RACE-1")))
    );

    // Deleting the product leaves its orders in place.
    let orders_before = order_count(&state).await?;
    product_service::delete_product(&state, &admin, product.id).await?;
    assert_eq!(order_count(&state).await?, orders_before);
    assert!(Products::find_by_id(product.id).one(&state.orm).await?.is_none());

    let audited = audit_logs::Entity::find()
        .filter(audit_logs::Column::Action.eq("order_status_update"))
        .count(&state.orm)
        .await?;
    assert!(audited >= 4);

    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    run_migrations(&pool).await?;
    let orm = orm_from_pool(&pool);

    orm.execute(Statement::from_string(
        orm.get_database_backend(),
        "TRUNCATE audit_logs, orders, products".to_owned(),
    ))
    .await?;

    let upload_dir = std::env::temp_dir().join(format!("storefront-test-{}", Uuid::new_v4()));
    Ok(AppState {
        pool,
        orm,
        images: Arc::new(LocalImageStorage::new(upload_dir)),
        jwt_secret: Arc::from("flow-test-secret"),
    })
}

fn new_product(code: &str, stock: i32, price: i64, discount: Option<i64>) -> NewProduct {
    NewProduct {
        name: "Refined White Nest".into(),
        stock,
        origin: "Khanh Hoa".into(),
        product_code: code.into(),
        usage: "Steam for 30 minutes".into(),
        original_price: price,
        discounted_price: discount,
        note: None,
        specification: "Box of 100g".into(),
        description: None,
        additional_info: None,
        status: ProductStatus::Active,
    }
}

fn image(file_name: &str) -> ImageFile {
    ImageFile {
        file_name: file_name.into(),
        content_type: "image/png".into(),
        bytes: Bytes::from_static(b"\x89PNG fake"),
    }
}

fn order_request(product: &Product, box_count: i32, total_price: i64) -> CreateOrderRequest {
    CreateOrderRequest {
        product_id: Some(product.id.to_string()),
        product_name: Some(product.name.clone()),
        box_count: Some(box_count),
        total_price: Some(total_price),
        full_name: Some("Nguyen Van A".into()),
        phone: Some("0901234567".into()),
        address: Some("12 Harbour Road".into()),
        note: None,
    }
}

fn status(value: &str) -> UpdateOrderStatusRequest {
    UpdateOrderStatusRequest {
        status: Some(value.into()),
    }
}

async fn inventory(state: &AppState, product_id: Uuid) -> anyhow::Result<(i32, i32)> {
    let product = Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product vanished"))?;
    Ok((product.stock, product.sold))
}

async fn order_count(state: &AppState) -> anyhow::Result<u64> {
    Ok(storefront_api::entity::orders::Entity::find()
        .count(&state.orm)
        .await?)
}
