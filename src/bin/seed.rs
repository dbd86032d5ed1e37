use storefront_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&pool).await?;

    let inserted = seed_products(&pool).await?;

    println!("Seed completed. {inserted} new product(s)");
    Ok(())
}

struct SeedProduct {
    name: &'static str,
    code: &'static str,
    origin: &'static str,
    usage: &'static str,
    specification: &'static str,
    original_price: i64,
    discounted_price: Option<i64>,
    stock: i32,
}

const PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        name: "Refined White Nest",
        code: "WN-100",
        origin: "Khanh Hoa",
        usage: "Steam with rock sugar for 30 minutes",
        specification: "Box of 100g",
        original_price: 3_500_000,
        discounted_price: Some(3_200_000),
        stock: 40,
    },
    SeedProduct {
        name: "Raw House Nest",
        code: "RN-050",
        origin: "Ninh Thuan",
        usage: "Soak for 2 hours before cleaning",
        specification: "Box of 50g",
        original_price: 1_600_000,
        discounted_price: None,
        stock: 25,
    },
    SeedProduct {
        name: "Ready-to-drink Nest Jar",
        code: "JR-006",
        origin: "Khanh Hoa",
        usage: "Serve chilled",
        specification: "Pack of 6 jars, 70ml each",
        original_price: 240_000,
        discounted_price: Some(199_000),
        stock: 120,
    },
];

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<u64> {
    let mut inserted = 0;

    for product in PRODUCTS {
        let image = format!("/uploads/seed-{}.jpg", product.code.to_lowercase());
        let result = sqlx::query(
            r#"
            INSERT INTO products (
                id, name, stock, origin, product_code, usage,
                original_price, discounted_price, specification, images
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (product_code) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(product.name)
        .bind(product.stock)
        .bind(product.origin)
        .bind(product.code)
        .bind(product.usage)
        .bind(product.original_price)
        .bind(product.discounted_price)
        .bind(product.specification)
        .bind(vec![image])
        .execute(pool)
        .await?;

        inserted += result.rows_affected();
    }

    println!("Seeded products");
    Ok(inserted)
}
