use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub stock: i32,
    pub sold: i32,
    pub origin: String,
    #[sea_orm(unique)]
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
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

// Orders only hold a weak product_id reference, so no relation is declared.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
