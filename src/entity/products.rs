use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub original_price: Option<i64>,
    pub image: String,
    pub category: String,
    pub brand: Option<String>,
    #[sea_orm(unique)]
    pub sku: Option<String>,
    pub stock: i32,
    pub is_on_sale: bool,
    pub is_active: bool,
    pub is_featured: bool,
    #[sea_orm(column_type = "Double")]
    pub rating: f64,
    pub reviews: i32,
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Active and holding at least `quantity` units.
    pub fn is_in_stock(&self, quantity: i32) -> bool {
        self.is_active && self.stock >= quantity
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::cart_items::Entity")]
    CartItems,
}

impl Related<super::cart_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
