use chrono::{DateTime, Utc};
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::{role::Role, shipping::ShippingAddress},
    entity::{
        orders::Model as OrderModel, products::Model as ProductModel, users::Model as UserModel,
    },
};

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_email_verified: bool,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<UserModel> for User {
    fn from(model: UserModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            role: model.role.parse().unwrap_or_default(),
            is_email_verified: model.is_email_verified,
            phone: model.phone,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub original_price: Option<i64>,
    pub discount_percentage: i64,
    pub image: String,
    pub category: String,
    pub brand: Option<String>,
    pub sku: Option<String>,
    pub stock: i32,
    pub is_available: bool,
    pub is_on_sale: bool,
    pub is_active: bool,
    pub is_featured: bool,
    pub rating: f64,
    pub reviews: i32,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Whole-percent markdown from `original_price` to `price`; zero when the
/// product is not discounted.
pub fn discount_percentage(price: i64, original_price: Option<i64>) -> i64 {
    match original_price {
        Some(original) if original > price && original > 0 => {
            ((original - price) as f64 / original as f64 * 100.0).round() as i64
        }
        _ => 0,
    }
}

impl From<ProductModel> for Product {
    fn from(model: ProductModel) -> Self {
        Self {
            discount_percentage: discount_percentage(model.price, model.original_price),
            is_available: model.stock > 0 && model.is_active,
            id: model.id,
            name: model.name,
            description: model.description,
            price: model.price,
            original_price: model.original_price,
            image: model.image,
            category: model.category,
            brand: model.brand,
            sku: model.sku,
            stock: model.stock,
            is_on_sale: model.is_on_sale,
            is_active: model.is_active,
            is_featured: model.is_featured,
            rating: model.rating,
            reviews: model.reviews,
            created_by: model.created_by,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

/// Product snapshot captured when the order was placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product: Uuid,
    pub name: String,
    pub price: i64,
    pub quantity: i32,
    pub image: String,
    pub sku: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema, FromJsonQueryResult)]
pub struct PaymentResult {
    pub id: Option<String>,
    pub status: Option<String>,
    pub update_time: Option<String>,
    pub email_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user: Uuid,
    pub items: Vec<OrderItem>,
    pub total_items: i64,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub payment_result: Option<PaymentResult>,
    pub items_price: i64,
    pub tax_price: i64,
    pub shipping_price: i64,
    pub total_price: i64,
    pub status: String,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderModel> for Order {
    fn from(model: OrderModel) -> Self {
        let items = model.items.0;
        Self {
            total_items: items.iter().map(|item| i64::from(item.quantity)).sum(),
            items,
            id: model.id,
            order_number: model.order_number,
            user: model.user_id,
            shipping_address: model.shipping_address,
            payment_method: model.payment_method,
            payment_result: model.payment_result,
            items_price: model.items_price,
            tax_price: model.tax_price,
            shipping_price: model.shipping_price,
            total_price: model.total_price,
            status: model.status,
            is_paid: model.is_paid,
            paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
            is_delivered: model.is_delivered,
            delivered_at: model.delivered_at.map(|dt| dt.with_timezone(&Utc)),
            tracking_number: model.tracking_number,
            notes: model.notes,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}
