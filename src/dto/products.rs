use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{domain::category::Category, error::AppError, models::Product};

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 1000;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub price: i64,
    pub original_price: Option<i64>,
    pub image: String,
    pub category: String,
    pub brand: Option<String>,
    pub sku: Option<String>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub is_on_sale: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub reviews: i32,
}

impl CreateProductRequest {
    /// Checks field bounds and returns the parsed category.
    pub fn validate(&self) -> Result<Category, AppError> {
        if self.name.trim().is_empty() {
            return Err(bad("Product name is required"));
        }
        check_name(&self.name)?;
        if self.description.trim().is_empty() {
            return Err(bad("Product description is required"));
        }
        check_description(&self.description)?;
        if self.image.trim().is_empty() {
            return Err(bad("Product image is required"));
        }
        check_price(self.price, self.original_price)?;
        check_stock(self.stock)?;
        check_rating(self.rating, self.reviews)?;
        parse_category(&self.category)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub original_price: Option<i64>,
    pub image: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub sku: Option<String>,
    pub stock: Option<i32>,
    pub is_on_sale: Option<bool>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub rating: Option<f64>,
    pub reviews: Option<i32>,
}

impl UpdateProductRequest {
    /// Returns the parsed category when one was supplied.
    pub fn validate(&self) -> Result<Option<Category>, AppError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(bad("Product name is required"));
            }
            check_name(name)?;
        }
        if let Some(description) = &self.description {
            check_description(description)?;
        }
        if let Some(price) = self.price {
            check_price(price, None)?;
        }
        if let Some(original) = self.original_price {
            check_price(0, Some(original))?;
        }
        if let Some(stock) = self.stock {
            check_stock(stock)?;
        }
        check_rating(self.rating.unwrap_or(0.0), self.reviews.unwrap_or(0))?;
        self.category.as_deref().map(parse_category).transpose()
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StockUpdateRequest {
    /// Signed delta; the resulting stock is clamped at zero.
    pub quantity: i32,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct CategoryList {
    #[schema(value_type = Vec<String>)]
    pub items: Vec<String>,
}

fn bad(message: &str) -> AppError {
    AppError::BadRequest(message.to_string())
}

fn check_name(name: &str) -> Result<(), AppError> {
    if name.trim().chars().count() > MAX_NAME_LEN {
        return Err(bad("Product name cannot exceed 100 characters"));
    }
    Ok(())
}

fn check_description(description: &str) -> Result<(), AppError> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(bad("Description cannot exceed 1000 characters"));
    }
    Ok(())
}

fn check_price(price: i64, original_price: Option<i64>) -> Result<(), AppError> {
    if price < 0 {
        return Err(bad("Price cannot be negative"));
    }
    if original_price.is_some_and(|p| p < 0) {
        return Err(bad("Original price cannot be negative"));
    }
    Ok(())
}

fn check_stock(stock: i32) -> Result<(), AppError> {
    if stock < 0 {
        return Err(bad("Stock cannot be negative"));
    }
    Ok(())
}

fn check_rating(rating: f64, reviews: i32) -> Result<(), AppError> {
    if !(0.0..=5.0).contains(&rating) {
        return Err(bad("Rating must be between 0 and 5"));
    }
    if reviews < 0 {
        return Err(bad("Review count cannot be negative"));
    }
    Ok(())
}

fn parse_category(category: &str) -> Result<Category, AppError> {
    category
        .parse()
        .map_err(|err: crate::domain::ParseEnumError| AppError::BadRequest(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateProductRequest {
        CreateProductRequest {
            name: "Ferris Mug".into(),
            description: "Coffee tastes better with Ferris".into(),
            price: 1200,
            original_price: Some(1500),
            image: "/img/mug.png".into(),
            category: "Home".into(),
            brand: None,
            sku: Some("MUG-001".into()),
            stock: 10,
            is_on_sale: true,
            is_featured: false,
            rating: 4.5,
            reviews: 12,
        }
    }

    #[test]
    fn valid_product_yields_category() {
        assert_eq!(request().validate().unwrap(), Category::Home);
    }

    #[test]
    fn rejects_out_of_range_fields() {
        let mut r = request();
        r.price = -1;
        assert!(r.validate().is_err());

        let mut r = request();
        r.stock = -5;
        assert!(r.validate().is_err());

        let mut r = request();
        r.rating = 5.5;
        assert!(r.validate().is_err());

        let mut r = request();
        r.name = "x".repeat(MAX_NAME_LEN + 1);
        assert!(r.validate().is_err());

        let mut r = request();
        r.category = "Groceries".into();
        assert!(r.validate().is_err());
    }

    #[test]
    fn partial_update_only_checks_present_fields() {
        let update = UpdateProductRequest {
            price: Some(999),
            ..Default::default()
        };
        assert_eq!(update.validate().unwrap(), None);

        let update = UpdateProductRequest {
            category: Some("toys".into()),
            ..Default::default()
        };
        assert_eq!(update.validate().unwrap(), Some(Category::Toys));
    }
}
