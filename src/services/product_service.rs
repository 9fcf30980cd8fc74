use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set, TransactionTrait,
    sea_query::{Expr, LockType, extension::postgres::PgExpr},
};
use uuid::Uuid;

use crate::{
    audit,
    domain::category::Category,
    dto::products::{CategoryList, CreateProductRequest, ProductList, UpdateProductRequest},
    entity::products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::{Pagination, ProductQuery, ProductSort},
    state::AppState,
};

pub const DEFAULT_PAGE_SIZE: i64 = 12;
pub const FEATURED_LIMIT: u64 = 8;

fn search_condition(term: &str) -> Condition {
    let pattern = format!("%{}%", term.trim());
    Condition::any()
        .add(Expr::col(Column::Name).ilike(pattern.clone()))
        .add(Expr::col(Column::Description).ilike(pattern))
}

fn sorted(finder: Select<Products>, sort: ProductSort) -> Select<Products> {
    match sort {
        ProductSort::PriceAsc => finder.order_by_asc(Column::Price),
        ProductSort::PriceDesc => finder.order_by_desc(Column::Price),
        ProductSort::Rating => finder
            .order_by_desc(Column::Rating)
            .order_by_desc(Column::Reviews),
        ProductSort::Newest => finder.order_by_desc(Column::CreatedAt),
        ProductSort::Oldest => finder.order_by_asc(Column::CreatedAt),
    }
}

async fn paginate(
    state: &AppState,
    finder: Select<Products>,
    pagination: &Pagination,
    message: &str,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = pagination.normalize(DEFAULT_PAGE_SIZE);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    Ok(ApiResponse::success(
        message,
        ProductList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let mut condition = Condition::all().add(Column::IsActive.eq(true));

    if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty()) {
        let category: Category = category
            .parse()
            .map_err(|err: crate::domain::ParseEnumError| AppError::BadRequest(err.to_string()))?;
        condition = condition.add(Column::Category.eq(category.as_str()));
    }
    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }
    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }
    if query.on_sale == Some(true) {
        condition = condition.add(Column::IsOnSale.eq(true));
    }
    if query.featured == Some(true) {
        condition = condition.add(Column::IsFeatured.eq(true));
    }
    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        condition = condition.add(search_condition(search));
    }

    let finder = sorted(
        Products::find().filter(condition),
        query.sort.unwrap_or_default(),
    );
    paginate(state, finder, &query.pagination(), "Products").await
}

pub async fn featured_products(state: &AppState) -> AppResult<ApiResponse<ProductList>> {
    let items = Products::find()
        .filter(Column::IsActive.eq(true))
        .filter(Column::IsFeatured.eq(true))
        .order_by_desc(Column::Rating)
        .limit(FEATURED_LIMIT)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();
    Ok(ApiResponse::success("Featured products", ProductList { items }, None))
}

pub async fn sale_products(
    state: &AppState,
    pagination: Pagination,
) -> AppResult<ApiResponse<ProductList>> {
    let finder = Products::find()
        .filter(Column::IsActive.eq(true))
        .filter(Column::IsOnSale.eq(true))
        .order_by_desc(Column::CreatedAt);
    paginate(state, finder, &pagination, "Sale products").await
}

pub async fn products_by_category(
    state: &AppState,
    category: &str,
    pagination: Pagination,
) -> AppResult<ApiResponse<ProductList>> {
    let category: Category = category
        .parse()
        .map_err(|err: crate::domain::ParseEnumError| AppError::BadRequest(err.to_string()))?;
    let finder = Products::find()
        .filter(Column::IsActive.eq(true))
        .filter(Column::Category.eq(category.as_str()))
        .order_by_desc(Column::CreatedAt);
    paginate(state, finder, &pagination, "Products").await
}

pub async fn search_products(
    state: &AppState,
    term: &str,
    pagination: Pagination,
) -> AppResult<ApiResponse<ProductList>> {
    if term.trim().is_empty() {
        return Err(AppError::BadRequest("Search query is required".into()));
    }
    let finder = Products::find()
        .filter(Column::IsActive.eq(true))
        .filter(search_condition(term))
        .order_by_desc(Column::Rating);
    paginate(state, finder, &pagination, "Search results").await
}

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let items: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT category FROM products WHERE is_active = TRUE ORDER BY category",
    )
    .fetch_all(&state.pool)
    .await?;
    Ok(ApiResponse::success("Categories", CategoryList { items }, None))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;
    Ok(ApiResponse::success("Product", product.into(), None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let category = payload.validate()?;

    let product = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name.trim().to_string()),
        description: Set(payload.description),
        price: Set(payload.price),
        original_price: Set(payload.original_price),
        image: Set(payload.image),
        category: Set(category.as_str().to_string()),
        brand: Set(payload.brand),
        sku: Set(payload.sku.filter(|s| !s.trim().is_empty())),
        stock: Set(payload.stock),
        is_on_sale: Set(payload.is_on_sale),
        is_active: Set(true),
        is_featured: Set(payload.is_featured),
        rating: Set(payload.rating),
        reviews: Set(payload.reviews),
        created_by: Set(Some(user.user_id)),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        state,
        Some(user.user_id),
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        product.into(),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let category = payload.validate()?;

    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(original_price) = payload.original_price {
        active.original_price = Set(Some(original_price));
    }
    if let Some(image) = payload.image {
        active.image = Set(image);
    }
    if let Some(category) = category {
        active.category = Set(category.as_str().to_string());
    }
    if let Some(brand) = payload.brand {
        active.brand = Set(Some(brand));
    }
    if let Some(sku) = payload.sku {
        active.sku = Set(Some(sku));
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    if let Some(is_on_sale) = payload.is_on_sale {
        active.is_on_sale = Set(is_on_sale);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    if let Some(is_featured) = payload.is_featured {
        active.is_featured = Set(is_featured);
    }
    if let Some(rating) = payload.rating {
        active.rating = Set(rating);
    }
    if let Some(reviews) = payload.reviews {
        active.reviews = Set(reviews);
    }
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&state.orm).await?;

    audit::record(
        state,
        Some(user.user_id),
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success("Product updated", product.into(), None))
}

/// Soft delete: the product is deactivated so existing orders keep their
/// references.
pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<()>> {
    ensure_admin(user)?;
    let result = Products::update_many()
        .col_expr(Column::IsActive, Expr::value(false))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::Id.eq(id))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::not_found("Product"));
    }

    audit::record(
        state,
        Some(user.user_id),
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::message("Product removed"))
}

pub(crate) fn adjusted_stock(current: i32, delta: i32) -> i32 {
    current.saturating_add(delta).max(0)
}

pub async fn update_stock(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    delta: i32,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let existing: ProductModel = Products::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;

    let before = existing.stock;
    let mut active: ActiveModel = existing.into();
    active.stock = Set(adjusted_stock(before, delta));
    active.updated_at = Set(Utc::now().into());
    let product = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(product_id = %id, before, after = product.stock, "stock adjusted");
    audit::record(
        state,
        Some(user.user_id),
        "product_stock_adjust",
        "products",
        serde_json::json!({ "product_id": id, "delta": delta, "stock": product.stock }),
    )
    .await;

    Ok(ApiResponse::success("Stock updated", product.into(), None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_adjustment_clamps_at_zero() {
        assert_eq!(adjusted_stock(5, 3), 8);
        assert_eq!(adjusted_stock(5, -3), 2);
        assert_eq!(adjusted_stock(5, -9), 0);
        assert_eq!(adjusted_stock(i32::MAX, 1), i32::MAX);
    }
}
