use std::collections::HashMap;

use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    sea_query::OnConflict,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{
        cart::{Cart, CartChange, CartError, CartLine},
        totals::TotalsError,
    },
    dto::cart::{AddToCartRequest, CartItemView, CartView, UpdateCartItemRequest},
    entity::{
        cart_items::{ActiveModel as CartActive, Column as CartCol, Entity as CartItems},
        products::{Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Product,
    response::ApiResponse,
    state::AppState,
};

/// A user's cart together with the product rows its lines point at.
struct LoadedCart {
    cart: Cart,
    products: HashMap<Uuid, ProductModel>,
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

fn totals_error(err: TotalsError) -> AppError {
    AppError::BadRequest(err.to_string())
}

async fn load_cart<C: ConnectionTrait>(db: &C, user_id: Uuid) -> AppResult<LoadedCart> {
    let rows = CartItems::find()
        .filter(CartCol::UserId.eq(user_id))
        .order_by_asc(CartCol::CreatedAt)
        .find_also_related(Products)
        .all(db)
        .await?;

    let mut lines = Vec::with_capacity(rows.len());
    let mut products = HashMap::with_capacity(rows.len());
    for (item, product) in rows {
        let Some(product) = product else { continue };
        lines.push(CartLine {
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: product.price,
        });
        products.insert(product.id, product);
    }

    Ok(LoadedCart {
        cart: Cart::new(lines),
        products,
    })
}

async fn persist<C: ConnectionTrait>(db: &C, user_id: Uuid, change: &CartChange) -> AppResult<()> {
    match change {
        CartChange::Upsert {
            product_id,
            quantity,
        } => {
            let row = CartActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id),
                product_id: Set(*product_id),
                quantity: Set(*quantity),
                created_at: NotSet,
            };
            CartItems::insert(row)
                .on_conflict(
                    OnConflict::columns([CartCol::UserId, CartCol::ProductId])
                        .update_column(CartCol::Quantity)
                        .to_owned(),
                )
                .exec_without_returning(db)
                .await?;
        }
        CartChange::Remove { product_id } => {
            CartItems::delete_many()
                .filter(CartCol::UserId.eq(user_id))
                .filter(CartCol::ProductId.eq(*product_id))
                .exec(db)
                .await?;
        }
        CartChange::Clear => {
            CartItems::delete_many()
                .filter(CartCol::UserId.eq(user_id))
                .exec(db)
                .await?;
        }
        CartChange::Unchanged => {}
    }
    Ok(())
}

fn view(loaded: LoadedCart) -> AppResult<CartView> {
    let LoadedCart { cart, mut products } = loaded;
    let subtotal = cart.subtotal().map_err(totals_error)?;
    let total_items = cart.total_items();

    let items = cart
        .lines()
        .iter()
        .filter_map(|line| {
            let product = products.remove(&line.product_id)?;
            Some(CartItemView {
                line_total: line.unit_price * i64::from(line.quantity),
                quantity: line.quantity,
                product: Product::from(product),
            })
        })
        .collect();

    Ok(CartView {
        items,
        total_items,
        subtotal,
    })
}

fn ensure_stock(product: &ProductModel, quantity: i32) -> AppResult<()> {
    if !product.is_in_stock(quantity) {
        return Err(AppError::BadRequest(format!(
            "Insufficient stock for {}",
            product.name
        )));
    }
    Ok(())
}

pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let loaded = load_cart(&state.orm, user.user_id).await?;
    Ok(ApiResponse::success("Cart", view(loaded)?, None))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    let product = Products::find_by_id(payload.product_id)
        .one(&state.orm)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| AppError::not_found("Product"))?;

    let mut loaded = load_cart(&state.orm, user.user_id).await?;
    let change = loaded
        .cart
        .add(product.id, payload.quantity, product.price)?;
    if let CartChange::Upsert { quantity, .. } = change {
        ensure_stock(&product, quantity)?;
    }

    persist(&state.orm, user.user_id, &change).await?;
    loaded.products.insert(product.id, product);

    audit::record(
        state,
        Some(user.user_id),
        "cart_add",
        "cart_items",
        serde_json::json!({ "product_id": payload.product_id, "quantity": payload.quantity }),
    )
    .await;

    Ok(ApiResponse::success("Item added to cart", view(loaded)?, None))
}

pub async fn update_cart_item(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartView>> {
    let mut loaded = load_cart(&state.orm, user.user_id).await?;
    if loaded.cart.quantity_of(product_id).is_none() {
        return Err(AppError::not_found("Cart item"));
    }

    let change = loaded.cart.set_quantity(product_id, payload.quantity);
    if let CartChange::Upsert { quantity, .. } = change {
        if let Some(product) = loaded.products.get(&product_id) {
            ensure_stock(product, quantity)?;
        }
    }

    persist(&state.orm, user.user_id, &change).await?;
    Ok(ApiResponse::success("Cart updated", view(loaded)?, None))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<CartView>> {
    let mut loaded = load_cart(&state.orm, user.user_id).await?;
    let change = loaded.cart.remove(product_id);
    persist(&state.orm, user.user_id, &change).await?;
    Ok(ApiResponse::success("Item removed from cart", view(loaded)?, None))
}

pub async fn clear_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let mut loaded = load_cart(&state.orm, user.user_id).await?;
    let change = loaded.cart.clear();
    persist(&state.orm, user.user_id, &change).await?;
    Ok(ApiResponse::success("Cart cleared", view(loaded)?, None))
}
