mod common;

use storefront_api::{
    domain::role::Role,
    dto::{
        cart::{AddToCartRequest, UpdateCartItemRequest},
        products::UpdateProductRequest,
    },
    error::AppError,
    services::{cart_service, product_service},
};
use uuid::Uuid;

#[tokio::test]
async fn adding_twice_merges_quantities() {
    let Some(state) = common::db_state().await else { return };
    let user = common::create_user(&state, Role::User).await;
    let mug = common::create_product(&state, 1200, 10).await;
    let shirt = common::create_product(&state, 1999, 10).await;

    for (product_id, quantity) in [(mug.id, 1), (shirt.id, 2), (mug.id, 2)] {
        cart_service::add_to_cart(&state, &user, AddToCartRequest { product_id, quantity })
            .await
            .unwrap();
    }

    let cart = cart_service::get_cart(&state, &user).await.unwrap().data.unwrap();
    assert_eq!(cart.items.len(), 2);
    assert_eq!(cart.total_items, 5);
    assert_eq!(cart.subtotal, 3 * 1200 + 2 * 1999);
    let mug_line = cart.items.iter().find(|i| i.product.id == mug.id).unwrap();
    assert_eq!(mug_line.quantity, 3);
    assert_eq!(mug_line.line_total, 3600);
}

#[tokio::test]
async fn cart_cannot_exceed_stock() {
    let Some(state) = common::db_state().await else { return };
    let user = common::create_user(&state, Role::User).await;
    let product = common::create_product(&state, 500, 2).await;

    cart_service::add_to_cart(
        &state,
        &user,
        AddToCartRequest {
            product_id: product.id,
            quantity: 2,
        },
    )
    .await
    .unwrap();
    let more = cart_service::add_to_cart(
        &state,
        &user,
        AddToCartRequest {
            product_id: product.id,
            quantity: 1,
        },
    )
    .await;
    assert!(matches!(more, Err(AppError::BadRequest(_))));

    let cart = cart_service::get_cart(&state, &user).await.unwrap().data.unwrap();
    assert_eq!(cart.total_items, 2);
}

#[tokio::test]
async fn zero_quantity_removes_and_clear_empties() {
    let Some(state) = common::db_state().await else { return };
    let user = common::create_user(&state, Role::User).await;
    let a = common::create_product(&state, 100, 10).await;
    let b = common::create_product(&state, 200, 10).await;

    for product_id in [a.id, b.id] {
        cart_service::add_to_cart(&state, &user, AddToCartRequest { product_id, quantity: 1 })
            .await
            .unwrap();
    }

    let cart = cart_service::update_cart_item(
        &state,
        &user,
        a.id,
        UpdateCartItemRequest { quantity: 0 },
    )
    .await
    .unwrap()
    .data
    .unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].product.id, b.id);

    // Removing a product that is not in the cart is a no-op.
    cart_service::remove_from_cart(&state, &user, Uuid::new_v4())
        .await
        .unwrap();

    let cart = cart_service::clear_cart(&state, &user).await.unwrap().data.unwrap();
    assert!(cart.items.is_empty());
    let cart = cart_service::get_cart(&state, &user).await.unwrap().data.unwrap();
    assert_eq!(cart.total_items, 0);
    assert_eq!(cart.subtotal, 0);
}

#[tokio::test]
async fn inactive_or_unknown_products_are_not_found() {
    let Some(state) = common::db_state().await else { return };
    let user = common::create_user(&state, Role::User).await;
    let admin = common::create_user(&state, Role::Admin).await;
    let product = common::create_product(&state, 100, 10).await;

    product_service::update_product(
        &state,
        &admin,
        product.id,
        UpdateProductRequest {
            is_active: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    for product_id in [product.id, Uuid::new_v4()] {
        let result =
            cart_service::add_to_cart(&state, &user, AddToCartRequest { product_id, quantity: 1 })
                .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
