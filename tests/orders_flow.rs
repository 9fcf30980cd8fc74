mod common;

use chrono::{NaiveDate, Utc};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, TransactionTrait};
use storefront_api::{
    domain::{order_status::OrderStatus, role::Role, shipping::ShippingAddressInput},
    dto::orders::{CreateOrderRequest, MarkPaidRequest, OrderItemRequest, UpdateOrderStatusRequest},
    entity::{AuditLogs, Orders, audit_logs::Column as AuditCol, orders::Column as OrderCol},
    error::AppError,
    middleware::auth::AuthUser,
    models::Order,
    routes::params::Pagination,
    services::{admin_service, order_service},
    state::AppState,
};
use uuid::Uuid;

fn address() -> ShippingAddressInput {
    ShippingAddressInput {
        address: Some("123 Test St".into()),
        city: Some("Test City".into()),
        state: Some("TS".into()),
        zip_code: Some("12345".into()),
        ..Default::default()
    }
}

fn order_request(items: &[(Uuid, i32)]) -> CreateOrderRequest {
    CreateOrderRequest {
        items: items
            .iter()
            .map(|(product, quantity)| OrderItemRequest {
                product: *product,
                quantity: *quantity,
            })
            .collect(),
        shipping_address: address(),
        payment_method: "stripe".into(),
        tax_price: None,
        shipping_price: None,
    }
}

async fn place(state: &AppState, user: &AuthUser, request: CreateOrderRequest) -> Order {
    order_service::create_order(state, user, request)
        .await
        .expect("create order")
        .data
        .expect("order data")
}

async fn order_count(state: &AppState, user: &AuthUser) -> u64 {
    Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .count(&state.orm)
        .await
        .unwrap()
}

#[tokio::test]
async fn checkout_computes_totals_and_takes_stock() {
    let Some(state) = common::db_state().await else { return };
    let user = common::create_user(&state, Role::User).await;
    let product = common::create_product(&state, 1000, 5).await;

    let mut request = order_request(&[(product.id, 2)]);
    request.tax_price = Some(100);
    request.shipping_price = Some(599);
    let order = place(&state, &user, request).await;

    assert_eq!(order.items_price, 2000);
    assert_eq!(order.total_price, 2699);
    assert_eq!(order.total_price, order.items_price + order.tax_price + order.shipping_price);
    assert_eq!(order.status, "pending");
    assert!(!order.is_paid);
    assert_eq!(order.items[0].name, product.name);
    assert_eq!(order.items[0].price, 1000);
    assert_eq!(common::stock_of(&state, product.id).await, 3);

    let today = Utc::now().format("%y%m%d").to_string();
    assert!(order.order_number.starts_with(&format!("SS{today}")));

    assert_eq!(order.shipping_address.first_name, "Test");
    assert_eq!(order.shipping_address.last_name, "User");
    assert_eq!(order.shipping_address.phone, "123-456-7890");
    assert_eq!(order.shipping_address.country, "US");

    let audited = AuditLogs::find()
        .filter(AuditCol::UserId.eq(user.user_id))
        .filter(AuditCol::Action.eq("order_create"))
        .count(&state.orm)
        .await
        .unwrap();
    assert_eq!(audited, 1);
}

#[tokio::test]
async fn quantity_above_stock_is_rejected_and_stock_kept() {
    let Some(state) = common::db_state().await else { return };
    let user = common::create_user(&state, Role::User).await;
    let product = common::create_product(&state, 500, 2).await;

    let result = order_service::create_order(&state, &user, order_request(&[(product.id, 3)])).await;

    match result {
        Err(AppError::BadRequest(message)) => {
            assert_eq!(message, format!("Insufficient stock for {}", product.name))
        }
        other => panic!("expected insufficient stock, got {:?}", other.map(|r| r.message)),
    }
    assert_eq!(common::stock_of(&state, product.id).await, 2);
    assert_eq!(order_count(&state, &user).await, 0);
}

#[tokio::test]
async fn unknown_product_is_not_found_and_nothing_persisted() {
    let Some(state) = common::db_state().await else { return };
    let user = common::create_user(&state, Role::User).await;

    let result =
        order_service::create_order(&state, &user, order_request(&[(Uuid::new_v4(), 1)])).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(order_count(&state, &user).await, 0);
}

#[tokio::test]
async fn failed_line_rolls_back_earlier_lines() {
    let Some(state) = common::db_state().await else { return };
    let user = common::create_user(&state, Role::User).await;
    let plenty = common::create_product(&state, 1000, 5).await;
    let scarce = common::create_product(&state, 1000, 1).await;

    let result = order_service::create_order(
        &state,
        &user,
        order_request(&[(plenty.id, 2), (scarce.id, 4)]),
    )
    .await;

    assert!(matches!(result, Err(AppError::BadRequest(_))));
    assert_eq!(common::stock_of(&state, plenty.id).await, 5);
    assert_eq!(common::stock_of(&state, scarce.id).await, 1);
    assert_eq!(order_count(&state, &user).await, 0);
}

#[tokio::test]
async fn empty_order_is_rejected() {
    let Some(state) = common::db_state().await else { return };
    let user = common::create_user(&state, Role::User).await;

    let result = order_service::create_order(&state, &user, order_request(&[])).await;

    match result {
        Err(AppError::BadRequest(message)) => assert_eq!(message, "No order items"),
        _ => panic!("expected bad request"),
    }
}

#[tokio::test]
async fn cancelling_pending_restores_stock() {
    let Some(state) = common::db_state().await else { return };
    let user = common::create_user(&state, Role::User).await;
    let product = common::create_product(&state, 250, 10).await;

    let order = place(&state, &user, order_request(&[(product.id, 4)])).await;
    assert_eq!(common::stock_of(&state, product.id).await, 6);

    let cancelled = order_service::cancel_order(&state, &user, order.id)
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(cancelled.status, "cancelled");
    assert_eq!(cancelled.total_price, order.total_price);
    assert_eq!(common::stock_of(&state, product.id).await, 10);

    let again = order_service::cancel_order(&state, &user, order.id).await;
    assert!(matches!(again, Err(AppError::BadRequest(_))));
    assert_eq!(common::stock_of(&state, product.id).await, 10);
}

#[tokio::test]
async fn shipped_orders_cannot_be_cancelled() {
    let Some(state) = common::db_state().await else { return };
    let user = common::create_user(&state, Role::User).await;
    let admin = common::create_user(&state, Role::Admin).await;
    let product = common::create_product(&state, 250, 10).await;
    let order = place(&state, &user, order_request(&[(product.id, 1)])).await;

    admin_service::update_order_status(
        &state,
        &admin,
        order.id,
        UpdateOrderStatusRequest {
            status: "shipped".into(),
            tracking_number: Some("1Z999".into()),
            notes: None,
        },
    )
    .await
    .unwrap();

    let result = order_service::cancel_order(&state, &user, order.id).await;
    match result {
        Err(AppError::BadRequest(message)) => {
            assert_eq!(message, "Order cannot be cancelled at this stage")
        }
        _ => panic!("expected bad request"),
    }
    assert_eq!(common::stock_of(&state, product.id).await, 9);
}

#[tokio::test]
async fn orders_are_private_to_owner_and_admin() {
    let Some(state) = common::db_state().await else { return };
    let owner = common::create_user(&state, Role::User).await;
    let stranger = common::create_user(&state, Role::User).await;
    let admin = common::create_user(&state, Role::Admin).await;
    let product = common::create_product(&state, 100, 3).await;
    let order = place(&state, &owner, order_request(&[(product.id, 1)])).await;

    assert!(order_service::get_order(&state, &owner, order.id).await.is_ok());
    assert!(order_service::get_order(&state, &admin, order.id).await.is_ok());
    assert!(matches!(
        order_service::get_order(&state, &stranger, order.id).await,
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        order_service::cancel_order(&state, &stranger, order.id).await,
        Err(AppError::Forbidden(_))
    ));

    let mine = order_service::my_orders(&state, &owner, Pagination::default())
        .await
        .unwrap();
    assert_eq!(mine.data.unwrap().items.len(), 1);
    assert_eq!(mine.meta.unwrap().total, Some(1));
    let theirs = order_service::my_orders(&state, &stranger, Pagination::default())
        .await
        .unwrap();
    assert!(theirs.data.unwrap().items.is_empty());
}

#[tokio::test]
async fn same_day_numbers_are_sequential() {
    let Some(state) = common::db_state().await else { return };
    // A day nobody else uses, and the transaction is rolled back anyway.
    let year = 2200 + (Uuid::new_v4().as_u128() % 700) as i32;
    let day = NaiveDate::from_ymd_opt(year, 6, 15).unwrap();
    let yy = format!("{:02}", year % 100);

    let txn = state.orm.begin().await.unwrap();
    let first = order_service::next_order_number(&txn, day).await.unwrap();
    let second = order_service::next_order_number(&txn, day).await.unwrap();
    txn.rollback().await.unwrap();

    assert_eq!(first, format!("SS{yy}06150001"));
    assert_eq!(second, format!("SS{yy}06150002"));
}

#[tokio::test]
async fn consecutive_orders_get_distinct_numbers() {
    let Some(state) = common::db_state().await else { return };
    let user = common::create_user(&state, Role::User).await;
    let product = common::create_product(&state, 100, 10).await;

    let first = place(&state, &user, order_request(&[(product.id, 1)])).await;
    let second = place(&state, &user, order_request(&[(product.id, 1)])).await;

    assert_ne!(first.order_number, second.order_number);
    assert_eq!(first.order_number[..8], second.order_number[..8]);
    let seq = |n: &str| n[8..].parse::<u32>().unwrap();
    assert!(seq(&second.order_number) > seq(&first.order_number));
}

#[tokio::test]
async fn admin_status_updates_follow_transitions() {
    let Some(state) = common::db_state().await else { return };
    let user = common::create_user(&state, Role::User).await;
    let admin = common::create_user(&state, Role::Admin).await;
    let product = common::create_product(&state, 100, 10).await;
    let order = place(&state, &user, order_request(&[(product.id, 1)])).await;

    let as_user = admin_service::mark_order_delivered(&state, &user, order.id).await;
    assert!(matches!(as_user, Err(AppError::Forbidden(_))));

    let paid = admin_service::mark_order_paid(&state, &admin, order.id, MarkPaidRequest::default())
        .await
        .unwrap()
        .data
        .unwrap();
    assert!(paid.is_paid);
    assert_eq!(paid.status, "processing");
    assert!(matches!(
        admin_service::mark_order_paid(&state, &admin, order.id, MarkPaidRequest::default()).await,
        Err(AppError::BadRequest(_))
    ));

    let delivered = admin_service::mark_order_delivered(&state, &admin, order.id)
        .await
        .unwrap()
        .data
        .unwrap();
    assert_eq!(delivered.status, "delivered");
    assert!(delivered.is_delivered);
    assert!(delivered.delivered_at.is_some());

    let back = admin_service::update_order_status(
        &state,
        &admin,
        order.id,
        UpdateOrderStatusRequest {
            status: "pending".into(),
            tracking_number: None,
            notes: None,
        },
    )
    .await;
    assert!(matches!(back, Err(AppError::BadRequest(_))));

    let refunded = admin_service::update_order_status(
        &state,
        &admin,
        order.id,
        UpdateOrderStatusRequest {
            status: "refunded".into(),
            tracking_number: None,
            notes: Some("Customer returned the item".into()),
        },
    )
    .await
    .unwrap()
    .data
    .unwrap();
    assert_eq!(refunded.status, "refunded");
    assert_eq!(refunded.notes.as_deref(), Some("Customer returned the item"));
}

#[tokio::test]
async fn stats_are_admin_only() {
    let Some(state) = common::db_state().await else { return };
    let user = common::create_user(&state, Role::User).await;
    let admin = common::create_user(&state, Role::Admin).await;

    assert!(matches!(
        admin_service::order_stats(&state, &user).await,
        Err(AppError::Forbidden(_))
    ));

    let product = common::create_product(&state, 1500, 5).await;
    place(&state, &user, order_request(&[(product.id, 2)])).await;

    let stats = admin_service::order_stats(&state, &admin).await.unwrap().data.unwrap();
    assert!(stats.total_orders >= 1);
    assert!(stats.total_revenue >= 3000);
    assert!(stats.avg_order_value > 0.0);
    for entry in &stats.status_breakdown {
        assert!(entry.status.parse::<OrderStatus>().is_ok(), "{}", entry.status);
        assert!(entry.count > 0);
    }
}
