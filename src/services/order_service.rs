use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, Statement, TransactionTrait,
    sea_query::{Expr, LockType},
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{
        ParseEnumError, numbering::format_order_number, order_status::OrderStatus,
        payment_method::PaymentMethod, totals::OrderTotals,
    },
    dto::orders::{CreateOrderRequest, OrderList},
    entity::{
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, LineItems,
            Model as OrderModel,
        },
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Status of a persisted order. Rows only ever hold known statuses, so a
/// parse failure is an internal error.
pub(crate) fn stored_status(order: &OrderModel) -> AppResult<OrderStatus> {
    order
        .status
        .parse()
        .map_err(|err: ParseEnumError| AppError::Internal(anyhow::anyhow!(err)))
}

const NEXT_ORDER_COUNTER: &str = r#"
    INSERT INTO order_counters (day, value)
    VALUES ($1, 1)
    ON CONFLICT (day) DO UPDATE SET value = order_counters.value + 1
    RETURNING value
"#;

/// Reserve the next order number for `day`. Run it inside the transaction
/// that inserts the order so an aborted checkout does not burn a number.
pub async fn next_order_number<C: ConnectionTrait>(db: &C, day: NaiveDate) -> AppResult<String> {
    let row = db
        .query_one(Statement::from_sql_and_values(
            DbBackend::Postgres,
            NEXT_ORDER_COUNTER,
            [day.into()],
        ))
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("order counter returned no row")))?;

    let value: i32 = row.try_get("", "value")?;
    let seq = u32::try_from(value)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("negative order counter {value}")))?;
    Ok(format_order_number(day, seq))
}

fn insufficient_stock(name: &str) -> AppError {
    AppError::BadRequest(format!("Insufficient stock for {name}"))
}

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("No order items".into()));
    }
    if payload.items.iter().any(|item| item.quantity < 1) {
        return Err(AppError::BadRequest("Quantity must be at least 1".into()));
    }
    let tax_price = payload.tax_price.unwrap_or(0);
    let shipping_price = payload.shipping_price.unwrap_or(0);
    if tax_price < 0 || shipping_price < 0 {
        return Err(AppError::BadRequest("Prices cannot be negative".into()));
    }
    let payment_method: PaymentMethod = payload
        .payment_method
        .parse()
        .map_err(|err: ParseEnumError| AppError::BadRequest(err.to_string()))?;
    let shipping_address = payload
        .shipping_address
        .complete()
        .map_err(|err| AppError::BadRequest(err.to_string()))?;

    // Dropping the transaction on any early return rolls back the stock
    // already taken for earlier lines.
    let txn = state.orm.begin().await?;

    let mut items = Vec::with_capacity(payload.items.len());
    for requested in &payload.items {
        let product = Products::find_by_id(requested.product)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Product not found: {}", requested.product))
            })?;

        if !product.is_in_stock(requested.quantity) {
            return Err(insufficient_stock(&product.name));
        }

        let taken = Products::update_many()
            .col_expr(
                ProdCol::Stock,
                Expr::col(ProdCol::Stock).sub(requested.quantity),
            )
            .col_expr(ProdCol::UpdatedAt, Expr::value(Utc::now()))
            .filter(ProdCol::Id.eq(product.id))
            .filter(ProdCol::Stock.gte(requested.quantity))
            .filter(ProdCol::IsActive.eq(true))
            .exec(&txn)
            .await?;
        if taken.rows_affected == 0 {
            return Err(insufficient_stock(&product.name));
        }

        items.push(OrderItem {
            product: product.id,
            name: product.name,
            price: product.price,
            quantity: requested.quantity,
            image: product.image,
            sku: product.sku,
        });
    }

    let totals = OrderTotals::compute(
        items.iter().map(|item| (item.price, item.quantity)),
        tax_price,
        shipping_price,
    )
    .map_err(|err| AppError::BadRequest(err.to_string()))?;

    let order_number = next_order_number(&txn, Utc::now().date_naive()).await?;

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        order_number: Set(order_number),
        user_id: Set(user.user_id),
        items: Set(LineItems(items)),
        shipping_address: Set(shipping_address),
        payment_method: Set(payment_method.to_string()),
        payment_result: Set(None),
        items_price: Set(totals.items_price),
        tax_price: Set(totals.tax_price),
        shipping_price: Set(totals.shipping_price),
        total_price: Set(totals.total_price),
        status: Set(OrderStatus::Pending.to_string()),
        is_paid: Set(false),
        paid_at: Set(None),
        is_delivered: Set(false),
        delivered_at: Set(None),
        tracking_number: Set(None),
        notes: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        order_number = %order.order_number,
        total_price = order.total_price,
        "order created"
    );
    audit::record(
        state,
        Some(user.user_id),
        "order_create",
        "orders",
        serde_json::json!({ "order_id": order.id, "order_number": order.order_number }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order created successfully",
        order.into(),
        None,
    ))
}

pub async fn my_orders(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = pagination.normalize(DEFAULT_PAGE_SIZE);
    let finder = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by_desc(OrderCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    Ok(ApiResponse::success(
        "Orders",
        OrderList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_order(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<Order>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;

    if !user.can_access(order.user_id) {
        return Err(AppError::Forbidden("Not authorized to view this order".into()));
    }
    Ok(ApiResponse::success("Order", order.into(), None))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;

    if !user.can_access(order.user_id) {
        return Err(AppError::Forbidden("Not authorized to cancel this order".into()));
    }
    let status = stored_status(&order)?;
    if !status.can_cancel() {
        return Err(AppError::BadRequest(
            "Order cannot be cancelled at this stage".into(),
        ));
    }

    // Products deleted since the order was placed are skipped.
    for item in &order.items.0 {
        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(item.quantity))
            .col_expr(ProdCol::UpdatedAt, Expr::value(Utc::now()))
            .filter(ProdCol::Id.eq(item.product))
            .exec(&txn)
            .await?;
    }

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Cancelled.to_string());
    let order = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(order_id = %order.id, "order cancelled");
    audit::record(
        state,
        Some(user.user_id),
        "order_cancel",
        "orders",
        serde_json::json!({ "order_id": order.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order cancelled successfully",
        order.into(),
        None,
    ))
}
