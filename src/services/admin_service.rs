use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::LockType,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{order_status::OrderStatus, ParseEnumError},
    dto::orders::{MarkPaidRequest, OrderList, OrderStats, StatusCount, UpdateOrderStatusRequest},
    entity::orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, PaymentResult},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, Pagination},
    services::order_service::stored_status,
    state::AppState,
};

pub const DEFAULT_PAGE_SIZE: i64 = 10;

fn parse_status(status: &str) -> AppResult<OrderStatus> {
    status
        .parse()
        .map_err(|err: ParseEnumError| AppError::BadRequest(err.to_string()))
}

async fn list_orders(
    state: &AppState,
    status: Option<OrderStatus>,
    pagination: &Pagination,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = pagination.normalize(DEFAULT_PAGE_SIZE);

    let mut condition = Condition::all();
    if let Some(status) = status {
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }
    let finder = Orders::find()
        .filter(condition)
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

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(parse_status)
        .transpose()?;
    list_orders(state, status, &query.pagination()).await
}

pub async fn orders_by_status(
    state: &AppState,
    user: &AuthUser,
    status: &str,
    pagination: Pagination,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let status = parse_status(status)?;
    list_orders(state, Some(status), &pagination).await
}

#[derive(sqlx::FromRow)]
struct TotalsRow {
    total_orders: i64,
    total_revenue: i64,
    avg_order_value: f64,
}

#[derive(sqlx::FromRow)]
struct StatusRow {
    status: String,
    count: i64,
}

pub async fn order_stats(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<OrderStats>> {
    ensure_admin(user)?;

    let totals = sqlx::query_as::<_, TotalsRow>(
        r#"
        SELECT COUNT(*)::BIGINT AS total_orders,
               COALESCE(SUM(total_price), 0)::BIGINT AS total_revenue,
               COALESCE(AVG(total_price), 0)::DOUBLE PRECISION AS avg_order_value
        FROM orders
        "#,
    )
    .fetch_one(&state.pool)
    .await?;

    let status_breakdown = sqlx::query_as::<_, StatusRow>(
        r#"
        SELECT status, COUNT(*)::BIGINT AS count
        FROM orders
        GROUP BY status
        ORDER BY status
        "#,
    )
    .fetch_all(&state.pool)
    .await?
    .into_iter()
    .map(|row| StatusCount {
        status: row.status,
        count: row.count,
    })
    .collect();

    Ok(ApiResponse::success(
        "Order stats",
        OrderStats {
            total_orders: totals.total_orders,
            total_revenue: totals.total_revenue,
            avg_order_value: totals.avg_order_value,
            status_breakdown,
        },
        None,
    ))
}

/// Apply an administrative status change to a loaded order.
pub(crate) fn apply_status(
    mut active: OrderActive,
    current: OrderStatus,
    next: OrderStatus,
) -> AppResult<OrderActive> {
    if !current.can_transition_to(next) {
        return Err(AppError::BadRequest(format!(
            "Cannot change order status from {current} to {next}"
        )));
    }
    active.status = Set(next.to_string());
    if next == OrderStatus::Delivered && current != OrderStatus::Delivered {
        active.is_delivered = Set(true);
        active.delivered_at = Set(Some(Utc::now().into()));
    }
    Ok(active)
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let next = parse_status(&payload.status)?;

    let txn = state.orm.begin().await?;
    let existing = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;
    let current = stored_status(&existing)?;

    let mut active = apply_status(existing.into(), current, next)?;
    if let Some(tracking_number) = payload.tracking_number.filter(|t| !t.trim().is_empty()) {
        active.tracking_number = Set(Some(tracking_number));
    }
    if let Some(notes) = payload.notes.filter(|n| !n.trim().is_empty()) {
        active.notes = Set(Some(notes));
    }
    let order = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(order_id = %order.id, from = %current, to = %next, "order status updated");
    audit::record(
        state,
        Some(user.user_id),
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": order.id, "from": current.as_str(), "to": next.as_str() }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order status updated successfully",
        order.into(),
        None,
    ))
}

pub async fn mark_order_paid(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: MarkPaidRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let existing = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;
    if existing.is_paid {
        return Err(AppError::BadRequest("Order is already paid".into()));
    }
    let current = stored_status(&existing)?;
    if current.is_terminal() {
        return Err(AppError::BadRequest(format!("Cannot pay a {current} order")));
    }

    let mut active: OrderActive = existing.into();
    active.is_paid = Set(true);
    active.paid_at = Set(Some(Utc::now().into()));
    active.payment_result = Set(Some(PaymentResult {
        id: payload.id,
        status: payload.status,
        update_time: payload.update_time,
        email_address: payload.email_address,
    }));
    if current == OrderStatus::Pending {
        active.status = Set(OrderStatus::Processing.to_string());
    }
    let order = active.update(&txn).await?;
    txn.commit().await?;

    audit::record(
        state,
        Some(user.user_id),
        "order_mark_paid",
        "orders",
        serde_json::json!({ "order_id": order.id }),
    )
    .await;

    Ok(ApiResponse::success("Order marked as paid", order.into(), None))
}

pub async fn mark_order_delivered(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let existing = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;
    let current = stored_status(&existing)?;

    let order = apply_status(existing.into(), current, OrderStatus::Delivered)?
        .update(&txn)
        .await?;
    txn.commit().await?;

    audit::record(
        state,
        Some(user.user_id),
        "order_deliver",
        "orders",
        serde_json::json!({ "order_id": order.id }),
    )
    .await;

    Ok(ApiResponse::success("Order marked as delivered", order.into(), None))
}

#[cfg(test)]
mod tests {
    use sea_orm::ActiveValue;

    use super::*;

    #[test]
    fn delivering_sets_flags() {
        let active = apply_status(
            <OrderActive as ActiveModelTrait>::default(),
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        )
        .unwrap();
        assert_eq!(active.status, ActiveValue::Set("delivered".to_string()));
        assert_eq!(active.is_delivered, ActiveValue::Set(true));
        assert!(matches!(active.delivered_at, ActiveValue::Set(Some(_))));
    }

    #[test]
    fn rejects_disallowed_transition() {
        let err = apply_status(
            <OrderActive as ActiveModelTrait>::default(),
            OrderStatus::Delivered,
            OrderStatus::Pending,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        assert!(apply_status(
            <OrderActive as ActiveModelTrait>::default(),
            OrderStatus::Pending,
            OrderStatus::Cancelled
        )
        .is_err());
    }
}
