use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, EntityTrait, QuerySelect, Set, TransactionTrait, sea_query::LockType,
};

use crate::{
    audit,
    domain::{order_status::OrderStatus, payment_method::PaymentMethod},
    dto::payments::{
        CreatePaymentIntentRequest, CreateSetupIntentRequest, PaymentIntentResponse,
        PaymentMethodsResponse, SetupIntentResponse, WebhookAck,
    },
    entity::{
        Users,
        orders::{ActiveModel as OrderActive, Entity as Orders},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::PaymentResult,
    payments::{
        CreatePaymentIntent, Customer, Event, EventKind, NewCustomer, PaymentError, PaymentIntent,
    },
    response::ApiResponse,
    services::order_service::stored_status,
    state::AppState,
};

pub async fn create_payment_intent(
    state: &AppState,
    user: &AuthUser,
    payload: CreatePaymentIntentRequest,
) -> AppResult<ApiResponse<PaymentIntentResponse>> {
    let order = Orders::find_by_id(payload.order_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;

    if order.user_id != user.user_id {
        return Err(AppError::Forbidden(
            "Not authorized to pay for this order".into(),
        ));
    }
    if order.is_paid {
        return Err(AppError::BadRequest("Order is already paid".into()));
    }
    if order.total_price <= 0 {
        return Err(AppError::BadRequest("Order total must be positive".into()));
    }

    let intent = state
        .payments
        .create_payment_intent(&CreatePaymentIntent {
            amount: order.total_price,
            currency: state.payments.currency(),
            order_id: order.id,
            user_id: user.user_id,
            description: format!("Payment for order {}", order.order_number),
        })
        .await?;

    let client_secret = intent.client_secret.ok_or_else(|| {
        AppError::Payment(PaymentError::Api {
            status: 200,
            message: "payment intent has no client secret".into(),
        })
    })?;

    tracing::info!(order_id = %order.id, intent_id = %intent.id, "payment intent created");

    Ok(ApiResponse::success(
        "Payment intent created",
        PaymentIntentResponse {
            client_secret,
            order_id: order.id,
            amount: order.total_price,
        },
        None,
    ))
}

pub async fn get_payment_intent(
    state: &AppState,
    id: &str,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let intent = state.payments.retrieve_payment_intent(id).await?;
    Ok(ApiResponse::success("Payment intent", intent, None))
}

/// Stripe customer for the caller, matched by email and created on first use.
async fn customer_for(state: &AppState, user: &AuthUser) -> AppResult<Customer> {
    if let Some(customer) = state.payments.find_customer_by_email(&user.email).await? {
        return Ok(customer);
    }
    let profile = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    let customer = state
        .payments
        .create_customer(&NewCustomer {
            email: &profile.email,
            name: &profile.name,
            user_id: profile.id,
        })
        .await?;
    tracing::info!(user_id = %profile.id, customer_id = %customer.id, "stripe customer created");
    Ok(customer)
}

pub async fn payment_methods(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<PaymentMethodsResponse>> {
    let customer = customer_for(state, user).await?;
    let payment_methods = state.payments.list_card_payment_methods(&customer.id).await?;
    Ok(ApiResponse::success(
        "Payment methods",
        PaymentMethodsResponse {
            customer: customer.id,
            payment_methods,
        },
        None,
    ))
}

pub async fn create_setup_intent(
    state: &AppState,
    user: &AuthUser,
    payload: CreateSetupIntentRequest,
) -> AppResult<ApiResponse<SetupIntentResponse>> {
    let customer = customer_for(state, user).await?;
    if payload
        .customer_id
        .as_deref()
        .is_some_and(|requested| requested != customer.id)
    {
        return Err(AppError::Forbidden(
            "Not authorized to use this customer".into(),
        ));
    }

    let intent = state.payments.create_setup_intent(&customer.id).await?;
    let client_secret = intent.client_secret.ok_or_else(|| {
        AppError::Payment(PaymentError::Api {
            status: 200,
            message: "setup intent has no client secret".into(),
        })
    })?;

    Ok(ApiResponse::success(
        "Setup intent created",
        SetupIntentResponse { client_secret },
        None,
    ))
}

fn payment_result(intent: &PaymentIntent) -> PaymentResult {
    PaymentResult {
        id: Some(intent.id.clone()),
        status: Some(intent.status.clone()),
        update_time: Some(Utc::now().to_rfc3339()),
        email_address: intent.receipt_email.clone(),
    }
}

/// Verify and apply a Stripe webhook delivery. Verification failures are
/// returned as errors; everything after that is acknowledged.
pub async fn handle_webhook(
    state: &AppState,
    payload: &[u8],
    signature: &str,
) -> AppResult<WebhookAck> {
    let event = state.payments.construct_event(payload, signature)?;
    handle_event(state, event).await?;
    Ok(WebhookAck { received: true })
}

pub async fn handle_event(state: &AppState, event: Event) -> AppResult<()> {
    let kind = match event.kind() {
        Ok(kind) => kind,
        Err(err) => {
            tracing::warn!(event_id = %event.id, event_type = %event.event_type, error = %err, "unreadable webhook event");
            return Ok(());
        }
    };

    match kind {
        EventKind::PaymentIntentSucceeded(intent) => payment_succeeded(state, &intent).await,
        EventKind::PaymentIntentFailed(intent) => payment_failed(state, &intent).await,
        EventKind::ChargeSucceeded(charge) => {
            tracing::info!(charge_id = %charge.id, "charge succeeded");
            Ok(())
        }
        EventKind::ChargeFailed(charge) => {
            tracing::warn!(charge_id = %charge.id, "charge failed");
            Ok(())
        }
        EventKind::Unhandled(event_type) => {
            tracing::debug!(event_type = %event_type, "unhandled webhook event");
            Ok(())
        }
    }
}

async fn payment_succeeded(state: &AppState, intent: &PaymentIntent) -> AppResult<()> {
    let Some(order_id) = intent.order_id() else {
        tracing::warn!(intent_id = %intent.id, "payment intent without order metadata");
        return Ok(());
    };

    let txn = state.orm.begin().await?;
    let Some(order) = Orders::find_by_id(order_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
    else {
        tracing::warn!(%order_id, intent_id = %intent.id, "payment for unknown order");
        return Ok(());
    };

    if order.is_paid {
        tracing::info!(%order_id, intent_id = %intent.id, "order already paid, ignoring redelivery");
        return Ok(());
    }
    let current = stored_status(&order)?;

    let mut active: OrderActive = order.into();
    active.payment_result = Set(Some(payment_result(intent)));
    if current.is_terminal() {
        // Closed orders keep their status; only the charge is recorded.
        active.update(&txn).await?;
        txn.commit().await?;
        tracing::warn!(%order_id, intent_id = %intent.id, status = %current, "payment for closed order");
        return Ok(());
    }

    active.is_paid = Set(true);
    active.paid_at = Set(Some(Utc::now().into()));
    active.payment_method = Set(PaymentMethod::Stripe.to_string());
    if current == OrderStatus::Pending {
        active.status = Set(OrderStatus::Processing.to_string());
    }
    active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(%order_id, intent_id = %intent.id, "order paid");
    audit::record(
        state,
        None,
        "order_paid",
        "orders",
        serde_json::json!({ "order_id": order_id, "payment_intent": intent.id }),
    )
    .await;
    Ok(())
}

async fn payment_failed(state: &AppState, intent: &PaymentIntent) -> AppResult<()> {
    let Some(order_id) = intent.order_id() else {
        tracing::warn!(intent_id = %intent.id, "payment intent without order metadata");
        return Ok(());
    };

    let Some(order) = Orders::find_by_id(order_id).one(&state.orm).await? else {
        tracing::warn!(%order_id, intent_id = %intent.id, "failed payment for unknown order");
        return Ok(());
    };
    if order.is_paid {
        tracing::info!(%order_id, intent_id = %intent.id, "failed payment for paid order, ignoring");
        return Ok(());
    }

    let mut active: OrderActive = order.into();
    active.payment_result = Set(Some(payment_result(intent)));
    active.update(&state.orm).await?;

    tracing::warn!(%order_id, intent_id = %intent.id, "payment failed");
    Ok(())
}
