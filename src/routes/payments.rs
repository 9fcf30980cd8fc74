use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
};

use crate::{
    dto::payments::{
        CreatePaymentIntentRequest, CreateSetupIntentRequest, PaymentIntentResponse,
        PaymentMethodsResponse, SetupIntentResponse, WebhookAck,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    payments::PaymentError,
    response::ApiResponse,
    services::payment_service,
    state::AppState,
};

pub const SIGNATURE_HEADER: &str = "stripe-signature";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create-payment-intent", post(create_payment_intent))
        .route("/payment-intent/{id}", get(get_payment_intent))
        .route("/payment-methods", get(payment_methods))
        .route("/setup-intent", post(create_setup_intent))
        .route("/webhook", post(webhook))
}

#[utoipa::path(
    post,
    path = "/api/payments/create-payment-intent",
    request_body = CreatePaymentIntentRequest,
    responses(
        (status = 200, description = "Stripe client secret for the order", body = ApiResponse<PaymentIntentResponse>),
        (status = 400, description = "Order is already paid"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Order not found"),
        (status = 502, description = "Stripe request failed")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreatePaymentIntentRequest>,
) -> AppResult<Json<ApiResponse<PaymentIntentResponse>>> {
    let resp = payment_service::create_payment_intent(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/payments/payment-intent/{id}",
    params(
        ("id" = String, Path, description = "Stripe payment intent ID")
    ),
    responses(
        (status = 200, description = "Payment intent as returned by Stripe"),
        (status = 502, description = "Stripe request failed")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn get_payment_intent(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = payment_service::get_payment_intent(&state, &id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/payments/payment-methods",
    responses(
        (status = 200, description = "Saved cards of the caller's Stripe customer", body = ApiResponse<PaymentMethodsResponse>),
        (status = 502, description = "Stripe request failed")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn payment_methods(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<PaymentMethodsResponse>>> {
    let resp = payment_service::payment_methods(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payments/setup-intent",
    request_body = CreateSetupIntentRequest,
    responses(
        (status = 200, description = "Setup intent for saving a card", body = ApiResponse<SetupIntentResponse>),
        (status = 403, description = "Customer belongs to another user"),
        (status = 502, description = "Stripe request failed")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn create_setup_intent(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Option<Json<CreateSetupIntentRequest>>,
) -> AppResult<Json<ApiResponse<SetupIntentResponse>>> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let resp = payment_service::create_setup_intent(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payments/webhook",
    request_body(content = String, description = "Raw Stripe event payload", content_type = "application/json"),
    params(
        ("Stripe-Signature" = String, Header, description = "t=<timestamp>,v1=<hex hmac>")
    ),
    responses(
        (status = 200, description = "Event acknowledged", body = WebhookAck),
        (status = 400, description = "Signature verification failed or payload is not an event")
    ),
    tag = "Payments"
)]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<WebhookAck>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    match payment_service::handle_webhook(&state, &body, signature).await {
        Ok(ack) => Ok(Json(ack)),
        Err(err @ AppError::Payment(PaymentError::InvalidSignature(_))) => {
            tracing::warn!(error = ?err, "webhook signature verification failed");
            Err(err)
        }
        Err(err @ AppError::Payment(PaymentError::InvalidPayload(_))) => {
            tracing::warn!(error = ?err, "webhook payload rejected");
            Err(err)
        }
        Err(err) => Err(err),
    }
}
