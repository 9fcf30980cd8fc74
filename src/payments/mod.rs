//! Stripe, reached over its REST API.

pub mod stripe;
pub mod webhook;

pub use stripe::{CreatePaymentIntent, Customer, NewCustomer, PaymentIntent, SetupIntent, StripeClient};
pub use webhook::{Event, EventKind};

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("payments are not configured: {0}")]
    NotConfigured(&'static str),

    #[error("invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("invalid webhook payload: {0}")]
    InvalidPayload(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("stripe returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
