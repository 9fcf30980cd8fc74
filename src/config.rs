use std::env;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_expires_in_hours: i64,
    pub cors_origin: Option<String>,
    pub stripe: StripeConfig,
}

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub api_base: String,
    pub currency: String,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            webhook_secret: None,
            api_base: "https://api.stripe.com".to_string(),
            currency: "usd".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_expires_in_hours = env::var("JWT_EXPIRES_IN_HOURS")
            .ok()
            .and_then(|h| h.parse::<i64>().ok())
            .filter(|h| *h > 0)
            .unwrap_or(24);

        let defaults = StripeConfig::default();
        let stripe = StripeConfig {
            secret_key: non_empty_var("STRIPE_SECRET_KEY"),
            webhook_secret: non_empty_var("STRIPE_WEBHOOK_SECRET"),
            api_base: non_empty_var("STRIPE_API_BASE").unwrap_or(defaults.api_base),
            currency: non_empty_var("PAYMENT_CURRENCY")
                .map(|c| c.to_lowercase())
                .unwrap_or(defaults.currency),
        };

        if stripe.secret_key.is_none() {
            tracing::warn!("STRIPE_SECRET_KEY is not set; payment intents are disabled");
        }
        if stripe.webhook_secret.is_none() {
            tracing::warn!("STRIPE_WEBHOOK_SECRET is not set; webhooks will be rejected");
        }

        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            jwt_expires_in_hours,
            cors_origin: non_empty_var("CORS_ORIGIN"),
            stripe,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
