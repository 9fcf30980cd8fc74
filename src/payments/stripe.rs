use std::collections::HashMap;

use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use uuid::Uuid;

use super::{
    PaymentError,
    webhook::{self, Event},
};
use crate::config::StripeConfig;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PaymentIntent {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub amount: i64,
    pub client_secret: Option<String>,
    pub receipt_email: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentIntent {
    /// Order this intent was created for, from `metadata.orderId`.
    pub fn order_id(&self) -> Option<Uuid> {
        self.metadata
            .get("orderId")
            .and_then(|id| Uuid::parse_str(id).ok())
    }
}

#[derive(Debug)]
pub struct CreatePaymentIntent<'a> {
    pub amount: i64,
    pub currency: &'a str,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub description: String,
}

impl CreatePaymentIntent<'_> {
    fn form(&self) -> Vec<(&'static str, String)> {
        vec![
            ("amount", self.amount.to_string()),
            ("currency", self.currency.to_string()),
            ("metadata[orderId]", self.order_id.to_string()),
            ("metadata[userId]", self.user_id.to_string()),
            ("description", self.description.clone()),
        ]
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Customer {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug)]
pub struct NewCustomer<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub user_id: Uuid,
}

impl NewCustomer<'_> {
    fn form(&self) -> Vec<(&'static str, String)> {
        vec![
            ("email", self.email.to_string()),
            ("name", self.name.to_string()),
            ("metadata[userId]", self.user_id.to_string()),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetupIntent {
    pub id: String,
    pub client_secret: Option<String>,
}

fn setup_intent_form(customer_id: &str) -> Vec<(&'static str, String)> {
    vec![
        ("customer", customer_id.to_string()),
        ("payment_method_types[]", "card".to_string()),
        ("usage", "off_session".to_string()),
    ]
}

#[derive(Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    api_base: String,
    secret_key: Option<String>,
    webhook_secret: Option<String>,
    currency: String,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            client: Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
            currency: config.currency.clone(),
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub async fn create_payment_intent(
        &self,
        params: &CreatePaymentIntent<'_>,
    ) -> Result<PaymentIntent, PaymentError> {
        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(self.secret_key()?)
            .form(&params.form())
            .send()
            .await?;
        read_json(response).await
    }

    /// Raw intent object, passed through to the caller unchanged.
    pub async fn retrieve_payment_intent(
        &self,
        id: &str,
    ) -> Result<serde_json::Value, PaymentError> {
        let response = self
            .client
            .get(format!("{}/v1/payment_intents/{}", self.api_base, id))
            .bearer_auth(self.secret_key()?)
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Customer>, PaymentError> {
        let response = self
            .client
            .get(format!("{}/v1/customers", self.api_base))
            .bearer_auth(self.secret_key()?)
            .query(&[("email", email), ("limit", "1")])
            .send()
            .await?;
        let list: ListResponse<Customer> = read_json(response).await?;
        Ok(list.data.into_iter().next())
    }

    pub async fn create_customer(&self, params: &NewCustomer<'_>) -> Result<Customer, PaymentError> {
        let response = self
            .client
            .post(format!("{}/v1/customers", self.api_base))
            .bearer_auth(self.secret_key()?)
            .form(&params.form())
            .send()
            .await?;
        read_json(response).await
    }

    /// Saved cards of a customer, as raw Stripe objects.
    pub async fn list_card_payment_methods(
        &self,
        customer_id: &str,
    ) -> Result<Vec<serde_json::Value>, PaymentError> {
        let response = self
            .client
            .get(format!("{}/v1/payment_methods", self.api_base))
            .bearer_auth(self.secret_key()?)
            .query(&[("customer", customer_id), ("type", "card")])
            .send()
            .await?;
        let list: ListResponse<serde_json::Value> = read_json(response).await?;
        Ok(list.data)
    }

    pub async fn create_setup_intent(&self, customer_id: &str) -> Result<SetupIntent, PaymentError> {
        let response = self
            .client
            .post(format!("{}/v1/setup_intents", self.api_base))
            .bearer_auth(self.secret_key()?)
            .form(&setup_intent_form(customer_id))
            .send()
            .await?;
        read_json(response).await
    }

    /// Verify a webhook delivery against the configured signing secret and
    /// parse it.
    pub fn construct_event(&self, payload: &[u8], signature: &str) -> Result<Event, PaymentError> {
        let secret = self
            .webhook_secret
            .as_deref()
            .ok_or(PaymentError::NotConfigured("STRIPE_WEBHOOK_SECRET"))?;
        webhook::verify_signature(
            payload,
            signature,
            secret,
            Utc::now().timestamp(),
            webhook::DEFAULT_TOLERANCE_SECS,
        )?;
        serde_json::from_slice(payload).map_err(|err| PaymentError::InvalidPayload(err.to_string()))
    }

    fn secret_key(&self) -> Result<&str, PaymentError> {
        self.secret_key
            .as_deref()
            .ok_or(PaymentError::NotConfigured("STRIPE_SECRET_KEY"))
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, PaymentError> {
    let status = response.status();
    let body = response.bytes().await?;
    if !status.is_success() {
        let message = serde_json::from_slice::<StripeErrorBody>(&body)
            .ok()
            .and_then(|b| b.error.message)
            .unwrap_or_else(|| status.to_string());
        return Err(PaymentError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(serde_json::from_slice(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_metadata_carries_order_id() {
        let order_id = Uuid::new_v4();
        let intent: PaymentIntent = serde_json::from_value(serde_json::json!({
            "id": "pi_123",
            "status": "succeeded",
            "amount": 2699,
            "client_secret": "pi_123_secret",
            "metadata": { "orderId": order_id.to_string(), "userId": "u" }
        }))
        .unwrap();
        assert_eq!(intent.order_id(), Some(order_id));
    }

    #[test]
    fn missing_or_bad_order_id_is_none() {
        let intent: PaymentIntent =
            serde_json::from_value(serde_json::json!({ "id": "pi_1", "metadata": { "orderId": "nope" } }))
                .unwrap();
        assert_eq!(intent.order_id(), None);
    }

    #[test]
    fn create_form_uses_bracketed_metadata() {
        let params = CreatePaymentIntent {
            amount: 2699,
            currency: "usd",
            order_id: Uuid::nil(),
            user_id: Uuid::nil(),
            description: "Payment for order SS2501010001".into(),
        };
        let form = params.form();
        assert!(form.contains(&("amount", "2699".to_string())));
        assert!(form.contains(&("metadata[orderId]", Uuid::nil().to_string())));
    }

    #[test]
    fn customer_and_setup_forms() {
        let user_id = Uuid::new_v4();
        let customer = NewCustomer {
            email: "buyer@example.com",
            name: "Buyer",
            user_id,
        };
        assert!(customer.form().contains(&("metadata[userId]", user_id.to_string())));

        let form = setup_intent_form("cus_123");
        assert_eq!(form[0], ("customer", "cus_123".to_string()));
        assert!(form.contains(&("payment_method_types[]", "card".to_string())));
        assert!(form.contains(&("usage", "off_session".to_string())));
    }

    #[test]
    fn customer_list_takes_first_entry() {
        let list: ListResponse<Customer> = serde_json::from_value(serde_json::json!({
            "object": "list",
            "data": [{ "id": "cus_1", "email": "a@example.com" }],
            "has_more": false
        }))
        .unwrap();
        assert_eq!(list.data.into_iter().next().map(|c| c.id).as_deref(), Some("cus_1"));
    }

    #[test]
    fn signed_garbage_is_an_invalid_payload() {
        let client = StripeClient::new(&StripeConfig {
            webhook_secret: Some("whsec_unit".into()),
            ..StripeConfig::default()
        });
        let now = Utc::now().timestamp();
        let header = format!(
            "t={now},v1={}",
            webhook::compute_signature(b"not json", "whsec_unit", now).unwrap()
        );
        assert!(matches!(
            client.construct_event(b"not json", &header),
            Err(PaymentError::InvalidPayload(_))
        ));
    }

    #[test]
    fn unconfigured_client_refuses_calls() {
        let client = StripeClient::new(&StripeConfig::default());
        assert!(matches!(
            client.construct_event(b"{}", "t=1,v1=00"),
            Err(PaymentError::NotConfigured(_))
        ));
    }
}
