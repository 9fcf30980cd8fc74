use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

pub const PLACEHOLDER_FIRST_NAME: &str = "Test";
pub const PLACEHOLDER_LAST_NAME: &str = "User";
pub const PLACEHOLDER_PHONE: &str = "123-456-7890";
pub const DEFAULT_COUNTRY: &str = "US";

/// Shipping address as stored on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, FromJsonQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub phone: String,
}

/// Shipping address as submitted at checkout; every field may be absent.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddressInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Shipping address {0} is required")]
pub struct MissingAddressField(pub &'static str);

impl ShippingAddressInput {
    /// Street, city, state and zip code are mandatory. Missing names and
    /// phone are filled with placeholders and a missing country defaults
    /// to the US.
    pub fn complete(self) -> Result<ShippingAddress, MissingAddressField> {
        Ok(ShippingAddress {
            first_name: or_default(self.first_name, PLACEHOLDER_FIRST_NAME),
            last_name: or_default(self.last_name, PLACEHOLDER_LAST_NAME),
            address: required(self.address, "address")?,
            city: required(self.city, "city")?,
            state: required(self.state, "state")?,
            zip_code: required(self.zip_code, "zipCode")?,
            country: or_default(self.country, DEFAULT_COUNTRY),
            phone: or_default(self.phone, PLACEHOLDER_PHONE),
        })
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn or_default(value: Option<String>, default: &str) -> String {
    trimmed(value).unwrap_or_else(|| default.to_string())
}

fn required(value: Option<String>, field: &'static str) -> Result<String, MissingAddressField> {
    trimmed(value).ok_or(MissingAddressField(field))
}
