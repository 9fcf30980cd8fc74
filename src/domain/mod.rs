//! Storefront rules that do not touch the database.

pub mod cart;
pub mod category;
pub mod numbering;
pub mod order_status;
pub mod payment_method;
pub mod role;
pub mod shipping;
pub mod totals;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
