use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use super::{PaymentError, stripe::PaymentIntent};

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Charge {
    pub id: String,
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    PaymentIntentSucceeded(PaymentIntent),
    PaymentIntentFailed(PaymentIntent),
    ChargeSucceeded(Charge),
    ChargeFailed(Charge),
    Unhandled(String),
}

impl Event {
    pub fn kind(&self) -> Result<EventKind, PaymentError> {
        let object = || self.data.object.clone();
        Ok(match self.event_type.as_str() {
            "payment_intent.succeeded" => {
                EventKind::PaymentIntentSucceeded(serde_json::from_value(object())?)
            }
            "payment_intent.payment_failed" => {
                EventKind::PaymentIntentFailed(serde_json::from_value(object())?)
            }
            "charge.succeeded" => EventKind::ChargeSucceeded(serde_json::from_value(object())?),
            "charge.failed" => EventKind::ChargeFailed(serde_json::from_value(object())?),
            other => EventKind::Unhandled(other.to_string()),
        })
    }
}

/// Hex HMAC-SHA256 of `"{timestamp}.{payload}"`, as Stripe puts in `v1=`.
pub fn compute_signature(
    payload: &[u8],
    secret: &str,
    timestamp: i64,
) -> Result<String, PaymentError> {
    let mac = new_mac(secret, timestamp, payload)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn new_mac(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, PaymentError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .map_err(|err| PaymentError::InvalidSignature(format!("signing secret: {err}")))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Check a `Stripe-Signature` header (`t=...,v1=...[,v1=...]`).
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), PaymentError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| PaymentError::InvalidSignature("missing timestamp".into()))?;
    if signatures.is_empty() {
        return Err(PaymentError::InvalidSignature("no v1 signature".into()));
    }
    if (now - timestamp).abs() > tolerance_secs {
        return Err(PaymentError::InvalidSignature(
            "timestamp outside tolerance".into(),
        ));
    }

    let mut matched = false;
    for sig in signatures {
        let Ok(bytes) = hex::decode(sig) else { continue };
        if new_mac(secret, timestamp, payload)?.verify_slice(&bytes).is_ok() {
            matched = true;
            break;
        }
    }
    if matched {
        Ok(())
    } else {
        Err(PaymentError::InvalidSignature("signature mismatch".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const NOW: i64 = 1_735_689_600;

    fn header_for(payload: &[u8], ts: i64) -> String {
        format!("t={},v1={}", ts, compute_signature(payload, SECRET, ts).unwrap())
    }

    #[test]
    fn accepts_valid_signature() {
        let payload = br#"{"id":"evt_1"}"#;
        assert!(verify_signature(payload, &header_for(payload, NOW), SECRET, NOW, 300).is_ok());
    }

    #[test]
    fn accepts_any_matching_v1_entry() {
        let payload = b"{}";
        let header = format!("t={NOW},v1=deadbeef,v1={}", compute_signature(payload, SECRET, NOW).unwrap());
        assert!(verify_signature(payload, &header, SECRET, NOW, 300).is_ok());
    }

    #[test]
    fn rejects_tampered_payload() {
        let header = header_for(b"{\"amount\":1}", NOW);
        let err = verify_signature(b"{\"amount\":2}", &header, SECRET, NOW, 300).unwrap_err();
        assert!(matches!(err, PaymentError::InvalidSignature(_)));
    }

    #[test]
    fn rejects_wrong_secret() {
        let payload = b"{}";
        let header = header_for(payload, NOW);
        assert!(verify_signature(payload, &header, "whsec_other", NOW, 300).is_err());
    }

    #[test]
    fn rejects_stale_timestamp() {
        let payload = b"{}";
        let header = header_for(payload, NOW - 301);
        assert!(verify_signature(payload, &header, SECRET, NOW, 300).is_err());
    }

    #[test]
    fn rejects_malformed_header() {
        assert!(verify_signature(b"{}", "garbage", SECRET, NOW, 300).is_err());
        assert!(verify_signature(b"{}", &format!("t={NOW}"), SECRET, NOW, 300).is_err());
    }

    #[test]
    fn event_kind_dispatch() {
        let event: Event = serde_json::from_value(serde_json::json!({
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": { "object": { "id": "pi_1", "status": "succeeded", "amount": 500, "metadata": {} } }
        }))
        .unwrap();
        match event.kind().unwrap() {
            EventKind::PaymentIntentSucceeded(pi) => assert_eq!(pi.amount, 500),
            other => panic!("unexpected {other:?}"),
        }

        let event: Event = serde_json::from_value(serde_json::json!({
            "id": "evt_2",
            "type": "customer.created",
            "data": { "object": {} }
        }))
        .unwrap();
        assert_eq!(event.kind().unwrap(), EventKind::Unhandled("customer.created".into()));
    }
}
