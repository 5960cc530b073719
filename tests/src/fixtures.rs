//! Transaction fixtures for pipeline tests.

use uuid::Uuid;

/// A well-formed daytime USD transaction with a unique id.
pub fn tx(user_id: &str, amount: f64) -> serde_json::Value {
    serde_json::json!({
        "transactionId": Uuid::new_v4().to_string(),
        "userId": user_id,
        "amount": amount,
        "currency": "USD",
        "merchantId": "amazon",
        "occurredAt": "2026-03-01T12:00:00Z",
    })
}

/// Overrides the transaction id.
pub fn with_id(mut tx: serde_json::Value, id: &str) -> serde_json::Value {
    tx["transactionId"] = serde_json::json!(id);
    tx
}

/// Sets `occurredAt` to the given UTC hour.
pub fn with_hour(mut tx: serde_json::Value, hour: u32) -> serde_json::Value {
    tx["occurredAt"] = serde_json::json!(format!("2026-03-01T{hour:02}:00:00Z"));
    tx
}

pub fn with_currency(mut tx: serde_json::Value, currency: &str) -> serde_json::Value {
    tx["currency"] = serde_json::json!(currency);
    tx
}

pub fn with_device(mut tx: serde_json::Value, id: &str, ip: &str) -> serde_json::Value {
    tx["device"] = serde_json::json!({
        "id": id,
        "ip": ip,
        "userAgent": "Mozilla/5.0 (Test)",
    });
    tx
}

pub fn with_location(mut tx: serde_json::Value, lat: f64, lon: f64) -> serde_json::Value {
    tx["location"] = serde_json::json!({ "lat": lat, "lon": lon });
    tx
}

/// Drops the amount entirely.
pub fn without_amount(mut tx: serde_json::Value) -> serde_json::Value {
    tx.as_object_mut().unwrap().remove("amount");
    tx
}

/// A payload missing the required identity fields.
pub fn schema_invalid() -> serde_json::Value {
    serde_json::json!({ "amount": 50.0, "currency": "USD" })
}

/// New York City coordinates.
pub const NEW_YORK: (f64, f64) = (40.7128, -74.0060);
/// Tokyo coordinates.
pub const TOKYO: (f64, f64) = (35.6762, 139.6503);
