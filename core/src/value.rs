use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A value a store can cache on behalf of a remote backend.
///
/// Decoding is total: [`from_payload`](StoreValue::from_payload) must produce a
/// usable value from whatever the backend sent, falling back to
/// [`Default`] when the payload is missing or malformed. Refreshing can then
/// never fail on a decode error, only degrade to the default.
pub trait StoreValue: Clone + Default + std::fmt::Debug + Send + Sync + 'static {
    /// Decode the `data` section of a backend envelope.
    fn from_payload(payload: Option<&Value>) -> Self;

    /// Clamp the value into its legal range. Applied on every store write.
    fn sanitize(self) -> Self { self }
}

/// Bare numeric payloads: accepts JSON numbers and numeric strings, anything
/// else decodes to `0.0`. Negative and non-finite values sanitize to `0.0`.
impl StoreValue for f64 {
    fn from_payload(payload: Option<&Value>) -> Self {
        match payload {
            Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0),
            Some(Value::String(raw)) => raw.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    fn sanitize(self) -> Self {
        if self.is_finite() { self.max(0.0) } else { 0.0 }
    }
}

/// A user-visible account balance.
///
/// The backend reports balances as `{"balance": "12.34"}` with the amount
/// serialized as a string; older deployments send a bare number. Both decode
/// here, and a balance can never be negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balance(f64);

impl Balance {
    pub fn new(amount: f64) -> Self { Balance(amount).sanitize() }

    pub fn amount(&self) -> f64 { self.0 }
}

impl From<f64> for Balance {
    fn from(amount: f64) -> Self { Balance::new(amount) }
}

impl std::fmt::Display for Balance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{:.2}", self.0) }
}

impl StoreValue for Balance {
    fn from_payload(payload: Option<&Value>) -> Self {
        let amount = match payload {
            Some(Value::Object(fields)) => fields.get("balance"),
            other => other,
        };
        Balance(f64::from_payload(amount))
    }

    fn sanitize(self) -> Self { Balance(self.0.sanitize()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_payloads_decode() {
        assert_eq!(f64::from_payload(Some(&json!(12.5))), 12.5);
        assert_eq!(f64::from_payload(Some(&json!("12.5"))), 12.5);
        assert_eq!(f64::from_payload(Some(&json!(" 7 "))), 7.0);
    }

    #[test]
    fn test_malformed_payloads_decode_to_zero() {
        assert_eq!(f64::from_payload(None), 0.0);
        assert_eq!(f64::from_payload(Some(&json!(null))), 0.0);
        assert_eq!(f64::from_payload(Some(&json!("not a number"))), 0.0);
        assert_eq!(f64::from_payload(Some(&json!([1, 2]))), 0.0);
    }

    #[test]
    fn test_sanitize_clamps_to_legal_range() {
        assert_eq!((-3.0f64).sanitize(), 0.0);
        assert_eq!(f64::NAN.sanitize(), 0.0);
        assert_eq!(f64::INFINITY.sanitize(), 0.0);
        assert_eq!(42.5f64.sanitize(), 42.5);
    }

    #[test]
    fn test_balance_decodes_the_envelope_object() {
        assert_eq!(Balance::from_payload(Some(&json!({ "balance": "42.50" }))), Balance::new(42.5));
        assert_eq!(Balance::from_payload(Some(&json!({ "balance": 42.5 }))), Balance::new(42.5));
        assert_eq!(Balance::from_payload(Some(&json!(42.5))), Balance::new(42.5));
        assert_eq!(Balance::from_payload(Some(&json!({ "other": 1 }))), Balance::default());
        assert_eq!(Balance::from_payload(None), Balance::default());
    }

    #[test]
    fn test_balance_never_goes_negative() {
        assert_eq!(Balance::new(-10.0), Balance::new(0.0));
        assert_eq!(Balance::from_payload(Some(&json!({ "balance": "-5" }))).sanitize(), Balance::default());
    }

    #[test]
    fn test_balance_displays_two_decimal_places() {
        assert_eq!(Balance::new(42.5).to_string(), "42.50");
    }
}
