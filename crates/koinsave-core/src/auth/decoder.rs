//! Unverified decoding of compact `header.payload.signature` tokens.
//!
//! Only the payload segment is interpreted. The signature is neither
//! required nor checked: there is no key material on the client, so the
//! claims returned here are untrusted and only good for UI gating.

use std::string::FromUtf8Error;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Number of dot-separated segments in a compact token.
const TOKEN_SEGMENTS: usize = 3;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Token must have 3 segments, found {found}")]
    SegmentCount { found: usize },

    #[error("Token payload segment is empty")]
    EmptyPayload,

    #[error("Token payload is not valid base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Token payload is not valid UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),

    #[error("Token payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Token payload is not a JSON object")]
    NotAnObject,
}

/// Decoded token payload.
///
/// Only `exp` matters for authentication. Every other field is optional and
/// a wrongly-typed value reads as absent rather than failing the decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Expiry instant, seconds since the Unix epoch.
    #[serde(default, deserialize_with = "number_or_none", skip_serializing_if = "Option::is_none")]
    pub exp: Option<f64>,

    /// Subject identifier.
    #[serde(default, deserialize_with = "string_or_none", skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Display name, usually "First Last".
    #[serde(default, deserialize_with = "string_or_none", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "string_or_none", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, deserialize_with = "string_or_none", skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,

    /// Claims with no dedicated field (`iat`, `iss`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Expiry as a timestamp, if `exp` is present and representable.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let exp = self.exp?;
        if !exp.is_finite() {
            return None;
        }
        Utc.timestamp_millis_opt((exp * 1000.0) as i64).single()
    }
}

fn number_or_none<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?.as_f64())
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Decode the payload of a compact token into `Claims`.
///
/// Accepts padded or unpadded base64url. Fails when the token does not have
/// exactly three segments or the payload is not a JSON object.
pub fn decode(token: &str) -> Result<Claims, DecodeError> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != TOKEN_SEGMENTS {
        return Err(DecodeError::SegmentCount {
            found: segments.len(),
        });
    }

    let payload = segments[1].trim_end_matches('=');
    if payload.is_empty() {
        return Err(DecodeError::EmptyPayload);
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload)?;
    let json = String::from_utf8(bytes)?;
    let value: Value = serde_json::from_str(&json)?;
    if !value.is_object() {
        return Err(DecodeError::NotAnObject);
    }

    Ok(serde_json::from_value(value)?)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::token_with_claims;
    use serde_json::json;

    #[test]
    fn test_decode_full_claims() {
        let token = token_with_claims(&json!({
            "sub": "42",
            "name": "Ada Lovelace",
            "email": "a@x.com",
            "accountNumber": "AC1",
            "exp": 1_900_000_000,
            "iat": 1_700_000_000,
        }));

        let claims = decode(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("42"));
        assert_eq!(claims.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(claims.email.as_deref(), Some("a@x.com"));
        assert_eq!(claims.account_number.as_deref(), Some("AC1"));
        assert_eq!(claims.exp, Some(1_900_000_000.0));
        assert_eq!(claims.extra.get("iat"), Some(&json!(1_700_000_000)));
    }

    #[test]
    fn test_decode_empty_object() {
        let claims = decode(&token_with_claims(&json!({}))).unwrap();
        assert_eq!(claims, Claims::default());
    }

    #[test]
    fn test_decode_ignores_signature() {
        let token = token_with_claims(&json!({ "exp": 1 }));
        let (head, _) = token.rsplit_once('.').unwrap();
        // Empty and garbage signatures both decode
        assert!(decode(&format!("{}.", head)).is_ok());
        assert!(decode(&format!("{}.!!not-base64!!", head)).is_ok());
    }

    #[test]
    fn test_decode_accepts_padding() {
        let payload = base64::engine::general_purpose::URL_SAFE.encode(r#"{"sub":"7"}"#);
        assert!(payload.ends_with('='));
        let claims = decode(&format!("h.{}.s", payload)).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("7"));
    }

    #[test]
    fn test_decode_lenient_field_types() {
        let token = token_with_claims(&json!({
            "sub": 42,
            "name": null,
            "email": ["a@x.com"],
            "exp": "1900000000",
        }));
        let claims = decode(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("42"));
        assert!(claims.name.is_none());
        assert!(claims.email.is_none());
        // Non-numeric expiry is treated as missing
        assert!(claims.exp.is_none());
    }

    #[test]
    fn test_decode_fractional_exp() {
        let claims = decode(&token_with_claims(&json!({ "exp": 1_900_000_000.5 }))).unwrap();
        assert_eq!(claims.exp, Some(1_900_000_000.5));
        assert_eq!(
            claims.expires_at().unwrap().timestamp_millis(),
            1_900_000_000_500
        );
    }

    #[test]
    fn test_decode_wrong_segment_count() {
        assert!(matches!(decode(""), Err(DecodeError::SegmentCount { found: 1 })));
        assert!(matches!(
            decode("only.two"),
            Err(DecodeError::SegmentCount { found: 2 })
        ));
        assert!(matches!(
            decode("a.b.c.d"),
            Err(DecodeError::SegmentCount { found: 4 })
        ));
    }

    #[test]
    fn test_decode_empty_payload() {
        assert!(matches!(decode("a..c"), Err(DecodeError::EmptyPayload)));
    }

    #[test]
    fn test_decode_bad_base64() {
        assert!(matches!(decode("a.$$$.c"), Err(DecodeError::Base64(_))));
    }

    #[test]
    fn test_decode_bad_json() {
        let payload = URL_SAFE_NO_PAD.encode("not json");
        assert!(matches!(
            decode(&format!("a.{}.c", payload)),
            Err(DecodeError::Json(_))
        ));
    }

    #[test]
    fn test_decode_non_object_payload() {
        let payload = URL_SAFE_NO_PAD.encode("[1,2,3]");
        assert!(matches!(
            decode(&format!("a.{}.c", payload)),
            Err(DecodeError::NotAnObject)
        ));
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let payload = URL_SAFE_NO_PAD.encode([0xff, 0xfe, 0xfd]);
        assert!(matches!(
            decode(&format!("a.{}.c", payload)),
            Err(DecodeError::Utf8(_))
        ));
    }

    #[test]
    fn test_expires_at_absent() {
        assert!(Claims::default().expires_at().is_none());
    }
}
