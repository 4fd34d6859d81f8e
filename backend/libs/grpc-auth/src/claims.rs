//! Access token claims

use crate::error::AuthError;
use crate::permission::Permission;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Claims carried by an access token
///
/// Only `extend_namespace` is interpreted by the authorization interceptor.
/// The remaining fields are kept for handlers that want them and are read
/// leniently: a value of an unexpected shape becomes absent (or empty)
/// instead of failing the whole token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extend_namespace: Option<String>,

    #[serde(default, deserialize_with = "lenient_permissions", skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<Permission>,

    #[serde(default, deserialize_with = "lenient_timestamp", skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    #[serde(default, deserialize_with = "lenient_timestamp", skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Any claim not listed above
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AccessTokenClaims {
    /// `extend_namespace`, treating an empty string as absent
    pub fn extend_namespace(&self) -> Option<&str> {
        self.extend_namespace.as_deref().filter(|ns| !ns.is_empty())
    }
}

/// Strings as-is, numbers and booleans rendered, anything else absent
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Seconds since the epoch; fractional values are truncated
fn lenient_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    })
}

/// `null` or a malformed list reads as no permissions
fn lenient_permissions<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<Permission>, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default())
}

/// Decode the claims of `token` without verifying it
///
/// Signature and expiry are the validator's concern; this only reads the
/// payload.
pub fn parse_access_token(token: &str) -> Result<AccessTokenClaims, AuthError> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<AccessTokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| AuthError::InvalidClaims(format!("invalid access token claims: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn token(claims: Value) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"any-secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_reads_payload_without_key() {
        let claims = parse_access_token(&token(json!({
            "sub": "user-1",
            "extend_namespace": "accelbyte",
            "permissions": [{"Resource": "ADMIN:*", "Action": 2}],
            "display_name": "Player One",
        })))
        .unwrap();

        assert_eq!(claims.sub.as_deref(), Some("user-1"));
        assert_eq!(claims.extend_namespace(), Some("accelbyte"));
        assert_eq!(claims.permissions.len(), 1);
        assert_eq!(claims.extra["display_name"], "Player One");
    }

    #[test]
    fn test_empty_extend_namespace_is_absent() {
        let claims = parse_access_token(&token(json!({ "extend_namespace": "" }))).unwrap();
        assert_eq!(claims.extend_namespace(), None);
    }

    #[test]
    fn test_null_permissions_read_as_empty() {
        let claims = parse_access_token(&token(json!({
            "sub": "u",
            "extend_namespace": "other",
            "permissions": null,
        })))
        .unwrap();

        assert!(claims.permissions.is_empty());
        assert_eq!(claims.extend_namespace(), Some("other"));
    }

    #[test]
    fn test_fractional_iat_is_truncated() {
        let claims = parse_access_token(&token(json!({
            "extend_namespace": "accelbyte",
            "iat": 1700000000.75,
            "exp": "1700003600",
        })))
        .unwrap();

        assert_eq!(claims.iat, Some(1700000000));
        assert_eq!(claims.exp, Some(1700003600));
    }

    #[test]
    fn test_uninterpreted_fields_of_other_shapes_are_tolerated() {
        let claims = parse_access_token(&token(json!({
            "client_id": 42,
            "namespace": {"nested": true},
            "permissions": "everything",
            "extend_namespace": "accelbyte",
        })))
        .unwrap();

        assert_eq!(claims.client_id.as_deref(), Some("42"));
        assert_eq!(claims.namespace, None);
        assert!(claims.permissions.is_empty());
        assert_eq!(claims.extend_namespace(), Some("accelbyte"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_access_token("not-a-jwt").unwrap_err();
        assert!(matches!(err, AuthError::InvalidClaims(_)));
    }
}
