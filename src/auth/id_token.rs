//! Reading the identity out of a Google ID token
//!
//! Only the payload is decoded here. Signature verification happens on the
//! backend, which receives the raw token during the exchange.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use serde::Deserialize;

use super::identity::ProviderIdentity;

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    aud: String,
    exp: i64,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<bool>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

/// Decode an ID token into the identity it asserts
pub fn identity_from_id_token(
    id_token: &str,
    client_id: &str,
) -> std::result::Result<ProviderIdentity, String> {
    let mut segments = id_token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err("ID token is not a three-part JWT".to_string()),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| format!("ID token payload is not base64url: {}", e))?;
    let claims: IdTokenClaims = serde_json::from_slice(&bytes)
        .map_err(|e| format!("ID token payload is not valid claims JSON: {}", e))?;

    if claims.aud != client_id {
        return Err(format!("ID token was issued for another client ({})", claims.aud));
    }
    if claims.exp <= Utc::now().timestamp() {
        return Err("ID token has expired".to_string());
    }

    let email = claims
        .email
        .ok_or_else(|| "ID token carries no email claim".to_string())?;

    ProviderIdentity {
        external_id: claims.sub,
        email,
        display_name: claims.name,
        avatar_url: claims.picture,
        email_verified: claims.email_verified.unwrap_or(false),
    }
    .validate()
}

#[cfg(test)]
pub(crate) fn encode_test_token(claims: serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.signature", header, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(aud: &str, exp_offset: i64) -> serde_json::Value {
        json!({
            "iss": "https://accounts.google.com",
            "sub": "g1",
            "aud": aud,
            "exp": Utc::now().timestamp() + exp_offset,
            "email": "a@b.com",
            "email_verified": true,
            "name": "Ada Lovelace",
            "picture": "https://example.com/ada.png"
        })
    }

    #[test]
    fn test_decode_identity() {
        let token = encode_test_token(claims("client-1", 3600));
        let identity = identity_from_id_token(&token, "client-1").unwrap();

        assert_eq!(identity.external_id, "g1");
        assert_eq!(identity.email, "a@b.com");
        assert!(identity.email_verified);
        assert_eq!(identity.display_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(identity.avatar_url.as_deref(), Some("https://example.com/ada.png"));
    }

    #[test]
    fn test_wrong_audience() {
        let token = encode_test_token(claims("someone-else", 3600));
        let err = identity_from_id_token(&token, "client-1").unwrap_err();
        assert!(err.contains("another client"));
    }

    #[test]
    fn test_expired_token() {
        let token = encode_test_token(claims("client-1", -10));
        assert!(identity_from_id_token(&token, "client-1").unwrap_err().contains("expired"));
    }

    #[test]
    fn test_garbage_tokens() {
        assert!(identity_from_id_token("", "c").is_err());
        assert!(identity_from_id_token("a.b", "c").is_err());
        assert!(identity_from_id_token("a.!!!.c", "c").is_err());
        assert!(identity_from_id_token("a.b.c.d", "c").is_err());
    }

    #[test]
    fn test_missing_email() {
        let mut value = claims("client-1", 3600);
        value.as_object_mut().unwrap().remove("email");
        let token = encode_test_token(value);
        assert!(identity_from_id_token(&token, "client-1").is_err());
    }
}
