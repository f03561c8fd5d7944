//! Client-identity extraction from bearer tokens.
//!
//! The client identity is the `client_id` claim of the token's JWT payload
//! segment. No signature verification happens here: the fronting gateway
//! owns token validity, this surface only needs the identity for routing
//! and attribution.

use axum::http::{header, HeaderMap};
use fixbridge_core::ClientId;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};

/// Resolves the client identity from an `Authorization: Bearer` header.
pub fn resolve_client(headers: &HeaderMap) -> ApiResult<ClientId> {
    let auth = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| ApiError::Unauthorized("malformed Authorization header".to_string()))?;

    let token = auth
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("expected a bearer token".to_string()))?;

    client_from_token(token)
}

/// Extracts the `client_id` claim from a JWT-shaped token.
pub fn client_from_token(token: &str) -> ApiResult<ClientId> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| ApiError::Unauthorized("token is not JWT-shaped".to_string()))?;

    let decoded = base64url_decode(payload)
        .ok_or_else(|| ApiError::Unauthorized("token payload is not base64url".to_string()))?;

    let claims: Value = serde_json::from_str(&decoded)
        .map_err(|_| ApiError::Unauthorized("token payload is not JSON".to_string()))?;

    match claims.get("client_id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => Ok(ClientId::from(id)),
        _ => Err(ApiError::Unauthorized(
            "token carries no client_id claim".to_string(),
        )),
    }
}

/// Base64url decode (RFC 4648 URL-safe alphabet, padding optional).
fn base64url_decode(input: &str) -> Option<String> {
    const ALPHABET: &[u8] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

    fn decode_char(c: u8) -> Option<u8> {
        ALPHABET.iter().position(|&x| x == c).map(|p| p as u8)
    }

    let input = input.trim_end_matches('=');
    let mut result = Vec::new();

    for chunk in input.as_bytes().chunks(4) {
        let mut buf = 0u32;
        let mut bits = 0;

        for &c in chunk {
            buf = (buf << 6) | (decode_char(c)? as u32);
            bits += 6;
        }

        while bits >= 8 {
            bits -= 8;
            result.push(((buf >> bits) & 0xFF) as u8);
        }
    }

    String::from_utf8(result).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    /// Test-only encoder matching `base64url_decode`.
    fn base64url_encode(input: &str) -> String {
        const ALPHABET: &[u8] =
            b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

        let bytes = input.as_bytes();
        let mut out = String::new();
        for chunk in bytes.chunks(3) {
            let mut buf = 0u32;
            for (i, &b) in chunk.iter().enumerate() {
                buf |= (b as u32) << (16 - 8 * i);
            }
            for i in 0..=chunk.len() {
                out.push(ALPHABET[((buf >> (18 - 6 * i)) & 0x3F) as usize] as char);
            }
        }
        out
    }

    fn token_for(claims: &str) -> String {
        format!(
            "{}.{}.sig",
            base64url_encode("{\"alg\":\"none\"}"),
            base64url_encode(claims)
        )
    }

    #[test]
    fn test_extracts_client_id_claim() {
        let token = token_for("{\"client_id\":\"acme\",\"exp\":1234}");
        let client = client_from_token(&token).unwrap();
        assert_eq!(client, ClientId::from("acme"));
    }

    #[test]
    fn test_missing_claim_rejected() {
        let token = token_for("{\"sub\":\"someone\"}");
        assert!(matches!(
            client_from_token(&token),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_non_jwt_token_rejected() {
        assert!(client_from_token("just-an-opaque-string").is_err());
        assert!(client_from_token("").is_err());
    }

    #[test]
    fn test_resolve_from_headers() {
        let token = token_for("{\"client_id\":\"globex\"}");
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        assert_eq!(resolve_client(&headers).unwrap(), ClientId::from("globex"));
    }

    #[test]
    fn test_missing_header_rejected() {
        let headers = HeaderMap::new();
        assert!(matches!(
            resolve_client(&headers),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_basic_scheme_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );
        assert!(resolve_client(&headers).is_err());
    }

    #[test]
    fn test_decode_handles_padding() {
        assert_eq!(base64url_decode("YWJj").as_deref(), Some("abc"));
        assert_eq!(base64url_decode("YWI=").as_deref(), Some("ab"));
        assert_eq!(base64url_decode("YWI").as_deref(), Some("ab"));
    }
}
