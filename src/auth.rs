//! Token acquisition with OAuth 1.0 `HMAC-SHA256` signed client credentials.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::credentials::Credentials;
use crate::error::HereError;
use crate::transport::{HttpRequest, HttpTransport, Method};

type HmacSha256 = Hmac<Sha256>;

/// RFC 3986 unreserved characters stay literal, everything else is encoded.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const GRANT_TYPE: &str = "client_credentials";
const SIGNATURE_METHOD: &str = "HMAC-SHA256";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(alias = "accessToken")]
    access_token: String,
    #[serde(default, alias = "expiresIn")]
    expires_in: Option<u64>,
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

/// Builds the OAuth signature base string from already sorted parameters.
pub fn signature_base_string(method: &str, url: &str, params: &[(&str, &str)]) -> String {
    let normalized = params
        .iter()
        .map(|(key, value)| format!("{}={}", encode(key), encode(value)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}&{}&{}", method, encode(url), encode(&normalized))
}

pub fn sign(secret: &str, base_string: &str) -> Result<String, HereError> {
    let key = format!("{}&", encode(secret));
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|e| HereError::Authentication(e.to_string()))?;
    mac.update(base_string.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

// Authorization header for the token request with a given nonce and timestamp
pub fn authorization_header(
    credentials: &Credentials,
    nonce: &str,
    timestamp: u64,
) -> Result<String, HereError> {
    let timestamp = timestamp.to_string();
    let params = [
        ("grant_type", GRANT_TYPE),
        ("oauth_consumer_key", credentials.access_key_id.as_str()),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", SIGNATURE_METHOD),
        ("oauth_timestamp", timestamp.as_str()),
        ("oauth_version", "1.0"),
    ];
    let base = signature_base_string("POST", &credentials.token_endpoint_url, &params);
    let signature = sign(&credentials.access_key_secret, &base)?;

    Ok(format!(
        "OAuth oauth_consumer_key=\"{}\",oauth_nonce=\"{}\",oauth_signature=\"{}\",oauth_signature_method=\"{}\",oauth_timestamp=\"{}\",oauth_version=\"1.0\"",
        encode(&credentials.access_key_id),
        encode(nonce),
        encode(&signature),
        SIGNATURE_METHOD,
        timestamp
    ))
}

fn nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

/// Exchanges the access key for a bearer token.
pub fn fetch_token<T: HttpTransport + ?Sized>(
    transport: &T,
    credentials: &Credentials,
) -> Result<String, HereError> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| HereError::Authentication(e.to_string()))?
        .as_secs();
    let header = authorization_header(credentials, &nonce(), timestamp)?;

    let request = HttpRequest::new(Method::Post, credentials.token_endpoint_url.as_str())
        .header("Authorization", header)
        .body(
            "application/x-www-form-urlencoded",
            format!("grant_type={}", GRANT_TYPE).into_bytes(),
        );

    let response = transport.send(request)?;
    if !response.is_success() {
        return Err(HereError::Authentication(format!(
            "HTTP {}: {}",
            response.status,
            response.text()
        )));
    }

    let token: TokenResponse = serde_json::from_slice(&response.body)
        .map_err(|e| HereError::Authentication(format!("Invalid token response: {}", e)))?;
    debug!("Obtained access token, expires in {:?}s", token.expires_in);

    Ok(token.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::ScriptedTransport;

    fn credentials() -> Credentials {
        Credentials {
            access_key_id: "key id".to_string(),
            access_key_secret: "secret".to_string(),
            token_endpoint_url: "https://account.api.here.com/oauth2/token".to_string(),
        }
    }

    #[test]
    fn test_base_string_encoding() {
        let base = signature_base_string(
            "POST",
            "https://account.api.here.com/oauth2/token",
            &[("grant_type", "client_credentials"), ("oauth_nonce", "a b~")],
        );
        assert_eq!(
            base,
            "POST&https%3A%2F%2Faccount.api.here.com%2Foauth2%2Ftoken&grant_type%3Dclient_credentials%26oauth_nonce%3Da%2520b~"
        );
    }

    #[test]
    fn test_signature_is_deterministic_sha256() {
        let first = sign("secret", "POST&url&params").unwrap();
        let second = sign("secret", "POST&url&params").unwrap();
        let other = sign("other", "POST&url&params").unwrap();

        assert_eq!(first, second);
        assert_ne!(first, other);
        // 32 byte digest in padded base64
        assert_eq!(first.len(), 44);
    }

    #[test]
    fn test_authorization_header_fields() {
        let header = authorization_header(&credentials(), "nonce123", 1_700_000_000).unwrap();

        assert!(header.starts_with("OAuth "));
        assert!(header.contains("oauth_consumer_key=\"key%20id\""));
        assert!(header.contains("oauth_nonce=\"nonce123\""));
        assert!(header.contains("oauth_signature_method=\"HMAC-SHA256\""));
        assert!(header.contains("oauth_timestamp=\"1700000000\""));
    }

    #[test]
    fn test_fetch_token() {
        let transport = ScriptedTransport::default().respond(
            200,
            r#"{"access_token": "tok-123", "token_type": "bearer", "expires_in": 86399}"#,
        );

        let token = fetch_token(&transport, &credentials()).unwrap();

        assert_eq!(token, "tok-123");
        let requests = transport.requests.borrow();
        assert_eq!(requests[0].method, Method::Post);
        assert_eq!(requests[0].url, "https://account.api.here.com/oauth2/token");
        assert_eq!(
            requests[0].body.as_deref(),
            Some(&b"grant_type=client_credentials"[..])
        );
        assert!(requests[0]
            .header_value("Authorization")
            .unwrap()
            .starts_with("OAuth "));
    }

    #[test]
    fn test_rejected_credentials() {
        let transport = ScriptedTransport::default().respond(401, "invalid signature");

        let err = fetch_token(&transport, &credentials()).unwrap_err();
        assert!(matches!(err, HereError::Authentication(_)));
        assert!(err.to_string().contains("401"));
    }
}
