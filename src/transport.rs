//! HTTP transport abstraction for testability

use std::time::Duration;

use crate::error::HereError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn body(mut self, content_type: &str, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self.header("Content-Type", content_type)
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends a single request and returns whatever status the server answered
/// with. Only failures to obtain a response are errors.
pub trait HttpTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, HereError>;
}

const USER_AGENT: &str = concat!("activity-map-sync/", env!("CARGO_PKG_VERSION"));

/// Blocking reqwest transport.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, HereError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| HereError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, HereError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .map_err(|e| HereError::Transport(format!("{} {}", request.url, e)))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|e| HereError::Transport(format!("Failed to read response: {}", e)))?
            .to_vec();

        Ok(HttpResponse { status, body })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = HttpRequest::new(Method::Put, "https://example.com/features")
            .header("Authorization", "Bearer token")
            .body("application/geo+json", b"{}".to_vec());

        assert_eq!(request.header_value("authorization"), Some("Bearer token"));
        assert_eq!(
            request.header_value("content-type"),
            Some("application/geo+json")
        );
        assert_eq!(request.body.as_deref(), Some(&b"{}"[..]));
    }

    #[test]
    fn test_response_status() {
        let ok = HttpResponse {
            status: 204,
            body: Vec::new(),
        };
        let missing = HttpResponse {
            status: 404,
            body: b"not here".to_vec(),
        };
        assert!(ok.is_success());
        assert!(!missing.is_success());
        assert_eq!(missing.text(), "not here");
    }
}
