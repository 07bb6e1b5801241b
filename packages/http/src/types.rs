use std::collections::HashMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    GET,
    POST,
    PUT,
    DELETE,
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => http::Method::GET,
            Method::POST => http::Method::POST,
            Method::PUT => http::Method::PUT,
            Method::DELETE => http::Method::DELETE,
        }
    }
}

/// Body attached to an outgoing request.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Serialized as JSON with an `application/json` content type.
    Json(serde_json::Value),
    /// Sent verbatim. Callers set their own `Content-Type`.
    Bytes(Bytes),
}

/// An outgoing request, built with the `with_*` methods.
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    /// HTTP method (GET, POST, PUT, DELETE)
    pub method: Method,

    /// Absolute URL of the request
    pub url: String,

    pub headers: HashMap<String, String>,

    /// Request body
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_body(mut self, body: impl Serialize) -> Result<Self, serde_json::Error> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn with_json_body(mut self, body: serde_json::Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn with_bytes_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = RequestBody::Bytes(body.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attach an `Authorization: Bearer <token>` header.
    pub fn with_bearer(self, token: &str) -> Self {
        self.with_header("Authorization", format!("Bearer {}", token))
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A response as received, body unparsed.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,

    /// Canonical reason phrase, e.g. "Not Found"
    pub status_text: String,

    pub headers: HashMap<String, String>,

    /// Raw response body
    pub body: Bytes,
}

/// The outcome carried by a finished response, tagged by what the body holds.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload<'a> {
    /// The body parsed as a JSON document.
    Json(serde_json::Value),
    /// A non-empty body that is not JSON.
    Bytes(&'a [u8]),
    /// No body at all.
    Empty,
}

impl Payload<'_> {
    /// The parsed document, if the body was JSON.
    pub fn into_json(self) -> Option<serde_json::Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        let status_text = http::StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or("Unknown")
            .to_string();

        Self {
            status,
            status_text,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Build a response whose body is the serialized JSON value.
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self::new(status, body.to_string())
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        self.status / 100 == 2
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Classify the body as JSON, raw bytes or nothing.
    pub fn payload(&self) -> Payload<'_> {
        if self.body.is_empty() {
            return Payload::Empty;
        }
        match serde_json::from_slice(&self.body) {
            Ok(value) => Payload::Json(value),
            Err(_) => Payload::Bytes(&self.body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_tags_json_bodies() {
        let response = HttpResponse::json(200, &json!({"token": "abc"}));
        assert_eq!(response.payload(), Payload::Json(json!({"token": "abc"})));
    }

    #[test]
    fn payload_tags_binary_bodies() {
        let response = HttpResponse::new(200, vec![0u8, 159, 146, 150]);
        assert_eq!(response.payload(), Payload::Bytes(&[0u8, 159, 146, 150]));
        assert!(response.payload().into_json().is_none());
    }

    #[test]
    fn payload_tags_empty_bodies() {
        let response = HttpResponse::new(204, Bytes::new());
        assert_eq!(response.payload(), Payload::Empty);
    }

    #[test]
    fn status_text_from_code() {
        assert_eq!(HttpResponse::new(404, "").status_text, "Not Found");
        assert_eq!(HttpResponse::new(599, "").status_text, "Unknown");
    }

    #[test]
    fn only_2xx_is_success() {
        assert!(HttpResponse::new(201, "").is_success());
        assert!(!HttpResponse::new(302, "").is_success());
        assert!(!HttpResponse::new(401, "").is_success());
    }

    #[test]
    fn bearer_header_is_attached() {
        let request = HttpRequest::get("http://localhost/settings").with_bearer("abc");
        assert_eq!(request.header("authorization"), Some("Bearer abc"));
    }

    #[test]
    fn with_body_serializes_to_json() {
        #[derive(Serialize)]
        struct Credentials<'a> {
            username: &'a str,
            password: &'a str,
        }

        let request = HttpRequest::post("http://localhost/auth/login")
            .with_body(Credentials {
                username: "alice",
                password: "hunter2",
            })
            .unwrap();

        assert_eq!(
            request.body,
            RequestBody::Json(json!({"username": "alice", "password": "hunter2"}))
        );
    }
}
