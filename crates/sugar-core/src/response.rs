//! HTTP response types.

use std::fmt;

use serde_json::{Value, json};

use crate::error::{HttpError, RequestValidationError, ResponseValidationError};

/// HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatusCode(u16);

impl StatusCode {
    pub const OK: Self = Self(200);
    pub const CREATED: Self = Self(201);
    pub const ACCEPTED: Self = Self(202);
    pub const NO_CONTENT: Self = Self(204);
    pub const BAD_REQUEST: Self = Self(400);
    pub const UNAUTHORIZED: Self = Self(401);
    pub const FORBIDDEN: Self = Self(403);
    pub const NOT_FOUND: Self = Self(404);
    pub const METHOD_NOT_ALLOWED: Self = Self(405);
    pub const CONFLICT: Self = Self(409);
    pub const PAYLOAD_TOO_LARGE: Self = Self(413);
    pub const UNSUPPORTED_MEDIA_TYPE: Self = Self(415);
    pub const UNPROCESSABLE_ENTITY: Self = Self(422);
    pub const INTERNAL_SERVER_ERROR: Self = Self(500);

    /// Create a status code from its numeric value.
    #[must_use]
    pub const fn from_u16(code: u16) -> Self {
        Self(code)
    }

    /// Numeric value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Whether this is a 2xx code.
    #[must_use]
    pub fn is_success(self) -> bool {
        (200..300).contains(&self.0)
    }

    /// Standard reason phrase, or `""` for unknown codes.
    #[must_use]
    pub fn canonical_reason(self) -> &'static str {
        match self.0 {
            200 => "OK",
            201 => "Created",
            202 => "Accepted",
            204 => "No Content",
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            409 => "Conflict",
            413 => "Payload Too Large",
            415 => "Unsupported Media Type",
            422 => "Unprocessable Entity",
            500 => "Internal Server Error",
            _ => "",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Response {
    /// Create an empty response with a status.
    #[must_use]
    pub fn with_status(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// JSON response with status `200`.
    #[must_use]
    pub fn json(value: &Value) -> Self {
        Self::with_status(StatusCode::OK)
            .header("content-type", "application/json")
            .body(value.to_string().into_bytes())
    }

    /// HTML response with status `200`.
    #[must_use]
    pub fn html(html: impl Into<String>) -> Self {
        Self::with_status(StatusCode::OK)
            .header("content-type", "text/html; charset=utf-8")
            .body(html.into().into_bytes())
    }

    /// Plain text response with status `200`.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::with_status(StatusCode::OK)
            .header("content-type", "text/plain; charset=utf-8")
            .body(text.into().into_bytes())
    }

    /// Replace the status.
    #[must_use]
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Set a header, replacing any existing value (case-insensitive).
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Replace the body.
    #[must_use]
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Status code.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// All headers.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First header value by name (case-insensitive).
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body bytes.
    #[must_use]
    pub fn body_bytes(&self) -> &[u8] {
        &self.body
    }

    /// Consume the response, returning its body.
    #[must_use]
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

/// Conversion into an HTTP response.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for Value {
    fn into_response(self) -> Response {
        Response::json(&self)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response =
            Response::json(&json!({ "detail": self.detail })).status(self.status);
        for (name, value) in self.headers {
            response = response.header(name, value);
        }
        response
    }
}

impl IntoResponse for RequestValidationError {
    fn into_response(self) -> Response {
        Response::json(&self.detail()).status(StatusCode::UNPROCESSABLE_ENTITY)
    }
}

impl IntoResponse for ResponseValidationError {
    fn into_response(self) -> Response {
        Response::json(&json!({ "detail": "Internal Server Error" }))
            .status(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ValidationError, ValidationErrors};

    #[test]
    fn test_json_response() {
        let response = Response::json(&json!({"a": 1}));
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.header_value("Content-Type"), Some("application/json"));
        assert_eq!(response.body_bytes(), br#"{"a":1}"#);
    }

    #[test]
    fn test_header_replaces_case_insensitively() {
        let response = Response::text("x")
            .header("Content-Type", "text/csv")
            .header("x-a", "1");
        assert_eq!(response.headers().len(), 2);
        assert_eq!(response.header_value("content-type"), Some("text/csv"));
    }

    #[test]
    fn test_http_error_into_response() {
        let response = HttpError::not_found()
            .with_detail("Item not found")
            .with_header("x-error", "yes")
            .into_response();
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(response.header_value("x-error"), Some("yes"));
        let body: Value = serde_json::from_slice(response.body_bytes()).unwrap();
        assert_eq!(body, json!({"detail": "Item not found"}));
    }

    #[test]
    fn test_request_validation_error_into_response() {
        let err = RequestValidationError::new(vec![ValidationErrors::from(
            ValidationError::missing(),
        )]);
        let response = err.into_response();
        assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = serde_json::from_slice(response.body_bytes()).unwrap();
        assert_eq!(body["detail"][0][0]["type"], "missing");
    }

    #[test]
    fn test_status_code_reason() {
        assert_eq!(StatusCode::UNPROCESSABLE_ENTITY.canonical_reason(), "Unprocessable Entity");
        assert_eq!(StatusCode::from_u16(299).canonical_reason(), "");
        assert!(StatusCode::CREATED.is_success());
        assert!(!StatusCode::NOT_FOUND.is_success());
    }
}
