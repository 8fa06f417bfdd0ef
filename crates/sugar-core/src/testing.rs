//! In-process test client.
//!
//! [`TestClient`] drives [`App::handle`] synchronously, without a server:
//!
//! ```
//! use sugar_core::{App, RouteConfig, Signature, TestClient};
//! use serde_json::json;
//!
//! let app = App::builder()
//!     .get("/", Signature::new(), |_| async { Ok(json!({"hello": "world"})) }, RouteConfig::new())
//!     .unwrap()
//!     .build();
//! let client = TestClient::new(app);
//!
//! let response = client.get("/").send();
//! assert_eq!(response.status().as_u16(), 200);
//! assert_eq!(response.json(), json!({"hello": "world"}));
//! ```

use std::fmt::Write as _;

use serde_json::Value;

use crate::app::App;
use crate::query::percent_encode;
use crate::request::{Method, Request};
use crate::response::{Response, StatusCode};

const BOUNDARY: &str = "sugar-test-boundary";

/// Synchronous client for an [`App`].
#[derive(Debug)]
pub struct TestClient {
    app: App,
}

impl TestClient {
    #[must_use]
    pub fn new(app: App) -> Self {
        Self { app }
    }

    #[must_use]
    pub fn app(&self) -> &App {
        &self.app
    }

    #[must_use]
    pub fn request(&self, method: Method, uri: &str) -> RequestBuilder<'_> {
        RequestBuilder {
            client: self,
            request: Request::new(method, uri),
            cookies: Vec::new(),
        }
    }

    #[must_use]
    pub fn get(&self, uri: &str) -> RequestBuilder<'_> {
        self.request(Method::Get, uri)
    }

    #[must_use]
    pub fn head(&self, uri: &str) -> RequestBuilder<'_> {
        self.request(Method::Head, uri)
    }

    #[must_use]
    pub fn post(&self, uri: &str) -> RequestBuilder<'_> {
        self.request(Method::Post, uri)
    }

    #[must_use]
    pub fn put(&self, uri: &str) -> RequestBuilder<'_> {
        self.request(Method::Put, uri)
    }

    #[must_use]
    pub fn patch(&self, uri: &str) -> RequestBuilder<'_> {
        self.request(Method::Patch, uri)
    }

    #[must_use]
    pub fn delete(&self, uri: &str) -> RequestBuilder<'_> {
        self.request(Method::Delete, uri)
    }
}

/// A request under construction.
#[derive(Debug)]
pub struct RequestBuilder<'a> {
    client: &'a TestClient,
    request: Request,
    cookies: Vec<(String, String)>,
}

impl RequestBuilder<'_> {
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request = self.request.with_header(name, value.into().into_bytes());
        self
    }

    #[must_use]
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    /// Send a JSON body.
    #[must_use]
    pub fn json(self, value: &Value) -> Self {
        self.header("content-type", "application/json")
            .body(value.to_string().into_bytes())
    }

    /// Send an urlencoded form body.
    #[must_use]
    pub fn form(self, fields: &[(&str, &str)]) -> Self {
        let encoded = fields
            .iter()
            .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        self.header("content-type", "application/x-www-form-urlencoded")
            .body(encoded.into_bytes())
    }

    /// Send a multipart body.
    #[must_use]
    pub fn multipart(self, form: MultipartBody) -> Self {
        self.header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(form.encode())
    }

    /// Send raw bytes.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.request = self.request.with_body(body);
        self
    }

    /// Dispatch the request and wait for the response.
    #[must_use]
    pub fn send(self) -> TestResponse {
        let mut request = self.request;
        if !self.cookies.is_empty() {
            let cookie = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            request = request.with_header("cookie", cookie.into_bytes());
        }
        TestResponse {
            inner: futures_executor::block_on(self.client.app.handle(request)),
        }
    }
}

/// A multipart body for [`RequestBuilder::multipart`].
#[derive(Debug, Clone, Default)]
pub struct MultipartBody {
    parts: Vec<MultipartPart>,
}

#[derive(Debug, Clone)]
struct MultipartPart {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

impl MultipartBody {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(MultipartPart {
            name: name.into(),
            filename: None,
            content_type: None,
            data: value.into().into_bytes(),
        });
        self
    }

    /// Add a file.
    #[must_use]
    pub fn file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        self.parts.push(MultipartPart {
            name: name.into(),
            filename: Some(filename.into()),
            content_type: Some(content_type.into()),
            data: data.into(),
        });
        self
    }

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for part in &self.parts {
            let mut head = format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{}\"", part.name);
            if let Some(filename) = &part.filename {
                let _ = write!(head, "; filename=\"{filename}\"");
            }
            head.push_str("\r\n");
            if let Some(content_type) = &part.content_type {
                let _ = write!(head, "Content-Type: {content_type}\r\n");
            }
            head.push_str("\r\n");
            out.extend_from_slice(head.as_bytes());
            out.extend_from_slice(&part.data);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        out
    }
}

/// A response captured by [`TestClient`].
#[derive(Debug)]
pub struct TestResponse {
    inner: Response,
}

impl TestResponse {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.inner.status_code()
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.header_value(name)
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        self.inner.body_bytes()
    }

    /// Body as text, lossily decoded.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.inner.body_bytes()).into_owned()
    }

    /// Body parsed as JSON; `Value::Null` when it is not JSON.
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_slice(self.inner.body_bytes()).unwrap_or(Value::Null)
    }

    #[must_use]
    pub fn into_inner(self) -> Response {
        self.inner
    }
}

/// Whether `actual` contains everything in `expected`: objects may carry
/// extra keys, arrays and scalars must match exactly.
#[must_use]
pub fn json_contains(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Object(actual), Value::Object(expected)) => expected
            .iter()
            .all(|(k, v)| actual.get(k).is_some_and(|a| json_contains(a, v))),
        (Value::Array(actual), Value::Array(expected)) => {
            actual.len() == expected.len()
                && actual.iter().zip(expected).all(|(a, e)| json_contains(a, e))
        }
        _ => actual == expected,
    }
}
