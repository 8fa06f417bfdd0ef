//! HTTP request types.

pub use sugar_router::Method;

use crate::query::{QueryString, percent_decode_path};

/// HTTP headers. Names are compared case-insensitively and repeated
/// headers keep every value in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    inner: Vec<(String, Vec<u8>)>,
}

impl Headers {
    /// Create empty headers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// First value of a header, as bytes.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.inner
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
    }

    /// First value of a header, if it is valid UTF-8.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| std::str::from_utf8(v).ok())
    }

    /// Every UTF-8 value of a header.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.inner
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .filter_map(|(_, v)| std::str::from_utf8(v).ok())
    }

    /// Append a header value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.inner.push((name.into().to_ascii_lowercase(), value.into()));
    }

    /// Iterate over all `(name, value)` pairs. Names are lowercase.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    /// Number of header values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Request body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Body {
    /// Empty body.
    #[default]
    Empty,
    /// Fully buffered body.
    Bytes(Vec<u8>),
}

impl Body {
    /// Borrow the body bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Empty => &[],
            Self::Bytes(b) => b,
        }
    }

    /// Consume the body.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Empty => Vec::new(),
            Self::Bytes(b) => b,
        }
    }

    /// Check if the body is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// An HTTP request as seen by the binding engine.
///
/// Path parameters are filled in by the dispatcher after route lookup.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: Option<String>,
    headers: Headers,
    body: Body,
    path_params: Vec<(String, String)>,
}

impl Request {
    /// Create a request. A `?query` suffix on `uri` is split off.
    #[must_use]
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (uri, None),
        };
        Self {
            method,
            path,
            query,
            headers: Headers::new(),
            body: Body::Empty,
            path_params: Vec::new(),
        }
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        let bytes = body.into();
        self.body = if bytes.is_empty() {
            Body::Empty
        } else {
            Body::Bytes(bytes)
        };
        self
    }

    /// Get the HTTP method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// Get the request path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the raw query string.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Set the raw query string.
    pub fn set_query(&mut self, query: Option<String>) {
        self.query = query;
    }

    /// Parsed query parameters.
    #[must_use]
    pub fn query_params(&self) -> QueryString<'_> {
        QueryString::parse(self.query.as_deref().unwrap_or(""))
    }

    /// Get the headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get mutable headers.
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Get the body.
    #[must_use]
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Take the body, leaving it empty.
    pub fn take_body(&mut self) -> Body {
        std::mem::take(&mut self.body)
    }

    /// Set the body.
    pub fn set_body(&mut self, body: Body) {
        self.body = body;
    }

    /// The `Content-Type` header without parameters, lowercased.
    #[must_use]
    pub fn content_type(&self) -> Option<String> {
        let raw = self.headers.get_str("content-type")?;
        let mime = raw.split(';').next().unwrap_or("").trim();
        (!mime.is_empty()).then(|| mime.to_ascii_lowercase())
    }

    /// Captured path parameters, in template order.
    #[must_use]
    pub fn path_params(&self) -> &[(String, String)] {
        &self.path_params
    }

    /// A captured path parameter, percent-decoded.
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<String> {
        self.path_params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| percent_decode_path(v).into_owned())
    }

    /// Record the path parameters captured by route lookup.
    pub fn set_path_params(&mut self, params: Vec<(String, String)>) {
        self.path_params = params;
    }

    /// Every value of a cookie, from all `Cookie` headers.
    #[must_use]
    pub fn cookies(&self, name: &str) -> Vec<String> {
        self.headers
            .get_all("cookie")
            .flat_map(|header| header.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .filter(|(k, _)| k.trim() == name)
            .map(|(_, v)| unquote_cookie(v.trim()).to_string())
            .collect()
    }

    /// First value of a cookie.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies(name).into_iter().next()
    }
}

fn unquote_cookie(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
