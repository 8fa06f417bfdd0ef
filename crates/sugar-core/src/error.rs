//! Error types.
//!
//! Registration problems are [`ConfigurationError`]s and abort route setup.
//! Request problems are [`ValidationError`]s, aggregated per binding group
//! into a [`RequestValidationError`] and rendered as `422`.

use std::fmt;

use serde::Serialize;
use serde_json::{Value, json};

use crate::response::StatusCode;

/// One element of an error location path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LocItem {
    /// A field or source name.
    Field(String),
    /// A list index.
    Index(usize),
}

impl LocItem {
    /// Field location item.
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    /// Index location item.
    #[must_use]
    pub fn index(idx: usize) -> Self {
        Self::Index(idx)
    }

    /// The field name, if this is a field item.
    #[must_use]
    pub fn as_field(&self) -> Option<&str> {
        match self {
            Self::Field(name) => Some(name),
            Self::Index(_) => None,
        }
    }
}

impl fmt::Display for LocItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.write_str(name),
            Self::Index(idx) => write!(f, "{idx}"),
        }
    }
}

/// Machine-readable validation failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Missing,
    StringType,
    IntParsing,
    FloatParsing,
    BoolParsing,
    ListType,
    DictType,
    ModelType,
    UploadType,
    StringTooShort,
    StringTooLong,
    TooShort,
    TooLong,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    MultipleOf,
    StringPatternMismatch,
    JsonInvalid,
    ValueError,
}

impl ErrorKind {
    /// Wire name, as emitted in the `type` field.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::StringType => "string_type",
            Self::IntParsing => "int_parsing",
            Self::FloatParsing => "float_parsing",
            Self::BoolParsing => "bool_parsing",
            Self::ListType => "list_type",
            Self::DictType => "dict_type",
            Self::ModelType => "model_type",
            Self::UploadType => "upload_type",
            Self::StringTooShort => "string_too_short",
            Self::StringTooLong => "string_too_long",
            Self::TooShort => "too_short",
            Self::TooLong => "too_long",
            Self::GreaterThan => "greater_than",
            Self::GreaterThanEqual => "greater_than_equal",
            Self::LessThan => "less_than",
            Self::LessThanEqual => "less_than_equal",
            Self::MultipleOf => "multiple_of",
            Self::StringPatternMismatch => "string_pattern_mismatch",
            Self::JsonInvalid => "json_invalid",
            Self::ValueError => "value_error",
        }
    }
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    /// Location of the offending value, outermost first.
    pub loc: Vec<LocItem>,
    /// Human-readable message.
    pub msg: String,
    /// Failure kind.
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    /// The rejected input, when there was one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    /// Constraint context, e.g. `{"gt": 0}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ctx: Option<Value>,
}

impl ValidationError {
    /// Create an error with a message and no location.
    #[must_use]
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            loc: Vec::new(),
            msg: msg.into(),
            kind,
            input: None,
            ctx: None,
        }
    }

    /// A `missing` error.
    #[must_use]
    pub fn missing() -> Self {
        Self::new(ErrorKind::Missing, "Field required")
    }

    /// Set the location.
    #[must_use]
    pub fn at(mut self, loc: Vec<LocItem>) -> Self {
        self.loc = loc;
        self
    }

    /// Record the rejected input.
    #[must_use]
    pub fn with_input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    /// Record constraint context.
    #[must_use]
    pub fn with_ctx(mut self, ctx: Value) -> Self {
        self.ctx = Some(ctx);
        self
    }

    /// Prepend location items.
    #[must_use]
    pub fn prefixed<I: IntoIterator<Item = LocItem>>(mut self, prefix: I) -> Self {
        let mut loc: Vec<LocItem> = prefix.into_iter().collect();
        loc.append(&mut self.loc);
        self.loc = loc;
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let loc: Vec<String> = self.loc.iter().map(ToString::to_string).collect();
        write!(f, "{}: {} [{}]", loc.join("."), self.msg, self.kind.as_str())
    }
}

/// An ordered collection of validation errors from one group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, thiserror::Error)]
#[serde(transparent)]
#[error("{} validation error(s)", .0.len())]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error.
    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    /// Append every error from `other`.
    pub fn extend(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    /// Returns true if there are no errors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over the errors.
    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    /// Borrow the errors as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[ValidationError] {
        &self.0
    }

    /// Prefix every error location.
    #[must_use]
    pub fn prefixed(self, prefix: &[LocItem]) -> Self {
        Self(
            self.0
                .into_iter()
                .map(|e| e.prefixed(prefix.iter().cloned()))
                .collect(),
        )
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Binding failed. Holds one non-empty error list per failed group
/// (parameters, body, files), in that order.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("request validation failed in {} group(s)", .groups.len())]
pub struct RequestValidationError {
    pub groups: Vec<ValidationErrors>,
}

impl RequestValidationError {
    /// Wrap error groups. Empty groups are dropped.
    #[must_use]
    pub fn new(groups: Vec<ValidationErrors>) -> Self {
        Self {
            groups: groups.into_iter().filter(|g| !g.is_empty()).collect(),
        }
    }

    /// Total number of field errors across groups.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.groups.iter().map(ValidationErrors::len).sum()
    }

    /// The default `422` body: `{"detail": [[...], ...]}`.
    #[must_use]
    pub fn detail(&self) -> Value {
        json!({ "detail": self.groups })
    }
}

/// A handler's output did not fit the declared response model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("response does not match the declared response model: {errors}")]
pub struct ResponseValidationError {
    pub errors: ValidationErrors,
}

/// A route cannot be registered as declared.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("{endpoint}: only one body parameter is allowed, found `{first}` and `{second}`")]
    MultipleBodies {
        endpoint: String,
        first: String,
        second: String,
    },
    #[error("{endpoint}: `{name}` is marked as a path parameter but `{path}` has no such placeholder")]
    PathMarkerOutsideTemplate {
        endpoint: String,
        name: String,
        path: String,
    },
    #[error("{endpoint}: path parameter `{name}` may only use a Path marker or no default")]
    InvalidPathDefault { endpoint: String, name: String },
    #[error("{endpoint}: `{name}` is marked as a body but its type is not a composite model")]
    BodyNotComposite { endpoint: String, name: String },
    #[error("{endpoint}: composite parameter `{name}` must be a body or form parameter")]
    CompositeOutsideBody { endpoint: String, name: String },
    #[error("{endpoint}: file parameters require a Form body, but `{body}` is a JSON body")]
    FilesWithJsonBody { endpoint: String, body: String },
    #[error("{endpoint}: parameter `{name}` is declared twice")]
    DuplicateParameter { endpoint: String, name: String },
    #[error("a {method} route for `{path}` is already registered")]
    DuplicateRoute { method: String, path: String },
    #[error("route `{rule}` declares no methods")]
    NoMethods { rule: String },
    #[error("route `{rule}`: segment `{segment}` holds more than one placeholder")]
    CrowdedPathSegment { rule: String, segment: String },
    #[error("group endpoint `{endpoint}` may not contain a dot")]
    DottedEndpoint { endpoint: String },
}

/// Loading [`AppConfig`](crate::AppConfig) failed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid value `{value}` for {key}: expected {expected}")]
    Env {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// An error a handler may return to short-circuit with an HTTP response.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("HTTP {status}: {detail}")]
pub struct HttpError {
    pub status: StatusCode,
    pub detail: Value,
    pub headers: Vec<(String, String)>,
}

impl HttpError {
    /// Create an error with a status and its canonical reason as detail.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            detail: Value::String(status.canonical_reason().to_string()),
            headers: Vec::new(),
        }
    }

    /// Replace the detail payload.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<Value>) -> Self {
        self.detail = detail.into();
        self
    }

    /// Add a response header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn bad_request() -> Self {
        Self::new(StatusCode::BAD_REQUEST)
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    #[must_use]
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_serialization() {
        let error = ValidationError::new(ErrorKind::IntParsing, "Input should be a valid integer")
            .at(vec![LocItem::field("path"), LocItem::field("item_id")])
            .with_input(json!("abc"));
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({
                "loc": ["path", "item_id"],
                "msg": "Input should be a valid integer",
                "type": "int_parsing",
                "input": "abc"
            })
        );
    }

    #[test]
    fn test_prefix_and_index_locations() {
        let error = ValidationError::missing()
            .at(vec![LocItem::index(2), LocItem::field("name")])
            .prefixed([LocItem::field("body"), LocItem::field("items")]);
        assert_eq!(serde_json::to_value(&error.loc).unwrap(), json!(["body", "items", 2, "name"]));
        assert_eq!(error.to_string(), "body.items.2.name: Field required [missing]");
    }

    #[test]
    fn test_request_validation_error_drops_empty_groups() {
        let err = RequestValidationError::new(vec![
            ValidationErrors::from(ValidationError::missing()),
            ValidationErrors::new(),
            ValidationErrors::from(vec![ValidationError::missing(), ValidationError::missing()]),
        ]);
        assert_eq!(err.groups.len(), 2);
        assert_eq!(err.error_count(), 3);
        assert_eq!(err.detail()["detail"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_validation_errors_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());
        assert!(ValidationErrors::from(ValidationError::missing()).into_result().is_err());
    }

    #[test]
    fn test_configuration_error_messages() {
        let err = ConfigurationError::MultipleBodies {
            endpoint: "create".into(),
            first: "a".into(),
            second: "b".into(),
        };
        assert_eq!(
            err.to_string(),
            "create: only one body parameter is allowed, found `a` and `b`"
        );
    }

    #[test]
    fn test_http_error_defaults() {
        let err = HttpError::not_found();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.detail, json!("Not Found"));
        assert_eq!(err.to_string(), "HTTP 404: \"Not Found\"");
    }
}
