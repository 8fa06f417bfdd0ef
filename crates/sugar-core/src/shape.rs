//! Response shaping.
//!
//! Handlers return a [`Reply`]. When a route declares a response type, a
//! structured JSON reply is validated against it and serialized under the
//! route's [`DumpOptions`]; anything else passes through.

use serde_json::Value;
use tracing::warn;

use crate::error::ResponseValidationError;
use crate::model::{DumpOptions, ModelInstance, Raw};
use crate::response::{IntoResponse, Response, StatusCode};
use crate::types::TypeDescriptor;

/// What a handler produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Plain JSON, shaped when the route declares a response type.
    Json(Value),
    /// An already validated instance, dumped under the route's options.
    Model(ModelInstance),
    /// A finished response, sent untouched.
    Response(Response),
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<ModelInstance> for Reply {
    fn from(instance: ModelInstance) -> Self {
        Self::Model(instance)
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Self::Response(Response::text(text))
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Self::Response(Response::text(text))
    }
}

/// How a route turns replies into responses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseShape {
    pub model: Option<TypeDescriptor>,
    pub options: DumpOptions,
    /// Status of shaped responses; `200` when unset.
    pub status: Option<StatusCode>,
}

impl ResponseShape {
    /// Shape a reply into a response with the route's status code.
    pub fn shape(&self, reply: Reply) -> Result<Response, ResponseValidationError> {
        let value = match reply {
            Reply::Response(response) => return Ok(response),
            Reply::Model(instance) => instance.dump(&self.options),
            Reply::Json(value) => self.shape_json(value)?,
        };
        Ok(Response::json(&value).status(self.status.unwrap_or(StatusCode::OK)))
    }

    /// Validate structured JSON against the declared type and dump it.
    /// Scalars, and anything when no type is declared, pass through.
    pub fn shape_json(&self, value: Value) -> Result<Value, ResponseValidationError> {
        let Some(model) = self.model.as_ref().filter(|_| value.is_object() || value.is_array())
        else {
            return Ok(value);
        };
        match model.validate(Raw::Value(value)) {
            Ok(validated) => Ok(validated.dump(&self.options)),
            Err(errors) => {
                warn!(
                    model = %model,
                    errors = errors.len(),
                    "handler output does not match the response model"
                );
                Err(ResponseValidationError { errors })
            }
        }
    }

    /// Like [`shape`](Self::shape), rendering a failure as a `500`.
    #[must_use]
    pub fn respond(&self, reply: Reply) -> Response {
        self.shape(reply).unwrap_or_else(IntoResponse::into_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelDescriptor, ModelField};
    use serde_json::json;

    fn shape() -> ResponseShape {
        ResponseShape {
            model: Some(TypeDescriptor::model(
                ModelDescriptor::new("Item")
                    .field(ModelField::typed::<i64>("id"))
                    .field(ModelField::typed::<Option<String>>("q"))
                    .field(ModelField::typed::<bool>("visible").alias("isVisible").default(json!(true)))
                    .build(),
            )),
            ..ResponseShape::default()
        }
    }

    fn body(response: &Response) -> Value {
        serde_json::from_slice(response.body_bytes()).unwrap()
    }

    #[test]
    fn test_round_trip_adds_defaults() {
        let response = shape().shape(json!({"id": 42, "q": "hello"}).into()).unwrap();
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(body(&response), json!({"id": 42, "q": "hello", "isVisible": true}));
    }

    #[test]
    fn test_options_apply() {
        let mut shape = shape();
        shape.options = DumpOptions::default().exclude_unset(true).by_alias(false);
        shape.status = Some(StatusCode::CREATED);
        let response = shape.shape(json!({"id": "7"}).into()).unwrap();
        assert_eq!(response.status_code(), StatusCode::CREATED);
        assert_eq!(body(&response), json!({"id": 7}));
    }

    #[test]
    fn test_invalid_output_is_server_error() {
        let err = shape().shape(json!({"q": 1}).into()).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        let response = shape().respond(json!({}).into());
        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_passthrough() {
        let response = shape().shape(Reply::from("plain")).unwrap();
        assert_eq!(response.body_bytes(), b"plain");
        let untyped = ResponseShape::default().shape(json!({"any": [1]}).into()).unwrap();
        assert_eq!(body(&untyped), json!({"any": [1]}));
        let scalar = shape().shape(json!(5).into()).unwrap();
        assert_eq!(body(&scalar), json!(5));
    }
}
