//! Request binding, validation and OpenAPI derivation.
//!
//! A route declares its inputs once as a [`Signature`]. Registration turns
//! it into a [`BindingPlan`] that says where every value comes from (path,
//! query, header, cookie, body or uploaded file). At request time the
//! [`binder`] fetches and validates each group of values, reporting every
//! failure at once, and the handler receives a [`BoundArgs`] mapping.
//! Handler output is shaped against the declared response type, and the
//! same plans drive the generated OpenAPI document.
//!
//! # Modules
//!
//! - [`model`] and [`types`]: composite type descriptors and validation
//! - [`params`] and [`signature`]: parameter markers and declarations
//! - [`plan`]: registration-time classification
//! - [`binder`]: request-time extraction
//! - [`shape`]: response shaping
//! - [`openapi`]: schema derivation
//! - [`app`] and [`route`]: registration and dispatch
//! - [`testing`]: an in-process test client

#![forbid(unsafe_code)]

extern crate self as sugar_core;

pub mod app;
pub mod binder;
pub mod config;
pub mod error;
pub mod model;
pub mod multipart;
pub mod openapi;
pub mod params;
pub mod plan;
pub mod query;
pub mod request;
pub mod response;
pub mod route;
pub mod shape;
pub mod signature;
pub mod testing;
pub mod types;

pub use app::{App, AppBuilder, DocRouteFilter, ValidationErrorHandler};
pub use binder::{ArgValue, BoundArgs, bind};
pub use config::AppConfig;
pub use error::{
    ConfigError, ConfigurationError, ErrorKind, HttpError, LocItem, RequestValidationError,
    ResponseValidationError, ValidationError, ValidationErrors,
};
pub use model::{
    DumpOptions, FieldDefault, Model, ModelDescriptor, ModelField, ModelInstance, Raw, Validated,
};
pub use multipart::{MultipartConfig, MultipartError, MultipartForm, Part, UploadFile};
pub use openapi::{RouteDocMeta, SchemaRegistry, build_operation};
pub use params::{
    FORM_MEDIA_TYPE, JSON_MEDIA_TYPE, MULTIPART_MEDIA_TYPE, Marker, ParamInfo, ParamSource,
};
pub use plan::{BindingPlan, BodyDescriptor, FieldDescriptor};
pub use query::QueryString;
pub use request::{Headers, Method, Request};
pub use response::{IntoResponse, Response, StatusCode};
pub use route::{
    BoxFuture, BoxHandler, RouteConfig, RouteEntry, RouteGroup, default_endpoint, handler_endpoint,
};
pub use shape::{Reply, ResponseShape};
pub use signature::{Arg, ArgDefault, Signature};
pub use testing::{MultipartBody, RequestBuilder, TestClient, TestResponse, json_contains};
pub use types::{Constraints, Described, Pattern, TypeDescriptor};

pub use sugar_openapi as openapi_types;
pub use sugar_router::{combine_paths, convert_path};

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}
