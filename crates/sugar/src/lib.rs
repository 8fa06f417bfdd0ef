//! Declarative request binding, validation and OpenAPI generation.
//!
//! sugar lets a route declare its inputs once and derives everything else
//! from that declaration:
//!
//! - **Binding**: each argument is read from the path, query string,
//!   headers, cookies, JSON or form body, or uploaded files
//! - **Validation**: values are coerced and checked, and every failure is
//!   reported together as a `422` response
//! - **Response shaping**: handler output is validated against the declared
//!   response model and serialized with its aliases and defaults
//! - **OpenAPI**: the document, Swagger UI and ReDoc pages are generated
//!   from the registered routes
//!
//! # Quick Start
//!
//! ```ignore
//! use sugar::prelude::*;
//!
//! #[derive(Model, Serialize, Deserialize)]
//! struct Item {
//!     id: i64,
//!     q: Option<String>,
//! }
//!
//! async fn read_item(args: BoundArgs) -> Result<Value, HttpError> {
//!     let id: i64 = args.get("item_id")?;
//!     let q: Option<String> = args.get("q")?;
//!     Ok(json!({"id": id, "q": q}))
//! }
//!
//! let app = App::builder()
//!     .config(AppConfig::new().title("Inventory"))
//!     .get(
//!         "/items/<int:item_id>",
//!         Signature::new()
//!             .arg(Arg::new("item_id").typed::<i64>())
//!             .arg(Arg::new("q").typed::<Option<String>>().default(Value::Null)),
//!         read_item,
//!         RouteConfig::new().response_type::<Item>(),
//!     )?
//!     .build();
//!
//! let client = TestClient::new(app);
//! assert_eq!(client.get("/items/42?q=hello").send().json(), json!({"id": 42, "q": "hello"}));
//! ```
//!
//! # Crate Structure
//!
//! - [`sugar_core`]: binding, validation, shaping, schema derivation, the app
//! - [`sugar_router`]: path normalization and route lookup
//! - [`sugar_macros`]: `#[derive(Model)]`
//! - [`sugar_openapi`]: OpenAPI types and documentation pages

#![forbid(unsafe_code)]

pub use sugar_core as core;
pub use sugar_macros as macros;
pub use sugar_openapi as openapi;
pub use sugar_router as router;

pub use sugar_core::{
    App, AppBuilder, AppConfig, Arg, BoundArgs, ConfigurationError, Described, DumpOptions,
    HttpError, IntoResponse, Marker, Method, Model, ModelDescriptor, ModelField, Reply, Request,
    RequestValidationError, Response, RouteConfig, RouteGroup, Signature, StatusCode,
    TypeDescriptor, UploadFile, ValidationError, ValidationErrors,
};
pub use sugar_core::{MultipartBody, RequestBuilder, TestClient, TestResponse};
pub use sugar_macros::Model;
pub use sugar_openapi::{OpenApi, OpenApiBuilder};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        App, AppBuilder, AppConfig, Arg, BoundArgs, ConfigurationError, Described, DumpOptions,
        HttpError, IntoResponse, Marker, Method, Model, ModelDescriptor, ModelField, OpenApi,
        Reply, Request, Response, RouteConfig, RouteGroup, Signature, StatusCode, TestClient,
        TypeDescriptor, UploadFile,
    };
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};
    pub use ::sugar_core;
}

/// Testing utilities module.
pub mod testing {
    pub use sugar_core::testing::{
        MultipartBody, RequestBuilder, TestClient, TestResponse, json_contains,
    };
}
