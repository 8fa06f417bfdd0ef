//! OpenAPI 3 types and documentation page templates.
//!
//! This crate provides:
//!
//! - OpenAPI document types ([`OpenApi`], [`Operation`], [`Components`], ...)
//! - JSON Schema types ([`Schema`] and friends)
//! - HTML shells for Swagger UI and ReDoc
//!
//! It knows nothing about requests or handlers; the schema derivation engine
//! in `sugar-core` fills these types in by walking registered routes.
//!
//! # Example
//!
//! ```
//! use sugar_openapi::{OpenApiBuilder, Operation, Schema};
//!
//! let doc = OpenApiBuilder::new("My API", "1.0.0")
//!     .operation("get", "/items", Operation::default())
//!     .schema("Item", Schema::string())
//!     .build();
//! assert!(doc.paths.contains_key("/items"));
//! ```

#![forbid(unsafe_code)]

mod schema;
mod spec;
pub mod ui;

pub use schema::{
    ArraySchema, ObjectSchema, ObjectType, PrimitiveSchema, RefSchema, Schema, SchemaType,
};
pub use spec::{
    Components, Contact, Info, License, MediaType, OpenApi, OpenApiBuilder, Operation, Parameter,
    ParameterLocation, PathItem, RequestBody, Response, ResponseEntry, SecurityRequirement,
    Server, Tag,
};
