//! Path templates and route lookup.
//!
//! This crate provides the routing pieces the binding engine needs:
//!
//! - [`Method`] for HTTP verbs
//! - [`convert_path`] normalizing `<int:id>` rules to `{id}` templates
//! - [`PathTemplate`] for placeholder extraction and matching
//! - [`Router`] for method-aware lookup with `405` detection

#![forbid(unsafe_code)]

mod r#match;
mod method;
mod path;
mod router;

pub use r#match::{AllowedMethods, RouteLookup, RouteMatch};
pub use method::{Method, ParseMethodError};
pub use path::{
    PathTemplate, Segment, combine_paths, convert_path, crowded_segment, path_param_names,
};
pub use router::Router;
