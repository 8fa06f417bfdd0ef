//! Derive macros for sugar.
//!
//! `#[derive(Model)]` describes a struct as a composite type so it can be
//! used as a request body, a nested field, or a response model:
//!
//! ```ignore
//! use sugar::prelude::*;
//!
//! /// An inventory item.
//! #[derive(Model, serde::Serialize, serde::Deserialize)]
//! struct Item {
//!     #[model(ge = 0)]
//!     id: i64,
//!     /// Free-text note.
//!     q: Option<String>,
//!     #[model(alias = "isVisible", default = true)]
//!     visible: bool,
//! }
//! ```
//!
//! Generated code refers to `sugar_core`, which must be in scope (directly
//! or through `sugar::prelude`).

mod model;

use proc_macro::TokenStream;

/// Derive `sugar_core::Model` and `sugar_core::Described`.
///
/// Container attributes: `#[model(name = "...", title = "...", description = "...")]`.
///
/// Field attributes: `alias`, `title`, `description`, `deprecated`,
/// `example`, `default`, `ge`, `gt`, `le`, `lt`, `multiple_of`,
/// `min_length`, `max_length`, `pattern` and `skip`. Doc comments become
/// descriptions.
#[proc_macro_derive(Model, attributes(model))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    model::derive_model_impl(input)
}
