//! Parameter source markers.
//!
//! A [`Marker`] is placed as a handler argument's default to say where the
//! value comes from and how it is documented:
//!
//! ```
//! use sugar_core::Marker;
//! use serde_json::json;
//!
//! let token = Marker::header().alias("X-Token").description("API token");
//! let page = Marker::query().default(json!(1)).ge(1.0);
//! # let _ = (token, page);
//! ```

use serde_json::Value;

use crate::model::FieldDefault;
use crate::types::{Constraints, Pattern};

/// Media type of a JSON body.
pub const JSON_MEDIA_TYPE: &str = "application/json";
/// Media type of a urlencoded form body.
pub const FORM_MEDIA_TYPE: &str = "application/x-www-form-urlencoded";
/// Media type of a body carrying files.
pub const MULTIPART_MEDIA_TYPE: &str = "multipart/form-data";

/// Request location a parameter is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamSource {
    Path,
    Query,
    Header,
    Cookie,
    Body,
    File,
}

impl ParamSource {
    /// Location name used in error paths and schema `in` fields.
    /// Files travel in the body.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Cookie => "cookie",
            Self::Body | Self::File => "body",
        }
    }
}

/// Metadata shared by every marker.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamInfo {
    pub default: FieldDefault,
    /// Wire name; the parameter name when unset.
    pub alias: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub examples: Vec<Value>,
    pub deprecated: bool,
    pub include_in_schema: bool,
    pub constraints: Constraints,
    /// Body media type override.
    pub media_type: Option<String>,
}

impl Default for ParamInfo {
    fn default() -> Self {
        Self {
            default: FieldDefault::Required,
            alias: None,
            title: None,
            description: None,
            examples: Vec::new(),
            deprecated: false,
            include_in_schema: true,
            constraints: Constraints::default(),
            media_type: None,
        }
    }
}

/// Where a parameter comes from, with its documentation and constraints.
#[derive(Debug, Clone, PartialEq)]
pub enum Marker {
    Path(ParamInfo),
    Query(ParamInfo),
    Header(ParamInfo),
    Cookie(ParamInfo),
    /// A JSON body.
    Body(ParamInfo),
    /// A form body, urlencoded or multipart.
    Form(ParamInfo),
    /// An uploaded file.
    File(ParamInfo),
}

impl Marker {
    #[must_use]
    pub fn path() -> Self {
        Self::Path(ParamInfo::default())
    }

    #[must_use]
    pub fn query() -> Self {
        Self::Query(ParamInfo::default())
    }

    #[must_use]
    pub fn header() -> Self {
        Self::Header(ParamInfo::default())
    }

    #[must_use]
    pub fn cookie() -> Self {
        Self::Cookie(ParamInfo::default())
    }

    #[must_use]
    pub fn body() -> Self {
        Self::Body(ParamInfo::default())
    }

    #[must_use]
    pub fn form() -> Self {
        Self::Form(ParamInfo::default())
    }

    #[must_use]
    pub fn file() -> Self {
        Self::File(ParamInfo::default())
    }

    /// The request location this marker reads from.
    #[must_use]
    pub fn source(&self) -> ParamSource {
        match self {
            Self::Path(_) => ParamSource::Path,
            Self::Query(_) => ParamSource::Query,
            Self::Header(_) => ParamSource::Header,
            Self::Cookie(_) => ParamSource::Cookie,
            Self::Body(_) | Self::Form(_) => ParamSource::Body,
            Self::File(_) => ParamSource::File,
        }
    }

    /// Default body media type for this marker.
    #[must_use]
    pub fn body_media_type(&self) -> Option<&str> {
        let fallback = match self {
            Self::Body(_) => JSON_MEDIA_TYPE,
            Self::Form(_) => FORM_MEDIA_TYPE,
            Self::File(_) => MULTIPART_MEDIA_TYPE,
            _ => return None,
        };
        Some(self.info().media_type.as_deref().unwrap_or(fallback))
    }

    #[must_use]
    pub fn is_form(&self) -> bool {
        matches!(self, Self::Form(_))
    }

    #[must_use]
    pub fn info(&self) -> &ParamInfo {
        match self {
            Self::Path(info)
            | Self::Query(info)
            | Self::Header(info)
            | Self::Cookie(info)
            | Self::Body(info)
            | Self::Form(info)
            | Self::File(info) => info,
        }
    }

    fn info_mut(&mut self) -> &mut ParamInfo {
        match self {
            Self::Path(info)
            | Self::Query(info)
            | Self::Header(info)
            | Self::Cookie(info)
            | Self::Body(info)
            | Self::Form(info)
            | Self::File(info) => info,
        }
    }

    fn with(mut self, f: impl FnOnce(&mut ParamInfo)) -> Self {
        f(self.info_mut());
        self
    }

    /// Make the parameter optional with a default value.
    #[must_use]
    pub fn default(self, value: Value) -> Self {
        self.with(|i| i.default = FieldDefault::Value(value))
    }

    #[must_use]
    pub fn alias(self, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        self.with(|i| i.alias = Some(alias))
    }

    #[must_use]
    pub fn title(self, title: impl Into<String>) -> Self {
        let title = title.into();
        self.with(|i| i.title = Some(title))
    }

    #[must_use]
    pub fn description(self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.with(|i| i.description = Some(description))
    }

    #[must_use]
    pub fn example(self, example: Value) -> Self {
        self.with(|i| i.examples.push(example))
    }

    #[must_use]
    pub fn deprecated(self, deprecated: bool) -> Self {
        self.with(|i| i.deprecated = deprecated)
    }

    /// Hide the parameter from the generated schema.
    #[must_use]
    pub fn include_in_schema(self, include: bool) -> Self {
        self.with(|i| i.include_in_schema = include)
    }

    #[must_use]
    pub fn media_type(self, media_type: impl Into<String>) -> Self {
        let media_type = media_type.into();
        self.with(|i| i.media_type = Some(media_type))
    }

    #[must_use]
    pub fn gt(self, bound: f64) -> Self {
        self.with(|i| i.constraints.gt = Some(bound))
    }

    #[must_use]
    pub fn ge(self, bound: f64) -> Self {
        self.with(|i| i.constraints.ge = Some(bound))
    }

    #[must_use]
    pub fn lt(self, bound: f64) -> Self {
        self.with(|i| i.constraints.lt = Some(bound))
    }

    #[must_use]
    pub fn le(self, bound: f64) -> Self {
        self.with(|i| i.constraints.le = Some(bound))
    }

    #[must_use]
    pub fn multiple_of(self, factor: f64) -> Self {
        self.with(|i| i.constraints.multiple_of = Some(factor))
    }

    #[must_use]
    pub fn min_length(self, len: usize) -> Self {
        self.with(|i| i.constraints.min_length = Some(len))
    }

    #[must_use]
    pub fn max_length(self, len: usize) -> Self {
        self.with(|i| i.constraints.max_length = Some(len))
    }

    #[must_use]
    pub fn pattern(self, pattern: Pattern) -> Self {
        self.with(|i| i.constraints.pattern = Some(pattern))
    }
}
