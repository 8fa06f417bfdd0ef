//! Route registration.
//!
//! A route is compiled once: its rule is normalized, its [`BindingPlan`] is
//! built from the declared [`Signature`], and its documentation metadata is
//! fixed. [`RouteGroup`] collects routes under a shared prefix, tags and
//! deprecation flag before they are added to an application.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use sugar_openapi::SecurityRequirement;
use sugar_router::{combine_paths, convert_path, crowded_segment};

use crate::binder::BoundArgs;
use crate::error::{ConfigurationError, HttpError};
use crate::model::DumpOptions;
use crate::openapi::RouteDocMeta;
use crate::plan::BindingPlan;
use crate::request::Method;
use crate::response::StatusCode;
use crate::shape::{Reply, ResponseShape};
use crate::signature::Signature;
use crate::types::{Described, TypeDescriptor};

/// A boxed, sendable future.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A type-erased route handler.
pub type BoxHandler = Arc<dyn Fn(BoundArgs) -> BoxFuture<Result<Reply, HttpError>> + Send + Sync>;

/// Erase a handler's concrete future and reply types.
pub fn box_handler<H, Fut, R>(handler: H) -> BoxHandler
where
    H: Fn(BoundArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, HttpError>> + Send + 'static,
    R: Into<Reply>,
{
    Arc::new(move |args| {
        let fut = handler(args);
        Box::pin(async move { fut.await.map(Into::into) })
    })
}

/// Per-route documentation and response settings.
///
/// ```
/// use sugar_core::{RouteConfig, StatusCode};
///
/// let config = RouteConfig::new()
///     .tags(["items"])
///     .summary("Create an item")
///     .status_code(StatusCode::CREATED);
/// assert_eq!(config.response_description, "success");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RouteConfig {
    /// Include the route in the generated document.
    pub doc_enable: bool,
    pub tags: Vec<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub response_model: Option<TypeDescriptor>,
    pub status_code: StatusCode,
    pub response_description: String,
    /// Additional responses keyed by status, documented verbatim.
    pub responses: IndexMap<String, Value>,
    pub deprecated: bool,
    pub operation_id: Option<String>,
    pub security: Vec<SecurityRequirement>,
    pub extra: IndexMap<String, Value>,
    /// Endpoint identifier. When unset, the handler function's name is used,
    /// or one derived from the rule for closures.
    pub endpoint: Option<String>,
    /// Serialization options for shaped responses.
    pub dump: DumpOptions,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            doc_enable: true,
            tags: Vec::new(),
            summary: None,
            description: None,
            response_model: None,
            status_code: StatusCode::OK,
            response_description: "success".to_string(),
            responses: IndexMap::new(),
            deprecated: false,
            operation_id: None,
            security: Vec::new(),
            extra: IndexMap::new(),
            endpoint: None,
            dump: DumpOptions::default(),
        }
    }
}

impl RouteConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn doc_enable(mut self, enable: bool) -> Self {
        self.doc_enable = enable;
        self
    }

    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declare the response type; replies are validated against it.
    #[must_use]
    pub fn response_model(mut self, ty: TypeDescriptor) -> Self {
        self.response_model = Some(ty);
        self
    }

    /// Declare the response type from a Rust type.
    #[must_use]
    pub fn response_type<T: Described + ?Sized>(self) -> Self {
        self.response_model(T::descriptor())
    }

    #[must_use]
    pub fn status_code(mut self, status: StatusCode) -> Self {
        self.status_code = status;
        self
    }

    #[must_use]
    pub fn response_description(mut self, description: impl Into<String>) -> Self {
        self.response_description = description.into();
        self
    }

    /// Document an additional response, e.g. `response(404, json!({...}))`.
    #[must_use]
    pub fn response(mut self, status: impl ToString, response: Value) -> Self {
        self.responses.insert(status.to_string(), response);
        self
    }

    #[must_use]
    pub fn deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = deprecated;
        self
    }

    #[must_use]
    pub fn operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = Some(operation_id.into());
        self
    }

    #[must_use]
    pub fn security(mut self, requirement: SecurityRequirement) -> Self {
        self.security.push(requirement);
        self
    }

    /// Merge a free-form field into the operation object.
    #[must_use]
    pub fn extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    #[must_use]
    pub fn dump_options(mut self, options: DumpOptions) -> Self {
        self.dump = options;
        self
    }
}

/// A compiled route.
pub struct RouteEntry {
    /// Rule as registered.
    pub rule: String,
    /// Normalized `{name}` template.
    pub path: String,
    pub methods: Vec<Method>,
    pub endpoint: String,
    pub plan: Arc<BindingPlan>,
    pub doc: RouteDocMeta,
    pub doc_enable: bool,
    pub shape: ResponseShape,
    pub handler: BoxHandler,
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("path", &self.path)
            .field("methods", &self.methods)
            .field("endpoint", &self.endpoint)
            .field("plan", &self.plan)
            .finish_non_exhaustive()
    }
}

impl RouteEntry {
    /// Compile a route, building its binding plan.
    pub fn compile(
        rule: &str,
        methods: &[Method],
        signature: &Signature,
        handler: BoxHandler,
        config: RouteConfig,
    ) -> Result<Self, ConfigurationError> {
        let mut unique: Vec<Method> = Vec::with_capacity(methods.len());
        for method in methods {
            if !unique.contains(method) {
                unique.push(*method);
            }
        }
        if unique.is_empty() {
            return Err(ConfigurationError::NoMethods {
                rule: rule.to_string(),
            });
        }

        if let Some(segment) = crowded_segment(rule) {
            return Err(ConfigurationError::CrowdedPathSegment {
                rule: rule.to_string(),
                segment: segment.to_string(),
            });
        }

        let path = convert_path(rule);
        let endpoint = config.endpoint.unwrap_or_else(|| default_endpoint(rule));
        let plan = BindingPlan::build(&endpoint, rule, signature)?;

        let doc = RouteDocMeta {
            path: path.clone(),
            methods: unique.clone(),
            endpoint: endpoint.clone(),
            tags: config.tags,
            summary: config.summary,
            description: config.description,
            deprecated: config.deprecated,
            operation_id: config.operation_id,
            response_description: config.response_description,
            response_model: config.response_model.clone(),
            status_code: config.status_code,
            responses: config.responses,
            security: config.security,
            extra: config.extra,
        };
        let shape = ResponseShape {
            model: config.response_model,
            options: config.dump,
            status: Some(config.status_code),
        };

        Ok(Self {
            rule: rule.to_string(),
            path,
            methods: unique,
            endpoint,
            plan: Arc::new(plan),
            doc,
            doc_enable: config.doc_enable,
            shape,
            handler,
        })
    }
}

/// Endpoint identifier derived from a rule: `/items/<int:item_id>` becomes
/// `items_item_id`, and `/` becomes `root`.
#[must_use]
pub fn default_endpoint(rule: &str) -> String {
    let template = convert_path(rule);
    let cleaned: String = template
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let joined = cleaned
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    if joined.is_empty() {
        "root".to_string()
    } else {
        joined
    }
}

/// Endpoint identifier taken from a handler's own name.
///
/// A plain function `my_app::views::read_item` yields `read_item`. Closures
/// have no usable name and yield `None`.
#[must_use]
pub fn handler_endpoint<H>() -> Option<String> {
    let full = std::any::type_name::<H>();
    let path = full.split('<').next().unwrap_or(full);
    let name = path.rsplit("::").next().unwrap_or(path);
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_');
    valid.then(|| name.to_string())
}

pub(crate) struct PendingRoute {
    pub(crate) rule: String,
    pub(crate) methods: Vec<Method>,
    pub(crate) signature: Signature,
    pub(crate) handler: BoxHandler,
    pub(crate) config: RouteConfig,
}

/// A named collection of routes sharing a prefix, tags and deprecation.
///
/// Group tags default to the group name. Each route's tags are appended to
/// the group's, its deprecation is ORed with the group's, and its endpoint
/// becomes `{group}.{endpoint}`.
///
/// ```
/// use sugar_core::{RouteConfig, RouteGroup, Signature};
/// use serde_json::json;
///
/// let users = RouteGroup::new("users")
///     .prefix("/api/users")
///     .get("/", Signature::new(), |_| async { Ok(json!([])) }, RouteConfig::new());
/// assert_eq!(users.len(), 1);
/// ```
pub struct RouteGroup {
    name: String,
    prefix: String,
    tags: Vec<String>,
    deprecated: bool,
    routes: Vec<PendingRoute>,
}

impl fmt::Debug for RouteGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteGroup")
            .field("name", &self.name)
            .field("prefix", &self.prefix)
            .field("tags", &self.tags)
            .field("deprecated", &self.deprecated)
            .field("routes", &self.routes.len())
            .finish()
    }
}

impl RouteGroup {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            tags: vec![name.clone()],
            name,
            prefix: String::new(),
            deprecated: false,
            routes: Vec::new(),
        }
    }

    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Replace the group tags.
    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = deprecated;
        self
    }

    /// Add a route. Errors surface when the group is included.
    #[must_use]
    pub fn route<H, Fut, R>(
        mut self,
        rule: impl Into<String>,
        methods: &[Method],
        signature: Signature,
        handler: H,
        config: RouteConfig,
    ) -> Self
    where
        H: Fn(BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HttpError>> + Send + 'static,
        R: Into<Reply>,
    {
        let mut config = config;
        if config.endpoint.is_none() {
            config.endpoint = handler_endpoint::<H>();
        }
        self.routes.push(PendingRoute {
            rule: rule.into(),
            methods: methods.to_vec(),
            signature,
            handler: box_handler(handler),
            config,
        });
        self
    }

    #[must_use]
    pub fn get<H, Fut, R>(self, rule: impl Into<String>, signature: Signature, handler: H, config: RouteConfig) -> Self
    where
        H: Fn(BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HttpError>> + Send + 'static,
        R: Into<Reply>,
    {
        self.route(rule, &[Method::Get], signature, handler, config)
    }

    #[must_use]
    pub fn post<H, Fut, R>(self, rule: impl Into<String>, signature: Signature, handler: H, config: RouteConfig) -> Self
    where
        H: Fn(BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HttpError>> + Send + 'static,
        R: Into<Reply>,
    {
        self.route(rule, &[Method::Post], signature, handler, config)
    }

    #[must_use]
    pub fn put<H, Fut, R>(self, rule: impl Into<String>, signature: Signature, handler: H, config: RouteConfig) -> Self
    where
        H: Fn(BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HttpError>> + Send + 'static,
        R: Into<Reply>,
    {
        self.route(rule, &[Method::Put], signature, handler, config)
    }

    #[must_use]
    pub fn patch<H, Fut, R>(self, rule: impl Into<String>, signature: Signature, handler: H, config: RouteConfig) -> Self
    where
        H: Fn(BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HttpError>> + Send + 'static,
        R: Into<Reply>,
    {
        self.route(rule, &[Method::Patch], signature, handler, config)
    }

    #[must_use]
    pub fn delete<H, Fut, R>(self, rule: impl Into<String>, signature: Signature, handler: H, config: RouteConfig) -> Self
    where
        H: Fn(BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HttpError>> + Send + 'static,
        R: Into<Reply>,
    {
        self.route(rule, &[Method::Delete], signature, handler, config)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of routes in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Compile every route with the group's prefix, tags and endpoint
    /// namespace applied.
    pub(crate) fn into_entries(self) -> Result<Vec<RouteEntry>, ConfigurationError> {
        let Self {
            name,
            prefix,
            tags,
            deprecated,
            routes,
        } = self;
        routes
            .into_iter()
            .map(|route| {
                let mut config = route.config;
                let endpoint = config
                    .endpoint
                    .take()
                    .unwrap_or_else(|| default_endpoint(&route.rule));
                if endpoint.contains('.') {
                    return Err(ConfigurationError::DottedEndpoint { endpoint });
                }
                config.endpoint = Some(format!("{name}.{endpoint}"));
                let mut merged = tags.clone();
                merged.append(&mut config.tags);
                config.tags = merged;
                config.deprecated |= deprecated;

                let rule = combine_paths(&prefix, &route.rule);
                RouteEntry::compile(&rule, &route.methods, &route.signature, route.handler, config)
            })
            .collect()
    }
}
