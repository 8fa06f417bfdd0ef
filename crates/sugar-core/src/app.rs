//! Application assembly and dispatch.
//!
//! [`AppBuilder`] compiles routes as they are registered, so configuration
//! mistakes surface immediately as [`ConfigurationError`]s. The built [`App`]
//! dispatches requests through lookup, binding, the handler and response
//! shaping, serves the documentation routes, and derives the OpenAPI
//! document from its routes.
//!
//! ```
//! use sugar_core::{App, AppConfig, Arg, BoundArgs, HttpError, Method, Request, RouteConfig, Signature};
//! use serde_json::{Value, json};
//!
//! async fn read_item(args: BoundArgs) -> Result<Value, HttpError> {
//!     let id: i64 = args.get("item_id")?;
//!     Ok(json!({"id": id}))
//! }
//!
//! let app = App::builder()
//!     .config(AppConfig::new().title("Inventory"))
//!     .get(
//!         "/items/<int:item_id>",
//!         Signature::new().arg(Arg::new("item_id").typed::<i64>()),
//!         read_item,
//!         RouteConfig::new(),
//!     )
//!     .unwrap()
//!     .build();
//!
//! let response = futures_executor::block_on(app.handle(Request::new(Method::Get, "/items/7")));
//! assert_eq!(response.status_code().as_u16(), 200);
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;
use sugar_openapi::{OpenApi, OpenApiBuilder, ui};
use sugar_router::{RouteLookup, Router};
use tracing::{debug, info};

use crate::binder::{self, BoundArgs};
use crate::config::AppConfig;
use crate::error::{ConfigurationError, HttpError, RequestValidationError};
use crate::openapi::{SchemaRegistry, build_operation};
use crate::request::{Method, Request};
use crate::response::{IntoResponse, Response, StatusCode};
use crate::route::{RouteConfig, RouteEntry, RouteGroup, box_handler, handler_endpoint};
use crate::shape::Reply;
use crate::signature::Signature;

/// Renders a failed binding into a response.
pub type ValidationErrorHandler =
    Arc<dyn Fn(&Request, RequestValidationError) -> Response + Send + Sync>;

/// Decides whether a documented route appears in the schema.
pub type DocRouteFilter = Arc<dyn Fn(&RouteEntry) -> bool + Send + Sync>;

/// Builder for [`App`].
#[derive(Default)]
pub struct AppBuilder {
    config: AppConfig,
    routes: Vec<RouteEntry>,
    router: Router<usize>,
    validation_error_handler: Option<ValidationErrorHandler>,
    doc_route_filter: Option<DocRouteFilter>,
}

impl fmt::Debug for AppBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppBuilder")
            .field("config", &self.config)
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

impl AppBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the default `422` rendering of validation failures.
    #[must_use]
    pub fn validation_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Request, RequestValidationError) -> Response + Send + Sync + 'static,
    {
        self.validation_error_handler = Some(Arc::new(handler));
        self
    }

    /// Hide routes from the schema when `filter` returns false.
    #[must_use]
    pub fn doc_route_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&RouteEntry) -> bool + Send + Sync + 'static,
    {
        self.doc_route_filter = Some(Arc::new(filter));
        self
    }

    /// Register a route.
    ///
    /// Without a configured endpoint, a named handler function lends its
    /// own name; closures fall back to one derived from the rule.
    pub fn route<H, Fut, R>(
        self,
        rule: &str,
        methods: &[Method],
        signature: Signature,
        handler: H,
        mut config: RouteConfig,
    ) -> Result<Self, ConfigurationError>
    where
        H: Fn(BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HttpError>> + Send + 'static,
        R: Into<Reply>,
    {
        if config.endpoint.is_none() {
            config.endpoint = handler_endpoint::<H>();
        }
        let entry = RouteEntry::compile(rule, methods, &signature, box_handler(handler), config)?;
        self.add_entry(entry)
    }

    pub fn get<H, Fut, R>(
        self,
        rule: &str,
        signature: Signature,
        handler: H,
        config: RouteConfig,
    ) -> Result<Self, ConfigurationError>
    where
        H: Fn(BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HttpError>> + Send + 'static,
        R: Into<Reply>,
    {
        self.route(rule, &[Method::Get], signature, handler, config)
    }

    pub fn post<H, Fut, R>(
        self,
        rule: &str,
        signature: Signature,
        handler: H,
        config: RouteConfig,
    ) -> Result<Self, ConfigurationError>
    where
        H: Fn(BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HttpError>> + Send + 'static,
        R: Into<Reply>,
    {
        self.route(rule, &[Method::Post], signature, handler, config)
    }

    pub fn put<H, Fut, R>(
        self,
        rule: &str,
        signature: Signature,
        handler: H,
        config: RouteConfig,
    ) -> Result<Self, ConfigurationError>
    where
        H: Fn(BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HttpError>> + Send + 'static,
        R: Into<Reply>,
    {
        self.route(rule, &[Method::Put], signature, handler, config)
    }

    pub fn patch<H, Fut, R>(
        self,
        rule: &str,
        signature: Signature,
        handler: H,
        config: RouteConfig,
    ) -> Result<Self, ConfigurationError>
    where
        H: Fn(BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HttpError>> + Send + 'static,
        R: Into<Reply>,
    {
        self.route(rule, &[Method::Patch], signature, handler, config)
    }

    pub fn delete<H, Fut, R>(
        self,
        rule: &str,
        signature: Signature,
        handler: H,
        config: RouteConfig,
    ) -> Result<Self, ConfigurationError>
    where
        H: Fn(BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HttpError>> + Send + 'static,
        R: Into<Reply>,
    {
        self.route(rule, &[Method::Delete], signature, handler, config)
    }

    /// Register every route of a group.
    pub fn include_group(mut self, group: RouteGroup) -> Result<Self, ConfigurationError> {
        let name = group.name().to_string();
        for entry in group.into_entries()? {
            self = self.add_entry(entry)?;
        }
        debug!(group = %name, "route group included");
        Ok(self)
    }

    fn add_entry(mut self, entry: RouteEntry) -> Result<Self, ConfigurationError> {
        if let Some(method) = entry
            .methods
            .iter()
            .find(|m| self.router.contains(&entry.path, **m))
        {
            return Err(ConfigurationError::DuplicateRoute {
                method: method.as_str().to_string(),
                path: entry.path.clone(),
            });
        }

        info!(
            endpoint = %entry.endpoint,
            path = %entry.path,
            methods = ?entry.methods,
            "route registered"
        );
        debug!(
            endpoint = %entry.endpoint,
            params = entry.plan.params.len(),
            body = entry.plan.body.is_some(),
            files = entry.plan.files.len(),
            "binding plan compiled"
        );

        let index = self.routes.len();
        self.router.add(&entry.path, &entry.methods, index);
        self.routes.push(entry);
        Ok(self)
    }

    /// Finish registration.
    #[must_use]
    pub fn build(self) -> App {
        App {
            config: self.config,
            routes: self.routes,
            router: self.router,
            validation_error_handler: self.validation_error_handler,
            doc_route_filter: self.doc_route_filter,
            openapi_cache: RwLock::new(None),
        }
    }
}

/// A built application. Routes are fixed once built.
pub struct App {
    config: AppConfig,
    routes: Vec<RouteEntry>,
    router: Router<usize>,
    validation_error_handler: Option<ValidationErrorHandler>,
    doc_route_filter: Option<DocRouteFilter>,
    openapi_cache: RwLock<Option<Arc<OpenApi>>>,
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

impl App {
    #[must_use]
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Registered routes, in registration order.
    #[must_use]
    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }

    /// Dispatch a request.
    pub async fn handle(&self, request: Request) -> Response {
        let is_head = request.method() == Method::Head;
        let response = self.dispatch(request).await;
        if is_head {
            response.body(Vec::new())
        } else {
            response
        }
    }

    async fn dispatch(&self, mut request: Request) -> Response {
        if let Some(response) = self.serve_docs(&request) {
            return response;
        }

        let (index, params) = match self.router.lookup(request.method(), request.path()) {
            RouteLookup::Match(found) => (*found.route, found.params),
            RouteLookup::MethodNotAllowed { allowed } => {
                return HttpError::new(StatusCode::METHOD_NOT_ALLOWED)
                    .with_header("allow", allowed.header_value())
                    .into_response();
            }
            RouteLookup::NotFound => return HttpError::not_found().into_response(),
        };
        let Some(route) = self.routes.get(index) else {
            return HttpError::internal().into_response();
        };

        request.set_path_params(params);
        let args = match binder::bind(&route.plan, &request, self.config.multipart) {
            Ok(args) => args,
            Err(error) => {
                return match &self.validation_error_handler {
                    Some(handler) => handler(&request, error),
                    None => error.into_response(),
                };
            }
        };

        match (route.handler)(args).await {
            Ok(reply) => route.shape.respond(reply),
            Err(error) => error.into_response(),
        }
    }

    fn serve_docs(&self, request: &Request) -> Option<Response> {
        let config = &self.config;
        if !config.enable_doc
            || config.openapi_json_url.is_empty()
            || !matches!(request.method(), Method::Get | Method::Head)
        {
            return None;
        }

        let path = request.path();
        let openapi_url = config.doc_url(&config.openapi_json_url);
        if path == openapi_url {
            return Some(match self.openapi_json() {
                Ok(json) => Response::with_status(StatusCode::OK)
                    .header("content-type", "application/json")
                    .body(json.into_bytes()),
                Err(_) => HttpError::internal().into_response(),
            });
        }
        if !config.swagger_url.is_empty() && path == config.doc_url(&config.swagger_url) {
            return Some(Response::html(ui::swagger_html(
                &format!("{} Swagger", config.title),
                &openapi_url,
                &config.swagger_js_url,
                &config.swagger_css_url,
            )));
        }
        if !config.redoc_url.is_empty() && path == config.doc_url(&config.redoc_url) {
            return Some(Response::html(ui::redoc_html(
                &format!("{} Redoc", config.title),
                &openapi_url,
                &config.redoc_js_url,
            )));
        }
        None
    }

    /// The OpenAPI document, derived on first use when caching is enabled.
    pub fn openapi(&self) -> Arc<OpenApi> {
        if !self.config.cache_openapi {
            return Arc::new(self.derive_openapi());
        }
        if let Some(doc) = self.openapi_cache.read().as_ref() {
            return Arc::clone(doc);
        }
        let mut slot = self.openapi_cache.write();
        if let Some(doc) = slot.as_ref() {
            return Arc::clone(doc);
        }
        let doc = Arc::new(self.derive_openapi());
        debug!(paths = doc.paths.len(), "OpenAPI document cached");
        *slot = Some(Arc::clone(&doc));
        doc
    }

    /// The OpenAPI document serialized as JSON.
    pub fn openapi_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self.openapi().as_ref())
    }

    fn derive_openapi(&self) -> OpenApi {
        let config = &self.config;
        let mut builder = OpenApiBuilder::new(&config.title, &config.version)
            .openapi_version(&config.openapi_version)
            .description(config.description.clone())
            .terms_of_service(config.terms_service.clone())
            .contact(config.contact.clone())
            .license(config.license.clone());
        for server in &config.servers {
            builder = builder.server(server.clone());
        }
        for tag in &config.tags {
            builder = builder.tag(tag.clone());
        }
        for (name, scheme) in &config.security_schemes {
            builder = builder.security_scheme(name, scheme.clone());
        }

        let mut registry = SchemaRegistry::new();
        for entry in &self.routes {
            if !entry.doc_enable || !self.doc_route_filter.as_ref().is_none_or(|keep| keep(entry)) {
                continue;
            }
            builder = builder.path(&entry.path);
            for method in entry.methods.iter().filter(|m| m.is_documented()) {
                let operation = build_operation(&mut registry, *method, &entry.plan, &entry.doc);
                builder = builder.operation(method.as_lower_str(), &entry.path, operation);
            }
        }
        for (name, schema) in registry.into_schemas() {
            builder = builder.schema(name, schema);
        }
        builder.build()
    }
}
