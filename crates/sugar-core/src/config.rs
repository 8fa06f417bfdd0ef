//! Application configuration.
//!
//! [`AppConfig`] holds document metadata and documentation settings. It can
//! be built in code, deserialized from JSON, or overridden from `SUGAR_*`
//! environment variables:
//!
//! ```
//! use sugar_core::AppConfig;
//!
//! let config = AppConfig::new().title("Inventory").version("2.1.0");
//! assert_eq!(config.openapi_json_url, "/openapi.json");
//! ```

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use sugar_openapi::{Contact, License, Server, Tag, ui};
use sugar_router::combine_paths;

use crate::error::ConfigError;
use crate::multipart::MultipartConfig;

/// Application-wide settings.
///
/// An app that never sets a title is documented as `"Sugar"`, version
/// `"0.1.0"`, and its documentation pages are titled after it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// API title. Defaults to `"Sugar"`.
    pub title: String,
    /// API document version. Defaults to `"0.1.0"`.
    pub version: String,
    pub description: Option<String>,
    pub terms_service: Option<String>,
    pub contact: Option<Contact>,
    pub license: Option<License>,
    pub servers: Vec<Server>,
    pub tags: Vec<Tag>,
    pub security_schemes: IndexMap<String, Value>,
    pub openapi_version: String,
    /// Serve the document and its UI pages.
    pub enable_doc: bool,
    /// Derive the document once and reuse it.
    pub cache_openapi: bool,
    /// Prefix for every documentation URL.
    pub openapi_url_prefix: Option<String>,
    pub openapi_json_url: String,
    pub swagger_url: String,
    pub redoc_url: String,
    pub swagger_js_url: String,
    pub swagger_css_url: String,
    pub redoc_js_url: String,
    pub multipart: MultipartConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Sugar".to_string(),
            version: "0.1.0".to_string(),
            description: None,
            terms_service: None,
            contact: None,
            license: None,
            servers: Vec::new(),
            tags: Vec::new(),
            security_schemes: IndexMap::new(),
            openapi_version: "3.0.2".to_string(),
            enable_doc: true,
            cache_openapi: true,
            openapi_url_prefix: None,
            openapi_json_url: "/openapi.json".to_string(),
            swagger_url: "/doc".to_string(),
            redoc_url: "/redoc".to_string(),
            swagger_js_url: ui::SWAGGER_JS_URL.to_string(),
            swagger_css_url: ui::SWAGGER_CSS_URL.to_string(),
            redoc_js_url: ui::REDOC_JS_URL.to_string(),
            multipart: MultipartConfig::default(),
        }
    }
}

impl AppConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON configuration. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Defaults overridden by `SUGAR_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env(|key| std::env::var(key).ok())
    }

    /// Apply `SUGAR_*` overrides read through `lookup`.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let strings: [(&str, &mut String); 6] = [
            ("SUGAR_TITLE", &mut self.title),
            ("SUGAR_VERSION", &mut self.version),
            ("SUGAR_OPENAPI_VERSION", &mut self.openapi_version),
            ("SUGAR_OPENAPI_JSON_URL", &mut self.openapi_json_url),
            ("SUGAR_SWAGGER_URL", &mut self.swagger_url),
            ("SUGAR_REDOC_URL", &mut self.redoc_url),
        ];
        for (key, slot) in strings {
            if let Some(value) = lookup(key) {
                *slot = value;
            }
        }
        if let Some(value) = lookup("SUGAR_DESCRIPTION") {
            self.description = Some(value);
        }
        if let Some(value) = lookup("SUGAR_TERMS_SERVICE") {
            self.terms_service = Some(value);
        }
        if let Some(value) = lookup("SUGAR_ENABLE_DOC") {
            self.enable_doc = parse_bool("SUGAR_ENABLE_DOC", value)?;
        }
        if let Some(value) = lookup("SUGAR_CACHE_OPENAPI") {
            self.cache_openapi = parse_bool("SUGAR_CACHE_OPENAPI", value)?;
        }
        Ok(self)
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn terms_service(mut self, terms: impl Into<String>) -> Self {
        self.terms_service = Some(terms.into());
        self
    }

    #[must_use]
    pub fn contact(mut self, contact: Contact) -> Self {
        self.contact = Some(contact);
        self
    }

    #[must_use]
    pub fn license(mut self, license: License) -> Self {
        self.license = Some(license);
        self
    }

    #[must_use]
    pub fn server(mut self, server: Server) -> Self {
        self.servers.push(server);
        self
    }

    #[must_use]
    pub fn tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    #[must_use]
    pub fn security_scheme(mut self, name: impl Into<String>, scheme: Value) -> Self {
        self.security_schemes.insert(name.into(), scheme);
        self
    }

    #[must_use]
    pub fn enable_doc(mut self, enable: bool) -> Self {
        self.enable_doc = enable;
        self
    }

    #[must_use]
    pub fn cache_openapi(mut self, cache: bool) -> Self {
        self.cache_openapi = cache;
        self
    }

    #[must_use]
    pub fn openapi_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.openapi_url_prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn openapi_json_url(mut self, url: impl Into<String>) -> Self {
        self.openapi_json_url = url.into();
        self
    }

    #[must_use]
    pub fn swagger_url(mut self, url: impl Into<String>) -> Self {
        self.swagger_url = url.into();
        self
    }

    #[must_use]
    pub fn redoc_url(mut self, url: impl Into<String>) -> Self {
        self.redoc_url = url.into();
        self
    }

    #[must_use]
    pub fn multipart(mut self, multipart: MultipartConfig) -> Self {
        self.multipart = multipart;
        self
    }

    /// Full URL of a documentation route, with the prefix applied.
    #[must_use]
    pub fn doc_url(&self, url: &str) -> String {
        match &self.openapi_url_prefix {
            Some(prefix) => combine_paths(prefix, url),
            None => url.to_string(),
        }
    }
}

fn parse_bool(key: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Env {
            key,
            value,
            expected: "a boolean",
        }),
    }
}
