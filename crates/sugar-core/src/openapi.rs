//! Schema derivation.
//!
//! The document is derived purely from registered routes: each route's
//! [`BindingPlan`] supplies parameters and the request body, and its
//! [`RouteDocMeta`] supplies everything else. Composite types are rendered
//! once into `components.schemas` by a [`SchemaRegistry`] and referenced
//! from operations.

use std::collections::BTreeMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use sugar_openapi::{
    MediaType, Operation, Parameter, ParameterLocation, RequestBody, Response as DocResponse,
    ResponseEntry, Schema, SecurityRequirement,
};

use crate::model::{FieldDefault, ModelDescriptor, ModelField, title_case};
use crate::params::{JSON_MEDIA_TYPE, ParamSource};
use crate::plan::BindingPlan;
use crate::request::Method;
use crate::response::StatusCode;
use crate::types::{Constraints, TypeDescriptor};

const VALIDATION_ERROR: &str = "ValidationError";
const HTTP_VALIDATION_ERROR: &str = "HTTPValidationError";

/// Documentation metadata of one route, fixed at registration.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteDocMeta {
    /// Normalized path template (`{name}` form).
    pub path: String,
    pub methods: Vec<Method>,
    pub endpoint: String,
    pub tags: Vec<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub deprecated: bool,
    pub operation_id: Option<String>,
    pub response_description: String,
    pub response_model: Option<TypeDescriptor>,
    pub status_code: StatusCode,
    /// Extra responses keyed by status, merged verbatim.
    pub responses: IndexMap<String, Value>,
    pub security: Vec<SecurityRequirement>,
    /// Free-form fields merged into each operation.
    pub extra: IndexMap<String, Value>,
}

/// Renders type descriptors to JSON Schema and collects named components.
///
/// Components are keyed by model name. A structurally different model that
/// reuses a taken name is registered as `Name2`, `Name3` and so on.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Schema>,
    names: Vec<(Arc<ModelDescriptor>, String)>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema of a type. Models become references.
    pub fn type_schema(&mut self, ty: &TypeDescriptor) -> Schema {
        match ty {
            TypeDescriptor::Any => Schema::any(),
            TypeDescriptor::String => Schema::string(),
            TypeDescriptor::Integer => Schema::integer(None),
            TypeDescriptor::Number => Schema::number(None),
            TypeDescriptor::Boolean => Schema::boolean(),
            TypeDescriptor::Upload => Schema::binary(),
            TypeDescriptor::Optional(inner) => self.type_schema(inner).nullable(),
            TypeDescriptor::List(inner) => Schema::array(self.type_schema(inner)),
            TypeDescriptor::Map(inner) => Schema::map(self.type_schema(inner)),
            TypeDescriptor::Model(model) => Schema::reference(&self.register(model)),
        }
    }

    /// Schema of a field: its type plus title, description, default and
    /// constraints.
    pub fn field_schema(&mut self, field: &ModelField) -> Schema {
        let mut schema = self.type_schema(&field.ty);
        apply_constraints(&mut schema, &field.constraints);
        schema = schema.with_title(&field.title);
        if let Some(description) = &field.description {
            schema = schema.with_description(description);
        }
        if let FieldDefault::Value(default) = &field.default {
            if !default.is_null() {
                schema = schema.with_default(default.clone());
            }
        }
        schema
    }

    /// Inline object schema of a model.
    pub fn model_schema(&mut self, model: &ModelDescriptor) -> Schema {
        let mut properties = IndexMap::with_capacity(model.fields.len());
        for field in &model.fields {
            properties.insert(field.alias.clone(), self.field_schema(field));
        }
        let required = model.required_fields().map(|f| f.alias.clone()).collect();
        let mut schema = Schema::object(properties, required).with_title(&model.title);
        if let Some(description) = &model.description {
            schema = schema.with_description(description);
        }
        schema
    }

    /// Register a model as a component and return its key.
    pub fn register(&mut self, model: &Arc<ModelDescriptor>) -> String {
        if let Some((_, name)) = self
            .names
            .iter()
            .find(|(known, _)| Arc::ptr_eq(known, model) || **known == **model)
        {
            return name.clone();
        }
        let name = self.free_name(&model.name);
        self.names.push((Arc::clone(model), name.clone()));
        let schema = self.model_schema(model);
        self.schemas.insert(name.clone(), schema);
        name
    }

    fn free_name(&self, base: &str) -> String {
        let taken = |candidate: &str| self.names.iter().any(|(_, n)| n == candidate);
        if !taken(base) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{base}{n}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    /// Register the `422` body schemas.
    pub fn register_validation_errors(&mut self) {
        if self.schemas.contains_key(HTTP_VALIDATION_ERROR) {
            return;
        }
        let mut error = IndexMap::new();
        error.insert(
            "loc".to_string(),
            Schema::array(Schema::any()).with_title("Location"),
        );
        error.insert("msg".to_string(), Schema::string().with_title("Message"));
        error.insert("type".to_string(), Schema::string().with_title("Error Type"));
        self.schemas.insert(
            VALIDATION_ERROR.to_string(),
            Schema::object(
                error,
                vec!["loc".to_string(), "msg".to_string(), "type".to_string()],
            )
            .with_title(VALIDATION_ERROR),
        );

        let mut detail = IndexMap::new();
        detail.insert(
            "detail".to_string(),
            Schema::array(Schema::array(Schema::reference(VALIDATION_ERROR))).with_title("Detail"),
        );
        self.schemas.insert(
            HTTP_VALIDATION_ERROR.to_string(),
            Schema::object(detail, Vec::new()).with_title(HTTP_VALIDATION_ERROR),
        );
    }

    /// Registered components, keyed by name.
    #[must_use]
    pub fn schemas(&self) -> &BTreeMap<String, Schema> {
        &self.schemas
    }

    #[must_use]
    pub fn into_schemas(self) -> BTreeMap<String, Schema> {
        self.schemas
    }
}

fn apply_constraints(schema: &mut Schema, c: &Constraints) {
    if c.is_empty() {
        return;
    }
    if let Some(p) = schema.as_primitive_mut() {
        p.exclusive_minimum = c.gt;
        p.minimum = c.ge;
        p.exclusive_maximum = c.lt;
        p.maximum = c.le;
        p.multiple_of = c.multiple_of;
        p.min_length = c.min_length;
        p.max_length = c.max_length;
        p.pattern = c.pattern.as_ref().map(|p| p.as_str().to_string());
    } else if let Some(a) = schema.as_array_mut() {
        a.min_items = c.min_length;
        a.max_items = c.max_length;
    }
}

fn location(source: ParamSource) -> Option<ParameterLocation> {
    match source {
        ParamSource::Path => Some(ParameterLocation::Path),
        ParamSource::Query => Some(ParameterLocation::Query),
        ParamSource::Header => Some(ParameterLocation::Header),
        ParamSource::Cookie => Some(ParameterLocation::Cookie),
        ParamSource::Body | ParamSource::File => None,
    }
}

/// Build the operation documenting `method` of a route.
pub fn build_operation(
    registry: &mut SchemaRegistry,
    method: Method,
    plan: &BindingPlan,
    meta: &RouteDocMeta,
) -> Operation {
    let mut operation = Operation {
        tags: meta.tags.clone(),
        summary: Some(meta.summary.clone().unwrap_or_else(|| title_case(&meta.endpoint))),
        description: meta.description.clone(),
        operation_id: Some(
            meta.operation_id
                .clone()
                .unwrap_or_else(|| format!("{}__{}", meta.endpoint, method.as_lower_str())),
        ),
        deprecated: meta.deprecated,
        security: meta.security.clone(),
        extensions: meta.extra.clone(),
        ..Operation::default()
    };

    if let Some(model) = &plan.param_model {
        for (param, field) in plan.params.iter().zip(&model.fields) {
            let Some(location) = location(param.source).filter(|_| param.info.include_in_schema)
            else {
                continue;
            };
            operation.parameters.push(Parameter {
                name: param.alias.clone(),
                location,
                required: param.required,
                schema: Some(registry.field_schema(field)),
                description: param.info.description.clone(),
                example: param.info.examples.first().cloned(),
                deprecated: param.info.deprecated,
            });
        }
    }

    operation.request_body = request_body(registry, plan);

    let content_schema = meta
        .response_model
        .as_ref()
        .map_or_else(Schema::any, |ty| registry.type_schema(ty));
    let mut content = IndexMap::new();
    content.insert(
        JSON_MEDIA_TYPE.to_string(),
        MediaType {
            schema: Some(content_schema),
            example: None,
        },
    );
    operation.responses.insert(
        meta.status_code.as_u16().to_string(),
        ResponseEntry::Typed(DocResponse {
            description: meta.response_description.clone(),
            content,
        }),
    );

    if !plan.is_empty() {
        registry.register_validation_errors();
        let mut content = IndexMap::new();
        content.insert(
            JSON_MEDIA_TYPE.to_string(),
            MediaType {
                schema: Some(Schema::reference(HTTP_VALIDATION_ERROR)),
                example: None,
            },
        );
        operation.responses.insert(
            "422".to_string(),
            ResponseEntry::Typed(DocResponse {
                description: "Validation Error".to_string(),
                content,
            }),
        );
    }

    for (status, response) in &meta.responses {
        operation
            .responses
            .insert(status.clone(), ResponseEntry::Raw(response.clone()));
    }
    operation
}

fn request_body(registry: &mut SchemaRegistry, plan: &BindingPlan) -> Option<RequestBody> {
    let media_type = plan.request_media_type()?;
    let body_visible = plan.body.as_ref().is_some_and(|b| b.info.include_in_schema);
    if !body_visible && plan.files.is_empty() {
        return None;
    }

    let schema = match (plan.body_schema_model(), &plan.body) {
        (Some(model), _) => Schema::reference(&registry.register(model)),
        (None, Some(body)) => registry.type_schema(&body.ty),
        (None, None) => return None,
    };
    let required = plan.body.as_ref().is_some_and(|b| b.required)
        || plan.files.iter().any(|f| f.required);
    let description = plan.body.as_ref().and_then(|b| b.info.description.clone());
    let example = plan.body.as_ref().and_then(|b| b.info.examples.first().cloned());

    let mut content = IndexMap::new();
    content.insert(
        media_type.to_string(),
        MediaType {
            schema: Some(schema),
            example,
        },
    );
    Some(RequestBody {
        content,
        required,
        description,
    })
}
