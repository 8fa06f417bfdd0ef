//! Binding plans.
//!
//! [`BindingPlan::build`] classifies each declared argument once, at route
//! registration, and synthesizes the composite types the binder validates
//! against. A marker decides the source when present; otherwise a name that
//! matches a path placeholder is a path parameter, a composite type is the
//! body, and anything else is a query parameter.

use std::sync::Arc;

use serde_json::Value;
use sugar_router::path_param_names;

use crate::error::ConfigurationError;
use crate::model::{FieldDefault, ModelDescriptor, ModelField, title_case};
use crate::params::{JSON_MEDIA_TYPE, MULTIPART_MEDIA_TYPE, Marker, ParamInfo, ParamSource};
use crate::signature::{Arg, ArgDefault, Signature};
use crate::types::TypeDescriptor;

/// A compiled non-body parameter or file.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Argument name; bound values are keyed by it.
    pub name: String,
    /// Wire name.
    pub alias: String,
    pub ty: TypeDescriptor,
    pub source: ParamSource,
    pub required: bool,
    pub default: Option<Value>,
    /// Fetch every value rather than the first.
    pub is_list: bool,
    pub media_type: Option<String>,
    pub info: ParamInfo,
}

impl FieldDescriptor {
    fn to_model_field(&self) -> ModelField {
        let mut field = ModelField::new(&self.name, self.ty.clone())
            .alias(&self.alias)
            .constraints(self.info.constraints.clone())
            .deprecated(self.info.deprecated);
        field.default = match &self.default {
            Some(value) if !self.required => FieldDefault::Value(value.clone()),
            _ if self.required => FieldDefault::Required,
            _ => FieldDefault::Value(Value::Null),
        };
        field.title = self.info.title.clone().unwrap_or_else(|| title_case(&self.name));
        field.description.clone_from(&self.info.description);
        field.examples.clone_from(&self.info.examples);
        field
    }
}

/// The compiled body parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDescriptor {
    pub name: String,
    pub ty: TypeDescriptor,
    pub required: bool,
    pub default: Option<Value>,
    pub media_type: String,
    /// Read from form fields rather than JSON.
    pub is_form: bool,
    /// Declared through a `Body`/`Form` marker rather than inferred.
    pub explicit: bool,
    pub info: ParamInfo,
}

/// Everything the binder and schema engine need to know about a handler's
/// inputs. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingPlan {
    /// Path, query, header and cookie parameters, in declaration order.
    pub params: Vec<FieldDescriptor>,
    pub body: Option<BodyDescriptor>,
    pub files: Vec<FieldDescriptor>,
    /// Composite of `params`, keyed by argument name and aliased by wire name.
    pub param_model: Option<Arc<ModelDescriptor>>,
    /// Composite of `files`.
    pub file_model: Option<Arc<ModelDescriptor>>,
    /// Body fields merged with the file fields, for the multipart schema.
    pub form_model: Option<Arc<ModelDescriptor>>,
}

impl BindingPlan {
    /// Compile a plan for the handler `endpoint` served at `rule`.
    pub fn build(
        endpoint: &str,
        rule: &str,
        signature: &Signature,
    ) -> Result<Self, ConfigurationError> {
        let placeholders = path_param_names(rule);
        let mut plan = Self::default();
        let mut seen: Vec<&str> = Vec::with_capacity(signature.len());

        for arg in signature.args() {
            if seen.contains(&arg.name.as_str()) {
                return Err(ConfigurationError::DuplicateParameter {
                    endpoint: endpoint.to_string(),
                    name: arg.name.clone(),
                });
            }
            seen.push(&arg.name);

            let in_template = placeholders.iter().any(|p| *p == arg.name);
            plan.classify(endpoint, rule, arg, in_template)?;
        }

        if !plan.files.is_empty() {
            if let Some(body) = plan.body.as_mut() {
                if body.explicit && !body.is_form {
                    return Err(ConfigurationError::FilesWithJsonBody {
                        endpoint: endpoint.to_string(),
                        body: body.name.clone(),
                    });
                }
                body.is_form = true;
                body.media_type = MULTIPART_MEDIA_TYPE.to_string();
            }
        }

        plan.synthesize_models(endpoint);
        Ok(plan)
    }

    fn classify(
        &mut self,
        endpoint: &str,
        rule: &str,
        arg: &Arg,
        in_template: bool,
    ) -> Result<(), ConfigurationError> {
        let ty = arg.resolve_type();
        let invalid_path_default = || ConfigurationError::InvalidPathDefault {
            endpoint: endpoint.to_string(),
            name: arg.name.clone(),
        };
        let composite_outside_body = || ConfigurationError::CompositeOutsideBody {
            endpoint: endpoint.to_string(),
            name: arg.name.clone(),
        };

        match &arg.default {
            ArgDefault::Marker(Marker::Path(info)) => {
                if !in_template {
                    return Err(ConfigurationError::PathMarkerOutsideTemplate {
                        endpoint: endpoint.to_string(),
                        name: arg.name.clone(),
                        path: rule.to_string(),
                    });
                }
                if !matches!(info.default, FieldDefault::Required) {
                    return Err(invalid_path_default());
                }
                if ty.is_composite() {
                    return Err(composite_outside_body());
                }
                self.params.push(path_field(arg, ty, info.clone()));
            }
            ArgDefault::Marker(_) if in_template => return Err(invalid_path_default()),
            ArgDefault::Marker(marker @ (Marker::Body(info) | Marker::Form(info))) => {
                if !ty.is_composite() {
                    return Err(ConfigurationError::BodyNotComposite {
                        endpoint: endpoint.to_string(),
                        name: arg.name.clone(),
                    });
                }
                let (required, default) = split_default(&info.default);
                self.set_body(
                    endpoint,
                    BodyDescriptor {
                        name: arg.name.clone(),
                        ty,
                        required,
                        default,
                        media_type: marker.body_media_type().unwrap_or(JSON_MEDIA_TYPE).to_string(),
                        is_form: marker.is_form(),
                        explicit: true,
                        info: info.clone(),
                    },
                )?;
            }
            ArgDefault::Marker(Marker::File(info)) => {
                let file_ty = if ty.is_list() {
                    TypeDescriptor::list(TypeDescriptor::Upload)
                } else {
                    TypeDescriptor::Upload
                };
                let (required, default) = split_default(&info.default);
                self.files.push(FieldDescriptor {
                    name: arg.name.clone(),
                    alias: info.alias.clone().unwrap_or_else(|| arg.name.clone()),
                    is_list: file_ty.is_list(),
                    ty: file_ty,
                    source: ParamSource::File,
                    required,
                    default,
                    media_type: Some(MULTIPART_MEDIA_TYPE.to_string()),
                    info: info.clone(),
                });
            }
            ArgDefault::Marker(marker) => {
                if ty.is_composite() {
                    return Err(composite_outside_body());
                }
                let info = marker.info();
                let (required, default) = split_default(&info.default);
                self.params.push(FieldDescriptor {
                    name: arg.name.clone(),
                    alias: info.alias.clone().unwrap_or_else(|| arg.name.clone()),
                    is_list: ty.is_list(),
                    ty,
                    source: marker.source(),
                    required,
                    default,
                    media_type: None,
                    info: info.clone(),
                });
            }
            ArgDefault::Value(_) if in_template => return Err(invalid_path_default()),
            ArgDefault::Empty if in_template => {
                if ty.is_composite() {
                    return Err(composite_outside_body());
                }
                self.params.push(path_field(arg, ty, ParamInfo::default()));
            }
            default if ty.is_model() => {
                let (required, default) = match default {
                    ArgDefault::Value(value) => (false, Some(value.clone())),
                    _ => (true, None),
                };
                self.set_body(
                    endpoint,
                    BodyDescriptor {
                        name: arg.name.clone(),
                        ty,
                        required,
                        default,
                        media_type: JSON_MEDIA_TYPE.to_string(),
                        is_form: false,
                        explicit: false,
                        info: ParamInfo::default(),
                    },
                )?;
            }
            default => {
                let (required, default) = match default {
                    ArgDefault::Value(value) => (false, Some(value.clone())),
                    _ => (true, None),
                };
                self.params.push(FieldDescriptor {
                    name: arg.name.clone(),
                    alias: arg.name.clone(),
                    is_list: ty.is_list(),
                    ty,
                    source: ParamSource::Query,
                    required,
                    default,
                    media_type: None,
                    info: ParamInfo::default(),
                });
            }
        }
        Ok(())
    }

    fn set_body(&mut self, endpoint: &str, body: BodyDescriptor) -> Result<(), ConfigurationError> {
        if let Some(existing) = &self.body {
            return Err(ConfigurationError::MultipleBodies {
                endpoint: endpoint.to_string(),
                first: existing.name.clone(),
                second: body.name,
            });
        }
        self.body = Some(body);
        Ok(())
    }

    fn synthesize_models(&mut self, endpoint: &str) {
        if !self.params.is_empty() {
            let model = self
                .params
                .iter()
                .fold(ModelDescriptor::new(format!("Params_{endpoint}")), |m, p| {
                    m.field(p.to_model_field())
                });
            self.param_model = Some(model.build());
        }

        if self.files.is_empty() {
            return;
        }
        let files = self
            .files
            .iter()
            .fold(ModelDescriptor::new(format!("Body_{endpoint}")), |m, f| {
                m.field(f.to_model_field())
            });
        if let Some(body_model) = self.body.as_ref().and_then(|b| b.ty.as_model()) {
            self.form_model = Some(body_model.merged(format!("Body_{endpoint}"), &files).build());
        }
        self.file_model = Some(files.build());
    }

    /// Returns true when the handler takes no inputs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.body.is_none() && self.files.is_empty()
    }

    /// Media type of the request body, if the handler reads one.
    #[must_use]
    pub fn request_media_type(&self) -> Option<&str> {
        if !self.files.is_empty() {
            return Some(MULTIPART_MEDIA_TYPE);
        }
        self.body.as_ref().map(|b| b.media_type.as_str())
    }

    /// Whether the body is read as form fields.
    #[must_use]
    pub fn reads_form(&self) -> bool {
        !self.files.is_empty() || self.body.as_ref().is_some_and(|b| b.is_form)
    }

    /// Composite rendered as the request body schema.
    #[must_use]
    pub fn body_schema_model(&self) -> Option<&Arc<ModelDescriptor>> {
        self.form_model
            .as_ref()
            .or_else(|| if self.body.is_none() { self.file_model.as_ref() } else { None })
    }
}

fn path_field(arg: &Arg, ty: TypeDescriptor, info: ParamInfo) -> FieldDescriptor {
    FieldDescriptor {
        name: arg.name.clone(),
        alias: arg.name.clone(),
        is_list: false,
        ty,
        source: ParamSource::Path,
        required: true,
        default: None,
        media_type: None,
        info,
    }
}

fn split_default(default: &FieldDefault) -> (bool, Option<Value>) {
    match default {
        FieldDefault::Required => (true, None),
        FieldDefault::Value(value) => (false, Some(value.clone())),
    }
}
