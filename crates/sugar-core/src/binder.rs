//! The request binder.
//!
//! [`bind`] executes a [`BindingPlan`] against a live request. Parameters,
//! body and files are validated as independent groups; every group runs
//! even when an earlier one failed, so a single `422` reports all of them.
//! A form body that travels with uploads is validated together with them
//! as one group.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{ErrorKind, HttpError, LocItem, RequestValidationError, ValidationError, ValidationErrors};
use crate::model::{ModelDescriptor, ModelField, ModelInstance, Raw, Validated};
use crate::multipart::{MultipartConfig, MultipartForm, UploadFile};
use crate::params::{FORM_MEDIA_TYPE, MULTIPART_MEDIA_TYPE, ParamSource};
use crate::plan::{BindingPlan, BodyDescriptor, FieldDescriptor};
use crate::query::QueryString;
use crate::request::Request;

/// A bound argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Json(Value),
    File(UploadFile),
    Files(Vec<UploadFile>),
}

impl From<Validated> for ArgValue {
    fn from(value: Validated) -> Self {
        match value {
            Validated::File(file) => Self::File(file),
            Validated::List(items)
                if !items.is_empty() && items.iter().all(|i| matches!(i, Validated::File(_))) =>
            {
                Self::Files(
                    items
                        .into_iter()
                        .filter_map(|i| match i {
                            Validated::File(file) => Some(file),
                            _ => None,
                        })
                        .collect(),
                )
            }
            other => Self::Json(other.to_value()),
        }
    }
}

/// Validated handler arguments keyed by argument name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArgs {
    values: IndexMap<String, ArgValue>,
}

impl BoundArgs {
    /// Create an empty set of arguments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an argument.
    pub fn insert(&mut self, name: impl Into<String>, value: ArgValue) {
        self.values.insert(name.into(), value);
    }

    /// Deserialize a JSON argument into `T`.
    ///
    /// A missing argument or a shape mismatch is a server error: the plan
    /// and the handler disagree about the argument.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, HttpError> {
        let value = self.value(name).ok_or_else(|| {
            HttpError::internal().with_detail(format!("argument `{name}` was not bound"))
        })?;
        T::deserialize(value).map_err(|e| {
            HttpError::internal().with_detail(format!("argument `{name}` has an unexpected shape: {e}"))
        })
    }

    /// The raw JSON of an argument.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.values.get(name)? {
            ArgValue::Json(value) => Some(value),
            _ => None,
        }
    }

    /// A single uploaded file.
    #[must_use]
    pub fn file(&self, name: &str) -> Option<&UploadFile> {
        match self.values.get(name)? {
            ArgValue::File(file) => Some(file),
            ArgValue::Files(files) => files.first(),
            ArgValue::Json(_) => None,
        }
    }

    /// Every uploaded file of an argument. Empty when none were sent.
    #[must_use]
    pub fn files(&self, name: &str) -> &[UploadFile] {
        match self.values.get(name) {
            Some(ArgValue::Files(files)) => files,
            Some(ArgValue::File(file)) => std::slice::from_ref(file),
            _ => &[],
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Arguments as one JSON object. Files render as their metadata.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| {
                    let value = match v {
                        ArgValue::Json(value) => value.clone(),
                        ArgValue::File(file) => Validated::File(file.clone()).to_value(),
                        ArgValue::Files(files) => Value::Array(
                            files
                                .iter()
                                .map(|f| Validated::File(f.clone()).to_value())
                                .collect(),
                        ),
                    };
                    (k.clone(), value)
                })
                .collect(),
        )
    }
}

/// Bind a request against a plan.
pub fn bind(
    plan: &BindingPlan,
    request: &Request,
    multipart: MultipartConfig,
) -> Result<BoundArgs, RequestValidationError> {
    let mut args = BoundArgs::new();
    let mut groups = Vec::with_capacity(3);
    let form = plan.reads_form().then(|| FormData::read(request, multipart));

    if let Some(model) = &plan.param_model {
        let result = ModelInstance::construct_with(
            model,
            |idx, field| {
                vec![
                    LocItem::field(plan.params[idx].source.as_str()),
                    LocItem::field(&field.alias),
                ]
            },
            |idx, _| fetch_param(&plan.params[idx], request),
        );
        match result {
            Ok(instance) => {
                for (name, value) in instance.into_values() {
                    args.insert(name, value.into());
                }
            }
            Err(errors) => groups.push(errors),
        }
    }

    let mut form_error = form.as_ref().and_then(FormData::error);
    let empty = FormData::default();

    if let (Some(form_model), Some(body)) = (&plan.form_model, &plan.body) {
        let result = match (form.as_ref(), form_error.take()) {
            (_, Some(error)) => Err(error.into()),
            (form, None) => bind_form_with_files(plan, body, form_model, form.unwrap_or(&empty)),
        };
        match result {
            Ok(bound) => {
                for (name, value) in bound {
                    args.insert(name, value);
                }
            }
            Err(errors) => groups.push(errors),
        }
    } else {
        if let Some(body) = &plan.body {
            let result = if body.is_form {
                match (form.as_ref(), form_error.take()) {
                    (_, Some(error)) => Err(error.into()),
                    (form, None) => bind_form_body(body, form.unwrap_or(&empty)),
                }
            } else {
                bind_json_body(body, request)
            };
            match result {
                Ok(value) => args.insert(body.name.clone(), value.into()),
                Err(errors) => groups.push(errors),
            }
        }

        if let Some(model) = &plan.file_model {
            let result = match (form.as_ref(), form_error.take()) {
                (_, Some(error)) => Err(error.into()),
                (form, None) => bind_files(plan, model, form.unwrap_or(&empty)),
            };
            match result {
                Ok(bound) => {
                    for (name, value) in bound {
                        args.insert(name, value);
                    }
                }
                Err(errors) => groups.push(errors),
            }
        }
    }

    if groups.is_empty() {
        return Ok(args);
    }
    let error = RequestValidationError::new(groups);
    debug!(
        path = request.path(),
        groups = error.groups.len(),
        errors = error.error_count(),
        "request validation failed"
    );
    Err(error)
}

fn fetch_param(field: &FieldDescriptor, request: &Request) -> Option<Raw> {
    let values: Vec<String> = match field.source {
        ParamSource::Path => {
            return request.path_param(&field.alias).map(|v| Raw::Value(Value::String(v)));
        }
        ParamSource::Query => {
            let query = request.query_params();
            if !field.is_list {
                return query
                    .get(&field.alias)
                    .map(|v| Raw::Value(Value::String(v.into_owned())));
            }
            query.get_all(&field.alias)
        }
        ParamSource::Header => header_values(request, &field.alias),
        ParamSource::Cookie => request.cookies(&field.alias),
        ParamSource::Body | ParamSource::File => return None,
    };

    if field.is_list {
        let items: Vec<Value> = if field.source == ParamSource::Query {
            values.into_iter().map(Value::String).collect()
        } else {
            values
                .iter()
                .flat_map(|v| v.split(','))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| Value::String(v.to_string()))
                .collect()
        };
        return (!items.is_empty()).then(|| Raw::Value(Value::Array(items)));
    }
    values.into_iter().next().map(|v| Raw::Value(Value::String(v)))
}

/// Header values under `name`, falling back to the dashed spelling of an
/// underscored name.
fn header_values(request: &Request, name: &str) -> Vec<String> {
    let headers = request.headers();
    let values: Vec<String> = headers.get_all(name).map(str::to_string).collect();
    if !values.is_empty() || !name.contains('_') {
        return values;
    }
    let dashed = name.replace('_', "-");
    headers.get_all(&dashed).map(str::to_string).collect()
}

fn body_loc() -> [LocItem; 1] {
    [LocItem::field("body")]
}

fn bind_json_body(body: &BodyDescriptor, request: &Request) -> Result<Validated, ValidationErrors> {
    let bytes = request.body().as_bytes();
    let payload = if bytes.iter().all(u8::is_ascii_whitespace) {
        match &body.default {
            Some(default) if !body.required => return Ok(Validated::Value(default.clone())),
            _ => Value::Object(serde_json::Map::new()),
        }
    } else {
        serde_json::from_slice(bytes).map_err(|e| {
            ValidationErrors::from(
                ValidationError::new(ErrorKind::JsonInvalid, format!("JSON decode error: {e}"))
                    .at(body_loc().to_vec())
                    .with_ctx(serde_json::json!({ "error": e.to_string() })),
            )
        })?
    };
    body.ty
        .validate(Raw::Value(payload))
        .map_err(|errors| errors.prefixed(&body_loc()))
}

/// A model field read from form data. Lists collect every repeated value.
fn form_field(field: &ModelField, form: &FormData) -> Option<Value> {
    let values = form.values(&field.alias);
    if values.is_empty() {
        return None;
    }
    Some(if field.ty.is_list() {
        Value::Array(values.into_iter().map(Value::String).collect())
    } else {
        values.into_iter().next().map_or(Value::Null, Value::String)
    })
}

fn bind_form_body(body: &BodyDescriptor, form: &FormData) -> Result<Validated, ValidationErrors> {
    if form.is_empty() {
        if let Some(default) = body.default.as_ref().filter(|_| !body.required) {
            return Ok(Validated::Value(default.clone()));
        }
    }
    let mut object = serde_json::Map::new();
    match body.ty.as_model() {
        Some(model) => {
            for field in &model.fields {
                if let Some(value) = form_field(field, form) {
                    object.insert(field.alias.clone(), value);
                }
            }
        }
        None => {
            for (key, value) in form.pairs() {
                object.entry(key).or_insert(Value::String(value));
            }
        }
    }
    body.ty
        .validate(Raw::Value(Value::Object(object)))
        .map_err(|errors| errors.prefixed(&body_loc()))
}

fn bind_files(
    plan: &BindingPlan,
    model: &Arc<ModelDescriptor>,
    form: &FormData,
) -> Result<Vec<(String, ArgValue)>, ValidationErrors> {
    let instance = ModelInstance::construct_with(
        model,
        |_, field| vec![LocItem::field("body"), LocItem::field(&field.alias)],
        |idx, _| fetch_file(&plan.files[idx], form),
    )?;
    Ok(instance
        .into_values()
        .into_iter()
        .map(|(name, value)| (name, value.into()))
        .collect())
}

/// Validate a form body and its uploads as one payload against the merged
/// form model, so every missing field and file lands in a single group.
fn bind_form_with_files(
    plan: &BindingPlan,
    body: &BodyDescriptor,
    form_model: &Arc<ModelDescriptor>,
    form: &FormData,
) -> Result<Vec<(String, ArgValue)>, ValidationErrors> {
    let offset = form_model.fields.len().saturating_sub(plan.files.len());
    let body_absent = form_model.fields[..offset]
        .iter()
        .all(|field| form.values(&field.alias).is_empty());
    if body_absent && !body.required {
        if let (Some(default), Some(file_model)) = (&body.default, &plan.file_model) {
            let value = ArgValue::from(Validated::Value(default.clone()));
            let mut bound = vec![(body.name.clone(), value)];
            bound.extend(bind_files(plan, file_model, form)?);
            return Ok(bound);
        }
    }

    let instance = ModelInstance::construct_with(
        form_model,
        |_, field| vec![LocItem::field("body"), LocItem::field(&field.alias)],
        |idx, field| match idx.checked_sub(offset) {
            Some(file) => fetch_file(&plan.files[file], form),
            None => form_field(field, form).map(Raw::Value),
        },
    )?;
    let mut values = instance.into_values();
    let mut bound = vec![(body.name.clone(), ArgValue::from(bind_form_body(body, form)?))];
    for file in &plan.files {
        if let Some(value) = values.shift_remove(&file.name) {
            bound.push((file.name.clone(), ArgValue::from(value)));
        }
    }
    Ok(bound)
}

fn fetch_file(field: &FieldDescriptor, form: &FormData) -> Option<Raw> {
    let FormData::Multipart(multipart) = form else {
        return None;
    };
    if field.is_list {
        let files = multipart.get_files(&field.alias);
        (!files.is_empty()).then_some(Raw::Files(files))
    } else {
        multipart.get_file(&field.alias).map(Raw::File)
    }
}

/// A request body read as form fields.
#[derive(Debug, Default)]
enum FormData {
    #[default]
    Empty,
    Urlencoded(Vec<(String, String)>),
    Multipart(MultipartForm),
    Invalid(String),
}

impl FormData {
    fn read(request: &Request, config: MultipartConfig) -> Self {
        let body = request.body().as_bytes();
        match request.content_type().as_deref() {
            Some(MULTIPART_MEDIA_TYPE) => {
                let header = request.headers().get_str("content-type").unwrap_or_default();
                match MultipartForm::parse(header, body, config) {
                    Ok(form) => Self::Multipart(form),
                    Err(e) => Self::Invalid(e.to_string()),
                }
            }
            Some(FORM_MEDIA_TYPE) => match std::str::from_utf8(body) {
                Ok(text) => Self::Urlencoded(
                    QueryString::parse(text)
                        .pairs()
                        .map(|(k, v)| (k.into_owned(), v.into_owned()))
                        .collect(),
                ),
                Err(_) => Self::Invalid("form body is not valid UTF-8".to_string()),
            },
            _ => Self::Empty,
        }
    }

    fn error(&self) -> Option<ValidationError> {
        match self {
            Self::Invalid(reason) => Some(
                ValidationError::new(ErrorKind::ValueError, format!("Value error, {reason}"))
                    .at(body_loc().to_vec()),
            ),
            _ => None,
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::Empty | Self::Invalid(_) => true,
            Self::Urlencoded(pairs) => pairs.is_empty(),
            Self::Multipart(form) => form.is_empty(),
        }
    }

    fn values(&self, name: &str) -> Vec<String> {
        match self {
            Self::Urlencoded(pairs) => pairs
                .iter()
                .filter(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
                .collect(),
            Self::Multipart(form) => form.get_fields(name).into_iter().map(str::to_string).collect(),
            Self::Empty | Self::Invalid(_) => Vec::new(),
        }
    }

    fn pairs(&self) -> Vec<(String, String)> {
        match self {
            Self::Urlencoded(pairs) => pairs.clone(),
            Self::Multipart(form) => form
                .parts()
                .iter()
                .filter(|p| !p.is_file())
                .filter_map(|p| p.text().map(|t| (p.name.clone(), t.to_string())))
                .collect(),
            Self::Empty | Self::Invalid(_) => Vec::new(),
        }
    }
}
