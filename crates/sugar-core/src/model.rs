//! Composite types: descriptors, lax construction and dumping.
//!
//! A [`ModelDescriptor`] lists typed fields. [`ModelInstance::construct`]
//! builds an instance from untyped JSON, coercing scalars the way form and
//! query values need (`"42"` becomes `42`) and reporting every failing field
//! at once. [`ModelInstance::dump`] serializes an instance back to JSON under
//! [`DumpOptions`].

use std::collections::BTreeSet;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Number, Value, json};

use crate::error::{ErrorKind, LocItem, ValidationError, ValidationErrors};
use crate::multipart::UploadFile;
use crate::types::{Constraints, Described, Pattern, TypeDescriptor};

/// Default of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDefault {
    /// The field must be supplied.
    Required,
    /// Used when the field is absent. Not validated.
    Value(Value),
}

/// A field of a composite type.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelField {
    /// Rust-side name; instances are keyed by it.
    pub name: String,
    /// Wire name used for input and, by default, for output.
    pub alias: String,
    pub ty: TypeDescriptor,
    pub default: FieldDefault,
    pub constraints: Constraints,
    pub title: String,
    pub description: Option<String>,
    pub examples: Vec<Value>,
    pub deprecated: bool,
}

impl ModelField {
    /// Create a field. Optional types default to `null`, others are required.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        let name = name.into();
        let default = if ty.is_optional() {
            FieldDefault::Value(Value::Null)
        } else {
            FieldDefault::Required
        };
        Self {
            alias: name.clone(),
            title: title_case(&name),
            name,
            ty,
            default,
            constraints: Constraints::default(),
            description: None,
            examples: Vec::new(),
            deprecated: false,
        }
    }

    /// Create a field typed after a Rust type.
    #[must_use]
    pub fn typed<T: Described + ?Sized>(name: impl Into<String>) -> Self {
        Self::new(name, T::descriptor())
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    #[must_use]
    pub fn default(mut self, value: Value) -> Self {
        self.default = FieldDefault::Value(value);
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.default = FieldDefault::Required;
        self
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn example(mut self, example: Value) -> Self {
        self.examples.push(example);
        self
    }

    #[must_use]
    pub fn deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = deprecated;
        self
    }

    #[must_use]
    pub fn constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    #[must_use]
    pub fn gt(mut self, bound: f64) -> Self {
        self.constraints.gt = Some(bound);
        self
    }

    #[must_use]
    pub fn ge(mut self, bound: f64) -> Self {
        self.constraints.ge = Some(bound);
        self
    }

    #[must_use]
    pub fn lt(mut self, bound: f64) -> Self {
        self.constraints.lt = Some(bound);
        self
    }

    #[must_use]
    pub fn le(mut self, bound: f64) -> Self {
        self.constraints.le = Some(bound);
        self
    }

    #[must_use]
    pub fn multiple_of(mut self, factor: f64) -> Self {
        self.constraints.multiple_of = Some(factor);
        self
    }

    #[must_use]
    pub fn min_length(mut self, len: usize) -> Self {
        self.constraints.min_length = Some(len);
        self
    }

    #[must_use]
    pub fn max_length(mut self, len: usize) -> Self {
        self.constraints.max_length = Some(len);
        self
    }

    #[must_use]
    pub fn pattern(mut self, pattern: Pattern) -> Self {
        self.constraints.pattern = Some(pattern);
        self
    }

    /// Returns true if the field has no default.
    #[must_use]
    pub fn is_required(&self) -> bool {
        matches!(self.default, FieldDefault::Required)
    }

    /// The default value, if any.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        match &self.default {
            FieldDefault::Required => None,
            FieldDefault::Value(v) => Some(v),
        }
    }
}

/// A composite type: a named, ordered set of fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDescriptor {
    /// Identity used for schema component names.
    pub name: String,
    pub title: String,
    pub description: Option<String>,
    pub fields: Vec<ModelField>,
}

impl ModelDescriptor {
    /// Create an empty model. The title defaults to the name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            title: name.clone(),
            name,
            description: None,
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a field.
    #[must_use]
    pub fn field(mut self, field: ModelField) -> Self {
        self.fields.push(field);
        self
    }

    /// Wrap in an `Arc`.
    #[must_use]
    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Look up a field by name.
    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<&ModelField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// A new model holding this model's fields followed by `other`'s.
    #[must_use]
    pub fn merged(&self, name: impl Into<String>, other: &ModelDescriptor) -> Self {
        let mut merged = Self::new(name);
        merged.fields = self.fields.iter().chain(&other.fields).cloned().collect();
        merged
    }

    /// Fields that must be supplied.
    pub fn required_fields(&self) -> impl Iterator<Item = &ModelField> {
        self.fields.iter().filter(|f| f.is_required())
    }
}

/// Rust types that describe a composite type. Derive with `#[derive(Model)]`.
pub trait Model: Described {
    fn model() -> Arc<ModelDescriptor>;
}

/// A raw input value handed to the validator.
#[derive(Debug, Clone, PartialEq)]
pub enum Raw {
    Value(Value),
    File(UploadFile),
    Files(Vec<UploadFile>),
}

impl From<Value> for Raw {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// A validated value.
#[derive(Debug, Clone, PartialEq)]
pub enum Validated {
    /// A scalar, `null`, or an `Any` value.
    Value(Value),
    Model(ModelInstance),
    List(Vec<Validated>),
    Map(IndexMap<String, Validated>),
    File(UploadFile),
}

impl Validated {
    /// Plain JSON, keyed by field names. Files render as their metadata.
    #[must_use]
    pub fn to_value(&self) -> Value {
        self.dump(&DumpOptions::default().by_alias(false))
    }

    /// Serialize under `options`. Include and exclude sets do not apply
    /// below the top level.
    #[must_use]
    pub fn dump(&self, options: &DumpOptions) -> Value {
        match self {
            Self::Value(v) => v.clone(),
            Self::Model(m) => m.dump(&options.nested()),
            Self::List(items) => Value::Array(items.iter().map(|i| i.dump(options)).collect()),
            Self::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.dump(options)))
                    .collect(),
            ),
            Self::File(file) => json!({
                "filename": file.filename,
                "content_type": file.content_type,
                "size": file.size(),
            }),
        }
    }
}

/// A validated composite value.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInstance {
    model: Arc<ModelDescriptor>,
    values: IndexMap<String, Validated>,
    fields_set: BTreeSet<String>,
}

impl ModelInstance {
    /// Construct from a JSON object keyed by alias (falling back to name).
    pub fn construct(
        model: &Arc<ModelDescriptor>,
        input: &Value,
    ) -> Result<Self, ValidationErrors> {
        let Value::Object(object) = input else {
            return Err(ValidationError::new(
                ErrorKind::ModelType,
                format!("Input should be a valid dictionary or instance of {}", model.name),
            )
            .with_input(input.clone())
            .into());
        };
        Self::construct_with(
            model,
            |_, field| vec![LocItem::field(&field.alias)],
            |_, field| {
                object
                    .get(&field.alias)
                    .or_else(|| object.get(&field.name))
                    .cloned()
                    .map(Raw::Value)
            },
        )
    }

    /// Construct from a per-field fetcher.
    ///
    /// `fetch` returns the raw value of the field at an index, or `None` when
    /// it is absent. `loc` gives the location errors of that field are
    /// reported under.
    pub fn construct_with<L, F>(
        model: &Arc<ModelDescriptor>,
        loc: L,
        mut fetch: F,
    ) -> Result<Self, ValidationErrors>
    where
        L: Fn(usize, &ModelField) -> Vec<LocItem>,
        F: FnMut(usize, &ModelField) -> Option<Raw>,
    {
        let mut errors = ValidationErrors::new();
        let mut values = IndexMap::with_capacity(model.fields.len());
        let mut fields_set = BTreeSet::new();

        for (idx, field) in model.fields.iter().enumerate() {
            match fetch(idx, field) {
                Some(raw) => match validate_field(field, raw) {
                    Ok(value) => {
                        values.insert(field.name.clone(), value);
                        fields_set.insert(field.name.clone());
                    }
                    Err(errs) => errors.extend(errs.prefixed(&loc(idx, field))),
                },
                None => match &field.default {
                    FieldDefault::Value(default) => {
                        values.insert(field.name.clone(), Validated::Value(default.clone()));
                    }
                    FieldDefault::Required => {
                        errors.push(ValidationError::missing().at(loc(idx, field)));
                    }
                },
            }
        }

        errors.into_result()?;
        Ok(Self {
            model: Arc::clone(model),
            values,
            fields_set,
        })
    }

    /// The instance's model.
    #[must_use]
    pub fn model(&self) -> &Arc<ModelDescriptor> {
        &self.model
    }

    /// A field value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Validated> {
        self.values.get(name)
    }

    /// Names of fields that were explicitly supplied.
    #[must_use]
    pub fn fields_set(&self) -> &BTreeSet<String> {
        &self.fields_set
    }

    /// Field values keyed by name, in declaration order.
    #[must_use]
    pub fn into_values(self) -> IndexMap<String, Validated> {
        self.values
    }

    /// Serialize under `options`.
    #[must_use]
    pub fn dump(&self, options: &DumpOptions) -> Value {
        let mut out = Map::new();
        for field in &self.model.fields {
            let Some(value) = self.values.get(&field.name) else {
                continue;
            };
            if options.include.as_ref().is_some_and(|inc| !inc.contains(&field.name))
                || options.exclude.contains(&field.name)
                || (options.exclude_unset && !self.fields_set.contains(&field.name))
            {
                continue;
            }
            let dumped = value.dump(options);
            if options.exclude_none && dumped.is_null() {
                continue;
            }
            if options.exclude_defaults && field.default_value() == Some(&dumped) {
                continue;
            }
            let key = if options.by_alias { &field.alias } else { &field.name };
            out.insert(key.clone(), dumped);
        }
        Value::Object(out)
    }
}

/// Serialization options for [`ModelInstance::dump`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpOptions {
    /// Only these top-level fields, when set.
    pub include: Option<BTreeSet<String>>,
    /// Drop these top-level fields.
    pub exclude: BTreeSet<String>,
    /// Key output by alias instead of name.
    pub by_alias: bool,
    /// Drop fields that were not explicitly supplied.
    pub exclude_unset: bool,
    /// Drop fields equal to their default.
    pub exclude_defaults: bool,
    /// Drop `null` fields.
    pub exclude_none: bool,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            include: None,
            exclude: BTreeSet::new(),
            by_alias: true,
            exclude_unset: false,
            exclude_defaults: false,
            exclude_none: false,
        }
    }
}

impl DumpOptions {
    #[must_use]
    pub fn include<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn exclude<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn by_alias(mut self, by_alias: bool) -> Self {
        self.by_alias = by_alias;
        self
    }

    #[must_use]
    pub fn exclude_unset(mut self, exclude: bool) -> Self {
        self.exclude_unset = exclude;
        self
    }

    #[must_use]
    pub fn exclude_defaults(mut self, exclude: bool) -> Self {
        self.exclude_defaults = exclude;
        self
    }

    #[must_use]
    pub fn exclude_none(mut self, exclude: bool) -> Self {
        self.exclude_none = exclude;
        self
    }

    fn nested(&self) -> Self {
        Self {
            include: None,
            exclude: BTreeSet::new(),
            ..self.clone()
        }
    }
}

impl TypeDescriptor {
    /// Validate and coerce a raw value. Error locations are relative to the
    /// value itself.
    pub fn validate(&self, raw: Raw) -> Result<Validated, ValidationErrors> {
        match raw {
            Raw::Value(value) => self.validate_value(value),
            Raw::File(file) => match self.unwrap_optional() {
                Self::Upload | Self::Any => Ok(Validated::File(file)),
                Self::List(inner) if matches!(inner.unwrap_optional(), Self::Upload) => {
                    Ok(Validated::List(vec![Validated::File(file)]))
                }
                _ => Err(upload_mismatch(self).into()),
            },
            Raw::Files(files) => match self.unwrap_optional() {
                Self::List(inner) if matches!(inner.unwrap_optional(), Self::Upload | Self::Any) => {
                    Ok(Validated::List(files.into_iter().map(Validated::File).collect()))
                }
                Self::Upload | Self::Any => match files.into_iter().next() {
                    Some(file) => Ok(Validated::File(file)),
                    None => Err(ValidationError::missing().into()),
                },
                _ => Err(upload_mismatch(self).into()),
            },
        }
    }

    fn validate_value(&self, value: Value) -> Result<Validated, ValidationErrors> {
        match self {
            Self::Any => Ok(Validated::Value(value)),
            Self::Optional(_) if value.is_null() => Ok(Validated::Value(Value::Null)),
            Self::Optional(inner) => inner.validate_value(value),
            Self::String => coerce_string(value).map(Validated::Value).map_err(Into::into),
            Self::Integer => coerce_integer(value).map(Validated::Value).map_err(Into::into),
            Self::Number => coerce_number(value).map(Validated::Value).map_err(Into::into),
            Self::Boolean => coerce_bool(value).map(Validated::Value).map_err(Into::into),
            Self::Upload => Err(ValidationError::new(
                ErrorKind::UploadType,
                format!("Expected UploadFile, received: {}", json_type_name(&value)),
            )
            .with_input(value)
            .into()),
            Self::List(inner) => {
                let Value::Array(items) = value else {
                    return Err(ValidationError::new(ErrorKind::ListType, "Input should be a valid list")
                        .with_input(value)
                        .into());
                };
                let mut errors = ValidationErrors::new();
                let mut out = Vec::with_capacity(items.len());
                for (idx, item) in items.into_iter().enumerate() {
                    match inner.validate_value(item) {
                        Ok(v) => out.push(v),
                        Err(errs) => errors.extend(errs.prefixed(&[LocItem::index(idx)])),
                    }
                }
                errors.into_result()?;
                Ok(Validated::List(out))
            }
            Self::Map(inner) => {
                let Value::Object(entries) = value else {
                    return Err(
                        ValidationError::new(ErrorKind::DictType, "Input should be a valid dictionary")
                            .with_input(value)
                            .into(),
                    );
                };
                let mut errors = ValidationErrors::new();
                let mut out = IndexMap::with_capacity(entries.len());
                for (key, item) in entries {
                    match inner.validate_value(item) {
                        Ok(v) => {
                            out.insert(key, v);
                        }
                        Err(errs) => errors.extend(errs.prefixed(&[LocItem::field(key)])),
                    }
                }
                errors.into_result()?;
                Ok(Validated::Map(out))
            }
            Self::Model(model) => ModelInstance::construct(model, &value).map(Validated::Model),
        }
    }
}

fn validate_field(field: &ModelField, raw: Raw) -> Result<Validated, ValidationErrors> {
    let value = field.ty.validate(raw)?;
    if field.constraints.is_empty() {
        return Ok(value);
    }
    check_constraints(&field.constraints, &value).map_err(ValidationErrors::from)?;
    Ok(value)
}

fn check_constraints(c: &Constraints, value: &Validated) -> Result<(), ValidationError> {
    match value {
        Validated::Value(Value::Number(n)) => {
            let x = n.as_f64().unwrap_or(f64::NAN);
            let input = Value::Number(n.clone());
            if let Some(gt) = c.gt.filter(|gt| x <= *gt) {
                return Err(bound_error(ErrorKind::GreaterThan, "greater than", "gt", gt, input));
            }
            if let Some(ge) = c.ge.filter(|ge| x < *ge) {
                return Err(bound_error(
                    ErrorKind::GreaterThanEqual,
                    "greater than or equal to",
                    "ge",
                    ge,
                    input,
                ));
            }
            if let Some(lt) = c.lt.filter(|lt| x >= *lt) {
                return Err(bound_error(ErrorKind::LessThan, "less than", "lt", lt, input));
            }
            if let Some(le) = c.le.filter(|le| x > *le) {
                return Err(bound_error(
                    ErrorKind::LessThanEqual,
                    "less than or equal to",
                    "le",
                    le,
                    input,
                ));
            }
            if let Some(m) = c.multiple_of.filter(|m| *m != 0.0 && !is_multiple(x, *m)) {
                return Err(bound_error(ErrorKind::MultipleOf, "a multiple of", "multiple_of", m, input));
            }
            Ok(())
        }
        Validated::Value(Value::String(s)) => {
            let len = s.chars().count();
            if let Some(min) = c.min_length.filter(|min| len < *min) {
                return Err(ValidationError::new(
                    ErrorKind::StringTooShort,
                    format!("String should have at least {min} {}", plural(min, "character")),
                )
                .with_input(Value::String(s.clone()))
                .with_ctx(json!({ "min_length": min })));
            }
            if let Some(max) = c.max_length.filter(|max| len > *max) {
                return Err(ValidationError::new(
                    ErrorKind::StringTooLong,
                    format!("String should have at most {max} {}", plural(max, "character")),
                )
                .with_input(Value::String(s.clone()))
                .with_ctx(json!({ "max_length": max })));
            }
            if let Some(pattern) = c.pattern.as_ref().filter(|p| !p.is_match(s)) {
                return Err(ValidationError::new(
                    ErrorKind::StringPatternMismatch,
                    format!("String should match pattern '{}'", pattern.as_str()),
                )
                .with_input(Value::String(s.clone()))
                .with_ctx(json!({ "pattern": pattern.as_str() })));
            }
            Ok(())
        }
        Validated::List(items) => {
            let len = items.len();
            if let Some(min) = c.min_length.filter(|min| len < *min) {
                return Err(ValidationError::new(
                    ErrorKind::TooShort,
                    format!(
                        "List should have at least {min} {} after validation, not {len}",
                        plural(min, "item")
                    ),
                )
                .with_ctx(json!({ "field_type": "List", "min_length": min, "actual_length": len })));
            }
            if let Some(max) = c.max_length.filter(|max| len > *max) {
                return Err(ValidationError::new(
                    ErrorKind::TooLong,
                    format!(
                        "List should have at most {max} {} after validation, not {len}",
                        plural(max, "item")
                    ),
                )
                .with_ctx(json!({ "field_type": "List", "max_length": max, "actual_length": len })));
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn bound_error(kind: ErrorKind, phrase: &str, key: &str, bound: f64, input: Value) -> ValidationError {
    ValidationError::new(kind, format!("Input should be {phrase} {}", format_number(bound)))
        .with_input(input)
        .with_ctx(json!({ key: number_value(bound) }))
}

fn is_multiple(x: f64, m: f64) -> bool {
    let q = x / m;
    (q - q.round()).abs() < 1e-9
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 { word.to_string() } else { format!("{word}s") }
}

/// Render a bound without a trailing `.0` for integral values.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn format_number(x: f64) -> String {
    if x.fract() == 0.0 && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        format!("{x}")
    }
}

/// A JSON number for a bound, integral when possible.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn number_value(x: f64) -> Value {
    if x.fract() == 0.0 && x.abs() < 1e15 {
        Value::from(x as i64)
    } else {
        Number::from_f64(x).map_or(Value::Null, Value::Number)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

fn upload_mismatch(ty: &TypeDescriptor) -> ValidationError {
    ValidationError::new(ErrorKind::ValueError, format!("Value error, expected {ty}, received a file"))
}

fn coerce_string(value: Value) -> Result<Value, ValidationError> {
    match value {
        Value::String(_) => Ok(value),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        other => Err(ValidationError::new(ErrorKind::StringType, "Input should be a valid string")
            .with_input(other)),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn coerce_integer(value: Value) -> Result<Value, ValidationError> {
    match &value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Ok(Value::from(f as i64)),
            _ => Err(ValidationError::new(
                ErrorKind::IntParsing,
                "Input should be a valid integer, got a number with a fractional part",
            )
            .with_input(value)),
        },
        Value::String(s) => parse_integer(s.trim()).ok_or_else(|| {
            ValidationError::new(
                ErrorKind::IntParsing,
                "Input should be a valid integer, unable to parse string as an integer",
            )
            .with_input(value.clone())
        }),
        _ => Err(ValidationError::new(ErrorKind::IntParsing, "Input should be a valid integer")
            .with_input(value)),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn parse_integer(s: &str) -> Option<Value> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::from(i));
    }
    if let Ok(u) = s.parse::<u64>() {
        return Some(Value::from(u));
    }
    let f = s.parse::<f64>().ok()?;
    (f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15).then(|| Value::from(f as i64))
}

fn coerce_number(value: Value) -> Result<Value, ValidationError> {
    match &value {
        Value::Number(_) => Ok(value),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| {
                ValidationError::new(
                    ErrorKind::FloatParsing,
                    "Input should be a valid number, unable to parse string as a number",
                )
                .with_input(value.clone())
            }),
        _ => Err(ValidationError::new(ErrorKind::FloatParsing, "Input should be a valid number")
            .with_input(value)),
    }
}

fn coerce_bool(value: Value) -> Result<Value, ValidationError> {
    let parsed = match &value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_f64() {
            Some(x) if x == 0.0 => Some(false),
            Some(x) if x == 1.0 => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" | "t" | "y" => Some(true),
            "false" | "0" | "no" | "off" | "f" | "n" => Some(false),
            _ => None,
        },
        _ => None,
    };
    parsed.map(Value::Bool).ok_or_else(|| {
        ValidationError::new(
            ErrorKind::BoolParsing,
            "Input should be a valid boolean, unable to interpret input",
        )
        .with_input(value)
    })
}

/// `"item_id"` to `"Item Id"`; letters after any non-letter are uppercased.
pub(crate) fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut boundary = true;
    for c in name.chars() {
        let c = if c == '_' { ' ' } else { c };
        if c.is_alphabetic() {
            if boundary {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            boundary = false;
        } else {
            out.push(c);
            boundary = !c.is_numeric();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_model() -> Arc<ModelDescriptor> {
        ModelDescriptor::new("Item")
            .field(ModelField::typed::<String>("name").min_length(2))
            .field(ModelField::typed::<f64>("price").gt(0.0))
            .field(ModelField::typed::<Option<String>>("description"))
            .field(ModelField::typed::<Vec<String>>("tags").default(json!([])))
            .field(ModelField::typed::<bool>("in_stock").alias("inStock").default(json!(true)))
            .build()
    }

    fn errors(result: Result<ModelInstance, ValidationErrors>) -> Vec<ValidationError> {
        result.unwrap_err().into_iter().collect()
    }

    #[test]
    fn test_construct_with_defaults() {
        let item = ModelInstance::construct(&item_model(), &json!({"name": "pen", "price": "1.5"}))
            .unwrap();
        assert_eq!(
            item.dump(&DumpOptions::default()),
            json!({"name": "pen", "price": 1.5, "description": null, "tags": [], "inStock": true})
        );
        let set: Vec<&str> = item.fields_set().iter().map(String::as_str).collect();
        assert_eq!(set, vec!["name", "price"]);
    }

    #[test]
    fn test_every_field_error_is_reported() {
        let errs = errors(ModelInstance::construct(
            &item_model(),
            &json!({"name": "x", "price": -1, "tags": ["ok", 3, {}], "inStock": "maybe"}),
        ));
        let kinds: Vec<(String, ErrorKind)> = errs
            .iter()
            .map(|e| {
                let loc: Vec<String> = e.loc.iter().map(ToString::to_string).collect();
                (loc.join("."), e.kind)
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("name".to_string(), ErrorKind::StringTooShort),
                ("price".to_string(), ErrorKind::GreaterThan),
                ("tags.2".to_string(), ErrorKind::StringType),
                ("inStock".to_string(), ErrorKind::BoolParsing),
            ]
        );
        assert_eq!(errs[0].msg, "String should have at least 2 characters");
        assert_eq!(errs[1].msg, "Input should be greater than 0");
        assert_eq!(errs[1].ctx, Some(json!({"gt": 0})));
    }

    #[test]
    fn test_missing_fields() {
        let errs = errors(ModelInstance::construct(&item_model(), &json!({})));
        assert_eq!(errs.len(), 2);
        assert!(errs.iter().all(|e| e.kind == ErrorKind::Missing && e.msg == "Field required"));
    }

    #[test]
    fn test_not_an_object() {
        let errs = errors(ModelInstance::construct(&item_model(), &json!([1])));
        assert_eq!(errs[0].kind, ErrorKind::ModelType);
        assert!(errs[0].loc.is_empty());
    }

    #[test]
    fn test_nested_model_locations() {
        let order = ModelDescriptor::new("Order")
            .field(ModelField::new("items", TypeDescriptor::list(TypeDescriptor::model(item_model()))))
            .build();
        let errs = errors(ModelInstance::construct(
            &order,
            &json!({"items": [{"name": "pen", "price": 1}, {"name": "cup"}]}),
        ));
        assert_eq!(errs.len(), 1);
        assert_eq!(
            serde_json::to_value(&errs[0].loc).unwrap(),
            json!(["items", 1, "price"])
        );
    }

    #[test]
    fn test_lax_scalar_coercion() {
        let int = TypeDescriptor::Integer;
        assert_eq!(int.validate(json!("42").into()).unwrap(), Validated::Value(json!(42)));
        assert_eq!(int.validate(json!(3.0).into()).unwrap(), Validated::Value(json!(3)));
        let err: Vec<_> = int.validate(json!("abc").into()).unwrap_err().into_iter().collect();
        assert_eq!(err[0].kind, ErrorKind::IntParsing);
        assert_eq!(
            err[0].msg,
            "Input should be a valid integer, unable to parse string as an integer"
        );
        assert!(int.validate(json!(1.5).into()).is_err());

        let boolean = TypeDescriptor::Boolean;
        for truthy in ["true", "1", "yes", "on", "TRUE"] {
            assert_eq!(boolean.validate(json!(truthy).into()).unwrap(), Validated::Value(json!(true)));
        }
        assert_eq!(boolean.validate(json!("off").into()).unwrap(), Validated::Value(json!(false)));

        assert_eq!(
            TypeDescriptor::Number.validate(json!("2.5").into()).unwrap(),
            Validated::Value(json!(2.5))
        );
        assert_eq!(
            TypeDescriptor::String.validate(json!(7).into()).unwrap(),
            Validated::Value(json!("7"))
        );
    }

    #[test]
    fn test_optional_accepts_null() {
        let ty = TypeDescriptor::of::<Option<i32>>();
        assert_eq!(ty.validate(Value::Null.into()).unwrap(), Validated::Value(Value::Null));
        assert_eq!(ty.validate(json!("5").into()).unwrap(), Validated::Value(json!(5)));
    }

    #[test]
    fn test_dump_options() {
        let item = ModelInstance::construct(
            &item_model(),
            &json!({"name": "pen", "price": 2, "inStock": true}),
        )
        .unwrap();

        let unset = item.dump(&DumpOptions::default().exclude_unset(true));
        assert_eq!(unset, json!({"name": "pen", "price": 2, "inStock": true}));

        let defaults = item.dump(&DumpOptions::default().exclude_defaults(true));
        assert_eq!(defaults, json!({"name": "pen", "price": 2}));

        let none = item.dump(&DumpOptions::default().exclude_none(true).by_alias(false));
        assert_eq!(none, json!({"name": "pen", "price": 2, "tags": [], "in_stock": true}));

        let include = item.dump(&DumpOptions::default().include(["name", "price"]).exclude(["price"]));
        assert_eq!(include, json!({"name": "pen"}));
    }

    #[test]
    fn test_pattern_and_list_length() {
        let model = ModelDescriptor::new("Code")
            .field(ModelField::typed::<String>("code").pattern(Pattern::new("^[A-Z]{3}$").unwrap()))
            .field(ModelField::typed::<Vec<i32>>("ids").max_length(1))
            .build();
        let errs = errors(ModelInstance::construct(&model, &json!({"code": "abc", "ids": [1, 2]})));
        assert_eq!(errs[0].kind, ErrorKind::StringPatternMismatch);
        assert_eq!(errs[0].msg, "String should match pattern '^[A-Z]{3}$'");
        assert_eq!(errs[1].kind, ErrorKind::TooLong);
        assert_eq!(errs[1].msg, "List should have at most 1 item after validation, not 2");
    }

    #[test]
    fn test_uploads() {
        let file = UploadFile {
            field_name: "f".into(),
            filename: "a.txt".into(),
            content_type: "text/plain".into(),
            data: b"hi".to_vec(),
            headers: Default::default(),
        };
        let single = TypeDescriptor::Upload.validate(Raw::File(file.clone())).unwrap();
        assert_eq!(single, Validated::File(file.clone()));
        let many = TypeDescriptor::of::<Vec<UploadFile>>()
            .validate(Raw::Files(vec![file.clone(), file.clone()]))
            .unwrap();
        assert!(matches!(many, Validated::List(ref v) if v.len() == 2));
        let err: Vec<_> = TypeDescriptor::Upload
            .validate(json!("text").into())
            .unwrap_err()
            .into_iter()
            .collect();
        assert_eq!(err[0].kind, ErrorKind::UploadType);
    }

    #[test]
    fn test_merged_model() {
        let files = ModelDescriptor::new("Files").field(ModelField::typed::<UploadFile>("upload"));
        let merged = item_model().merged("Body_create", &files);
        assert_eq!(merged.name, "Body_create");
        assert_eq!(merged.fields.len(), 6);
        assert_eq!(merged.fields[5].name, "upload");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("item_id"), "Item Id");
        assert_eq!(title_case("items.get_item"), "Items.Get Item");
        assert_eq!(title_case("x2_value"), "X2 Value");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(number_value(10.0), json!(10));
    }
}
