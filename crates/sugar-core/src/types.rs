//! Type descriptors.
//!
//! A [`TypeDescriptor`] is the declared type of a parameter or model field.
//! It drives value coercion in [`crate::model`] and schema rendering in
//! [`crate::openapi`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

use crate::model::ModelDescriptor;
use crate::multipart::UploadFile;

/// Declared type of a value.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    /// Any JSON value, passed through untouched.
    Any,
    String,
    Integer,
    Number,
    Boolean,
    /// An uploaded file.
    Upload,
    /// The inner type, or `null`.
    Optional(Box<TypeDescriptor>),
    /// A homogeneous list.
    List(Box<TypeDescriptor>),
    /// A string-keyed mapping with homogeneous values.
    Map(Box<TypeDescriptor>),
    /// A composite type.
    Model(Arc<ModelDescriptor>),
}

impl TypeDescriptor {
    #[must_use]
    pub fn optional(inner: TypeDescriptor) -> Self {
        match inner {
            already @ Self::Optional(_) => already,
            inner => Self::Optional(Box::new(inner)),
        }
    }

    #[must_use]
    pub fn list(inner: TypeDescriptor) -> Self {
        Self::List(Box::new(inner))
    }

    #[must_use]
    pub fn map(values: TypeDescriptor) -> Self {
        Self::Map(Box::new(values))
    }

    #[must_use]
    pub fn model(model: Arc<ModelDescriptor>) -> Self {
        Self::Model(model)
    }

    /// The type of a Rust value implementing [`Described`].
    #[must_use]
    pub fn of<T: Described>() -> Self {
        T::descriptor()
    }

    /// Infer a type from a JSON default value.
    ///
    /// `null` is an optional string, arrays take the type of their first
    /// element (string when empty) and objects are free-form mappings.
    #[must_use]
    pub fn of_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::optional(Self::String),
            Value::Bool(_) => Self::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => Self::Integer,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(items) => Self::list(items.first().map_or(Self::String, Self::of_value)),
            Value::Object(_) => Self::map(Self::Any),
        }
    }

    /// Strip one level of `Optional`.
    #[must_use]
    pub fn unwrap_optional(&self) -> &TypeDescriptor {
        match self {
            Self::Optional(inner) => inner,
            other => other,
        }
    }

    #[must_use]
    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Optional(_))
    }

    /// Whether the type is a composite (model, mapping, or a list or
    /// optional of one). Composite parameters are read from the body.
    #[must_use]
    pub fn is_composite(&self) -> bool {
        match self {
            Self::Model(_) | Self::Map(_) => true,
            Self::Optional(inner) | Self::List(inner) => inner.is_composite(),
            _ => false,
        }
    }

    /// Whether the type is a model, possibly optional. Only these default
    /// to the body when a parameter carries no marker.
    #[must_use]
    pub fn is_model(&self) -> bool {
        matches!(self.unwrap_optional(), Self::Model(_))
    }

    /// Whether the value is fetched as a list of raw values.
    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(self.unwrap_optional(), Self::List(_))
    }

    /// Whether the type is a file or a list of files.
    #[must_use]
    pub fn is_upload(&self) -> bool {
        match self.unwrap_optional() {
            Self::Upload => true,
            Self::List(inner) => matches!(inner.unwrap_optional(), Self::Upload),
            _ => false,
        }
    }

    /// The model, if this is (an optional) model type.
    #[must_use]
    pub fn as_model(&self) -> Option<&Arc<ModelDescriptor>> {
        match self.unwrap_optional() {
            Self::Model(model) => Some(model),
            _ => None,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::String => f.write_str("str"),
            Self::Integer => f.write_str("int"),
            Self::Number => f.write_str("float"),
            Self::Boolean => f.write_str("bool"),
            Self::Upload => f.write_str("file"),
            Self::Optional(inner) => write!(f, "Optional[{inner}]"),
            Self::List(inner) => write!(f, "List[{inner}]"),
            Self::Map(inner) => write!(f, "Dict[str, {inner}]"),
            Self::Model(model) => f.write_str(&model.name),
        }
    }
}

/// A compiled `pattern` constraint.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    /// Compile a pattern.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self)
    }

    /// The source pattern.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Whether the pattern matches somewhere in `value`.
    #[must_use]
    pub fn is_match(&self, value: &str) -> bool {
        self.0.is_match(value)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

/// Value constraints attached to a field or parameter.
///
/// Numeric bounds apply to integers and numbers; length bounds apply to
/// strings (in characters) and lists (in items).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub gt: Option<f64>,
    pub ge: Option<f64>,
    pub lt: Option<f64>,
    pub le: Option<f64>,
    pub multiple_of: Option<f64>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Pattern>,
}

impl Constraints {
    /// Returns true when no constraint is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Rust types with a known [`TypeDescriptor`].
///
/// Implemented for primitives, `String`, `Option`, `Vec`, string-keyed maps,
/// [`serde_json::Value`], [`UploadFile`], and every `#[derive(Model)]` type.
pub trait Described {
    fn descriptor() -> TypeDescriptor;
}

macro_rules! described {
    ($descriptor:expr => $($ty:ty),+ $(,)?) => {
        $(
            impl Described for $ty {
                fn descriptor() -> TypeDescriptor {
                    $descriptor
                }
            }
        )+
    };
}

described!(TypeDescriptor::String => String, str, char);
described!(TypeDescriptor::Boolean => bool);
described!(TypeDescriptor::Integer => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
described!(TypeDescriptor::Number => f32, f64);
described!(TypeDescriptor::Any => Value);
described!(TypeDescriptor::Upload => UploadFile);

impl<T: Described> Described for Option<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::optional(T::descriptor())
    }
}

impl<T: Described> Described for Vec<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::list(T::descriptor())
    }
}

impl<T: Described> Described for HashMap<String, T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::map(T::descriptor())
    }
}

impl<T: Described> Described for BTreeMap<String, T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::map(T::descriptor())
    }
}

impl<T: Described> Described for IndexMap<String, T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::map(T::descriptor())
    }
}

impl<T: Described + ?Sized> Described for Box<T> {
    fn descriptor() -> TypeDescriptor {
        T::descriptor()
    }
}

impl<T: Described> Described for Arc<T> {
    fn descriptor() -> TypeDescriptor {
        T::descriptor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_described_primitives() {
        assert_eq!(TypeDescriptor::of::<i64>(), TypeDescriptor::Integer);
        assert_eq!(TypeDescriptor::of::<f32>(), TypeDescriptor::Number);
        assert_eq!(
            TypeDescriptor::of::<Option<Vec<String>>>(),
            TypeDescriptor::optional(TypeDescriptor::list(TypeDescriptor::String))
        );
        assert_eq!(
            TypeDescriptor::of::<HashMap<String, bool>>(),
            TypeDescriptor::map(TypeDescriptor::Boolean)
        );
    }

    #[test]
    fn test_optional_does_not_nest() {
        let ty = TypeDescriptor::optional(TypeDescriptor::optional(TypeDescriptor::Integer));
        assert_eq!(ty, TypeDescriptor::optional(TypeDescriptor::Integer));
        assert_eq!(TypeDescriptor::of::<Option<Option<u8>>>(), ty);
    }

    #[test]
    fn test_of_value() {
        assert_eq!(TypeDescriptor::of_value(&json!(1)), TypeDescriptor::Integer);
        assert_eq!(TypeDescriptor::of_value(&json!(1.5)), TypeDescriptor::Number);
        assert_eq!(TypeDescriptor::of_value(&json!("x")), TypeDescriptor::String);
        assert_eq!(TypeDescriptor::of_value(&json!(true)), TypeDescriptor::Boolean);
        assert_eq!(
            TypeDescriptor::of_value(&Value::Null),
            TypeDescriptor::optional(TypeDescriptor::String)
        );
        assert_eq!(
            TypeDescriptor::of_value(&json!([1, 2])),
            TypeDescriptor::list(TypeDescriptor::Integer)
        );
        assert_eq!(
            TypeDescriptor::of_value(&json!([])),
            TypeDescriptor::list(TypeDescriptor::String)
        );
        assert!(TypeDescriptor::of_value(&json!({"a": 1})).is_composite());
    }

    #[test]
    fn test_shape_predicates() {
        let files = TypeDescriptor::of::<Vec<UploadFile>>();
        assert!(files.is_upload());
        assert!(files.is_list());
        assert!(!files.is_composite());
        assert!(TypeDescriptor::of::<Option<UploadFile>>().is_upload());
        assert!(!TypeDescriptor::of::<Vec<i32>>().is_upload());
        assert!(!TypeDescriptor::of::<Option<String>>().is_composite());
        assert!(!TypeDescriptor::of::<Vec<i32>>().is_model());
        assert!(!TypeDescriptor::of_value(&json!({"a": 1})).is_model());
    }

    #[test]
    fn test_display() {
        assert_eq!(TypeDescriptor::of::<Option<Vec<i32>>>().to_string(), "Optional[List[int]]");
    }

    #[test]
    fn test_pattern_equality_uses_source() {
        let a = Pattern::new("^[a-z]+$").unwrap();
        let b = Pattern::new("^[a-z]+$").unwrap();
        assert_eq!(a, b);
        assert!(a.is_match("abc"));
        assert!(!a.is_match("ABC"));
        assert!(Pattern::new("(").is_err());
    }
}
