//! Handler signatures.
//!
//! Handlers declare their arguments up front as a [`Signature`]: a name, an
//! optional type annotation, and an optional default that is either a plain
//! value or a source [`Marker`]. The binding plan is compiled from it once,
//! at registration.

use serde_json::Value;

use crate::model::FieldDefault;
use crate::params::Marker;
use crate::types::{Described, TypeDescriptor};

/// Default of a handler argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgDefault {
    /// No default.
    Empty,
    /// A source marker.
    Marker(Marker),
    /// A plain default value.
    Value(Value),
}

/// One declared handler argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub name: String,
    pub annotation: Option<TypeDescriptor>,
    pub default: ArgDefault,
}

impl Arg {
    /// An argument with neither annotation nor default.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotation: None,
            default: ArgDefault::Empty,
        }
    }

    /// Annotate with the descriptor of a Rust type.
    #[must_use]
    pub fn typed<T: Described + ?Sized>(self) -> Self {
        self.annotation(T::descriptor())
    }

    #[must_use]
    pub fn annotation(mut self, ty: TypeDescriptor) -> Self {
        self.annotation = Some(ty);
        self
    }

    /// Set a plain default value.
    #[must_use]
    pub fn default(mut self, value: Value) -> Self {
        self.default = ArgDefault::Value(value);
        self
    }

    /// Set a source marker as the default.
    #[must_use]
    pub fn marker(mut self, marker: Marker) -> Self {
        self.default = ArgDefault::Marker(marker);
        self
    }

    /// The argument's marker, if it has one.
    #[must_use]
    pub fn as_marker(&self) -> Option<&Marker> {
        match &self.default {
            ArgDefault::Marker(marker) => Some(marker),
            _ => None,
        }
    }

    /// Resolve the argument's semantic type.
    ///
    /// The annotation wins. Otherwise a marker contributes the type of its
    /// own default value, and a plain default contributes its own type. With
    /// nothing to go on the type is a string.
    #[must_use]
    pub fn resolve_type(&self) -> TypeDescriptor {
        if let Some(annotation) = &self.annotation {
            return annotation.clone();
        }
        match &self.default {
            ArgDefault::Marker(marker) => match &marker.info().default {
                FieldDefault::Value(value) => TypeDescriptor::of_value(value),
                FieldDefault::Required => TypeDescriptor::String,
            },
            ArgDefault::Value(value) => TypeDescriptor::of_value(value),
            ArgDefault::Empty => TypeDescriptor::String,
        }
    }
}

/// The ordered arguments of a handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    args: Vec<Arg>,
}

impl Signature {
    /// A signature with no arguments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an argument.
    #[must_use]
    pub fn arg(mut self, arg: Arg) -> Self {
        self.args.push(arg);
        self
    }

    #[must_use]
    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

impl FromIterator<Arg> for Signature {
    fn from_iter<I: IntoIterator<Item = Arg>>(iter: I) -> Self {
        Self {
            args: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_annotation_wins() {
        let arg = Arg::new("limit").typed::<i32>().default(json!("ten"));
        assert_eq!(arg.resolve_type(), TypeDescriptor::Integer);
    }

    #[test]
    fn test_marker_default_type() {
        let arg = Arg::new("ratio").marker(Marker::query().default(json!(0.5)));
        assert_eq!(arg.resolve_type(), TypeDescriptor::Number);
        let required = Arg::new("token").marker(Marker::header());
        assert_eq!(required.resolve_type(), TypeDescriptor::String);
    }

    #[test]
    fn test_plain_default_type() {
        assert_eq!(Arg::new("flag").default(json!(false)).resolve_type(), TypeDescriptor::Boolean);
        assert_eq!(
            Arg::new("q").default(Value::Null).resolve_type(),
            TypeDescriptor::optional(TypeDescriptor::String)
        );
    }

    #[test]
    fn test_fallback_is_string() {
        assert_eq!(Arg::new("name").resolve_type(), TypeDescriptor::String);
    }

    #[test]
    fn test_signature_collects() {
        let sig: Signature = ["a", "b"].into_iter().map(Arg::new).collect();
        assert_eq!(sig.len(), 2);
        assert_eq!(sig.args()[1].name, "b");
        assert!(Signature::new().is_empty());
    }
}
