//! JSON Schema types for OpenAPI 3.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON Schema representation.
///
/// Variant order matters for deserialization: the untagged representation
/// tries each in turn, and [`ObjectSchema`] only rejects a non-object `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Schema {
    /// Boolean schema (true = any, false = none).
    Boolean(bool),
    /// Reference to another schema.
    Ref(RefSchema),
    /// Array schema.
    Array(ArraySchema),
    /// Object schema, or the empty "any value" schema.
    Object(ObjectSchema),
    /// Primitive type schema.
    Primitive(PrimitiveSchema),
}

impl Schema {
    /// Create a string schema.
    #[must_use]
    pub fn string() -> Self {
        Schema::Primitive(PrimitiveSchema::new(SchemaType::String, None))
    }

    /// Create an integer schema with optional format.
    #[must_use]
    pub fn integer(format: Option<&str>) -> Self {
        Schema::Primitive(PrimitiveSchema::new(SchemaType::Integer, format))
    }

    /// Create a number schema with optional format.
    #[must_use]
    pub fn number(format: Option<&str>) -> Self {
        Schema::Primitive(PrimitiveSchema::new(SchemaType::Number, format))
    }

    /// Create a boolean schema.
    #[must_use]
    pub fn boolean() -> Self {
        Schema::Primitive(PrimitiveSchema::new(SchemaType::Boolean, None))
    }

    /// Schema of an uploaded file: `{type: string, format: binary}`.
    #[must_use]
    pub fn binary() -> Self {
        Schema::Primitive(PrimitiveSchema::new(SchemaType::String, Some("binary")))
    }

    /// The empty schema, accepting any value.
    #[must_use]
    pub fn any() -> Self {
        Schema::Object(ObjectSchema::default())
    }

    /// Create a reference into `#/components/schemas/`.
    #[must_use]
    pub fn reference(name: &str) -> Self {
        Schema::Ref(RefSchema {
            reference: format!("#/components/schemas/{name}"),
        })
    }

    /// Create an array schema.
    #[must_use]
    pub fn array(items: Schema) -> Self {
        Schema::Array(ArraySchema {
            schema_type: SchemaType::Array,
            title: None,
            description: None,
            items: Box::new(items),
            min_items: None,
            max_items: None,
            default: None,
        })
    }

    /// Create an object schema with the given properties.
    #[must_use]
    pub fn object(properties: IndexMap<String, Schema>, required: Vec<String>) -> Self {
        Schema::Object(ObjectSchema {
            schema_type: Some(ObjectType::Object),
            properties,
            required,
            ..ObjectSchema::default()
        })
    }

    /// Create a free-form map schema whose values follow `values`.
    #[must_use]
    pub fn map(values: Schema) -> Self {
        Schema::Object(ObjectSchema {
            schema_type: Some(ObjectType::Object),
            additional_properties: Some(Box::new(values)),
            ..ObjectSchema::default()
        })
    }

    /// Set nullable on this schema (if primitive).
    #[must_use]
    pub fn nullable(mut self) -> Self {
        if let Schema::Primitive(ref mut p) = self {
            p.nullable = true;
        }
        self
    }

    /// Set the title (ignored on references and boolean schemas).
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        let title = Some(title.into());
        match self {
            Schema::Object(ref mut o) => o.title = title,
            Schema::Array(ref mut a) => a.title = title,
            Schema::Primitive(ref mut p) => p.title = title,
            Schema::Ref(_) | Schema::Boolean(_) => {}
        }
        self
    }

    /// Set the description (ignored on references and boolean schemas).
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = Some(description.into());
        match self {
            Schema::Object(ref mut o) => o.description = description,
            Schema::Array(ref mut a) => a.description = description,
            Schema::Primitive(ref mut p) => p.description = description,
            Schema::Ref(_) | Schema::Boolean(_) => {}
        }
        self
    }

    /// Set the default value (ignored on references and boolean schemas).
    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        match self {
            Schema::Object(ref mut o) => o.default = Some(default),
            Schema::Array(ref mut a) => a.default = Some(default),
            Schema::Primitive(ref mut p) => p.default = Some(default),
            Schema::Ref(_) | Schema::Boolean(_) => {}
        }
        self
    }

    /// Access the primitive payload, if any.
    #[must_use]
    pub fn as_primitive_mut(&mut self) -> Option<&mut PrimitiveSchema> {
        match self {
            Schema::Primitive(p) => Some(p),
            _ => None,
        }
    }

    /// Access the array payload, if any.
    #[must_use]
    pub fn as_array_mut(&mut self) -> Option<&mut ArraySchema> {
        match self {
            Schema::Array(a) => Some(a),
            _ => None,
        }
    }
}

/// Schema reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefSchema {
    /// Reference path (e.g., "#/components/schemas/Item").
    #[serde(rename = "$ref")]
    pub reference: String,
}

/// Object schema.
///
/// With no type and no properties it serializes as `{}`, the schema that
/// accepts any value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSchema {
    /// `object`, or absent for the "any value" schema.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<ObjectType>,
    /// Schema title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Schema description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Object properties, in declaration order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,
    /// Required property names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Additional properties schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<Schema>>,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Array schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArraySchema {
    /// Always `array`.
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    /// Schema title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Schema description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Item schema.
    pub items: Box<Schema>,
    /// Minimum items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    /// Maximum items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Primitive type schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimitiveSchema {
    /// JSON Schema type.
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    /// Format hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Schema title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Schema description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Nullable flag (OpenAPI 3.0).
    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,
    /// Inclusive lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    /// Inclusive upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    /// Exclusive lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<f64>,
    /// Exclusive upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<f64>,
    /// Divisor constraint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,
    /// Minimum string length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    /// Maximum string length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Regex the string must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl PrimitiveSchema {
    /// Create a primitive schema with no constraints.
    #[must_use]
    pub fn new(schema_type: SchemaType, format: Option<&str>) -> Self {
        Self {
            schema_type,
            format: format.map(String::from),
            title: None,
            description: None,
            default: None,
            nullable: false,
            minimum: None,
            maximum: None,
            exclusive_minimum: None,
            exclusive_maximum: None,
            multiple_of: None,
            min_length: None,
            max_length: None,
            pattern: None,
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(b: &bool) -> bool {
    !*b
}

/// The only `type` an [`ObjectSchema`] may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Object,
}

/// JSON Schema types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Null,
}
