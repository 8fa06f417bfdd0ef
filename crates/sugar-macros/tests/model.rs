//! Tests for `#[derive(Model)]`.

use serde::Deserialize;
use serde_json::json;
use sugar_core::{ErrorKind, FieldDefault, Model, ModelInstance, TypeDescriptor, Validated};
use sugar_macros::Model;

/// A thing we sell.
#[derive(Model, Deserialize)]
#[allow(dead_code)]
struct Item {
    #[model(ge = 1)]
    id: i64,
    /// Display name.
    #[model(min_length = 1, max_length = 20, example = "widget")]
    name: String,
    q: Option<String>,
    #[model(alias = "isVisible", default = true)]
    visible: bool,
    #[model(pattern = "^[A-Z]{3}$")]
    currency: Option<String>,
    #[model(skip)]
    #[serde(default)]
    internal: u8,
}

#[derive(Model)]
#[model(name = "Order", title = "Customer order")]
#[allow(dead_code)]
struct OrderPayload {
    items: Vec<Item>,
    #[model(deprecated, description = "Legacy reference")]
    r#ref: Option<String>,
}

#[test]
fn test_descriptor_fields() {
    let model = Item::model();
    assert_eq!(model.name, "Item");
    assert_eq!(model.description.as_deref(), Some("A thing we sell."));
    let names: Vec<&str> = model.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["id", "name", "q", "visible", "currency"]);

    let name = model.get_field("name").unwrap();
    assert_eq!(name.description.as_deref(), Some("Display name."));
    assert_eq!(name.constraints.min_length, Some(1));
    assert_eq!(name.examples, vec![json!("widget")]);

    let visible = model.get_field("visible").unwrap();
    assert_eq!(visible.alias, "isVisible");
    assert_eq!(visible.default, FieldDefault::Value(json!(true)));
    assert!(model.get_field("q").unwrap().default_value().is_some());
    assert!(model.get_field("id").unwrap().is_required());
    assert!(model.get_field("currency").unwrap().constraints.pattern.is_some());
}

#[test]
fn test_descriptor_is_cached() {
    assert!(std::sync::Arc::ptr_eq(&Item::model(), &Item::model()));
}

#[test]
fn test_container_attributes_and_nesting() {
    let model = OrderPayload::model();
    assert_eq!(model.name, "Order");
    assert_eq!(model.title, "Customer order");
    let items = model.get_field("items").unwrap();
    assert_eq!(items.ty, TypeDescriptor::list(TypeDescriptor::of::<Item>()));
    let reference = model.get_field("ref").unwrap();
    assert!(reference.deprecated);
    assert_eq!(reference.description.as_deref(), Some("Legacy reference"));
}

#[test]
fn test_construct_and_deserialize() {
    let instance =
        ModelInstance::construct(&Item::model(), &json!({"id": "5", "name": "widget"})).unwrap();
    let item: Item = serde_json::from_value(Validated::Model(instance).to_value()).unwrap();
    assert_eq!(item.id, 5);
    assert!(item.visible);

    let errors = ModelInstance::construct(
        &Item::model(),
        &json!({"id": 0, "name": "", "currency": "usd"}),
    )
    .unwrap_err();
    let kinds: Vec<ErrorKind> = errors.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ErrorKind::GreaterThanEqual,
            ErrorKind::StringTooShort,
            ErrorKind::StringPatternMismatch
        ]
    );
}
