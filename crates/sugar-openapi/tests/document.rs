//! Integration tests for reading and writing whole documents.

use indexmap::IndexMap;
use serde_json::json;
use sugar_openapi::{
    OpenApi, OpenApiBuilder, Operation, ParameterLocation, ResponseEntry, Schema, SchemaType,
    Server, Tag,
};

#[test]
fn test_parse_hand_written_document() {
    let raw = json!({
        "openapi": "3.0.2",
        "info": {"title": "Pets", "version": "1.0.0", "termsOfService": "https://example.com/tos"},
        "paths": {
            "/pets/{pet_id}": {
                "get": {
                    "operationId": "read_pet__get",
                    "parameters": [{
                        "name": "pet_id",
                        "in": "path",
                        "required": true,
                        "schema": {"type": "integer", "title": "Pet Id", "minimum": 1.0}
                    }],
                    "responses": {
                        "200": {
                            "description": "success",
                            "content": {"application/json": {
                                "schema": {"$ref": "#/components/schemas/Pet"}
                            }}
                        },
                        "404": {"description": "Not found", "x-note": "raw"}
                    }
                }
            }
        },
        "components": {"schemas": {"Pet": {
            "type": "object",
            "title": "Pet",
            "properties": {
                "name": {"type": "string", "title": "Name"},
                "tags": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["name"]
        }}}
    });

    let doc: OpenApi = serde_json::from_value(raw).unwrap();
    assert_eq!(doc.info.terms_of_service.as_deref(), Some("https://example.com/tos"));

    let op = doc.paths["/pets/{pet_id}"].operation("get").unwrap();
    assert_eq!(op.parameters[0].location, ParameterLocation::Path);
    match &op.parameters[0].schema {
        Some(Schema::Primitive(p)) => {
            assert_eq!(p.schema_type, SchemaType::Integer);
            assert_eq!(p.minimum, Some(1.0));
        }
        other => panic!("expected a primitive schema, got {other:?}"),
    }
    assert!(matches!(op.responses["200"], ResponseEntry::Typed(_)));

    let Schema::Object(pet) = &doc.components.schemas["Pet"] else {
        panic!("Pet should be an object schema");
    };
    assert_eq!(pet.required, vec!["name"]);
    assert!(matches!(pet.properties["tags"], Schema::Array(_)));
}

#[test]
fn test_builder_output() {
    let mut extensions = IndexMap::new();
    extensions.insert("x-internal".to_string(), json!(true));
    let doc = OpenApiBuilder::new("Shop", "2.0.0")
        .description(Some(String::new()))
        .server(Server {
            url: "https://shop.example.com".to_string(),
            description: None,
        })
        .tag(Tag {
            name: "items".to_string(),
            description: Some("Things for sale".to_string()),
        })
        .path("/health")
        .operation(
            "delete",
            "/items/{id}",
            Operation {
                deprecated: true,
                extensions,
                ..Operation::default()
            },
        )
        .operation("connect", "/items/{id}", Operation::default())
        .security_scheme("apiKey", json!({"type": "apiKey", "in": "header", "name": "x-key"}))
        .build();

    let value = serde_json::to_value(&doc).unwrap();
    assert!(value["info"].get("description").is_none());
    assert_eq!(value["servers"], json!([{"url": "https://shop.example.com"}]));
    assert_eq!(value["paths"]["/health"], json!({}));
    assert_eq!(
        value["paths"]["/items/{id}"],
        json!({"delete": {"responses": {}, "deprecated": true, "x-internal": true}})
    );
    assert_eq!(value["components"]["securitySchemes"]["apiKey"]["in"], "header");
    assert!(value["components"].get("schemas").is_none());
}
