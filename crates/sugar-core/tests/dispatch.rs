//! End-to-end dispatch through `App::handle`.

use tracing_subscriber::util::SubscriberInitExt;
use std::sync::Arc;

use serde_json::{Value, json};
use sugar_core::{
    App, AppConfig, Arg, BoundArgs, ConfigurationError, HttpError, Marker, ModelDescriptor,
    ModelField, MultipartBody, RouteConfig, RouteGroup, Signature, StatusCode, TestClient,
    TypeDescriptor, json_contains,
};

fn item_model() -> Arc<ModelDescriptor> {
    ModelDescriptor::new("Item")
        .field(ModelField::typed::<i64>("id"))
        .field(ModelField::typed::<Option<String>>("q"))
        .build()
}

fn payload_model() -> Arc<ModelDescriptor> {
    ModelDescriptor::new("ItemIn")
        .field(ModelField::typed::<String>("name").min_length(1))
        .field(ModelField::typed::<f64>("price").gt(0.0))
        .field(ModelField::typed::<bool>("visible").alias("isVisible").default(json!(true)))
        .build()
}

fn traced() -> tracing::subscriber::DefaultGuard {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .set_default()
}

async fn echo(args: BoundArgs) -> Result<Value, HttpError> {
    Ok(args.to_json())
}

async fn read_item(args: BoundArgs) -> Result<Value, HttpError> {
    let id: i64 = args.get("item_id")?;
    let q: Option<String> = args.get("q")?;
    Ok(json!({"id": id, "q": q}))
}

fn items_app() -> App {
    App::builder()
        .get(
            "/items/<int:item_id>",
            Signature::new()
                .arg(Arg::new("item_id").typed::<i64>())
                .arg(Arg::new("q").typed::<Option<String>>().default(Value::Null)),
            read_item,
            RouteConfig::new().response_model(TypeDescriptor::model(item_model())),
        )
        .unwrap()
        .build()
}

#[test]
fn test_read_item_end_to_end() {
    let client = TestClient::new(items_app());

    let response = client.get("/items/42?q=hello").send();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.json(), json!({"id": 42, "q": "hello"}));

    let response = client.get("/items/42").send();
    assert_eq!(response.json(), json!({"id": 42, "q": null}));

    let response = client.get("/items/abc").send();
    assert_eq!(response.status().as_u16(), 422);
    let detail = response.json()["detail"].clone();
    assert_eq!(detail.as_array().map(Vec::len), Some(1));
    assert_eq!(detail[0].as_array().map(Vec::len), Some(1));
    assert_eq!(detail[0][0]["loc"], json!(["path", "item_id"]));
    assert_eq!(detail[0][0]["type"], "int_parsing");
}

#[test]
fn test_handler_name_drives_operation() {
    let app = App::builder()
        .get(
            "/closure/<int:item_id>",
            Signature::new().arg(Arg::new("item_id").typed::<i64>()),
            |args: BoundArgs| async move { Ok(args.to_json()) },
            RouteConfig::new(),
        )
        .unwrap()
        .build();
    let doc = items_app().openapi();
    let op = doc.paths["/items/{item_id}"].operation("get").unwrap();
    assert_eq!(op.summary.as_deref(), Some("Read Item"));
    assert_eq!(op.operation_id.as_deref(), Some("read_item__get"));
    assert_eq!(app.routes()[0].endpoint, "closure_item_id");
}

#[test]
fn test_path_segment_keeps_plus() {
    let app = App::builder()
        .get(
            "/files/<name>",
            Signature::new().arg(Arg::new("name").typed::<String>()),
            echo,
            RouteConfig::new(),
        )
        .unwrap()
        .build();
    let client = TestClient::new(app);
    assert_eq!(client.get("/files/a+b").send().json(), json!({"name": "a+b"}));
    assert_eq!(client.get("/files/a%20b").send().json(), json!({"name": "a b"}));
}

#[test]
fn test_literal_text_around_placeholder() {
    let app = App::builder()
        .get(
            "/reports/v<int:version>",
            Signature::new().arg(Arg::new("version").typed::<i64>()),
            echo,
            RouteConfig::new(),
        )
        .unwrap()
        .build();
    assert_eq!(app.routes()[0].path, "/reports/v{version}");
    let client = TestClient::new(app);
    assert_eq!(client.get("/reports/v3").send().json(), json!({"version": 3}));
    assert_eq!(client.get("/reports/3").send().status().as_u16(), 404);

    let err = App::builder()
        .get("/reports/<a>-<b>", Signature::new(), echo, RouteConfig::new())
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::CrowdedPathSegment { .. }));
}

#[test]
fn test_zero_parameter_handler() {
    let app = App::builder()
        .get("/ping", Signature::new(), echo, RouteConfig::new())
        .unwrap()
        .build();
    assert!(app.routes()[0].plan.is_empty());
    let response = TestClient::new(app).get("/ping?anything=1").send();
    assert_eq!(response.json(), json!({}));
}

#[test]
fn test_path_value_wins_over_query() {
    let app = App::builder()
        .get(
            "/users/<id>",
            Signature::new().arg(Arg::new("id").typed::<i64>()),
            echo,
            RouteConfig::new(),
        )
        .unwrap()
        .build();
    let response = TestClient::new(app).get("/users/5?id=9").send();
    assert_eq!(response.json(), json!({"id": 5}));
}

#[test]
fn test_two_composites_rejected() {
    let err = App::builder()
        .post(
            "/pair",
            Signature::new()
                .arg(Arg::new("left").annotation(TypeDescriptor::model(item_model())))
                .arg(Arg::new("right").annotation(TypeDescriptor::model(payload_model()))),
            echo,
            RouteConfig::new(),
        )
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::MultipleBodies { .. }));
}

#[test]
fn test_missing_query_and_malformed_body() {
    let _guard = traced();
    let app = App::builder()
        .post(
            "/items",
            Signature::new()
                .arg(Arg::new("limit").typed::<i64>())
                .arg(Arg::new("item").annotation(TypeDescriptor::model(payload_model()))),
            echo,
            RouteConfig::new(),
        )
        .unwrap()
        .build();
    let response = TestClient::new(app)
        .post("/items")
        .header("content-type", "application/json")
        .body(b"{not json".to_vec())
        .send();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let detail = response.json()["detail"].clone();
    assert_eq!(detail.as_array().map(Vec::len), Some(2));
    assert_eq!(detail[0][0]["loc"], json!(["query", "limit"]));
    assert_eq!(detail[0][0]["type"], "missing");
    assert_eq!(detail[1][0]["loc"], json!(["body"]));
    assert_eq!(detail[1][0]["type"], "json_invalid");
}

#[test]
fn test_json_body_binding() {
    let app = App::builder()
        .post(
            "/items",
            Signature::new().arg(Arg::new("item").annotation(TypeDescriptor::model(payload_model()))),
            echo,
            RouteConfig::new().status_code(StatusCode::CREATED),
        )
        .unwrap()
        .build();
    let client = TestClient::new(app);

    let response = client
        .post("/items")
        .json(&json!({"name": "lamp", "price": "9.5"}))
        .send();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.json(),
        json!({"item": {"name": "lamp", "price": 9.5, "visible": true}})
    );

    let response = client.post("/items").json(&json!({"name": "", "price": 0})).send();
    let detail = response.json()["detail"].clone();
    assert_eq!(detail[0][0]["loc"], json!(["body", "name"]));
    assert_eq!(detail[0][1]["loc"], json!(["body", "price"]));
}

#[test]
fn test_response_round_trip_adds_defaults() {
    let app = App::builder()
        .get(
            "/echo",
            Signature::new(),
            |_| async { Ok(json!({"name": "lamp", "price": 2})) },
            RouteConfig::new().response_model(TypeDescriptor::model(payload_model())),
        )
        .unwrap()
        .get(
            "/broken",
            Signature::new(),
            |_| async { Ok(json!({"name": "lamp"})) },
            RouteConfig::new().response_model(TypeDescriptor::model(payload_model())),
        )
        .unwrap()
        .build();
    let client = TestClient::new(app);
    assert_eq!(
        client.get("/echo").send().json(),
        json!({"name": "lamp", "price": 2, "isVisible": true})
    );
    assert_eq!(client.get("/broken").send().status().as_u16(), 500);
}

#[test]
fn test_handler_errors() {
    let app = App::builder()
        .get(
            "/missing",
            Signature::new(),
            |_| async { Err::<Value, _>(HttpError::not_found().with_detail("Item not found")) },
            RouteConfig::new(),
        )
        .unwrap()
        .build();
    let response = TestClient::new(app).get("/missing").send();
    assert_eq!(response.status().as_u16(), 404);
    assert_eq!(response.json(), json!({"detail": "Item not found"}));
}

#[test]
fn test_form_and_upload() {
    let form_model = ModelDescriptor::new("Note")
        .field(ModelField::typed::<String>("title"))
        .field(ModelField::typed::<Vec<String>>("tags").default(json!([])))
        .build();
    let app = App::builder()
        .post(
            "/notes",
            Signature::new().arg(Arg::new("note").annotation(TypeDescriptor::model(Arc::clone(&form_model))).marker(Marker::form())),
            echo,
            RouteConfig::new(),
        )
        .unwrap()
        .post(
            "/attach",
            Signature::new()
                .arg(Arg::new("note").annotation(TypeDescriptor::model(form_model)))
                .arg(Arg::new("upload").marker(Marker::file())),
            |args: BoundArgs| async move {
                let upload = args.file("upload").ok_or_else(HttpError::bad_request)?;
                Ok(json!({
                    "title": args.value("note").map(|n| n["title"].clone()),
                    "filename": upload.filename,
                    "size": upload.size(),
                }))
            },
            RouteConfig::new(),
        )
        .unwrap()
        .build();
    let client = TestClient::new(app);

    let response = client
        .post("/notes")
        .form(&[("title", "groceries"), ("tags", "food"), ("tags", "weekly")])
        .send();
    assert_eq!(
        response.json(),
        json!({"note": {"title": "groceries", "tags": ["food", "weekly"]}})
    );

    let response = client
        .post("/attach")
        .multipart(
            MultipartBody::new()
                .field("title", "receipt")
                .file("upload", "receipt.txt", "text/plain", b"total: 3".to_vec()),
        )
        .send();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        response.json(),
        json!({"title": "receipt", "filename": "receipt.txt", "size": 8})
    );

    let response = client
        .post("/attach")
        .multipart(MultipartBody::new().field("title", "receipt"))
        .send();
    assert_eq!(response.status().as_u16(), 422);
    assert_eq!(response.json()["detail"][0][0]["loc"], json!(["body", "upload"]));

    let response = client
        .post("/attach")
        .multipart(MultipartBody::new().field("comment", "no title, no file"))
        .send();
    assert_eq!(response.status().as_u16(), 422);
    let detail = response.json()["detail"].clone();
    assert_eq!(detail.as_array().map(Vec::len), Some(1));
    assert_eq!(detail[0][0]["loc"], json!(["body", "title"]));
    assert_eq!(detail[0][1]["loc"], json!(["body", "upload"]));
}

#[test]
fn test_groups_in_document() {
    let group = RouteGroup::new("items")
        .prefix("/api/items")
        .deprecated(true)
        .get(
            "/<int:item_id>",
            Signature::new().arg(Arg::new("item_id").typed::<i64>()),
            echo,
            RouteConfig::new().tag("catalog"),
        );
    let app = App::builder()
        .config(AppConfig::new().title("Shop").version("2.0.0"))
        .include_group(group)
        .unwrap()
        .build();

    let client = TestClient::new(app);
    assert_eq!(client.get("/api/items/3").send().json(), json!({"item_id": 3}));

    let doc = client.get("/openapi.json").send().json();
    assert!(json_contains(
        &doc,
        &json!({
            "openapi": "3.0.2",
            "info": {"title": "Shop", "version": "2.0.0"},
            "paths": {"/api/items/{item_id}": {"get": {
                "tags": ["items", "catalog"],
                "deprecated": true,
                "operationId": "items.echo__get",
                "summary": "Items.Echo"
            }}}
        })
    ));
    assert!(doc["components"]["schemas"]["HTTPValidationError"].is_object());
}

#[test]
fn test_schema_is_deterministic() {
    let build = || {
        App::builder()
            .config(AppConfig::new().cache_openapi(false))
            .get(
                "/items/<int:item_id>",
                Signature::new()
                    .arg(Arg::new("item_id").typed::<i64>())
                    .arg(Arg::new("q").typed::<Option<String>>().default(Value::Null)),
                read_item,
                RouteConfig::new().response_model(TypeDescriptor::model(item_model())),
            )
            .unwrap()
            .post(
                "/items",
                Signature::new().arg(Arg::new("item").annotation(TypeDescriptor::model(payload_model()))),
                echo,
                RouteConfig::new(),
            )
            .unwrap()
            .build()
    };
    let app = build();
    let first = app.openapi_json().unwrap();
    assert_eq!(first, app.openapi_json().unwrap());
    assert_eq!(first, build().openapi_json().unwrap());
}
