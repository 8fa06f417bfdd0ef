//! A small inventory service exercised through the public facade.

use sugar::prelude::*;
use sugar::testing::json_contains;
use tracing_subscriber::util::SubscriberInitExt;

/// An item in stock.
#[derive(Model, Serialize, Deserialize)]
struct Item {
    #[model(min_length = 1, example = "lamp")]
    name: String,
    #[model(gt = 0)]
    price: f64,
    #[model(alias = "inStock", default = true)]
    in_stock: bool,
    note: Option<String>,
}

async fn create_item(args: BoundArgs) -> Result<Value, HttpError> {
    let item: Item = args.get("item")?;
    let token: String = args.get("x_token")?;
    if token != "secret" {
        return Err(HttpError::new(StatusCode::FORBIDDEN).with_detail("bad token"));
    }
    serde_json::to_value(item).map_err(|_| HttpError::internal())
}

async fn list_items(args: BoundArgs) -> Result<Value, HttpError> {
    let limit: i64 = args.get("limit")?;
    let items: Vec<Value> = (0..limit)
        .map(|i| json!({"name": format!("item-{i}"), "price": 1, "note": null}))
        .collect();
    Ok(Value::Array(items))
}

fn app() -> App {
    let items = RouteGroup::new("items")
        .prefix("/items")
        .post(
            "/",
            Signature::new()
                .arg(Arg::new("item").typed::<Item>())
                .arg(Arg::new("x_token").typed::<String>().marker(Marker::header())),
            create_item,
            RouteConfig::new()
                .status_code(StatusCode::CREATED)
                .response_type::<Item>()
                .endpoint("create"),
        )
        .get(
            "/",
            Signature::new().arg(
                Arg::new("limit")
                    .typed::<i64>()
                    .marker(Marker::query().default(json!(2)).ge(0.0).le(10.0)),
            ),
            list_items,
            RouteConfig::new()
                .response_type::<Vec<Item>>()
                .dump_options(DumpOptions::default().exclude_none(true))
                .endpoint("list"),
        );

    App::builder()
        .config(AppConfig::new().title("Inventory").version("1.2.0"))
        .include_group(items)
        .expect("valid group")
        .build()
}

#[test]
fn test_create_item() {
    let _guard = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .set_default();
    let client = TestClient::new(app());

    let response = client
        .post("/items/")
        .header("x-token", "secret")
        .json(&json!({"name": "lamp", "price": 12.5}))
        .send();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.json(),
        json!({"name": "lamp", "price": 12.5, "inStock": true, "note": null})
    );

    let response = client
        .post("/items/")
        .header("x-token", "nope")
        .json(&json!({"name": "lamp", "price": 1}))
        .send();
    assert_eq!(response.status().as_u16(), 403);
}

#[test]
fn test_create_item_reports_every_group() {
    let response = TestClient::new(app())
        .post("/items/")
        .json(&json!({"name": "", "price": -1}))
        .send();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let detail = response.json()["detail"].clone();
    assert_eq!(detail[0][0]["loc"], json!(["header", "x_token"]));
    assert_eq!(detail[1][0]["loc"], json!(["body", "name"]));
    assert_eq!(detail[1][1]["loc"], json!(["body", "price"]));
    assert_eq!(detail[1][1]["type"], "greater_than");
}

#[test]
fn test_list_items() {
    let client = TestClient::new(app());
    assert_eq!(
        client.get("/items/").send().json(),
        json!([
            {"name": "item-0", "price": 1, "inStock": true},
            {"name": "item-1", "price": 1, "inStock": true}
        ])
    );
    assert_eq!(client.get("/items/?limit=0").send().json(), json!([]));

    let response = client.get("/items/?limit=11").send();
    assert_eq!(response.status().as_u16(), 422);
    assert_eq!(response.json()["detail"][0][0]["type"], "less_than_equal");
}

#[test]
fn test_document() {
    let client = TestClient::new(app());
    let doc = client.get("/openapi.json").send().json();
    assert!(json_contains(
        &doc,
        &json!({
            "info": {"title": "Inventory", "version": "1.2.0"},
            "paths": {"/items/": {
                "post": {
                    "tags": ["items"],
                    "operationId": "items.create__post",
                    "requestBody": {"content": {"application/json": {
                        "schema": {"$ref": "#/components/schemas/Item"}
                    }}},
                    "responses": {"201": {"description": "success"}}
                },
                "get": {"operationId": "items.list__get"}
            }},
            "components": {"schemas": {"Item": {
                "title": "Item",
                "description": "An item in stock.",
                "required": ["name", "price"]
            }}}
        })
    ));

    let swagger = client.get("/doc").send();
    assert_eq!(swagger.status().as_u16(), 200);
    assert!(swagger.text().contains("Inventory Swagger"));
    assert!(client.get("/redoc").send().text().contains("Inventory Redoc"));
}
