use http::Request;
use segroute::{
    App, AppConfig, ConfigError, Dispatcher, FieldKind, FieldLocation, FieldMeta, FieldSchema,
};
use serde_json::json;

mod common;
use common::{describe, get};

fn app_with(path: &str, fields: FieldSchema) -> Dispatcher {
    let mut app = App::new(AppConfig::default());
    let root = app.root();
    app.post(root, path, fields.clone(), describe).unwrap();
    app.get(root, path, fields, describe).unwrap();
    app.freeze().unwrap()
}

#[test]
fn test_path_fields_bind_positionally() {
    // schema names need not match the pattern's names
    let fields = FieldSchema::default()
        .field(FieldMeta::new("org", FieldLocation::Path, FieldKind::String))
        .field(FieldMeta::new("number", FieldLocation::Path, FieldKind::Unsigned));
    let dispatcher = app_with("/orgs/{o}/issues/{n}", fields);

    let resp = dispatcher.dispatch(get("/orgs/rust/issues/42"));
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body["input"], json!({ "org": "rust", "number": 42 }));
}

#[test]
fn test_scalar_kinds() {
    let fields = FieldSchema::default()
        .field(FieldMeta::new("limit", FieldLocation::Query, FieldKind::Integer))
        .field(FieldMeta::new("ratio", FieldLocation::Query, FieldKind::Float))
        .field(FieldMeta::new("draft", FieldLocation::Query, FieldKind::Boolean))
        .field(FieldMeta::new("tags", FieldLocation::Query, FieldKind::Json));
    let dispatcher = app_with("/search", fields);

    let resp = dispatcher.dispatch(get("/search?limit=-5&ratio=0.25&draft=F&tags=%5B1%2C2%5D"));
    assert_eq!(resp.status, 200);
    assert_eq!(
        resp.body["input"],
        json!({ "limit": -5, "ratio": 0.25, "draft": false, "tags": [1, 2] })
    );
}

#[test]
fn test_last_query_value_wins() {
    let fields =
        FieldSchema::default().field(FieldMeta::new("page", FieldLocation::Query, FieldKind::Integer));
    let dispatcher = app_with("/list", fields);
    let resp = dispatcher.dispatch(get("/list?page=1&page=3"));
    assert_eq!(resp.body["input"]["page"], 3);
}

#[test]
fn test_header_and_cookie_fields() {
    let fields = FieldSchema::default()
        .field(FieldMeta::new("x-tenant", FieldLocation::Header, FieldKind::String))
        .field(FieldMeta::new("session", FieldLocation::Cookie, FieldKind::String))
        .field(FieldMeta::new("x-debug", FieldLocation::Header, FieldKind::Boolean).optional());
    let dispatcher = app_with("/me", fields);

    let req = Request::get("/me")
        .header("X-Tenant", "acme")
        .header("cookie", "theme=dark; session=s1")
        .body(Vec::new())
        .unwrap();
    let resp = dispatcher.dispatch(req);
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body["input"], json!({ "x-tenant": "acme", "session": "s1" }));

    let resp = dispatcher.dispatch(get("/me"));
    assert_eq!(resp.status, 400);
    assert_eq!(resp.body["field"], "x-tenant");
    assert_eq!(resp.body["error"], "required field x-tenant not provided");
}

#[test]
fn test_form_fields() {
    let fields = FieldSchema::default()
        .field(FieldMeta::new("name", FieldLocation::Form, FieldKind::String))
        .field(FieldMeta::new("age", FieldLocation::Form, FieldKind::Unsigned));
    let dispatcher = app_with("/people", fields);

    let req = Request::post("/people")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(b"name=Ada+Lovelace&age=36".to_vec())
        .unwrap();
    let resp = dispatcher.dispatch(req);
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body["input"], json!({ "name": "Ada Lovelace", "age": 36 }));

    let req = Request::post("/people")
        .body(b"name=Ada&age=-1".to_vec())
        .unwrap();
    let resp = dispatcher.dispatch(req);
    assert_eq!(resp.status, 400);
    assert_eq!(resp.body["error"], "the value -1 cannot be used for field age");
}

#[test]
fn test_optional_empty_value_is_skipped() {
    let fields = FieldSchema::default()
        .field(FieldMeta::new("q", FieldLocation::Query, FieldKind::String).optional());
    let dispatcher = app_with("/find", fields);
    let resp = dispatcher.dispatch(get("/find?q="));
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body["input"], json!({}));
}

#[test]
fn test_wildcard_value_binds_to_path_field() {
    let fields =
        FieldSchema::default().field(FieldMeta::new("file", FieldLocation::Path, FieldKind::String));
    let dispatcher = app_with("/static/*path", fields);
    let resp = dispatcher.dispatch(get("/static/css/app.css"));
    assert_eq!(resp.body["input"]["file"], "css/app.css");

    // an empty remainder is still a captured value
    let resp = dispatcher.dispatch(get("/static/"));
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body["input"]["file"], "");
}

#[test]
fn test_empty_wildcard_fails_non_string_path_field() {
    let fields =
        FieldSchema::default().field(FieldMeta::new("page", FieldLocation::Path, FieldKind::Integer));
    let dispatcher = app_with("/pages/*page", fields);
    assert_eq!(dispatcher.dispatch(get("/pages/3")).body["input"]["page"], 3);

    let resp = dispatcher.dispatch(get("/pages/"));
    assert_eq!(resp.status, 400);
    assert_eq!(resp.body["field"], "page");
    assert_eq!(resp.body["error"], "the value  cannot be used for field page");
}

#[test]
fn test_path_field_count_checked_at_freeze() {
    let mut app = App::new(AppConfig::default());
    let root = app.root();
    let users = app.router("users");
    let fields = FieldSchema::default()
        .field(FieldMeta::new("org", FieldLocation::Path, FieldKind::String))
        .field(FieldMeta::new("id", FieldLocation::Path, FieldKind::Integer));
    // only one capture locally; the mount prefix supplies the other
    app.get(users, "/{id}", fields.clone(), describe).unwrap();
    app.get(root, "/health", fields, describe).unwrap();
    app.include_router("/orgs/{org}/users", users).unwrap();

    let errors = app.freeze().unwrap_err();
    assert_eq!(errors.len(), 1);
    match &errors.errors()[0] {
        ConfigError::PathFieldMismatch {
            route,
            declared,
            captured,
        } => {
            assert_eq!(route, "GET /health");
            assert_eq!((*declared, *captured), (2, 0));
        }
        other => panic!("unexpected error {other:?}"),
    }
}
