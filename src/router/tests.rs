use http::Method;
use serde_json::json;
use std::sync::Arc;

use super::{Registry, Resolution, ResponseDoc, RouteTable, RouterId};
use crate::dispatcher::{Handler, HandlerRequest, HandlerResponse};
use crate::error::ConfigError;
use crate::fields::{FieldKind, FieldLocation, FieldMeta, FieldSchema};

fn handler() -> Arc<dyn Handler> {
    Arc::new(|_: &HandlerRequest| HandlerResponse::json(200, json!({})))
}

fn add(reg: &mut Registry, router: RouterId, method: Method, path: &str) -> Result<(), ConfigError> {
    reg.register(router, method, path, Arc::new(FieldSchema::default()), handler())
        .map(|_| ())
}

fn matched(table: &RouteTable, method: Method, path: &str) -> (String, Vec<(String, String)>) {
    match table.resolve(&method, path) {
        Resolution::Matched(m) => (
            m.route.full_path().unwrap_or_default().to_string(),
            m.path_params
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        ),
        other => panic!("expected a match for {method} {path}, got {other:?}"),
    }
}

fn root_with(paths: &[(Method, &str)]) -> RouteTable {
    let mut reg = Registry::new();
    let root = reg.add_router("Default");
    for (method, path) in paths {
        add(&mut reg, root, method.clone(), path).unwrap();
    }
    reg.freeze(root).unwrap()
}

#[test]
fn test_static_paths_select_exact_route() {
    let paths = ["/", "/users", "/users/me", "/orders/open", "/a/b/c/d"];
    let table = root_with(&paths.map(|p| (Method::GET, p)));
    for p in paths {
        let (full, params) = matched(&table, Method::GET, p);
        assert_eq!(full, p);
        assert!(params.is_empty());
    }
}

#[test]
fn test_param_capture() {
    let table = root_with(&[(Method::GET, "/users/{id}")]);
    assert_eq!(
        matched(&table, Method::GET, "/users/42").1,
        vec![("id".to_string(), "42".to_string())]
    );
    assert_eq!(matched(&table, Method::GET, "/users/abc").1[0].1, "abc");
    assert!(matches!(table.resolve(&Method::GET, "/users"), Resolution::NotFound));
    assert!(matches!(
        table.resolve(&Method::GET, "/users/42/extra"),
        Resolution::NotFound
    ));
}

#[test]
fn test_deeper_route_reached_through_param() {
    let table = root_with(&[(Method::GET, "/users/{id}"), (Method::GET, "/users/{id}/extra")]);
    let (full, params) = matched(&table, Method::GET, "/users/42/extra");
    assert_eq!(full, "/users/{id}/extra");
    assert_eq!(params[0].1, "42");
}

#[test]
fn test_static_wins_over_param() {
    let table = root_with(&[(Method::GET, "/users/{id}"), (Method::GET, "/users/me")]);
    assert_eq!(matched(&table, Method::GET, "/users/me").0, "/users/me");
    assert_eq!(matched(&table, Method::GET, "/users/you").0, "/users/{id}");
}

#[test]
fn test_no_backtracking_after_static_commit() {
    let table = root_with(&[(Method::GET, "/a/{x}/c"), (Method::GET, "/a/b/d")]);
    assert!(matches!(table.resolve(&Method::GET, "/a/b/c"), Resolution::NotFound));
    assert_eq!(matched(&table, Method::GET, "/a/z/c").0, "/a/{x}/c");
}

#[test]
fn test_get_and_post_on_one_path() {
    let mut reg = Registry::new();
    let root = reg.add_router("Default");
    add(&mut reg, root, Method::GET, "/items").unwrap();
    add(&mut reg, root, Method::POST, "/items").unwrap();
    let err = add(&mut reg, root, Method::GET, "/items").unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateMethod { ref method, .. } if method == Method::GET));

    let table = reg.freeze(root).unwrap();
    let get = match table.resolve(&Method::GET, "/items") {
        Resolution::Matched(m) => m.route,
        other => panic!("{other:?}"),
    };
    let post = match table.resolve(&Method::POST, "/items") {
        Resolution::Matched(m) => m.route,
        other => panic!("{other:?}"),
    };
    assert_ne!(get.id(), post.id());
    assert_eq!(post.method(), &Method::POST);
}

#[test]
fn test_method_mismatch_lists_allow() {
    let table = root_with(&[(Method::GET, "/items"), (Method::POST, "/items")]);
    match table.resolve(&Method::PUT, "/items") {
        Resolution::MethodNotAllowed { allow } => assert_eq!(allow, "GET, POST"),
        other => panic!("{other:?}"),
    }
}

#[test]
fn test_intermediate_node_is_a_miss() {
    let table = root_with(&[(Method::GET, "/a/b")]);
    let res = table.resolve(&Method::GET, "/a");
    assert!(matches!(res, Resolution::NotFound));
    assert_eq!(res.status(), 404);
}

#[test]
fn test_wildcard_captures_remainder() {
    let table = root_with(&[(Method::GET, "/files/*rest")]);
    assert_eq!(
        matched(&table, Method::GET, "/files/a/b/c").1,
        vec![("rest".to_string(), "a/b/c".to_string())]
    );
    assert_eq!(matched(&table, Method::GET, "/files/").1[0].1, "");
    assert_eq!(matched(&table, Method::GET, "/files").1[0].1, "");
}

#[test]
fn test_unnamed_wildcard_reports_star() {
    let table = root_with(&[(Method::GET, "/static/*")]);
    let m = match table.resolve(&Method::GET, "/static/css/site.css") {
        Resolution::Matched(m) => m,
        other => panic!("{other:?}"),
    };
    assert_eq!(m.get_path_param("*"), Some("css/site.css"));
}

#[test]
fn test_resolve_is_idempotent() {
    let table = root_with(&[(Method::GET, "/orgs/{org}/repos/{repo}")]);
    let first = matched(&table, Method::GET, "/orgs/rust/repos/cargo");
    let second = matched(&table, Method::GET, "/orgs/rust/repos/cargo");
    assert_eq!(first, second);
}

#[test]
fn test_sibling_param_conflict() {
    let mut reg = Registry::new();
    let root = reg.add_router("Default");
    add(&mut reg, root, Method::GET, "/users/{id}").unwrap();
    let nodes = reg.tree().len();
    let err = add(&mut reg, root, Method::GET, "/users/{name}/posts").unwrap_err();
    assert!(matches!(err, ConfigError::ConflictingSegment { .. }));
    assert_eq!(reg.tree().len(), nodes);
}

#[test]
fn test_invalid_patterns() {
    let mut reg = Registry::new();
    let root = reg.add_router("Default");
    assert!(matches!(
        add(&mut reg, root, Method::GET, "/a/{}"),
        Err(ConfigError::EmptyParamName { .. })
    ));
    assert!(matches!(
        add(&mut reg, root, Method::GET, "/a/*rest/b"),
        Err(ConfigError::WildcardNotTrailing { .. })
    ));
}

#[test]
fn test_mount_makes_routes_reachable() {
    let mut reg = Registry::new();
    let a = reg.add_router("a");
    let b = reg.add_router("b");
    add(&mut reg, b, Method::GET, "/x").unwrap();
    add(&mut reg, b, Method::GET, "/{id}").unwrap();
    reg.mount(a, "/b", b).unwrap();

    let c = reg.add_router("c");
    assert!(matches!(
        reg.mount(c, "/again", b),
        Err(ConfigError::AlreadyMounted { .. })
    ));

    let table = reg.freeze(a).unwrap();
    assert_eq!(matched(&table, Method::GET, "/b/x").0, "/b/x");
    assert_eq!(matched(&table, Method::GET, "/b/7").1[0].1, "7");
}

#[test]
fn test_registration_after_mount_lands_under_prefix() {
    let mut reg = Registry::new();
    let root = reg.add_router("Default");
    let api = reg.add_router("api");
    reg.mount(root, "/api/v1", api).unwrap();
    add(&mut reg, api, Method::GET, "/ping").unwrap();
    let table = reg.freeze(root).unwrap();
    assert_eq!(matched(&table, Method::GET, "/api/v1/ping").0, "/api/v1/ping");
}

#[test]
fn test_mount_rejections() {
    let mut reg = Registry::new();
    let root = reg.add_router("Default");
    let a = reg.add_router("a");
    let b = reg.add_router("b");
    assert!(matches!(
        reg.mount(root, "a", a),
        Err(ConfigError::InvalidMountPrefix { .. })
    ));
    assert!(matches!(reg.mount(a, "/a", a), Err(ConfigError::SelfMount { .. })));
    reg.mount(a, "/b", b).unwrap();
    assert!(matches!(reg.mount(b, "/a", a), Err(ConfigError::MountCycle { .. })));
    assert!(matches!(
        reg.mount(root, "/*x", a),
        Err(ConfigError::WildcardNotTrailing { .. })
    ));
}

#[test]
fn test_mount_conflict_leaves_trees_untouched() {
    let mut reg = Registry::new();
    let root = reg.add_router("Default");
    add(&mut reg, root, Method::GET, "/users/{id}").unwrap();
    let users = reg.add_router("users");
    add(&mut reg, users, Method::GET, "/{name}").unwrap();
    let nodes = reg.tree().len();

    let err = reg.mount(root, "/users", users).unwrap_err();
    assert!(matches!(err, ConfigError::ConflictingSegment { .. }));
    assert_eq!(reg.tree().len(), nodes);
    assert!(reg.router(users).unwrap().parent().is_none());
    assert!(reg.router(root).unwrap().children().is_empty());
}

#[test]
fn test_mount_duplicate_method_at_junction() {
    let mut reg = Registry::new();
    let root = reg.add_router("Default");
    add(&mut reg, root, Method::GET, "/items").unwrap();
    let items = reg.add_router("items");
    add(&mut reg, items, Method::GET, "/").unwrap();
    assert!(matches!(
        reg.mount(root, "/items", items),
        Err(ConfigError::DuplicateMethod { .. })
    ));
}

#[test]
fn test_mount_merges_methods_at_junction() {
    let mut reg = Registry::new();
    let root = reg.add_router("Default");
    add(&mut reg, root, Method::GET, "/items").unwrap();
    let items = reg.add_router("items");
    add(&mut reg, items, Method::POST, "/").unwrap();
    reg.mount(root, "/items", items).unwrap();
    let table = reg.freeze(root).unwrap();
    match table.resolve(&Method::DELETE, "/items") {
        Resolution::MethodNotAllowed { allow } => assert_eq!(allow, "GET, POST"),
        other => panic!("{other:?}"),
    }
}

#[test]
fn test_nested_mounts_compose_prefixes() {
    let mut reg = Registry::new();
    let root = reg.add_router("Default");
    let v1 = reg.add_router("v1");
    let users = reg.add_router("users");
    add(&mut reg, users, Method::GET, "/{id}").unwrap();
    reg.mount(v1, "/users", users).unwrap();
    reg.mount(root, "/v1", v1).unwrap();

    let route = reg.all_routes(root).unwrap()[0];
    assert_eq!(reg.compute_full_path(route).unwrap(), "/v1/users/{id}");
    assert_eq!(reg.ancestors(users).collect::<Vec<_>>(), vec![v1, root]);

    let table = reg.freeze(root).unwrap();
    assert_eq!(matched(&table, Method::GET, "/v1/users/3").0, "/v1/users/{id}");
}

#[test]
fn test_enumeration_is_depth_first() {
    let mut reg = Registry::new();
    let root = reg.add_router("Default");
    let a = reg.add_router("a");
    let b = reg.add_router("b");
    add(&mut reg, a, Method::GET, "/one").unwrap();
    add(&mut reg, b, Method::GET, "/two").unwrap();
    add(&mut reg, root, Method::GET, "/zero").unwrap();
    reg.mount(root, "/a", a).unwrap();
    reg.mount(root, "/b", b).unwrap();

    let table = reg.freeze(root).unwrap();
    let order: Vec<&str> = table.routes().filter_map(|r| r.full_path()).collect();
    assert_eq!(order, vec!["/zero", "/a/one", "/b/two"]);
}

#[test]
fn test_freeze_overlays_responses() {
    let mut reg = Registry::new();
    let root = reg.add_router("Default");
    reg.router_mut(root)
        .unwrap()
        .add_response(500, ResponseDoc::new("server error"));
    reg.router_mut(root)
        .unwrap()
        .add_response(404, ResponseDoc::new("generic miss"));
    let id = reg
        .register(root, Method::GET, "/x", Arc::new(FieldSchema::default()), handler())
        .unwrap();
    reg.route_mut(id)
        .unwrap()
        .with_response(404, ResponseDoc::new("no such x"));

    let table = reg.freeze(root).unwrap();
    let route = table.route(id).unwrap();
    let effective = route.effective_responses();
    assert_eq!(effective.len(), 2);
    assert_eq!(effective[&404].description, "no such x");
    assert_eq!(effective[&500].description, "server error");
}

#[test]
fn test_freeze_collects_every_field_mismatch() {
    let mut reg = Registry::new();
    let root = reg.add_router("Default");
    let two = FieldSchema::default()
        .field(FieldMeta::new("a", FieldLocation::Path, FieldKind::String))
        .field(FieldMeta::new("b", FieldLocation::Path, FieldKind::String));
    reg.register(root, Method::GET, "/x/{a}", Arc::new(two.clone()), handler())
        .unwrap();
    reg.register(root, Method::GET, "/y", Arc::new(two), handler())
        .unwrap();

    let errors = reg.freeze(root).unwrap_err();
    assert_eq!(errors.len(), 2);
    assert!(errors
        .errors()
        .iter()
        .all(|e| matches!(e, ConfigError::PathFieldMismatch { declared: 2, .. })));
}

#[test]
fn test_freeze_rejects_mounted_root() {
    let mut reg = Registry::new();
    let root = reg.add_router("Default");
    let outer = reg.add_router("outer");
    add(&mut reg, root, Method::GET, "/ping").unwrap();
    reg.mount(outer, "/x", root).unwrap();

    let errors = reg.freeze(root).unwrap_err();
    assert_eq!(
        errors.errors(),
        &[ConfigError::RootMounted {
            router: "Default".to_string(),
            parent: "outer".to_string(),
        }]
    );
}

#[test]
fn test_full_path_only_after_freeze() {
    let mut reg = Registry::new();
    let root = reg.add_router("Default");
    let id = reg
        .register(root, Method::GET, "/x", Arc::new(FieldSchema::default()), handler())
        .unwrap();
    assert!(reg.route(id).unwrap().full_path().is_none());
    let table = reg.freeze(root).unwrap();
    assert_eq!(table.route(id).unwrap().full_path(), Some("/x"));
}

#[test]
fn test_unknown_handles() {
    let mut reg = Registry::new();
    let root = reg.add_router("Default");
    let mut other = Registry::new();
    other.add_router("x");
    let stray = other.add_router("y");
    assert!(matches!(
        add(&mut reg, stray, Method::GET, "/"),
        Err(ConfigError::UnknownRouter { index: 1 })
    ));
    assert!(reg.router(root).is_ok());
}
