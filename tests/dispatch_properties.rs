//! End-to-end behavior of the front-controller pass, through the public API.

use std::{collections::BTreeMap, sync::Arc};

use http::{Method, StatusCode, request::Parts};

use forecourt::{
    Controller, DispatchOptions, Dispatcher, HandlerRef, ParamShape, ParamSpec, ParamValue,
    RouteDef, RouteTable, ViewDirective,
};

fn parts(method: Method, uri: &str) -> Parts {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .body(())
        .unwrap()
        .into_parts()
        .0
}

fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn handler(tag: &'static str) -> HandlerRef {
    HandlerRef::from_fn("ItemsController", tag, vec![], move |_ctx, _args| async move {
        Ok(ViewDirective::body(tag))
    })
}

async fn body_of(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn get(dispatcher: &Dispatcher, path: &str) -> axum::response::Response {
    dispatcher
        .dispatch(path, Method::GET, params(&[]), parts(Method::GET, path))
        .await
}

#[tokio::test]
async fn static_routes_match_exactly() {
    let mut builder = RouteTable::builder();
    builder.register(Method::GET, "/items", handler("list")).unwrap();

    let dispatcher = Dispatcher::new(Arc::new(builder.freeze()));

    let response = get(&dispatcher, "/items").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_of(response).await, "list");

    let response = get(&dispatcher, "/items/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dynamic_routes_capture_path_parameters() {
    let mut builder = RouteTable::builder();
    builder
        .register(
            Method::GET,
            "/items/{id}",
            HandlerRef::from_fn(
                "ItemsController",
                "show",
                vec![ParamSpec::new("id", ParamShape::Int)],
                |_ctx, args| async move {
                    match args[0] {
                        ParamValue::Int(id) => Ok(ViewDirective::body(format!("item {id}"))),
                        _ => Ok(ViewDirective::body("no id")),
                    }
                },
            ),
        )
        .unwrap();

    let dispatcher = Dispatcher::new(Arc::new(builder.freeze()));

    let response = get(&dispatcher, "/items/42").await;
    assert_eq!(body_of(response).await, "item 42");

    // Coercion failure degrades to the unset sentinel, never an error.
    let response = get(&dispatcher, "/items/abc").await;
    assert_eq!(body_of(response).await, "no id");
}

#[tokio::test]
async fn exact_matches_beat_dynamic_patterns() {
    let mut builder = RouteTable::builder();
    builder
        .register(Method::GET, "/items/{id}", handler("show"))
        .unwrap();
    builder
        .register(Method::GET, "/items/new", handler("new_form"))
        .unwrap();

    let dispatcher = Dispatcher::new(Arc::new(builder.freeze()));

    assert_eq!(body_of(get(&dispatcher, "/items/new").await).await, "new_form");
    assert_eq!(body_of(get(&dispatcher, "/items/7").await).await, "show");
}

#[tokio::test]
async fn known_path_with_unsupported_verb_is_a_405() {
    let mut builder = RouteTable::builder();
    builder.register(Method::GET, "/items", handler("list")).unwrap();
    builder
        .register(Method::GET, "/items/{id}", handler("show"))
        .unwrap();

    let dispatcher = Dispatcher::new(Arc::new(builder.freeze()));

    for path in ["/items", "/items/7"] {
        let response = dispatcher
            .dispatch(path, Method::DELETE, params(&[]), parts(Method::DELETE, path))
            .await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body_of(response).await, "HTTP 405: Method Not Allowed");
    }
}

#[tokio::test]
async fn post_method_override_reaches_the_target_verb() {
    let mut builder = RouteTable::builder();
    builder
        .register(Method::PUT, "/items/{id}", handler("update"))
        .unwrap();

    let dispatcher = Dispatcher::new(Arc::new(builder.freeze()));

    let response = dispatcher
        .dispatch(
            "/items/7",
            Method::POST,
            params(&[("_method", "put")]),
            parts(Method::POST, "/items/7"),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_of(response).await, "update");

    // The override never applies to non-POST requests.
    let response = dispatcher
        .dispatch(
            "/items/7",
            Method::GET,
            params(&[("_method", "put")]),
            parts(Method::GET, "/items/7"),
        )
        .await;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn query_parameters_bind_by_name_and_degrade_to_unset() {
    let mut builder = RouteTable::builder();
    builder
        .register(
            Method::GET,
            "/search",
            HandlerRef::from_fn(
                "SearchController",
                "search",
                vec![
                    ParamSpec::new("q", ParamShape::Text),
                    ParamSpec::named("page_number", "page", ParamShape::Int),
                    ParamSpec::new("limit", ParamShape::Int),
                ],
                |_ctx, args| async move {
                    let q = args[0].as_text().unwrap_or("").to_owned();
                    let page = args[1].as_int().unwrap_or(1);
                    let limit = if args[2].is_unset() { 10 } else { args[2].as_int().unwrap() };

                    Ok(ViewDirective::body(format!("{q}/{page}/{limit}")))
                },
            ),
        )
        .unwrap();

    let dispatcher = Dispatcher::new(Arc::new(builder.freeze()));

    let response = dispatcher
        .dispatch(
            "/search",
            Method::GET,
            params(&[("q", "widgets"), ("page", "3")]),
            parts(Method::GET, "/search?q=widgets&page=3"),
        )
        .await;

    assert_eq!(body_of(response).await, "widgets/3/10");
}

#[tokio::test]
async fn view_directives_are_rooted_under_the_views_namespace() {
    let mut builder = RouteTable::builder();
    builder
        .register(
            Method::GET,
            "/items/{id}",
            HandlerRef::from_fn("ItemsController", "show", vec![], |_ctx, _args| async {
                Ok(ViewDirective::view("items/show").with("title", "Widget"))
            }),
        )
        .unwrap();

    let dispatcher = Dispatcher::new(Arc::new(builder.freeze()));

    let response = get(&dispatcher, "/items/7").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_of(response).await;
    assert!(body.contains("/views/items/show"));
    assert!(body.contains("Widget"));
}

#[tokio::test]
async fn unmatched_paths_delegate_to_the_fallback() {
    let dispatcher = Dispatcher::new(Arc::new(RouteTable::builder().freeze()));

    let response = get(&dispatcher, "/assets/style.css").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_of(response).await,
        "Requested resource not found for URL: /assets/style.css",
    );
}

#[tokio::test]
async fn the_index_path_is_configurable() {
    let mut builder = RouteTable::builder();
    builder.register(Method::GET, "/home", handler("home")).unwrap();

    let dispatcher = Dispatcher::new(Arc::new(builder.freeze())).with_options(DispatchOptions {
        index_path: "/home".to_owned(),
        ..Default::default()
    });

    let response = get(&dispatcher, "/").await;
    assert_eq!(body_of(response).await, "home");
}

struct ItemsController;

impl Controller for ItemsController {
    fn name(&self) -> &'static str {
        "ItemsController"
    }

    fn base_path(&self) -> &str {
        "/items"
    }

    fn routes(self: Arc<Self>) -> Vec<RouteDef> {
        vec![
            RouteDef::new(Method::GET, "/", handler("list")),
            RouteDef::new(Method::GET, "/{id}", handler("show")),
            RouteDef::new(Method::POST, "/", handler("create")),
        ]
    }
}

#[tokio::test]
async fn controllers_contribute_routes_under_their_base_path() {
    let mut builder = RouteTable::builder();
    builder.register_controller(Arc::new(ItemsController));

    let table = builder.freeze();
    assert_eq!(table.static_count(), 1);
    assert_eq!(table.dynamic_count(), 1);

    let dispatcher = Dispatcher::new(Arc::new(table));

    assert_eq!(body_of(get(&dispatcher, "/items").await).await, "list");
    assert_eq!(body_of(get(&dispatcher, "/items/7").await).await, "show");

    let response = dispatcher
        .dispatch("/items", Method::POST, params(&[]), parts(Method::POST, "/items"))
        .await;
    assert_eq!(body_of(response).await, "create");
}

struct StatusController;

impl Controller for StatusController {
    fn name(&self) -> &'static str {
        "StatusController"
    }

    fn base_path(&self) -> &str {
        "/status"
    }

    fn routes(self: Arc<Self>) -> Vec<RouteDef> {
        Vec::new()
    }

    fn fallback_handler(self: Arc<Self>) -> Option<HandlerRef> {
        Some(handler("status"))
    }
}

#[tokio::test]
async fn a_routeless_controller_mounts_its_default_handler() {
    let mut builder = RouteTable::builder();
    builder.register_controller(Arc::new(StatusController));

    let dispatcher = Dispatcher::new(Arc::new(builder.freeze()));

    assert_eq!(body_of(get(&dispatcher, "/status").await).await, "status");
}
