use std::collections::BTreeMap;

use axum::Router;

use crate::dispatch::Dispatcher;

/// The maximum size of an urlencoded form body, in bytes.
const FORM_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// A router whose fallback handler is the front controller.
///
/// Every path that no explicitly added route claims funnels through the
/// dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchRouter(Router);

impl DispatchRouter {
    /// Create a new dispatch router from a dispatcher.
    pub fn new(dispatcher: Dispatcher) -> Self {
        let router = Router::new()
            .fallback(
                |axum::extract::State(dispatcher): axum::extract::State<Dispatcher>,
                 request: axum::extract::Request| async move {
                    front_controller(dispatcher, request).await
                },
            )
            .with_state(dispatcher);

        Self(router)
    }

    /// Add a custom route, bypassing the front controller for its path.
    pub fn route(mut self, path: &str, method_router: axum::routing::MethodRouter) -> Self {
        self.0 = self.0.route(path, method_router);

        self
    }
}

impl From<DispatchRouter> for Router {
    fn from(dispatch_router: DispatchRouter) -> Self {
        dispatch_router.0
    }
}

/// The fallback handler: turn the raw request into dispatch input.
///
/// The query string always contributes request parameters; an urlencoded
/// POST body contributes as well, with form fields shadowing query fields
/// of the same name.
async fn front_controller(
    dispatcher: Dispatcher,
    request: axum::extract::Request,
) -> axum::response::Response {
    let (parts, body) = request.into_parts();
    let path = parts.uri.path().to_owned();
    let method = parts.method.clone();

    let mut params: BTreeMap<String, String> = BTreeMap::new();

    if let Some(query) = parts.uri.query() {
        match serde_html_form::from_str::<Vec<(String, String)>>(query) {
            Ok(pairs) => params.extend(pairs),
            Err(err) => tracing::warn!("Failed to parse the query string of `{path}`: {err}"),
        }
    }

    if method == http::Method::POST && is_urlencoded_form(&parts.headers) {
        match axum::body::to_bytes(body, FORM_BODY_LIMIT).await {
            Ok(bytes) => match serde_html_form::from_bytes::<Vec<(String, String)>>(&bytes) {
                Ok(pairs) => params.extend(pairs),
                Err(err) => tracing::warn!("Failed to parse the form body of `{path}`: {err}"),
            },
            Err(err) => tracing::warn!("Failed to read the form body of `{path}`: {err}"),
        }
    }

    dispatcher.dispatch(&path, method, params, parts).await
}

fn is_urlencoded_form(headers: &http::HeaderMap) -> bool {
    headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| {
            mime.trim()
                .eq_ignore_ascii_case("application/x-www-form-urlencoded")
        })
}
