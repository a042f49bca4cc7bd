//! The front-controller dispatch engine.

use std::{collections::BTreeMap, sync::Arc};

use http::{Method, StatusCode, request::Parts};

use crate::{
    controller::{BoxError, HandlerRef, ParamSpec, ViewDirective},
    registry::RouteTable,
    route::coerce::ParamValue,
    view::{Fallback, HtmlShellRenderer, NotFoundFallback, ViewRenderer, rooted_view_path},
};

/// The tunable knobs of the dispatch engine.
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// The canonical path substituted for an empty or root request path.
    pub index_path: String,

    /// The namespace prefix under which view names are rooted.
    pub views_prefix: String,

    /// The request-parameter field consulted for the POST method override.
    pub method_override_field: String,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            index_path: "/index".to_owned(),
            views_prefix: "/views/".to_owned(),
            method_override_field: "_method".to_owned(),
        }
    }
}

/// The per-request context handed to handlers and collaborators.
///
/// Created when dispatch starts and dropped when the response is produced.
#[derive(Debug)]
pub struct RequestContext {
    /// The normalized request path.
    pub path: String,

    /// The effective verb, after method override.
    pub method: Method,

    /// The flat request-parameter map (query and form fields merged).
    pub params: BTreeMap<String, String>,

    /// The path parameters extracted by the matched pattern.
    ///
    /// Empty for static routes and for fallback delegation.
    pub path_params: BTreeMap<String, String>,

    /// The request head.
    pub parts: Parts,
}

impl RequestContext {
    /// A request parameter, by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// A path parameter, by placeholder name.
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }
}

/// The outcome of route resolution.
#[derive(Debug)]
pub enum Resolution {
    /// A route matched and supports the effective verb.
    Matched {
        /// The bound handler.
        handler: HandlerRef,

        /// The path parameters extracted by the pattern, if any.
        path_params: BTreeMap<String, String>,
    },

    /// The path is known but no registered handler supports the verb.
    MethodNotAllowed,

    /// No route matched the path.
    Unmatched,
}

/// An error that can occur during dispatch.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The invoked handler failed.
    ///
    /// Request-fatal only: the error is logged and surfaced as a 500-class
    /// response, the process stays alive.
    #[error("handler `{controller}::{handler}` failed for `{method} {path}`: {source}")]
    HandlerFailed {
        /// The owning controller's name.
        controller: &'static str,

        /// The handler's name.
        handler: &'static str,

        /// The effective verb.
        method: Method,

        /// The normalized path.
        path: String,

        /// The error that occurred.
        #[source]
        source: BoxError,
    },
}

impl axum::response::IntoResponse for DispatchError {
    fn into_response(self) -> axum::response::Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "HTTP 500: Internal Server Error",
        )
            .into_response()
    }
}

/// The dispatch engine: one instance serves every request.
///
/// Holds the frozen route table and the two collaborators it delegates to,
/// all behind `Arc`, so the dispatcher itself is cheap to clone and share.
#[derive(Clone)]
pub struct Dispatcher {
    table: Arc<RouteTable>,
    options: DispatchOptions,
    renderer: Arc<dyn ViewRenderer>,
    fallback: Arc<dyn Fallback>,
}

impl Dispatcher {
    /// Create a dispatcher over a frozen route table, with the default
    /// options and collaborators.
    pub fn new(table: Arc<RouteTable>) -> Self {
        Self {
            table,
            options: DispatchOptions::default(),
            renderer: Arc::new(HtmlShellRenderer),
            fallback: Arc::new(NotFoundFallback),
        }
    }

    /// Replace the view renderer.
    pub fn with_renderer(mut self, renderer: impl ViewRenderer + 'static) -> Self {
        self.renderer = Arc::new(renderer);

        self
    }

    /// Replace the fallback collaborator.
    pub fn with_fallback(mut self, fallback: impl Fallback + 'static) -> Self {
        self.fallback = Arc::new(fallback);

        self
    }

    /// Replace the dispatch options.
    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = options;

        self
    }

    /// The dispatch options.
    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    /// The route table.
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Normalize a raw request path.
    ///
    /// An empty or root path canonicalizes to the configured index path.
    pub fn normalize_path(&self, path: &str) -> String {
        if path.is_empty() || path == "/" {
            self.options.index_path.clone()
        } else {
            path.to_owned()
        }
    }

    /// Compute the effective verb.
    ///
    /// A POST carrying a non-empty method-override field uses the override,
    /// upper-cased. An override value that is not a valid method token is
    /// ignored and the raw verb kept. Non-POST requests never override.
    pub fn effective_method(&self, method: Method, params: &BTreeMap<String, String>) -> Method {
        if method != Method::POST {
            return method;
        }

        let Some(value) = params.get(&self.options.method_override_field) else {
            return method;
        };

        if value.is_empty() {
            return method;
        }

        match Method::from_bytes(value.to_ascii_uppercase().as_bytes()) {
            Ok(method) => method,
            Err(_) => {
                tracing::warn!("Ignoring unparseable method override `{value}`.");

                method
            }
        }
    }

    /// Resolve a normalized path and effective verb against the route table.
    ///
    /// Exact matches take precedence over all dynamic patterns; dynamic
    /// patterns are scanned in registration order and the first structural
    /// match that also supports the verb wins. A structural match without
    /// the verb marks the path as known, so exhausting the table yields
    /// [`Resolution::MethodNotAllowed`] instead of [`Resolution::Unmatched`].
    pub fn resolve(&self, path: &str, method: &Method) -> Resolution {
        let mut path_exists = false;

        if let Some(entry) = self.table.static_route(path) {
            if let Some(handler) = entry.handler(method) {
                return Resolution::Matched {
                    handler: handler.clone(),
                    path_params: BTreeMap::new(),
                };
            }

            path_exists = true;
        }

        for route in self.table.dynamic_routes() {
            let Some(path_params) = route.pattern().captures(path) else {
                continue;
            };

            path_exists = true;

            if let Some(handler) = route.entry().handler(method) {
                return Resolution::Matched {
                    handler: handler.clone(),
                    path_params,
                };
            }
        }

        if path_exists {
            Resolution::MethodNotAllowed
        } else {
            Resolution::Unmatched
        }
    }

    /// Bind the handler's formal parameters from the request context.
    ///
    /// For each descriptor, the raw value is a non-empty path parameter
    /// under the declared name, or failing that the request parameter under
    /// the external name when one is declared, or the declared name
    /// otherwise. The raw value is then coerced to the declared shape.
    /// Absence and coercion failure both bind [`ParamValue::Unset`].
    pub fn bind_params(&self, specs: &[ParamSpec], ctx: &RequestContext) -> Vec<ParamValue> {
        specs
            .iter()
            .map(|spec| {
                let raw = ctx
                    .path_param(&spec.name)
                    .filter(|value| !value.is_empty())
                    .or_else(|| {
                        let key = spec.external_name.as_deref().unwrap_or(&spec.name);

                        ctx.param(key)
                    });

                match raw {
                    Some(raw) => spec.shape.coerce(raw),
                    None => ParamValue::Unset,
                }
            })
            .collect()
    }

    /// Run the full front-controller pass for one request.
    pub async fn dispatch(
        &self,
        path: &str,
        method: Method,
        params: BTreeMap<String, String>,
        parts: Parts,
    ) -> axum::response::Response {
        use axum::response::IntoResponse;

        let path = self.normalize_path(path);
        let method = self.effective_method(method, &params);

        match self.resolve(&path, &method) {
            Resolution::Matched {
                handler,
                path_params,
            } => {
                let ctx = Arc::new(RequestContext {
                    path,
                    method,
                    params,
                    path_params,
                    parts,
                });

                self.invoke(&handler, ctx).await
            }
            Resolution::MethodNotAllowed => {
                tracing::debug!("No handler supports `{method}` at `{path}`.");

                (
                    StatusCode::METHOD_NOT_ALLOWED,
                    "HTTP 405: Method Not Allowed",
                )
                    .into_response()
            }
            Resolution::Unmatched => {
                let ctx = Arc::new(RequestContext {
                    path,
                    method,
                    params,
                    path_params: BTreeMap::new(),
                    parts,
                });

                self.fallback.handle(&ctx.path, ctx.clone()).await
            }
        }
    }

    /// Invoke a matched handler and interpret its view directive.
    async fn invoke(
        &self,
        handler: &HandlerRef,
        ctx: Arc<RequestContext>,
    ) -> axum::response::Response {
        use axum::response::IntoResponse;

        let args = self.bind_params(handler.params(), &ctx);

        match handler.call(ctx.clone(), args).await {
            Ok(ViewDirective::Body(body)) => axum::response::Html(body).into_response(),
            Ok(ViewDirective::View { name, model }) => {
                let view_path = rooted_view_path(&self.options.views_prefix, &name);

                let mut attributes: BTreeMap<String, serde_json::Value> = ctx
                    .path_params
                    .iter()
                    .map(|(key, value)| (key.clone(), serde_json::Value::String(value.clone())))
                    .collect();
                attributes.extend(model);

                self.renderer.render(&view_path, attributes, ctx).await
            }
            Ok(ViewDirective::Response(response)) => response,
            Err(source) => {
                let err = DispatchError::HandlerFailed {
                    controller: handler.controller(),
                    handler: handler.name(),
                    method: ctx.method.clone(),
                    path: ctx.path.clone(),
                    source,
                };

                tracing::error!("{err}");

                err.into_response()
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("table", &self.table)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
