//! The view-side collaborators of the dispatch engine.
//!
//! The core never renders templates or serves files itself: it resolves
//! *which* view with *what* attributes, then hands off through these traits.

use std::{collections::BTreeMap, sync::Arc};

use axum::response::{Html, IntoResponse, Response};
use http::StatusCode;

use crate::dispatch::RequestContext;

/// The attribute map handed to the view renderer.
pub type ViewAttributes = BTreeMap<String, serde_json::Value>;

/// Renders a resolved view path with its attributes into a response.
#[async_trait::async_trait]
pub trait ViewRenderer: Send + Sync {
    /// Render the view.
    ///
    /// `view_path` is already rooted under the views namespace; `attributes`
    /// holds the path parameters merged with the handler's view data, with
    /// the handler's entries taking precedence.
    async fn render(
        &self,
        view_path: &str,
        attributes: ViewAttributes,
        ctx: Arc<RequestContext>,
    ) -> Response;
}

/// Handles requests that matched no registered route.
#[async_trait::async_trait]
pub trait Fallback: Send + Sync {
    /// Produce the response for an unmatched path.
    async fn handle(&self, path: &str, ctx: Arc<RequestContext>) -> Response;
}

/// Root a view name under the views namespace.
///
/// Idempotent: a name already carrying the prefix is returned unchanged.
pub fn rooted_view_path(prefix: &str, name: &str) -> String {
    if name.starts_with(prefix) {
        name.to_owned()
    } else {
        format!("{prefix}{}", name.trim_start_matches('/'))
    }
}

/// A debug-quality renderer that dumps the attributes into an HTML shell.
///
/// Makes the crate runnable out of the box; real applications plug their
/// template engine in through [`ViewRenderer`] instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlShellRenderer;

#[async_trait::async_trait]
impl ViewRenderer for HtmlShellRenderer {
    async fn render(
        &self,
        view_path: &str,
        attributes: ViewAttributes,
        _ctx: Arc<RequestContext>,
    ) -> Response {
        let mut body = String::new();
        body.push_str("<!DOCTYPE html><html><head><title>");
        body.push_str(view_path);
        body.push_str("</title></head><body><h1>");
        body.push_str(view_path);
        body.push_str("</h1><dl>");

        for (key, value) in &attributes {
            body.push_str("<dt>");
            body.push_str(key);
            body.push_str("</dt><dd>");
            body.push_str(&value.to_string());
            body.push_str("</dd>");
        }

        body.push_str("</dl></body></html>");

        Html(body).into_response()
    }
}

/// The default fallback: a plain 404 page naming the unmatched path.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotFoundFallback;

#[async_trait::async_trait]
impl Fallback for NotFoundFallback {
    async fn handle(&self, path: &str, _ctx: Arc<RequestContext>) -> Response {
        tracing::debug!("No route matched `{path}`.");

        (
            StatusCode::NOT_FOUND,
            format!("Requested resource not found for URL: {path}"),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rooted_view_path() {
        assert_eq!(rooted_view_path("/views/", "item"), "/views/item");
        assert_eq!(rooted_view_path("/views/", "/item"), "/views/item");
        assert_eq!(rooted_view_path("/views/", "items/show"), "/views/items/show");
        assert_eq!(rooted_view_path("/views/", "/views/item"), "/views/item");
    }

    #[test]
    fn test_rooted_view_path_is_idempotent() {
        let once = rooted_view_path("/views/", "item");
        let twice = rooted_view_path("/views/", &once);

        assert_eq!(once, twice);
    }
}
