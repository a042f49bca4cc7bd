//! The route table: built once at startup, frozen, then read by every
//! request.

use std::{collections::HashMap, sync::Arc};

use http::Method;

use crate::{
    controller::{Controller, HandlerRef, RouteDef},
    route::{CompiledPattern, ParseError, RouteTemplate},
};

/// An error that can occur while registering a route.
///
/// Registration errors are isolated: callers log them and skip the route,
/// they never abort the registration pass.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    /// The route template could not be parsed or compiled.
    #[error("invalid route template `{template}`: {err}")]
    InvalidTemplate {
        /// The offending template.
        template: String,

        /// The error that occurred.
        #[source]
        err: ParseError,
    },
}

/// One registered endpoint: the handlers for every verb supported at a
/// given path or pattern.
///
/// At most one entry exists per key (literal path, or compiled-pattern
/// source string); multiple verbs merge into the same entry.
#[derive(Debug, Clone, Default)]
pub struct RouteEntry {
    methods: HashMap<Method, HandlerRef>,
}

impl RouteEntry {
    /// The handler for the given verb, if the entry supports it.
    pub fn handler(&self, method: &Method) -> Option<&HandlerRef> {
        self.methods.get(method)
    }

    /// The verbs supported by this entry.
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.methods.keys()
    }

    /// Insert a handler, returning whether an earlier registration for the
    /// same verb was replaced.
    fn insert(&mut self, method: Method, handler: HandlerRef) -> bool {
        self.methods.insert(method, handler).is_some()
    }
}

/// A dynamic route: a compiled pattern and its entry.
#[derive(Debug, Clone)]
pub struct DynamicRoute {
    pattern: CompiledPattern,
    entry: RouteEntry,
}

impl DynamicRoute {
    /// The compiled pattern.
    pub fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }

    /// The route entry.
    pub fn entry(&self) -> &RouteEntry {
        &self.entry
    }
}

/// The builder for a [`RouteTable`].
///
/// This is the single-writer phase: all registration happens here, before
/// any request is accepted, and [`RouteTableBuilder::freeze`] consumes the
/// builder so no mutation can outlive it.
#[derive(Debug, Default)]
pub struct RouteTableBuilder {
    static_routes: HashMap<String, RouteEntry>,
    dynamic_routes: Vec<DynamicRoute>,
}

impl RouteTableBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one `(verb, template, handler)` tuple.
    ///
    /// Static templates merge into the exact-match index; dynamic templates
    /// merge into an existing entry with the identical pattern source, or
    /// append a new one (append-only, so the first registered pattern wins
    /// future structural matches). Re-registering the same `(verb, key)`
    /// replaces the earlier handler: last registration wins, by design.
    pub fn register(
        &mut self,
        method: Method,
        template: &str,
        handler: HandlerRef,
    ) -> Result<(), RegistrationError> {
        let parsed = RouteTemplate::parse(template).map_err(|err| {
            RegistrationError::InvalidTemplate {
                template: template.to_owned(),
                err,
            }
        })?;

        tracing::info!(
            "Registered route `{method} {template}` -> `{}::{}`.",
            handler.controller(),
            handler.name(),
        );

        match parsed {
            RouteTemplate::Static(path) => {
                let entry = self.static_routes.entry(path).or_default();

                if entry.insert(method, handler) {
                    tracing::debug!(
                        "Route `{template}` replaced an earlier registration for the same verb (last wins)."
                    );
                }
            }
            RouteTemplate::Dynamic(pattern) => {
                match self
                    .dynamic_routes
                    .iter_mut()
                    .find(|route| route.pattern.source() == pattern.source())
                {
                    Some(route) => {
                        if route.entry.insert(method, handler) {
                            tracing::debug!(
                                "Route `{template}` replaced an earlier registration for the same verb (last wins)."
                            );
                        }
                    }
                    None => {
                        let mut entry = RouteEntry::default();
                        entry.insert(method, handler);

                        self.dynamic_routes.push(DynamicRoute { pattern, entry });
                    }
                }
            }
        }

        Ok(())
    }

    /// Register a route definition.
    pub fn register_def(&mut self, def: RouteDef) -> Result<(), RegistrationError> {
        self.register(def.method, &def.template, def.handler)
    }

    /// Register every route contributed by a controller.
    ///
    /// Failures are logged and skipped per route: a bad template never
    /// aborts the registration pass. A controller with no routes falls back
    /// to its conventional default handler at the base path; with neither,
    /// it contributes nothing.
    pub fn register_controller(&mut self, controller: Arc<dyn Controller>) {
        let name = controller.name();
        let base = controller.base_path().to_owned();
        let defs = controller.clone().routes();

        if defs.is_empty() {
            match controller.fallback_handler() {
                Some(handler) => {
                    let template = join_paths(&base, "");

                    match self.register(Method::GET, &template, handler) {
                        Ok(()) => tracing::info!(
                            "Registered default controller `{name}` at `{template}`."
                        ),
                        Err(err) => tracing::error!(
                            "Failed to register the default handler of controller `{name}`: {err}"
                        ),
                    }
                }
                None => tracing::warn!(
                    "Controller `{name}` declares no routes and no default handler: it contributes nothing."
                ),
            }

            return;
        }

        for def in defs {
            let template = join_paths(&base, &def.template);

            if let Err(err) = self.register(def.method, &template, def.handler) {
                tracing::error!("Skipping route `{template}` of controller `{name}`: {err}");
            }
        }
    }

    /// Freeze the builder into an immutable route table.
    pub fn freeze(self) -> RouteTable {
        tracing::info!(
            "Route table frozen with {} static route(s) and {} dynamic route(s).",
            self.static_routes.len(),
            self.dynamic_routes.len(),
        );

        RouteTable {
            static_routes: self.static_routes,
            dynamic_routes: self.dynamic_routes,
        }
    }
}

/// The frozen route table.
///
/// Constructed exactly once at startup and read-only thereafter: the type
/// exposes no mutation, so sharing it behind an `Arc` across request
/// workers requires no locking.
#[derive(Debug)]
pub struct RouteTable {
    static_routes: HashMap<String, RouteEntry>,
    dynamic_routes: Vec<DynamicRoute>,
}

impl RouteTable {
    /// Get a builder for a route table.
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::new()
    }

    /// The exact-match entry for a path, if any.
    pub fn static_route(&self, path: &str) -> Option<&RouteEntry> {
        self.static_routes.get(path)
    }

    /// The dynamic routes, in registration order.
    pub fn dynamic_routes(&self) -> &[DynamicRoute] {
        &self.dynamic_routes
    }

    /// The number of static entries.
    pub fn static_count(&self) -> usize {
        self.static_routes.len()
    }

    /// The number of dynamic entries.
    pub fn dynamic_count(&self) -> usize {
        self.dynamic_routes.len()
    }

    /// Whether the table holds no routes at all.
    pub fn is_empty(&self) -> bool {
        self.static_routes.is_empty() && self.dynamic_routes.is_empty()
    }
}

/// Join a controller base path and a route template into one full template.
fn join_paths(base: &str, template: &str) -> String {
    let base = base.trim_end_matches('/');
    let template = template.trim_start_matches('/');

    if template.is_empty() {
        if base.is_empty() {
            "/".to_owned()
        } else {
            base.to_owned()
        }
    } else {
        format!("{base}/{template}")
    }
}
