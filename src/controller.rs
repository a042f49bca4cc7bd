//! The controller and handler contracts.

use std::{collections::BTreeMap, fmt, future::Future, pin::Pin, sync::Arc};

use crate::{
    dispatch::RequestContext,
    route::coerce::{ParamShape, ParamValue},
};

/// A boxed error, used as the failure type of handler invocations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The future returned by a handler invocation.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<ViewDirective, BoxError>> + Send>>;

/// An async handler callable.
///
/// The `Arc` typically captures the owning controller instance, so cloning a
/// handler reference never re-constructs the controller.
pub type HandlerFn =
    Arc<dyn Fn(Arc<RequestContext>, Vec<ParamValue>) -> HandlerFuture + Send + Sync>;

/// The data mapping a handler hands to the view renderer.
pub type ViewData = BTreeMap<String, serde_json::Value>;

/// The result of a successful handler invocation.
#[derive(Debug)]
pub enum ViewDirective {
    /// An opaque string, written verbatim as the response body.
    Body(String),

    /// A named view with its data mapping.
    ///
    /// The mapping is merged into the request-scoped attributes and control
    /// is handed to the view renderer; the view name is rooted under the
    /// views namespace if it is not already.
    View {
        /// The view name.
        name: String,

        /// The view data mapping.
        model: ViewData,
    },

    /// A complete response produced by the handler itself.
    Response(axum::response::Response),
}

impl ViewDirective {
    /// A verbatim body directive.
    pub fn body(body: impl Into<String>) -> Self {
        Self::Body(body.into())
    }

    /// A view-forward directive with an empty data mapping.
    pub fn view(name: impl Into<String>) -> Self {
        Self::View {
            name: name.into(),
            model: ViewData::new(),
        }
    }

    /// Add an entry to the view data mapping.
    ///
    /// Has no effect on non-view directives. A value that fails to
    /// serialize degrades to JSON `null`, consistent with the lenient
    /// binding protocol.
    pub fn with(mut self, key: impl Into<String>, value: impl serde::Serialize) -> Self {
        if let Self::View { model, .. } = &mut self {
            let value = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
            model.insert(key.into(), value);
        }

        self
    }
}

/// The descriptor for one formal handler parameter.
///
/// Descriptors are built once at registration time and consumed uniformly
/// on the hot path, so no runtime inspection of the handler is ever needed.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    /// The declared parameter name.
    pub name: String,

    /// An explicit external name, looked up among the request parameters
    /// when no path parameter matches the declared name.
    pub external_name: Option<String>,

    /// The declared parameter shape.
    pub shape: ParamShape,
}

impl ParamSpec {
    /// A parameter bound by its declared name.
    pub fn new(name: impl Into<String>, shape: ParamShape) -> Self {
        Self {
            name: name.into(),
            external_name: None,
            shape,
        }
    }

    /// A parameter carrying an explicit external name for request-parameter
    /// lookup.
    pub fn named(
        name: impl Into<String>,
        external_name: impl Into<String>,
        shape: ParamShape,
    ) -> Self {
        Self {
            name: name.into(),
            external_name: Some(external_name.into()),
            shape,
        }
    }
}

/// A handler bound to a route: the callable unit, its owning controller's
/// name, and its parameter descriptor table.
#[derive(Clone)]
pub struct HandlerRef {
    controller: &'static str,
    name: &'static str,
    params: Vec<ParamSpec>,
    invoke: HandlerFn,
}

impl HandlerRef {
    /// Create a handler reference from a pre-boxed callable.
    pub fn new(
        controller: &'static str,
        name: &'static str,
        params: Vec<ParamSpec>,
        invoke: HandlerFn,
    ) -> Self {
        Self {
            controller,
            name,
            params,
            invoke,
        }
    }

    /// Create a handler reference from an async function or closure.
    pub fn from_fn<F, Fut>(
        controller: &'static str,
        name: &'static str,
        params: Vec<ParamSpec>,
        f: F,
    ) -> Self
    where
        F: Fn(Arc<RequestContext>, Vec<ParamValue>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ViewDirective, BoxError>> + Send + 'static,
    {
        Self::new(
            controller,
            name,
            params,
            Arc::new(move |ctx, args| Box::pin(f(ctx, args))),
        )
    }

    /// The owning controller's name.
    pub fn controller(&self) -> &'static str {
        self.controller
    }

    /// The handler's name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The parameter descriptor table.
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Invoke the handler with pre-bound arguments.
    pub fn call(&self, ctx: Arc<RequestContext>, args: Vec<ParamValue>) -> HandlerFuture {
        (self.invoke)(ctx, args)
    }
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRef")
            .field("controller", &self.controller)
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// One route definition contributed by a controller.
#[derive(Debug, Clone)]
pub struct RouteDef {
    /// The HTTP method.
    pub method: http::Method,

    /// The route template, relative to the controller's base path.
    pub template: String,

    /// The bound handler.
    pub handler: HandlerRef,
}

impl RouteDef {
    /// Create a route definition.
    pub fn new(method: http::Method, template: impl Into<String>, handler: HandlerRef) -> Self {
        Self {
            method,
            template: template.into(),
            handler,
        }
    }
}

/// A controller: a named group of route definitions owned by one instance.
///
/// Exactly one instance exists per controller, constructed before the route
/// table is frozen and shared by every request its routes handle. Handlers
/// must not rely on unsynchronized mutable instance state being private to
/// one request; use `Arc<RwLock<T>>` or `Arc<Mutex<T>>` for shared mutable
/// state.
pub trait Controller: Send + Sync {
    /// The controller name, used in route diagnostics.
    fn name(&self) -> &'static str;

    /// The base path prefixed to every route template of this controller.
    fn base_path(&self) -> &str {
        ""
    }

    /// The route definitions contributed by this controller.
    fn routes(self: Arc<Self>) -> Vec<RouteDef>;

    /// The conventional default handler.
    ///
    /// Mounted at the base path, for `GET`, when [`Controller::routes`]
    /// yields no definitions. A controller with neither routes nor a
    /// default handler contributes nothing.
    fn fallback_handler(self: Arc<Self>) -> Option<HandlerRef> {
        None
    }
}
