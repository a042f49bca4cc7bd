//! Forecourt
//!
//! An MVC front-controller framework core for server-rendered web
//! applications, built on Axum.
//!
//! A single entry point receives every request, resolves it against a route
//! table built once at startup from controller-supplied definitions, binds
//! the matched handler's parameters with lenient typed coercion, and
//! interprets the handler's view directive: a verbatim body, a forward to a
//! view collaborator, or a complete response. Unmatched paths delegate to a
//! fallback collaborator.

pub mod route;

mod controller;
mod dispatch;
mod registry;
mod server;
mod view;

pub use controller::{
    BoxError, Controller, HandlerFn, HandlerFuture, HandlerRef, ParamSpec, RouteDef, ViewData,
    ViewDirective,
};
pub use dispatch::{DispatchError, DispatchOptions, Dispatcher, RequestContext, Resolution};
pub use registry::{
    DynamicRoute, RegistrationError, RouteEntry, RouteTable, RouteTableBuilder,
};
pub use route::{
    CompiledPattern, ParseError, RouteTemplate,
    coerce::{ParamShape, ParamValue},
};
pub use server::{
    DispatchRouter, ServeError, Server, ServerBuilder, ServerInfo, ServerOptions,
    ServerOptionsFromEnvError,
};
pub use view::{Fallback, HtmlShellRenderer, NotFoundFallback, ViewAttributes, ViewRenderer};
