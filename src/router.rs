//! The HTTP application: an ordered stack of middleware, mounted
//! sub-applications and routes.
//!
//! Requests walk the stack in registration order. Routes live in one radix
//! tree per method (O(path-length) lookup via [`matchit`]); the tree table
//! takes the stack position of the first route ever registered, so
//! middleware added before it runs first and middleware added after it only
//! sees requests no route answered.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::adapter::{Arg, Location};
use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler, Handler, Outcome};
use crate::middleware::{self, Middleware, Next};
use crate::request::Request;

/// Operations a router answers to.
///
/// `handle` and `set` are the native HTTP surface; an argument exposing
/// either is never taken for a service.
pub const SURFACE: &[&str] = &["use", "handle", "set", "setting", "route", "listen"];

/// The HTTP application.
///
/// Build it once at startup, register on it, and hand it to
/// [`Server::listen`](crate::Server::listen). Cloning is cheap: every
/// handler and middleware is reference-counted.
#[derive(Clone, Default)]
pub struct Router {
    stack: Vec<Layer>,
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    settings: HashMap<String, String>,
}

#[derive(Clone)]
struct Layer {
    prefix: String,
    kind: LayerKind,
}

#[derive(Clone)]
enum LayerKind {
    Use(Middleware),
    Routes,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered. Use [`Router::route`] to get the error instead.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.route(method, path, handler)
            .unwrap_or_else(|e| panic!("{e}"));
        self
    }

    /// Fallible form of [`Router::on`].
    pub fn route(
        &mut self,
        method: Method,
        path: &str,
        handler: impl Handler,
    ) -> Result<&mut Self, Error> {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .map_err(|e| Error::InvalidRoute { path: path.to_owned(), reason: e.to_string() })?;
        if !self.stack.iter().any(|layer| matches!(layer.kind, LayerKind::Routes)) {
            self.stack.push(Layer { prefix: "/".to_owned(), kind: LayerKind::Routes });
        }
        Ok(self)
    }

    /// Native registration: middleware and sub-applications, at a path or
    /// (zero-path form) at the root.
    ///
    /// Every argument must be [`Arg::Middleware`] or [`Arg::App`]; anything
    /// else fails with [`Error::InvalidMount`] and registers nothing.
    pub fn mount(&mut self, location: Location, args: Vec<Arg>) -> Result<&mut Self, Error> {
        let (prefix, args) = match location {
            Location::Path(path) => (normalize_prefix(&path), args),
            Location::Arg(first) => ("/".to_owned(), std::iter::once(first).chain(args).collect()),
        };
        if args.is_empty() {
            return Err(Error::InvalidMount { got: "nothing" });
        }

        let mut layers = Vec::with_capacity(args.len());
        for arg in args {
            let middleware = match arg {
                Arg::Middleware(middleware) => middleware,
                Arg::App(app) => mounted(prefix.clone(), Arc::new(*app)),
                other => return Err(Error::InvalidMount { got: other.kind_name() }),
            };
            layers.push(Layer { prefix: prefix.clone(), kind: LayerKind::Use(middleware) });
        }
        self.stack.extend(layers);
        Ok(self)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }

    /// Runs one request through the whole stack.
    ///
    /// A request nothing answered fails with `NotFound`.
    pub fn handle(&self, req: Request) -> BoxFuture<'static, Outcome> {
        self.dispatch(req, None)
    }

    fn dispatch(&self, req: Request, outer: Option<(Next, String)>) -> BoxFuture<'static, Outcome> {
        let path = req.route_path().to_owned();
        let mut stack = Vec::with_capacity(self.stack.len());
        for layer in &self.stack {
            match &layer.kind {
                LayerKind::Use(middleware) if matches_prefix(&layer.prefix, &path) => {
                    stack.push(middleware.clone());
                }
                LayerKind::Routes => {
                    if let Some((handler, params)) = self.lookup(req.method(), &path) {
                        stack.push(endpoint(handler, params));
                    }
                }
                LayerKind::Use(_) => {}
            }
        }
        middleware::run_chain(stack.into(), req, outer)
    }

    fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }
}

/// Wraps a sub-application so it runs below `prefix` and falls through to
/// the enclosing stack when nothing in it answers.
fn mounted(prefix: String, app: Arc<Router>) -> Middleware {
    middleware::from_fn(move |mut req: Request, next: Next| {
        let outer_base = req.base.clone();
        if prefix != "/" {
            req.base.push_str(&prefix);
        }
        app.dispatch(req, Some((next, outer_base)))
    })
}

fn endpoint(handler: BoxedHandler, params: HashMap<String, String>) -> Middleware {
    middleware::from_fn(move |mut req: Request, _next: Next| {
        req.params = params.clone();
        handler.call(req)
    })
}

fn normalize_prefix(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() { "/".to_owned() } else { format!("/{trimmed}") }
}

fn matches_prefix(prefix: &str, path: &str) -> bool {
    prefix == "/"
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}
