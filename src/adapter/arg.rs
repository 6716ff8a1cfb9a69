//! The argument types of a registration call.

use std::fmt;
use std::sync::Arc;

use crate::middleware::Middleware;
use crate::router::Router;
use crate::service::Service;

/// One argument of [`App::register`](crate::App::register).
pub enum Arg {
    /// A plain middleware function.
    Middleware(Middleware),
    /// An object exposing service methods.
    Service(Arc<dyn Service>),
    /// A sub-application.
    App(Box<Router>),
    /// Several values at once. Never treated as a service.
    List(Vec<Arg>),
    /// Any other value, e.g. a stray string.
    Literal(String),
}

impl Arg {
    /// Wraps a service value.
    pub fn service(service: impl Service) -> Self {
        Self::Service(Arc::new(service))
    }

    pub fn is_middleware(&self) -> bool {
        matches!(self, Self::Middleware(_))
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Self::Middleware(_) => "middleware",
            Self::Service(_) => "service",
            Self::App(_) => "application",
            Self::List(_) => "list",
            Self::Literal(_) => "literal",
        }
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List(items) => f.debug_list().entries(items).finish(),
            Self::Literal(value) => write!(f, "Literal({value:?})"),
            other => f.write_str(other.kind_name()),
        }
    }
}

impl From<Middleware> for Arg {
    fn from(middleware: Middleware) -> Self { Self::Middleware(middleware) }
}

impl From<Arc<dyn Service>> for Arg {
    fn from(service: Arc<dyn Service>) -> Self { Self::Service(service) }
}

impl From<Router> for Arg {
    fn from(app: Router) -> Self { Self::App(Box::new(app)) }
}

impl From<Vec<Arg>> for Arg {
    fn from(items: Vec<Arg>) -> Self { Self::List(items) }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self { Self::Literal(value.to_owned()) }
}

/// Where a registration lands: a path, or the first argument itself when the
/// call has no path (global middleware, a root sub-application).
#[derive(Debug)]
pub enum Location {
    Path(String),
    Arg(Arg),
}

impl From<&str> for Location {
    fn from(path: &str) -> Self { Self::Path(path.to_owned()) }
}

impl From<String> for Location {
    fn from(path: String) -> Self { Self::Path(path) }
}

impl From<Arg> for Location {
    fn from(arg: Arg) -> Self { Self::Arg(arg) }
}

impl From<Middleware> for Location {
    fn from(middleware: Middleware) -> Self { Self::Arg(Arg::Middleware(middleware)) }
}

impl From<Router> for Location {
    fn from(app: Router) -> Self { Self::Arg(Arg::from(app)) }
}
