//! Services: RPC-style objects with a fixed set of method names.
//!
//! A service implements any subset of `find`, `get`, `create`, `update`,
//! `patch` and `remove`, and says which ones through [`Service::methods`].
//! That declaration is what the registration dispatcher probes; methods
//! left out answer `405 Method Not Allowed`.
//!
//! ```rust
//! use serde_json::json;
//! use tsu_services::service::{Params, Service, ServiceFuture};
//!
//! struct Items;
//!
//! impl Service for Items {
//!     fn methods(&self) -> &[&'static str] { &["get"] }
//!
//!     fn get<'a>(&'a self, id: String, _params: Params) -> ServiceFuture<'a> {
//!         Box::pin(async move { Ok(json!({ "id": id })) })
//!     }
//! }
//! ```

pub(crate) mod application;
mod error;

pub use application::{Application, Framework, Provider, ServiceOptions, VERSION};
pub use error::{ErrorKind, ServiceError};

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::handler::BoxFuture;

/// The future every service method returns.
pub type ServiceFuture<'a> = BoxFuture<'a, Result<Value, ServiceError>>;

/// The standard service methods.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ServiceMethod {
    Find,
    Get,
    Create,
    Update,
    Patch,
    Remove,
}

impl ServiceMethod {
    pub const ALL: [Self; 6] =
        [Self::Find, Self::Get, Self::Create, Self::Update, Self::Patch, Self::Remove];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Find   => "find",
            Self::Get    => "get",
            Self::Create => "create",
            Self::Update => "update",
            Self::Patch  => "patch",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for ServiceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Names of the standard methods, in [`ServiceMethod::ALL`] order.
pub const METHODS: [&str; 6] = ["find", "get", "create", "update", "patch", "remove"];

/// Name of the lifecycle method a service may declare.
pub const SETUP: &str = "setup";

/// Call parameters passed alongside ids and data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params {
    /// Transport the call came in through (`Some("rest")`), `None` when
    /// called from code.
    pub provider: Option<&'static str>,
    pub query: BTreeMap<String, String>,
}

/// An RPC-style service.
///
/// Every method has a default that fails with `MethodNotAllowed`, so an
/// implementation only writes what it supports and lists those names in
/// [`methods`](Self::methods).
pub trait Service: Send + Sync + 'static {
    /// The method names this service exposes, including `"setup"` when it
    /// has a lifecycle hook.
    fn methods(&self) -> &[&'static str];

    fn find<'a>(&'a self, _params: Params) -> ServiceFuture<'a> {
        unsupported(ServiceMethod::Find)
    }

    fn get<'a>(&'a self, _id: String, _params: Params) -> ServiceFuture<'a> {
        unsupported(ServiceMethod::Get)
    }

    fn create<'a>(&'a self, _data: Value, _params: Params) -> ServiceFuture<'a> {
        unsupported(ServiceMethod::Create)
    }

    fn update<'a>(&'a self, _id: String, _data: Value, _params: Params) -> ServiceFuture<'a> {
        unsupported(ServiceMethod::Update)
    }

    fn patch<'a>(&'a self, _id: Option<String>, _data: Value, _params: Params) -> ServiceFuture<'a> {
        unsupported(ServiceMethod::Patch)
    }

    fn remove<'a>(&'a self, _id: Option<String>, _params: Params) -> ServiceFuture<'a> {
        unsupported(ServiceMethod::Remove)
    }

    /// Called once the application is set up, with the path the service is
    /// registered at (slashes stripped).
    fn setup(&self, _app: &Application, _path: &str) -> Result<(), ServiceError> {
        Ok(())
    }
}

impl dyn Service {
    /// Whether the service declares `name` in [`Service::methods`].
    pub fn exposes(&self, name: &str) -> bool {
        self.methods().contains(&name)
    }
}

fn unsupported<'a>(method: ServiceMethod) -> ServiceFuture<'a> {
    Box::pin(async move {
        Err(ServiceError::method_not_allowed(format!(
            "Method `{method}` is not supported by this endpoint."
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    impl Service for Echo {
        fn methods(&self) -> &[&'static str] { &["get"] }

        fn get<'a>(&'a self, id: String, _params: Params) -> ServiceFuture<'a> {
            Box::pin(async move { Ok(json!({ "id": id })) })
        }
    }

    #[tokio::test]
    async fn undeclared_methods_are_not_allowed() {
        let err = Echo.remove(Some("1".into()), Params::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MethodNotAllowed);
        assert_eq!(err.message(), "Method `remove` is not supported by this endpoint.");
    }

    #[test]
    fn exposes_only_declared_names() {
        let echo: &dyn Service = &Echo;
        assert!(echo.exposes("get"));
        assert!(!echo.exposes("find"));
        assert!(!echo.exposes(SETUP));
    }

    #[test]
    fn method_names_line_up() {
        let names: Vec<_> = ServiceMethod::ALL.iter().map(|m| m.as_str()).collect();
        assert_eq!(names, METHODS);
    }
}
