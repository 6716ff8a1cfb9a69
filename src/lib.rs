//! # tsu-services
//!
//! One application that is both an HTTP router and a service framework.
//!
//! A tsu [`Router`] registers middleware and sub-applications. A service
//! framework registers RPC-style [`Service`]s and publishes them through
//! providers such as [`rest`]. [`adapt`] puts both behind a single
//! [`App::register`]:
//!
//! - middleware, sub-apps and anything the router understands go to the
//!   router, untouched
//! - a service goes to the framework, together with the middleware listed
//!   before it (runs before the service call) and after it (runs after,
//!   with the result in [`Request::data`])
//!
//! [`App::start`] brings the server up and then runs the framework's setup
//! with the live server, so services see the real bound address.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use serde_json::json;
//! use tsu_services::{
//!     Application, Arg, Params, Request, Service, ServiceFuture, adapt, error_handler,
//!     middleware::{self, Next},
//!     not_found, rest,
//! };
//!
//! struct Messages;
//!
//! impl Service for Messages {
//!     fn methods(&self) -> &[&'static str] { &["get"] }
//!
//!     fn get<'a>(&'a self, id: String, _params: Params) -> ServiceFuture<'a> {
//!         Box::pin(async move { Ok(json!({ "id": id, "text": "hello" })) })
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tsu_services::Error> {
//!     let mut framework = Application::new();
//!     framework.configure(rest());
//!
//!     let audit = middleware::from_fn(|req: Request, next: Next| next.run(req));
//!
//!     let mut app = adapt(Some(framework))?;
//!     app.register("/messages", [Arg::from(audit), Arg::service(Messages)])?
//!         .register(not_found(), Vec::new())?
//!         .register(error_handler(), Vec::new())?;
//!
//!     let server = app.listen("0.0.0.0:3030").await?;
//!     tokio::signal::ctrl_c().await?;
//!     server.close().await;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod handler;
mod request;
mod response;
mod rest;
mod router;
mod server;

pub mod adapter;
pub mod middleware;
pub mod service;

pub use adapter::{App, Arg, Location, adapt};
pub use config::ServerConfig;
pub use error::Error;
pub use handler::Handler;
pub use middleware::{error_handler, not_found};
pub use request::Request;
pub use response::{IntoResponse, Reply, Response, ResponseBuilder};
pub use rest::{Rest, rest};
pub use router::Router;
pub use server::{Server, ServerHandle, SharedRouter};
pub use service::{
    Application, ErrorKind, Framework, Params, Provider, Service, ServiceError, ServiceFuture,
};

/// The plain tsu router, without any service operations.
pub fn original() -> Router {
    Router::new()
}
