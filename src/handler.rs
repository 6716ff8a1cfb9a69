//! Route handler trait and type erasure.
//!
//! The router stores handlers of different concrete types in one table, so
//! each one is wrapped once at registration time:
//!
//! ```text
//! async fn hello(req: Request) -> Response { … }   ← user writes this
//!        ↓ router.route(Method::GET, "/", hello)
//! Arc::new(FnHandler(hello))                       ← BoxedHandler
//!        ↓ at request time
//! Box::pin(async { hello(req).await.into_reply() }) ← BoxFuture
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{Reply, Response};
use crate::service::ServiceError;

/// A heap-allocated, type-erased, `Send` future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What every handler and middleware resolves to.
pub type Outcome = Result<Response, ServiceError>;

#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture<'static, Outcome>;
}

#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for every valid route handler:
///
/// ```text
/// async fn name(req: Request) -> impl Reply
/// ```
///
/// Sealed; only the blanket impl below satisfies it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: Reply + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: Reply + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: Reply + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture<'static, Outcome> {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_reply() })
    }
}
