//! Middleware layer.
//!
//! A [`Middleware`] wraps everything registered after it: it receives the
//! request and a [`Next`] for the rest of the chain, and decides whether to
//! continue, answer early, or post-process what comes back.
//!
//! ```text
//! Request → mw1 → mw2 → route → …
//!                  ↓
//! Response ← mw1 ← mw2 ← Response
//! ```
//!
//! Recover middleware ([`recover_fn`]) never sees requests. It runs once the
//! chain has produced an error and may turn it into a response.

mod errors;

pub use errors::{error_handler, not_found};

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::handler::{BoxFuture, Outcome};
use crate::request::Request;
use crate::service::ServiceError;

type HandleFn = dyn Fn(Request, Next) -> BoxFuture<'static, Outcome> + Send + Sync;
type RecoverFn = dyn Fn(ServiceError) -> BoxFuture<'static, Outcome> + Send + Sync;

/// A plain middleware function, cheap to clone.
#[derive(Clone)]
pub struct Middleware {
    kind: Kind,
}

#[derive(Clone)]
enum Kind {
    Handle(Arc<HandleFn>),
    Recover(Arc<RecoverFn>),
}

impl Middleware {
    /// `true` for middleware built with [`recover_fn`].
    pub fn is_recover(&self) -> bool {
        matches!(self.kind, Kind::Recover(_))
    }

    /// Whether both values are clones of the same middleware.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.kind, &other.kind) {
            (Kind::Handle(a), Kind::Handle(b)) => Arc::ptr_eq(a, b),
            (Kind::Recover(a), Kind::Recover(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Kind::Handle(_) => f.write_str("Middleware::Handle"),
            Kind::Recover(_) => f.write_str("Middleware::Recover"),
        }
    }
}

/// Builds middleware from an async function of the request and the rest of
/// the chain.
///
/// ```rust
/// use tsu_services::middleware::{self, Next};
/// use tsu_services::Request;
///
/// let tag = middleware::from_fn(|mut req: Request, next: Next| async move {
///     req.set_data(serde_json::json!({ "seen": true }));
///     next.run(req).await
/// });
/// ```
pub fn from_fn<F, Fut>(f: F) -> Middleware
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    let f = move |req: Request, next: Next| -> BoxFuture<'static, Outcome> {
        Box::pin(f(req, next))
    };
    Middleware { kind: Kind::Handle(Arc::new(f)) }
}

/// Builds error-handling middleware. It runs, in registration order, on the
/// error the rest of its router produced.
pub fn recover_fn<F, Fut>(f: F) -> Middleware
where
    F: Fn(ServiceError) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    let f = move |err: ServiceError| -> BoxFuture<'static, Outcome> { Box::pin(f(err)) };
    Middleware { kind: Kind::Recover(Arc::new(f)) }
}

// ── Chain ─────────────────────────────────────────────────────────────────────

/// The remainder of a middleware chain.
pub struct Next {
    stack: Arc<[Middleware]>,
    index: usize,
    tail: Option<Box<Tail>>,
}

/// Where a chain continues once its own stack is exhausted: the enclosing
/// router, with the mount base it had before descending.
struct Tail {
    next: Next,
    base: String,
}

impl Next {
    /// Passes the request to the next middleware, or past the end of this
    /// chain into the enclosing one.
    ///
    /// A chain with nothing left fails with `NotFound`.
    pub fn run(mut self, mut req: Request) -> BoxFuture<'static, Outcome> {
        Box::pin(async move {
            while let Some(mw) = self.stack.get(self.index).cloned() {
                self.index += 1;
                if let Kind::Handle(f) = mw.kind {
                    return f(req, self).await;
                }
            }
            match self.tail.take() {
                Some(tail) => {
                    req.base = tail.base;
                    tail.next.run(req).await
                }
                None => Err(ServiceError::not_found(format!(
                    "Cannot {} {}",
                    req.method(),
                    req.path()
                ))),
            }
        })
    }
}

/// Runs `req` through `stack`, then hands any error to the stack's recover
/// middleware in order.
///
/// `outer` is where the chain falls through to, along with the base to
/// restore on the way out.
pub(crate) fn run_chain(
    stack: Arc<[Middleware]>,
    req: Request,
    outer: Option<(Next, String)>,
) -> BoxFuture<'static, Outcome> {
    Box::pin(async move {
        let next = Next {
            stack: Arc::clone(&stack),
            index: 0,
            tail: outer.map(|(next, base)| Box::new(Tail { next, base })),
        };
        let mut outcome = next.run(req).await;
        for mw in stack.iter() {
            if let Kind::Recover(f) = &mw.kind {
                outcome = match outcome {
                    Err(err) => f(err).await,
                    ok => ok,
                };
            }
        }
        outcome
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Response;
    use http::{Method, StatusCode};

    fn stack(mws: Vec<Middleware>) -> Arc<[Middleware]> {
        mws.into()
    }

    fn tag(label: &'static str) -> Middleware {
        from_fn(move |mut req: Request, next: Next| async move {
            let mut seen = req.take_data().unwrap_or_else(|| serde_json::json!([]));
            if let Some(list) = seen.as_array_mut() {
                list.push(label.into());
            }
            req.set_data(seen);
            next.run(req).await
        })
    }

    fn echo() -> Middleware {
        from_fn(|mut req: Request, _next: Next| async move {
            let data = req.take_data().unwrap_or_default();
            Ok(Response::json(data.to_string().into_bytes()))
        })
    }

    #[tokio::test]
    async fn runs_in_registration_order() {
        let chain = stack(vec![tag("a"), tag("b"), echo()]);
        let res = run_chain(chain, Request::new(Method::GET, "/"), None).await.unwrap();
        assert_eq!(res.body(), br#"["a","b"]"#);
    }

    #[tokio::test]
    async fn exhausted_chain_is_not_found() {
        let err = run_chain(stack(vec![tag("a")]), Request::new(Method::GET, "/x"), None)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message(), "Cannot GET /x");
    }

    #[tokio::test]
    async fn recover_sees_errors_from_the_whole_stack() {
        let fail = from_fn(|_req: Request, _next: Next| async {
            Err(ServiceError::bad_request("bad"))
        });
        let recover = recover_fn(|err: ServiceError| async move {
            Ok(Response::text(format!("recovered: {err}")))
        });
        let res = run_chain(stack(vec![recover, fail]), Request::new(Method::GET, "/"), None)
            .await
            .unwrap();
        assert_eq!(res.body(), b"recovered: bad");
    }

    #[test]
    fn clones_are_the_same_middleware() {
        let a = tag("a");
        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&tag("a")));
        assert!(error_handler().is_recover());
    }
}
