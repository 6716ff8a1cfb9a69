//! Ready-made middleware for the end of a router's stack.

use crate::request::Request;
use crate::service::ServiceError;

use super::{Middleware, Next, from_fn, recover_fn};

/// Fails every request that reaches it with `NotFound("Page not found")`.
///
/// Register it after all routes and services so unmatched paths produce a
/// proper JSON error instead of falling off the end of the stack.
pub fn not_found() -> Middleware {
    from_fn(|_req: Request, _next: Next| async {
        Err(ServiceError::not_found("Page not found"))
    })
}

/// Renders any error the router produced as its JSON body and status.
pub fn error_handler() -> Middleware {
    recover_fn(|err: ServiceError| async move {
        tracing::debug!(status = %err.status(), "rendering error response");
        Ok(err.to_response())
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::{Method, StatusCode};

    use super::*;
    use crate::middleware::run_chain;

    #[tokio::test]
    async fn not_found_is_rendered_by_the_error_handler() {
        let stack: Arc<[Middleware]> = vec![not_found(), error_handler()].into();
        let res = run_chain(stack, Request::new(Method::GET, "/missing"), None)
            .await
            .unwrap();
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["message"], "Page not found");
        assert_eq!(body["className"], "not-found");
    }
}
