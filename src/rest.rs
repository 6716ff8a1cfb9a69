//! Publishes services as REST routes.
//!
//! | Method | Path        | Service call            | Status      |
//! |--------|-------------|-------------------------|-------------|
//! | GET    | `/p`        | `find(params)`          | 200         |
//! | GET    | `/p/{id}`   | `get(id, params)`       | 200         |
//! | POST   | `/p`        | `create(body, params)`  | 201         |
//! | PUT    | `/p/{id}`   | `update(id, body, ..)`  | 200         |
//! | PATCH  | `/p[/{id}]` | `patch(id?, body, ..)`  | 200         |
//! | DELETE | `/p[/{id}]` | `remove(id?, params)`   | 200         |
//!
//! A `null` result answers `204 No Content`. Every route runs the service's
//! `before` middleware, the call, its `after` middleware, then renders
//! [`Request::data`] as JSON.

use std::sync::Arc;

use http::{Method, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::error::Error;
use crate::middleware::{self, Middleware, Next};
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::service::{Params, Provider, Service, ServiceError, ServiceMethod, ServiceOptions};

const ID: &str = "__id";

/// The REST provider. Pass it to
/// [`Application::configure`](crate::Application::configure).
#[derive(Clone, Copy, Debug, Default)]
pub struct Rest;

pub fn rest() -> Rest {
    Rest
}

impl Provider for Rest {
    fn publish(
        &self,
        host: &mut Router,
        path: &str,
        service: &Arc<dyn Service>,
        options: &ServiceOptions,
    ) -> Result<(), Error> {
        let base = if path == "/" { String::new() } else { format!("/{path}") };
        let collection = if base.is_empty() { "/".to_owned() } else { base.clone() };
        let member = format!("{base}/{{{ID}}}");

        let routes = [
            (Method::GET, &collection, ServiceMethod::Find),
            (Method::POST, &collection, ServiceMethod::Create),
            (Method::PATCH, &collection, ServiceMethod::Patch),
            (Method::DELETE, &collection, ServiceMethod::Remove),
            (Method::GET, &member, ServiceMethod::Get),
            (Method::PUT, &member, ServiceMethod::Update),
            (Method::PATCH, &member, ServiceMethod::Patch),
            (Method::DELETE, &member, ServiceMethod::Remove),
        ];
        for (method, route, call) in routes {
            let stack: Arc<[Middleware]> = options.middleware.before.iter().cloned()
                .chain([invoke(Arc::clone(service), call)])
                .chain(options.middleware.after.iter().cloned())
                .chain([render(call)])
                .collect();
            host.route(method, route, move |req: Request| {
                middleware::run_chain(Arc::clone(&stack), req, None)
            })?;
        }

        debug!(path = %collection, "published REST routes");
        Ok(())
    }
}

/// Calls `method` on the service and stores the result for what follows.
fn invoke(service: Arc<dyn Service>, method: ServiceMethod) -> Middleware {
    middleware::from_fn(move |mut req: Request, next: Next| {
        let service = Arc::clone(&service);
        async move {
            if !service.exposes(method.as_str()) {
                return Err(ServiceError::method_not_allowed(format!(
                    "Method `{method}` is not supported by this endpoint."
                )));
            }

            let params = params_of(&req);
            let id = req.param(ID).map(str::to_owned);
            let result = match method {
                ServiceMethod::Find => service.find(params).await,
                ServiceMethod::Get => service.get(id.unwrap_or_default(), params).await,
                ServiceMethod::Create => service.create(req.json()?, params).await,
                ServiceMethod::Update => {
                    service.update(id.unwrap_or_default(), req.json()?, params).await
                }
                ServiceMethod::Patch => service.patch(id, req.json()?, params).await,
                ServiceMethod::Remove => service.remove(id, params).await,
            }?;

            req.set_data(result);
            next.run(req).await
        }
    })
}

/// Renders the stored result; ends the chain.
fn render(method: ServiceMethod) -> Middleware {
    middleware::from_fn(move |mut req: Request, _next: Next| async move {
        let status = match method {
            ServiceMethod::Create => StatusCode::CREATED,
            _ => StatusCode::OK,
        };
        Ok(match req.take_data() {
            None | Some(Value::Null) => Response::status(StatusCode::NO_CONTENT),
            Some(data) => Response::builder().status(status).json(data.to_string().into_bytes()),
        })
    })
}

fn params_of(req: &Request) -> Params {
    Params {
        provider: Some("rest"),
        query: req.query_pairs().map(|(k, v)| (k.to_owned(), v.to_owned())).collect(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::adapter::Partition;
    use crate::service::{Application, Framework, ServiceFuture};

    struct Items;

    impl Service for Items {
        fn methods(&self) -> &[&'static str] { &["find", "get", "create", "remove"] }

        fn find<'a>(&'a self, params: Params) -> ServiceFuture<'a> {
            Box::pin(async move { Ok(json!({ "query": params.query, "provider": params.provider })) })
        }

        fn get<'a>(&'a self, id: String, _params: Params) -> ServiceFuture<'a> {
            Box::pin(async move { Ok(json!({ "id": id })) })
        }

        fn create<'a>(&'a self, data: Value, _params: Params) -> ServiceFuture<'a> {
            Box::pin(async move { Ok(data) })
        }

        fn remove<'a>(&'a self, _id: Option<String>, _params: Params) -> ServiceFuture<'a> {
            Box::pin(async { Ok(Value::Null) })
        }
    }

    fn publish(middleware: Partition) -> Router {
        let mut app = Application::new();
        app.configure(rest());
        let mut host = Router::new();
        app.use_service(&mut host, "/items", Arc::new(Items), ServiceOptions { middleware })
            .unwrap();
        host
    }

    async fn call(router: &Router, req: Request) -> (StatusCode, Value) {
        match router.handle(req).await {
            Ok(res) if res.body().is_empty() => (res.status_code(), Value::Null),
            Ok(res) => (res.status_code(), serde_json::from_slice(res.body()).unwrap()),
            Err(err) => (err.status(), err.to_json()),
        }
    }

    #[tokio::test]
    async fn maps_verbs_to_service_methods() {
        let router = publish(Partition::default());

        let (status, body) = call(&router, Request::new(Method::GET, "/items/7")).await;
        assert_eq!((status, body), (StatusCode::OK, json!({ "id": "7" })));

        let (status, body) = call(&router, Request::new(Method::GET, "/items?limit=2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "query": { "limit": "2" }, "provider": "rest" }));

        let req = Request::new(Method::POST, "/items").with_body(r#"{"name":"a"}"#);
        let (status, body) = call(&router, req).await;
        assert_eq!((status, body), (StatusCode::CREATED, json!({ "name": "a" })));

        let (status, _) = call(&router, Request::new(Method::DELETE, "/items/7")).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn undeclared_methods_answer_405() {
        let router = publish(Partition::default());
        let req = Request::new(Method::PUT, "/items/7").with_body("{}");
        let (status, body) = call(&router, req).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["message"], "Method `update` is not supported by this endpoint.");
    }

    #[tokio::test]
    async fn bad_json_is_rejected_before_the_service_runs() {
        let router = publish(Partition::default());
        let req = Request::new(Method::POST, "/items").with_body("{");
        assert_eq!(call(&router, req).await.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn before_and_after_wrap_the_call() {
        let before = middleware::from_fn(|req: Request, next: Next| async move {
            if req.header("authorization").is_none() {
                return Err(ServiceError::new(crate::ErrorKind::NotAuthenticated, "no token"));
            }
            next.run(req).await
        });
        let after = middleware::from_fn(|mut req: Request, next: Next| async move {
            if let Some(data) = req.data_mut() {
                data["seen"] = json!(true);
            }
            next.run(req).await
        });
        let router = publish(Partition { before: vec![before], after: vec![after] });

        let (status, _) = call(&router, Request::new(Method::GET, "/items/1")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let req = Request::new(Method::GET, "/items/1").with_header("authorization", "t");
        let (status, body) = call(&router, req).await;
        assert_eq!((status, body), (StatusCode::OK, json!({ "id": "1", "seen": true })));
    }
}
