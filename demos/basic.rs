//! A REST service behind an adapted tsu app.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3030/messages
//!   curl -X POST http://localhost:3030/messages \
//!        -H 'authorization: demo' \
//!        -d '{"text":"hello"}'
//!   curl http://localhost:3030/messages/0
//!   curl http://localhost:3030/nope          # {"name":"NotFound",...}

use std::sync::Mutex;

use http::Method;
use serde_json::{Value, json};
use tsu_services::middleware::{self, Next};
use tsu_services::{
    Application, Arg, ErrorKind, Params, Request, Server, ServerConfig, Service, ServiceError,
    ServiceFuture, adapt, error_handler, not_found, rest,
};

#[derive(Default)]
struct Messages {
    items: Mutex<Vec<Value>>,
}

impl Messages {
    fn items(&self) -> std::sync::MutexGuard<'_, Vec<Value>> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Service for Messages {
    fn methods(&self) -> &[&'static str] {
        &["find", "get", "create", "setup"]
    }

    fn find<'a>(&'a self, _params: Params) -> ServiceFuture<'a> {
        Box::pin(async move { Ok(Value::Array(self.items().clone())) })
    }

    fn get<'a>(&'a self, id: String, _params: Params) -> ServiceFuture<'a> {
        Box::pin(async move {
            id.parse::<usize>()
                .ok()
                .and_then(|index| self.items().get(index).cloned())
                .ok_or_else(|| ServiceError::not_found(format!("No record found for id '{id}'")))
        })
    }

    fn create<'a>(&'a self, data: Value, _params: Params) -> ServiceFuture<'a> {
        Box::pin(async move {
            let mut items = self.items();
            let message = json!({ "id": items.len(), "text": data["text"] });
            items.push(message.clone());
            Ok(message)
        })
    }

    fn setup(&self, app: &Application, path: &str) -> Result<(), ServiceError> {
        if let Some(addr) = app.server_addr() {
            tracing::info!("messages ready at http://{addr}/{path}");
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), tsu_services::Error> {
    tracing_subscriber::fmt::init();

    // Writes need a token; reads do not.
    let authenticate = middleware::from_fn(|req: Request, next: Next| async move {
        if *req.method() == Method::POST && req.header("authorization").is_none() {
            return Err(ServiceError::new(ErrorKind::NotAuthenticated, "missing authorization"));
        }
        next.run(req).await
    });
    let stamp = middleware::from_fn(|mut req: Request, next: Next| async move {
        if let Some(Value::Object(message)) = req.data_mut() {
            message.insert("served_by".into(), json!("tsu"));
        }
        next.run(req).await
    });

    let mut framework = Application::new();
    framework.configure(rest());

    let mut app = adapt(Some(framework))?;
    app.register("/messages", [Arg::from(authenticate), Arg::service(Messages::default()), Arg::from(stamp)])?
        .register(not_found(), Vec::new())?
        .register(error_handler(), Vec::new())?;

    let server = app.start(Server::from_config(&ServerConfig::default())).await?;
    tokio::signal::ctrl_c().await?;
    server.close().await;
    Ok(())
}
