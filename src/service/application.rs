//! The service framework an [`App`](crate::App) composes with its router.

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::adapter::Partition;
use crate::error::Error;
use crate::router::Router;
use crate::server::ServerHandle;

use super::{METHODS, Service};

/// Version of the bundled [`Application`].
pub const VERSION: &str = "3.0.0";

/// Operations an [`Application`] answers to.
pub const SURFACE: &[&str] = &[
    "use", "service", "setup", "configure", "set", "setting", "version", "methods", "listen",
];

/// Options handed to the framework alongside a service.
#[derive(Clone, Debug, Default)]
pub struct ServiceOptions {
    /// Middleware to run around every call to the service. Always present,
    /// possibly empty.
    pub middleware: Partition,
}

/// Publishes registered services on a transport, e.g. [`rest`](crate::rest).
pub trait Provider: Send + Sync + 'static {
    fn publish(
        &self,
        host: &mut Router,
        path: &str,
        service: &Arc<dyn Service>,
        options: &ServiceOptions,
    ) -> Result<(), Error>;
}

/// The interface the adapter needs from a service framework.
pub trait Framework: Send + Sync + 'static {
    /// `None` when the framework does not carry a version.
    fn version(&self) -> Option<&str>;

    /// Names of the operations the framework exposes. Must include `setup`.
    fn surface(&self) -> &[&'static str];

    /// Service method names the framework recognizes.
    fn methods(&self) -> &[&'static str];

    /// Registers `service` at `path`, publishing it on `host`.
    fn use_service(
        &mut self,
        host: &mut Router,
        path: &str,
        service: Arc<dyn Service>,
        options: ServiceOptions,
    ) -> Result<(), Error>;

    fn service(&self, path: &str) -> Option<Arc<dyn Service>>;

    /// Runs once the server is listening.
    fn setup(&mut self, server: &ServerHandle) -> Result<(), Error>;
}

/// The bundled service framework: a registry of services keyed by path.
pub struct Application {
    version: Option<String>,
    methods: Vec<&'static str>,
    services: BTreeMap<String, Arc<dyn Service>>,
    providers: Vec<Arc<dyn Provider>>,
    settings: HashMap<String, Value>,
    server_addr: Option<SocketAddr>,
    is_setup: bool,
}

impl Application {
    pub fn new() -> Self {
        Self {
            version: Some(VERSION.to_owned()),
            methods: METHODS.to_vec(),
            services: BTreeMap::new(),
            providers: Vec::new(),
            settings: HashMap::new(),
            server_addr: None,
            is_setup: false,
        }
    }

    pub fn set_version(&mut self, version: Option<String>) -> &mut Self {
        self.version = version;
        self
    }

    /// Recognizes one more method name when probing registrations.
    pub fn add_method(&mut self, name: &'static str) -> &mut Self {
        if !self.methods.contains(&name) {
            self.methods.push(name);
        }
        self
    }

    /// Adds a provider. It sees every service registered afterwards.
    pub fn configure(&mut self, provider: impl Provider) -> &mut Self {
        self.providers.push(Arc::new(provider));
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.settings.insert(key.into(), value);
        self
    }

    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    /// Registered services and their paths, ordered by path.
    pub fn services(&self) -> impl Iterator<Item = (&str, &Arc<dyn Service>)> {
        self.services.iter().map(|(path, service)| (path.as_str(), service))
    }

    /// Address of the server the application was set up with.
    pub fn server_addr(&self) -> Option<SocketAddr> {
        self.server_addr
    }

    pub fn is_setup(&self) -> bool {
        self.is_setup
    }
}

impl Default for Application {
    fn default() -> Self { Self::new() }
}

impl Framework for Application {
    fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    fn surface(&self) -> &[&'static str] {
        SURFACE
    }

    fn methods(&self) -> &[&'static str] {
        &self.methods
    }

    fn use_service(
        &mut self,
        host: &mut Router,
        path: &str,
        service: Arc<dyn Service>,
        options: ServiceOptions,
    ) -> Result<(), Error> {
        let location = strip_slashes(path);
        // Providers publish onto a copy; `host` only changes once all succeed.
        let mut staged = host.clone();
        for provider in &self.providers {
            provider.publish(&mut staged, &location, &service, &options)?;
        }
        *host = staged;
        debug!(path = %location, methods = ?service.methods(), "service registered");
        self.services.insert(location.clone(), Arc::clone(&service));

        if self.is_setup {
            service.setup(self, &location)?;
        }
        Ok(())
    }

    fn service(&self, path: &str) -> Option<Arc<dyn Service>> {
        self.services.get(&strip_slashes(path)).cloned()
    }

    fn setup(&mut self, server: &ServerHandle) -> Result<(), Error> {
        self.server_addr = Some(server.local_addr());
        for (path, service) in &self.services {
            service.setup(self, path)?;
        }
        self.is_setup = true;
        debug!(addr = %server.local_addr(), "service application set up");
        Ok(())
    }
}

/// `"/items/"` → `"items"`; the root stays `"/"`.
pub(crate) fn strip_slashes(path: &str) -> String {
    match path.trim_matches('/') {
        "" => "/".to_owned(),
        trimmed => trimmed.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::server::Server;
    use crate::service::{Params, ServiceFuture};

    #[derive(Default)]
    struct Recorder {
        setups: Mutex<Vec<(String, Option<SocketAddr>)>>,
    }

    impl Service for Recorder {
        fn methods(&self) -> &[&'static str] { &["get", "setup"] }

        fn get<'a>(&'a self, id: String, _params: Params) -> ServiceFuture<'a> {
            Box::pin(async move { Ok(json!({ "id": id })) })
        }

        fn setup(&self, app: &Application, path: &str) -> Result<(), crate::ServiceError> {
            self.setups.lock().unwrap().push((path.to_owned(), app.server_addr()));
            Ok(())
        }
    }

    #[test]
    fn services_are_keyed_without_slashes() {
        let mut app = Application::new();
        let mut host = Router::new();
        app.use_service(&mut host, "/items/", Arc::new(Recorder::default()), ServiceOptions::default())
            .unwrap();

        assert!(app.service("items").is_some());
        assert!(app.service("/items").is_some());
        assert_eq!(app.services().map(|(path, _)| path).collect::<Vec<_>>(), ["items"]);
        assert_eq!(strip_slashes("/"), "/");
    }

    #[tokio::test]
    async fn setup_reaches_every_service_and_late_registrations() {
        let early = Arc::new(Recorder::default());
        let late = Arc::new(Recorder::default());
        let mut app = Application::new();
        let mut host = Router::new();
        app.use_service(&mut host, "early", early.clone(), ServiceOptions::default()).unwrap();

        let server = Server::bind("127.0.0.1:0").unwrap().listen(Router::new()).await.unwrap();
        app.setup(&server).unwrap();
        app.use_service(&mut host, "late", late.clone(), ServiceOptions::default()).unwrap();

        let addr = Some(server.local_addr());
        assert_eq!(*early.setups.lock().unwrap(), vec![("early".to_owned(), addr)]);
        assert_eq!(*late.setups.lock().unwrap(), vec![("late".to_owned(), addr)]);
        assert!(app.is_setup());
        server.close().await;
    }

    #[tokio::test]
    async fn conflicting_routes_leave_host_and_registry_untouched() {
        use http::Method;

        use crate::request::Request;

        let mut host = Router::new();
        host.route(Method::GET, "/items/{id}", |_req: Request| async { "user route" }).unwrap();
        let mut app = Application::new();
        app.configure(crate::rest::rest());

        let err = app
            .use_service(&mut host, "items", Arc::new(Recorder::default()), ServiceOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRoute { .. }));
        assert!(app.service("items").is_none());

        let err = host.handle(Request::new(Method::GET, "/items")).await.unwrap_err();
        assert_eq!(err.message(), "Cannot GET /items");
        let res = host.handle(Request::new(Method::GET, "/items/5")).await.unwrap();
        assert_eq!(res.body(), b"user route");
    }

    #[test]
    fn custom_methods_are_recognized_once() {
        let mut app = Application::new();
        app.add_method("search").add_method("search");
        assert_eq!(app.methods().len(), METHODS.len() + 1);
    }
}
