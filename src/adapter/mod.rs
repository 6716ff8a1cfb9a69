//! One application that is both an HTTP router and a service framework.
//!
//! [`adapt`] composes a [`Router`] with a [`Framework`] into an [`App`].
//! Every [`App::register`] call is routed to exactly one of them:
//!
//! ```text
//! register(location, args)
//!     │ collect   → candidate + before/after middleware
//!     │ classify  → NativeHandler | SubApp | Service
//!     ├─ NativeHandler, SubApp ─→ Router::mount(location, args)      (unchanged)
//!     └─ Service ──────────────→ Framework::use_service(path, service, {before, after})
//! ```
//!
//! [`App::start`] starts the server and then sets the framework up with the
//! live server handle. Running servers read the app's router through a
//! [`SharedRouter`], so later registrations are served as well.

mod arg;
mod collect;
mod merge;
mod probe;

pub use arg::{Arg, Location};
pub use collect::{Collected, Partition, collect};
pub use merge::{Origin, Surface, merge};
pub use probe::{Capability, NATIVE_SURFACE, classify};

use std::sync::Arc;

use arc_swap::ArcSwap;
use http::Method;
use tracing::debug;

use crate::error::Error;
use crate::handler::{BoxFuture, Handler, Outcome};
use crate::request::Request;
use crate::router::{self, Router};
use crate::server::{Server, ServerHandle, SharedRouter};
use crate::service::{Application, Framework, Provider, SETUP, Service, ServiceOptions};

/// Lowest framework version [`adapt`] accepts.
const MIN_VERSION: (u64, u64, u64) = (3, 0, 0);

/// A router and, optionally, a service framework behind one surface.
///
/// Where both halves define an operation the router's wins (see
/// [`App::surface`]).
pub struct App<F = Application> {
    server: Router,
    /// What started servers serve; replaced after every change to `server`.
    live: SharedRouter,
    framework: Option<F>,
    surface: Surface,
}

/// Builds an [`App`].
///
/// `None` gives a bare HTTP application without any service operations.
/// A framework must expose `setup` and be version 3.0.0 or later.
pub fn adapt<F: Framework>(framework: Option<F>) -> Result<App<F>, Error> {
    let surface = Surface::server(router::SURFACE);
    let Some(framework) = framework else {
        return Ok(App::assemble(None, surface));
    };

    if !framework.surface().contains(&SETUP) {
        return Err(Error::InvalidApplication);
    }
    match framework.version().filter(|v| !v.is_empty()) {
        Some(version) if is_compatible(version) => {}
        found => {
            return Err(Error::IncompatibleVersion {
                found: found.unwrap_or("unknown").to_owned(),
            });
        }
    }

    let surface = merge(framework.surface(), surface);
    Ok(App::assemble(Some(framework), surface))
}

impl App<Application> {
    /// A bare HTTP application.
    pub fn bare() -> Self {
        Self::assemble(None, Surface::server(router::SURFACE))
    }

    /// Adds a provider to the bundled framework. Ignored on a bare app.
    pub fn configure(&mut self, provider: impl Provider) -> &mut Self {
        match self.framework.as_mut() {
            Some(framework) => {
                framework.configure(provider);
            }
            None => debug!("bare application has no framework, ignoring provider"),
        }
        self
    }
}

impl<F: Framework> App<F> {
    fn assemble(framework: Option<F>, surface: Surface) -> Self {
        let server = Router::new();
        let live = Arc::new(ArcSwap::from_pointee(server.clone()));
        Self { server, live, framework, surface }
    }

    /// Hands the current router to every server started from this app.
    fn publish(&self) {
        self.live.store(Arc::new(self.server.clone()));
    }

    /// Registers middleware, a sub-application or a service.
    ///
    /// At most one argument may be something other than middleware; more is
    /// [`Error::InvalidOptions`] and nothing is registered. A service
    /// candidate goes to the framework with the middleware before it and
    /// after it; everything else goes to [`Router::mount`] untouched.
    pub fn register(
        &mut self,
        location: impl Into<Location>,
        args: impl IntoIterator<Item = Arg>,
    ) -> Result<&mut Self, Error> {
        let location = location.into();
        let args: Vec<Arg> = args.into_iter().collect();

        let Collected { service, middleware } = collect(&args)?;
        let capability = match &self.framework {
            Some(framework) => classify(service, framework.methods()),
            None => Capability::NativeHandler,
        };
        let service: Option<Arc<dyn Service>> = match (capability, service) {
            (Capability::Service, Some(Arg::Service(service))) => Some(Arc::clone(service)),
            _ => None,
        };

        let registered = match (service, self.framework.as_mut()) {
            (Some(service), Some(framework)) => {
                let Location::Path(path) = location else {
                    return Err(Error::InvalidServicePath);
                };
                debug!(
                    path = %path,
                    before = middleware.before.len(),
                    after = middleware.after.len(),
                    "registering service with middleware"
                );
                framework.use_service(&mut self.server, &path, service, ServiceOptions { middleware })
            }
            _ => {
                debug!(?capability, "passing register call to the router");
                self.server.mount(location, args).map(|_| ())
            }
        };
        // A failing late setup still leaves the service registered and routed.
        self.publish();
        registered?;
        Ok(self)
    }

    /// Adds a route on the router.
    pub fn route(
        &mut self,
        method: Method,
        path: &str,
        handler: impl Handler,
    ) -> Result<&mut Self, Error> {
        self.server.route(method, path, handler)?;
        self.publish();
        Ok(self)
    }

    /// Router setting; the router owns `set` even when the framework has one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.server.set(key, value);
        self.publish();
        self
    }

    pub fn setting(&self, key: &str) -> Option<&str> {
        self.server.setting(key)
    }

    /// The service registered at `path`. Always `None` on a bare app.
    pub fn service(&self, path: &str) -> Option<Arc<dyn Service>> {
        self.framework.as_ref()?.service(path)
    }

    pub fn version(&self) -> Option<&str> {
        self.framework.as_ref()?.version()
    }

    /// Service method names recognized when probing registrations.
    pub fn methods(&self) -> &[&'static str] {
        match &self.framework {
            Some(framework) => framework.methods(),
            None => &[],
        }
    }

    /// Sets the framework up against an already running server, for servers
    /// started outside [`App::start`]. No-op on a bare app.
    pub fn setup(&mut self, server: &ServerHandle) -> Result<&mut Self, Error> {
        if let Some(framework) = self.framework.as_mut() {
            framework.setup(server)?;
        }
        Ok(self)
    }

    /// Starts `server` on this app's router, then sets the framework up with
    /// the live handle before returning it. Registrations made afterwards
    /// are served by the running server too.
    ///
    /// Each call runs setup again. If setup fails the server is closed and
    /// the setup error returned.
    pub async fn start(&mut self, server: Server) -> Result<ServerHandle, Error> {
        let handle = server.listen_shared(Arc::clone(&self.live)).await?;
        if let Some(framework) = self.framework.as_mut() {
            if let Err(e) = framework.setup(&handle) {
                handle.close().await;
                return Err(e);
            }
            debug!(addr = %handle.local_addr(), "service application listening");
        }
        Ok(handle)
    }

    /// [`start`](Self::start) on `addr`.
    pub async fn listen(&mut self, addr: &str) -> Result<ServerHandle, Error> {
        self.start(Server::bind(addr)?).await
    }

    /// Runs one request through the router.
    pub fn handle(&self, req: Request) -> BoxFuture<'static, Outcome> {
        self.server.handle(req)
    }

    /// Operation name → the half that answers it.
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn exposes(&self, operation: &str) -> bool {
        self.surface.exposes(operation)
    }

    pub fn server(&self) -> &Router {
        &self.server
    }

    pub fn framework(&self) -> Option<&F> {
        self.framework.as_ref()
    }

    pub fn framework_mut(&mut self) -> Option<&mut F> {
        self.framework.as_mut()
    }
}

/// Semver comparison against [`MIN_VERSION`]; a pre-release of 3.0.0 is
/// older than 3.0.0. Unparseable versions compare as strings.
fn is_compatible(version: &str) -> bool {
    match parse_version(version) {
        Some((core, pre_release)) => core > MIN_VERSION || (core == MIN_VERSION && !pre_release),
        None => version >= "3.0.0",
    }
}

fn parse_version(version: &str) -> Option<((u64, u64, u64), bool)> {
    let version = version.strip_prefix('v').unwrap_or(version);
    let (core, pre_release) = match version.split_once('-') {
        Some((core, _)) => (core, true),
        None => (version.split('+').next().unwrap_or(version), false),
    };
    let mut parts = core.split('.').map(|part| part.parse::<u64>().ok());
    let major = parts.next()??;
    let minor = parts.next().unwrap_or(Some(0))?;
    let patch = parts.next().unwrap_or(Some(0))?;
    if parts.next().is_some() {
        return None;
    }
    Some(((major, minor, patch), pre_release))
}
