//! Decides what a registration candidate is.

use crate::service::SETUP;

use super::Arg;

/// Method names of the native HTTP surface. A candidate exposing any of them
/// is handed to the router, whatever else it exposes.
pub const NATIVE_SURFACE: &[&str] = &["handle", "set"];

/// What a registration candidate turned out to be.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Capability {
    /// Anything the router registers natively (middleware, stray values).
    NativeHandler,
    /// A service for the framework.
    Service,
    /// A sub-application for the router.
    SubApp,
}

/// Classifies `candidate` against the framework's recognized `methods`.
///
/// Sub-applications are routers and always go to the router. Lists are
/// never services. Native surface is checked before service methods. A
/// candidate with neither is passed through.
pub fn classify(candidate: Option<&Arg>, methods: &[&str]) -> Capability {
    let Some(candidate) = candidate else {
        return Capability::NativeHandler;
    };

    match candidate {
        Arg::App(_) => Capability::SubApp,
        Arg::Service(service) => {
            let declared = service.methods();
            if exposes_any(declared, NATIVE_SURFACE) {
                Capability::NativeHandler
            } else if exposes_any(declared, methods) || declared.contains(&SETUP) {
                Capability::Service
            } else {
                Capability::NativeHandler
            }
        }
        _ => Capability::NativeHandler,
    }
}

fn exposes_any(surface: &[&str], names: &[&str]) -> bool {
    names.iter().any(|name| surface.contains(name))
}
