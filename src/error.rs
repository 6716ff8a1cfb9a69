//! Unified error type.

use crate::service::ServiceError;

/// The error type returned by tsu-services' fallible operations.
///
/// Failures that belong to a single request (a missing record, a bad body)
/// are [`ServiceError`]s and become HTTP responses. This type surfaces
/// everything else: building the application, registering on it, binding a
/// port.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The framework handed to [`adapt`](crate::adapt) has no `setup`.
    #[error("tsu-services requires a valid service application instance")]
    InvalidApplication,

    /// The framework is older than 3.0.0 or carries no version at all.
    #[error(
        "tsu-services requires an instance of a service application version 3.x or later (got {found})"
    )]
    IncompatibleVersion { found: String },

    /// More than one non-middleware argument in a single `register` call.
    #[error("Invalid options passed to app.use")]
    InvalidOptions,

    /// The router was asked to mount something that is neither middleware
    /// nor a sub-application.
    #[error("Router::mount requires a middleware function or a sub-application (got {got})")]
    InvalidMount { got: &'static str },

    #[error("invalid route `{path}`: {reason}")]
    InvalidRoute { path: String, reason: String },

    /// A service was registered without a path to live at.
    #[error("a service must be registered at a path")]
    InvalidServicePath,

    #[error("invalid socket address `{0}`")]
    InvalidAddress(String),

    #[error("config: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_message_names_the_offending_version() {
        let err = Error::IncompatibleVersion { found: "2.9.9".into() };
        assert_eq!(
            err.to_string(),
            "tsu-services requires an instance of a service application version 3.x or later (got 2.9.9)"
        );
    }

    #[test]
    fn service_errors_pass_through_unchanged() {
        let err: Error = ServiceError::not_found("No record").into();
        assert_eq!(err.to_string(), "No record");
    }
}
