//! Errors raised while serving a request.
//!
//! Every [`ServiceError`] knows its HTTP status and renders to the same JSON
//! shape, so a service can fail with `ServiceError::not_found(..)` and the
//! client sees a `404` with a readable body without any glue code.
//!
//! ```text
//! {"name":"NotFound","message":"No record","code":404,"className":"not-found"}
//! ```

use http::StatusCode;
use serde_json::{Value, json};

use crate::response::Response;

/// The class of a [`ServiceError`], one per HTTP status the services emit.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    BadRequest,
    NotAuthenticated,
    PaymentError,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    NotAcceptable,
    Timeout,
    Conflict,
    LengthRequired,
    Unprocessable,
    TooManyRequests,
    GeneralError,
    NotImplemented,
    BadGateway,
    Unavailable,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::BadRequest       => "BadRequest",
            Self::NotAuthenticated => "NotAuthenticated",
            Self::PaymentError     => "PaymentError",
            Self::Forbidden        => "Forbidden",
            Self::NotFound         => "NotFound",
            Self::MethodNotAllowed => "MethodNotAllowed",
            Self::NotAcceptable    => "NotAcceptable",
            Self::Timeout          => "Timeout",
            Self::Conflict         => "Conflict",
            Self::LengthRequired   => "LengthRequired",
            Self::Unprocessable    => "Unprocessable",
            Self::TooManyRequests  => "TooManyRequests",
            Self::GeneralError     => "GeneralError",
            Self::NotImplemented   => "NotImplemented",
            Self::BadGateway       => "BadGateway",
            Self::Unavailable      => "Unavailable",
        }
    }

    /// Kebab-case form of [`name`](Self::name), sent as `className`.
    pub fn class_name(self) -> &'static str {
        match self {
            Self::BadRequest       => "bad-request",
            Self::NotAuthenticated => "not-authenticated",
            Self::PaymentError     => "payment-error",
            Self::Forbidden        => "forbidden",
            Self::NotFound         => "not-found",
            Self::MethodNotAllowed => "method-not-allowed",
            Self::NotAcceptable    => "not-acceptable",
            Self::Timeout          => "timeout",
            Self::Conflict         => "conflict",
            Self::LengthRequired   => "length-required",
            Self::Unprocessable    => "unprocessable",
            Self::TooManyRequests  => "too-many-requests",
            Self::GeneralError     => "general-error",
            Self::NotImplemented   => "not-implemented",
            Self::BadGateway       => "bad-gateway",
            Self::Unavailable      => "unavailable",
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            Self::BadRequest       => StatusCode::BAD_REQUEST,
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Self::PaymentError     => StatusCode::PAYMENT_REQUIRED,
            Self::Forbidden        => StatusCode::FORBIDDEN,
            Self::NotFound         => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::NotAcceptable    => StatusCode::NOT_ACCEPTABLE,
            Self::Timeout          => StatusCode::REQUEST_TIMEOUT,
            Self::Conflict         => StatusCode::CONFLICT,
            Self::LengthRequired   => StatusCode::LENGTH_REQUIRED,
            Self::Unprocessable    => StatusCode::UNPROCESSABLE_ENTITY,
            Self::TooManyRequests  => StatusCode::TOO_MANY_REQUESTS,
            Self::GeneralError     => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotImplemented   => StatusCode::NOT_IMPLEMENTED,
            Self::BadGateway       => StatusCode::BAD_GATEWAY,
            Self::Unavailable      => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// A request-level failure with an HTTP status and a JSON rendering.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct ServiceError {
    kind: ErrorKind,
    message: String,
    data: Option<Value>,
}

impl ServiceError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), data: None }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MethodNotAllowed, message)
    }

    pub fn general(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::GeneralError, message)
    }

    /// Attaches extra detail, sent to the client under `data`.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn kind(&self) -> ErrorKind { self.kind }
    pub fn message(&self) -> &str { &self.message }
    pub fn data(&self) -> Option<&Value> { self.data.as_ref() }
    pub fn status(&self) -> StatusCode { self.kind.status() }

    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "name": self.kind.name(),
            "message": self.message,
            "code": self.kind.status().as_u16(),
            "className": self.kind.class_name(),
        });
        if let (Some(data), Some(map)) = (&self.data, body.as_object_mut()) {
            map.insert("data".to_owned(), data.clone());
        }
        body
    }

    /// Renders the error as a JSON response carrying its status.
    pub fn to_response(&self) -> Response {
        Response::builder()
            .status(self.status())
            .json(self.to_json().to_string().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_name_code_and_class() {
        let err = ServiceError::not_found("No record found for id '7'");
        assert_eq!(
            err.to_json(),
            json!({
                "name": "NotFound",
                "message": "No record found for id '7'",
                "code": 404,
                "className": "not-found",
            })
        );
    }

    #[test]
    fn data_is_only_sent_when_present() {
        let err = ServiceError::bad_request("invalid").with_data(json!({ "field": "name" }));
        assert_eq!(err.to_json()["data"], json!({ "field": "name" }));
        assert!(ServiceError::general("boom").to_json().get("data").is_none());
    }

    #[test]
    fn response_carries_the_status() {
        let res = ServiceError::method_not_allowed("nope").to_response();
        assert_eq!(res.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
