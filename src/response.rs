//! Outgoing HTTP response type and the conversion traits handlers return.
//!
//! Build a [`Response`] in your handler and return it, or return anything
//! that implements [`IntoResponse`]. Handlers that can fail return
//! `Result<_, ServiceError>`; the error keeps travelling up the middleware
//! stack until an [`error_handler`](crate::error_handler) or the server
//! renders it.

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use serde_json::Value;

use crate::service::ServiceError;

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use http::StatusCode;
/// use tsu_services::Response;
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .json(br#"{"id":42}"#.to_vec());
/// ```
#[derive(Debug)]
pub struct Response {
    pub(crate) body: Bytes,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) status: StatusCode,
}

impl Response {
    /// `200 OK`, `application/json`.
    pub fn json(body: Vec<u8>) -> Self {
        Self::builder().json(body)
    }

    /// `200 OK`, `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self { body: Bytes::new(), headers: Vec::new(), status: code }
    }

    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: StatusCode::OK }
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Converts into the hyper response the connection writes out.
    ///
    /// Headers hyper refuses (bad name or value bytes) are dropped with a
    /// warning rather than failing the whole response.
    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(self.body));
        *res.status_mut() = self.status;
        for (name, value) in self.headers {
            match (
                http::HeaderName::try_from(name.as_str()),
                http::HeaderValue::try_from(value.as_str()),
            ) {
                (Ok(name), Ok(value)) => {
                    res.headers_mut().append(name, value);
                }
                _ => tracing::warn!(header = %name, "dropping invalid response header"),
            }
        }
        res
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`]. Defaults to `200 OK`.
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn json(self, body: Vec<u8>) -> Response {
        self.finish("application/json", body)
    }

    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish("text/plain; charset=utf-8", body.into().into_bytes())
    }

    /// Terminate with no body (e.g. `204 No Content`).
    pub fn no_body(self) -> Response {
        Response { body: Bytes::new(), headers: self.headers, status: self.status }
    }

    fn finish(self, content_type: &str, body: Vec<u8>) -> Response {
        let mut headers = vec![("content-type".to_owned(), content_type.to_owned())];
        headers.extend(self.headers);
        Response { body: Bytes::from(body), headers, status: self.status }
    }
}

// ── IntoResponse / Reply ──────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}

impl IntoResponse for Value {
    fn into_response(self) -> Response { Response::json(self.to_string().into_bytes()) }
}

/// What a route handler may return: a response, or a failure that the
/// middleware stack gets to see.
pub trait Reply {
    fn into_reply(self) -> Result<Response, ServiceError>;
}

macro_rules! reply_from_response {
    ($($ty:ty),*) => {$(
        impl Reply for $ty {
            fn into_reply(self) -> Result<Response, ServiceError> { Ok(self.into_response()) }
        }
    )*};
}

reply_from_response!(Response, &'static str, String, StatusCode, Value);

impl<R: IntoResponse> Reply for Result<R, ServiceError> {
    fn into_reply(self) -> Result<Response, ServiceError> {
        self.map(IntoResponse::into_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_puts_content_type_first() {
        let res = Response::builder()
            .status(StatusCode::CREATED)
            .header("location", "/users/42")
            .json(b"{}".to_vec());
        assert_eq!(res.status_code(), StatusCode::CREATED);
        assert_eq!(res.headers[0].0, "content-type");
        assert_eq!(res.header("Location"), Some("/users/42"));
    }

    #[test]
    fn json_values_reply_as_json() {
        let res = json!({ "ok": true }).into_reply().unwrap();
        assert_eq!(res.header("content-type"), Some("application/json"));
        assert_eq!(res.body(), br#"{"ok":true}"#);
    }

    #[test]
    fn failed_results_stay_errors() {
        let res: Result<String, ServiceError> = Err(ServiceError::not_found("gone"));
        assert_eq!(res.into_reply().unwrap_err().message(), "gone");
    }

    #[test]
    fn invalid_headers_are_dropped() {
        let inner = Response::builder()
            .header("bad header", "x")
            .text("ok")
            .into_inner();
        assert_eq!(inner.headers().len(), 1);
    }
}
