//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::service::ServiceError;

/// An incoming HTTP request, with its body already read.
///
/// Besides the wire data a request carries two pieces of routing state: the
/// `base` a mounted sub-application has consumed from the path, and a `data`
/// slot in which a service stores its result for the middleware after it.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) base: String,
    pub(crate) query: Option<String>,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) data: Option<Value>,
}

impl Request {
    /// Builds a request by hand; `target` may carry a `?query`.
    ///
    /// The server builds requests itself; this is for tests and for calling
    /// a router directly.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query.to_owned())),
            None => (target, None),
        };
        Self {
            method,
            path: path.to_owned(),
            base: String::new(),
            query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            params: HashMap::new(),
            data: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers
            .append(HeaderName::from_static(name), HeaderValue::from_static(value));
        self
    }

    pub(crate) fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        Self {
            method: parts.method,
            path: parts.uri.path().to_owned(),
            base: String::new(),
            query: parts.uri.query().map(str::to_owned),
            headers: parts.headers,
            body,
            params: HashMap::new(),
            data: None,
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn query(&self) -> Option<&str> { self.query.as_deref() }

    /// The full path as the client sent it.
    pub fn path(&self) -> &str { &self.path }

    /// The path below the sub-application the request is currently in.
    pub fn route_path(&self) -> &str {
        match self.path.strip_prefix(self.base.as_str()) {
            Some("") => "/",
            Some(rest) => rest,
            None => &self.path,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// `key=value` pairs of the query string, in order. No percent-decoding.
    pub fn query_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.query
            .as_deref()
            .unwrap_or_default()
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
    }

    /// Parses the body as JSON. An empty body parses as `{}` when `T` allows it.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ServiceError> {
        let body: &[u8] = if self.body.is_empty() { b"{}" } else { &self.body };
        serde_json::from_slice(body)
            .map_err(|e| ServiceError::bad_request(format!("invalid JSON body: {e}")))
    }

    /// The result a service stored for the middleware that runs after it.
    pub fn data(&self) -> Option<&Value> { self.data.as_ref() }
    pub fn data_mut(&mut self) -> Option<&mut Value> { self.data.as_mut() }
    pub fn set_data(&mut self, data: Value) { self.data = Some(data); }
    pub fn take_data(&mut self) -> Option<Value> { self.data.take() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_query_from_path() {
        let req = Request::new(Method::GET, "/items?limit=10&sort");
        assert_eq!(req.path(), "/items");
        assert_eq!(
            req.query_pairs().collect::<Vec<_>>(),
            vec![("limit", "10"), ("sort", "")]
        );
    }

    #[test]
    fn route_path_is_relative_to_the_mount_base() {
        let mut req = Request::new(Method::GET, "/api/items");
        req.base = "/api".to_owned();
        assert_eq!(req.route_path(), "/items");
        req.base = "/api/items".to_owned();
        assert_eq!(req.route_path(), "/");
    }

    #[test]
    fn malformed_json_is_a_bad_request() {
        let req = Request::new(Method::POST, "/items").with_body("{nope");
        let err = req.json::<Value>().unwrap_err();
        assert_eq!(err.status(), http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn empty_body_is_an_empty_object() {
        let req = Request::new(Method::POST, "/items");
        assert_eq!(req.json::<Value>().unwrap(), serde_json::json!({}));
    }
}
