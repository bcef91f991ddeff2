//! Responses and the [`IntoResponse`] conversion handlers return through.
//!
//! Handlers build a [`Response`] and return it inside `Ok`. Errors go the
//! other way: return an [`Error`](crate::web::Error) and the errors
//! middleware decides what the client sees.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use serde::Serialize;

use crate::web::Error;

const JSON: &str = "application/json";
const TEXT: &str = "text/plain; charset=utf-8";

/// A response on its way out.
///
/// ```rust
/// use http::StatusCode;
/// use http::header::{HeaderValue, LOCATION};
/// use sales::web::Response;
///
/// let user = serde_json::json!({ "user_id": "42" });
/// let res = Response::builder()
///     .status(StatusCode::CREATED)
///     .header(LOCATION, HeaderValue::from_static("/v1/users/42"))
///     .encode(&user)
///     .unwrap();
/// assert_eq!(res.header("location"), Some("/v1/users/42"));
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// `200`, `text/plain`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// A bare status with an empty body.
    pub fn status(code: StatusCode) -> Self {
        Self { status: code, headers: HeaderMap::new(), body: Bytes::new() }
    }

    /// `value` as a JSON body with the given status. A value that cannot be
    /// serialised is an internal fault.
    pub fn encode<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Result<Self, Error> {
        Self::builder().status(status).encode(value)
    }

    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { status: StatusCode::OK, headers: HeaderMap::new() }
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn body(&self) -> &[u8] { &self.body }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(self.body));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}

/// Builds a [`Response`] that needs a status other than `200` or extra
/// headers.
#[derive(Debug)]
pub struct ResponseBuilder {
    status: StatusCode,
    headers: HeaderMap,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn text(self, body: impl Into<String>) -> Response {
        self.with_body(TEXT, Bytes::from(body.into()))
    }

    pub fn encode<T: Serialize + ?Sized>(self, value: &T) -> Result<Response, Error> {
        let body = serde_json::to_vec(value).map_err(Error::internal)?;
        Ok(self.with_body(JSON, Bytes::from(body)))
    }

    fn with_body(mut self, content_type: &'static str, body: Bytes) -> Response {
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        Response { status: self.status, headers: self.headers, body }
    }
}

/// What a handler may return inside `Ok`.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// `Ok(StatusCode::NO_CONTENT)`
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}
