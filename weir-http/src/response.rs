use axum::body::Bytes;
use serde::Serialize;

use crate::HttpError;

/// Body of a [`Response`] before it is encoded.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Content {
    #[default]
    Empty,
    Text(String),
    Bytes(Bytes),
    Json(serde_json::Value),
}

impl Content {
    /// Encodes the content: text as UTF-8, JSON as compact JSON text.
    pub fn into_bytes(self) -> Bytes {
        match self {
            Content::Empty => Bytes::new(),
            Content::Text(v) => Bytes::from(v),
            Content::Bytes(v) => v,
            Content::Json(v) => Bytes::from(v.to_string()),
        }
    }

    fn content_type(&self) -> Option<&'static str> {
        match self {
            Content::Empty | Content::Bytes(_) => None,
            Content::Text(_) => Some("text/plain; charset=utf-8"),
            Content::Json(_) => Some("application/json"),
        }
    }
}

impl From<String> for Content {
    fn from(value: String) -> Self {
        Content::Text(value)
    }
}

impl From<&str> for Content {
    fn from(value: &str) -> Self {
        Content::Text(value.to_string())
    }
}

impl From<Bytes> for Content {
    fn from(value: Bytes) -> Self {
        Content::Bytes(value)
    }
}

impl From<Vec<u8>> for Content {
    fn from(value: Vec<u8>) -> Self {
        Content::Bytes(value.into())
    }
}

impl From<serde_json::Value> for Content {
    fn from(value: serde_json::Value) -> Self {
        Content::Json(value)
    }
}

/// A response produced by a handler or an error handler.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    content: Content,
}

impl Response {
    /// A `200` response. Text and JSON content get a matching `content-type`.
    pub fn new(content: impl Into<Content>) -> Self {
        let content = content.into();
        let headers = content
            .content_type()
            .map(|v| vec![("content-type".to_string(), v.to_string())])
            .unwrap_or_default();
        Self {
            status: 200,
            headers,
            content,
        }
    }

    pub fn empty(status: u16) -> Self {
        Self::new(Content::Empty).with_status(status)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Encodes the response into its wire form.
    pub fn into_reply(self) -> Reply {
        Reply {
            status: self.status,
            status_text: status_text(self.status),
            headers: self.headers,
            body: self.content.into_bytes(),
        }
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::empty(204)
    }
}

/// Encoded response handed back to the protocol adapter.
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    pub status: u16,
    /// Status line such as `404 Not Found`.
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Reply {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Conversion of handler outputs into a [`Response`].
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        Response::new(self)
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        Response::new(self)
    }
}

impl IntoResponse for Bytes {
    fn into_response(self) -> Response {
        Response::new(self)
    }
}

impl IntoResponse for Vec<u8> {
    fn into_response(self) -> Response {
        Response::new(self)
    }
}

impl IntoResponse for serde_json::Value {
    fn into_response(self) -> Response {
        Response::new(self)
    }
}

impl IntoResponse for () {
    fn into_response(self) -> Response {
        Response::default()
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = Response::new(self.detail).with_status(self.status);
        response.headers.extend(self.headers);
        response
    }
}

impl<T> IntoResponse for (u16, T)
where
    T: IntoResponse,
{
    fn into_response(self) -> Response {
        self.1.into_response().with_status(self.0)
    }
}

/// Serializes a value as a JSON response.
#[derive(Clone, Debug)]
pub struct Json<T>(pub T);

impl<T> IntoResponse for Json<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        match serde_json::to_value(self.0) {
            Ok(v) => Response::new(v),
            Err(err) => {
                tracing::error!(%err, "Cannot serialize response");
                HttpError::new(500, "Internal server error").into_response()
            }
        }
    }
}

/// Returns the status line for `status`, e.g. `200 OK`.
///
/// Unknown codes yield just the number.
pub fn status_text(status: u16) -> String {
    let reason = match status {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Payload Too Large",
        414 => "URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Range Not Satisfiable",
        417 => "Expectation Failed",
        422 => "Unprocessable Entity",
        428 => "Precondition Required",
        429 => "Too Many Requests",
        431 => "Request Header Fields Too Large",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        _ => return status.to_string(),
    };
    format!("{status} {reason}")
}
