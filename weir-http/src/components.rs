use axum::body::Bytes;
use weir::{Registry, injectable};

use crate::Environ;

/// Upper-cased request method.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Method(pub String);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestPath(pub String);

/// Raw query string without the leading `?`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryString(pub String);

/// Decoded query parameters in request order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams(pub Vec<(String, String)>);

impl QueryParams {
    pub fn parse(query: &str) -> Self {
        Self(
            url::form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        )
    }

    /// First value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers(pub Vec<(String, String)>);

impl Headers {
    /// First value of header `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Body(pub Bytes);

#[injectable]
fn read_method(environ: &Environ) -> Method {
    Method(environ.method().to_string())
}

#[injectable]
fn read_path(environ: &Environ) -> RequestPath {
    RequestPath(environ.path().to_string())
}

#[injectable]
fn read_query_string(environ: &Environ) -> QueryString {
    QueryString(environ.query().to_string())
}

#[injectable]
fn read_query_params(query: &QueryString) -> QueryParams {
    QueryParams::parse(&query.0)
}

#[injectable]
fn read_headers(environ: &Environ) -> Headers {
    Headers(environ.headers().to_vec())
}

#[injectable]
fn read_body(environ: &Environ) -> Body {
    Body(environ.body().clone())
}

/// Providers of the request accessors derived from the `environ` slot.
pub fn request_components() -> Registry {
    Registry::new()
        .with(read_method)
        .with(read_path)
        .with(read_query_string)
        .with(read_query_params)
        .with(read_headers)
        .with(read_body)
}
