use std::error::Error;
use std::fmt;
use std::sync::Arc;

use weir::{InjectError, PlanError, StdError};

use crate::Content;

/// The error being handled, as seen by the error handler through the `exc` slot.
#[derive(Clone)]
pub struct Exc(Arc<dyn Error + Send + Sync>);

impl Exc {
    pub fn new(error: impl Into<StdError>) -> Self {
        Self(Arc::from(error.into()))
    }

    /// Unwraps a failed provider or handler so that its own error is exposed.
    /// Other injection errors are kept as they are.
    pub fn from_inject(error: InjectError) -> Self {
        match error.into_failure() {
            Ok(source) => Self::new(source),
            Err(error) => Self::new(error),
        }
    }

    pub fn downcast_ref<T>(&self) -> Option<&T>
    where
        T: Error + 'static,
    {
        self.0.downcast_ref::<T>()
    }

    pub fn is<T>(&self) -> bool
    where
        T: Error + 'static,
    {
        self.0.is::<T>()
    }

    pub fn inner(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.0.as_ref()
    }
}

impl fmt::Debug for Exc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Exc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Error for Exc {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.0.source()
    }
}

/// An error that maps directly onto an HTTP response.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpError {
    pub status: u16,
    pub detail: Content,
    pub headers: Vec<(String, String)>,
}

impl HttpError {
    pub fn new(status: u16, detail: impl Into<Content>) -> Self {
        Self {
            status,
            detail: detail.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn bad_request(detail: impl Into<Content>) -> Self {
        Self::new(400, detail)
    }

    pub fn forbidden() -> Self {
        Self::new(403, "Forbidden")
    }

    pub fn not_found() -> Self {
        Self::new(404, "Not found")
    }

    /// A `405` error listing `allowed` in its `Allow` header.
    pub fn method_not_allowed<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed: Vec<_> = allowed.into_iter().map(|v| v.as_ref().to_string()).collect();
        Self::new(405, "Method not allowed").with_header("Allow", allowed.join(", "))
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Content::Text(v) => write!(f, "HTTP {}: {v}", self.status),
            Content::Json(v) => write!(f, "HTTP {}: {v}", self.status),
            Content::Empty | Content::Bytes(_) => write!(f, "HTTP {}", self.status),
        }
    }
}

impl Error for HttpError {}

/// Routing failures raised by [`Router::lookup`](crate::Router::lookup).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteError {
    NotFound {
        path: String,
    },
    /// The path matches, but only under other methods.
    MethodNotAllowed {
        method: String,
        allowed: Vec<String>,
    },
}

impl RouteError {
    pub fn to_http_error(&self) -> HttpError {
        match self {
            RouteError::NotFound { .. } => HttpError::not_found(),
            RouteError::MethodNotAllowed { allowed, .. } => HttpError::method_not_allowed(allowed),
        }
    }
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::NotFound { path } => write!(f, "No route matches {path}"),
            RouteError::MethodNotAllowed { method, allowed } => write!(
                f,
                "Method {method} not allowed, expected one of: {}",
                allowed.join(", ")
            ),
        }
    }
}

impl Error for RouteError {}

/// Router configuration and reversal errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouterError {
    DuplicateName {
        name: String,
    },
    InvalidTemplate {
        path: String,
        reason: &'static str,
    },
    UnknownRoute {
        name: String,
    },
    MissingParameter {
        route: String,
        param: String,
    },
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterError::DuplicateName { name } => write!(f, "Duplicate route name {name}"),
            RouterError::InvalidTemplate { path, reason } => {
                write!(f, "Invalid path template {path}: {reason}")
            }
            RouterError::UnknownRoute { name } => write!(f, "Unknown route {name}"),
            RouterError::MissingParameter { route, param } => {
                write!(f, "Missing parameter {param} for route {route}")
            }
        }
    }
}

impl Error for RouterError {}

/// Errors returned by [`App::dispatch`](crate::App::dispatch).
#[derive(Debug)]
pub enum DispatchError {
    /// The error handler declined to handle the error.
    Unhandled(Exc),
    /// The error handler itself could not run.
    ErrorHandler(InjectError),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Unhandled(exc) => write!(f, "Unhandled error: {exc}"),
            DispatchError::ErrorHandler(err) => write!(f, "Error handler failed: {err}"),
        }
    }
}

impl Error for DispatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DispatchError::Unhandled(exc) => Some(exc),
            DispatchError::ErrorHandler(err) => Some(err),
        }
    }
}

/// Errors returned by [`AppBuilder::build`](crate::AppBuilder::build).
#[derive(Clone, Debug, PartialEq)]
pub enum BuildError {
    Router(RouterError),
    Plan {
        target: &'static str,
        source: PlanError,
    },
    /// The error handler reads a slot that is absent when routing fails.
    RouteSlot {
        target: &'static str,
        slot: &'static str,
    },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::Router(err) => write!(f, "Router error: {err}"),
            BuildError::Plan { target, source } => {
                write!(f, "Cannot build plan for {target}: {source}")
            }
            BuildError::RouteSlot { target, slot } => {
                write!(f, "Error handler {target} cannot read slot {slot}")
            }
        }
    }
}

impl Error for BuildError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BuildError::Router(err) => Some(err),
            BuildError::Plan { source, .. } => Some(source),
            BuildError::RouteSlot { .. } => None,
        }
    }
}

impl From<RouterError> for BuildError {
    fn from(value: RouterError) -> Self {
        Self::Router(value)
    }
}
