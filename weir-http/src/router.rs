use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use weir::Injectable;

use crate::handler::DynHandler;
use crate::{IntoResponse, Link, PathParams, RouteError, RouterError};

// Bytes that cannot appear verbatim inside one path segment.
const SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// One route: a method, a path template, a unique name and a handler.
///
/// Templates are absolute paths whose segments are either literals or
/// `{name}` variables; a variable matches exactly one non-empty segment
/// that percent-decodes to valid UTF-8.
#[derive(Clone)]
pub struct Route {
    method: String,
    path: String,
    name: String,
    handler: Arc<dyn DynHandler>,
}

impl Route {
    /// Creates a route named after the handler function.
    pub fn new<H>(method: impl AsRef<str>, path: impl Into<String>, handler: H) -> Self
    where
        H: Injectable,
        H::Output: IntoResponse,
    {
        let name = Injectable::name(&handler);
        let name = name.rsplit("::").next().unwrap_or(name).to_string();
        Self {
            method: method.as_ref().to_ascii_uppercase(),
            path: path.into(),
            name,
            handler: Arc::new(handler),
        }
    }

    pub fn get<H>(path: impl Into<String>, handler: H) -> Self
    where
        H: Injectable,
        H::Output: IntoResponse,
    {
        Self::new("GET", path, handler)
    }

    pub fn post<H>(path: impl Into<String>, handler: H) -> Self
    where
        H: Injectable,
        H::Output: IntoResponse,
    {
        Self::new("POST", path, handler)
    }

    pub fn put<H>(path: impl Into<String>, handler: H) -> Self
    where
        H: Injectable,
        H::Output: IntoResponse,
    {
        Self::new("PUT", path, handler)
    }

    pub fn delete<H>(path: impl Into<String>, handler: H) -> Self
    where
        H: Injectable,
        H::Output: IntoResponse,
    {
        Self::new("DELETE", path, handler)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handler_name(&self) -> &'static str {
        self.handler.name()
    }

    pub fn link(&self) -> Link {
        Link {
            name: self.name.clone(),
            method: self.method.clone(),
            path: self.path.clone(),
        }
    }

    pub(crate) fn handler(&self) -> &Arc<dyn DynHandler> {
        &self.handler
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("name", &self.name)
            .field("handler", &self.handler_name())
            .finish()
    }
}

struct CompiledRoute {
    route: Route,
    segments: Vec<Segment>,
}

/// Maps a path and method to a route.
///
/// Routes are tried in registration order and the first one whose template
/// and method both match wins.
///
/// # Examples
///
/// ```rust
/// use weir::injectable;
/// use weir_http::{Route, Router};
///
/// #[injectable]
/// fn show_user() -> &'static str {
///     "user"
/// }
///
/// let router = Router::new(vec![Route::get("/users/{id}", show_user)]).unwrap();
/// let (route, params) = router.lookup("/users/ann%20lee", "GET").unwrap();
/// assert_eq!(route.name(), "show_user");
/// assert_eq!(params.get("id"), Some("ann lee"));
/// assert_eq!(
///     router.reverse("show_user", &[("id", "ann lee")]).unwrap(),
///     "/users/ann%20lee"
/// );
/// ```
pub struct Router {
    routes: Vec<CompiledRoute>,
}

impl Router {
    pub fn new(routes: impl IntoIterator<Item = Route>) -> Result<Self, RouterError> {
        let mut names = HashSet::new();
        let mut compiled = Vec::new();
        for route in routes {
            if !names.insert(route.name.clone()) {
                return Err(RouterError::DuplicateName { name: route.name });
            }
            let segments = parse_template(&route.path)?;
            compiled.push(CompiledRoute { route, segments });
        }
        Ok(Self { routes: compiled })
    }

    /// Finds the first route matching `path` and `method`.
    ///
    /// Fails with [`RouteError::MethodNotAllowed`] when the path matches only
    /// under other methods and with [`RouteError::NotFound`] otherwise.
    pub fn lookup(&self, path: &str, method: &str) -> Result<(&Route, PathParams), RouteError> {
        let method = method.to_ascii_uppercase();
        let mut allowed: Vec<String> = Vec::new();
        for compiled in &self.routes {
            let Some(params) = match_segments(&compiled.segments, path) else {
                continue;
            };
            if compiled.route.method == method {
                return Ok((&compiled.route, params));
            }
            if !allowed.contains(&compiled.route.method) {
                allowed.push(compiled.route.method.clone());
            }
        }
        if allowed.is_empty() {
            Err(RouteError::NotFound {
                path: path.to_string(),
            })
        } else {
            Err(RouteError::MethodNotAllowed { method, allowed })
        }
    }

    /// Builds the path of route `name`, percent-encoding every variable.
    /// Parameters the template does not use are ignored.
    pub fn reverse(&self, name: &str, params: &[(&str, &str)]) -> Result<String, RouterError> {
        let compiled = self
            .routes
            .iter()
            .find(|v| v.route.name == name)
            .ok_or_else(|| RouterError::UnknownRoute {
                name: name.to_string(),
            })?;
        let mut path = String::new();
        for segment in &compiled.segments {
            path.push('/');
            match segment {
                Segment::Literal(v) => path.push_str(v),
                Segment::Variable(var) => {
                    let value = params
                        .iter()
                        .find(|(k, _)| *k == var.as_str())
                        .map(|(_, v)| *v)
                        .ok_or_else(|| RouterError::MissingParameter {
                            route: name.to_string(),
                            param: var.clone(),
                        })?;
                    path.extend(utf8_percent_encode(value, SEGMENT_ENCODE_SET));
                }
            }
        }
        Ok(path)
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter().map(|v| &v.route)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.routes()).finish()
    }
}

fn parse_template(path: &str) -> Result<Vec<Segment>, RouterError> {
    let invalid = |reason| RouterError::InvalidTemplate {
        path: path.to_string(),
        reason,
    };
    let rest = path
        .strip_prefix('/')
        .ok_or_else(|| invalid("must start with /"))?;
    let mut segments = Vec::new();
    let mut variables = HashSet::new();
    for part in rest.split('/') {
        if let Some(var) = part.strip_prefix('{').and_then(|v| v.strip_suffix('}')) {
            if var.is_empty() || !var.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(invalid("invalid variable name"));
            }
            if !variables.insert(var) {
                return Err(invalid("duplicate variable"));
            }
            segments.push(Segment::Variable(var.to_string()));
        } else if part.contains(['{', '}']) {
            return Err(invalid("variable must be a whole segment"));
        } else {
            segments.push(Segment::Literal(part.to_string()));
        }
    }
    Ok(segments)
}

fn match_segments(segments: &[Segment], path: &str) -> Option<PathParams> {
    let rest = path.strip_prefix('/')?;
    let mut parts = rest.split('/');
    let mut params = PathParams::new();
    for segment in segments {
        let part = parts.next()?;
        match segment {
            Segment::Literal(v) => {
                if v != part {
                    return None;
                }
            }
            Segment::Variable(var) => {
                if part.is_empty() {
                    return None;
                }
                let value = percent_decode_str(part).decode_utf8().ok()?;
                params.insert(var.as_str(), value.into_owned());
            }
        }
    }
    if parts.next().is_some() {
        return None;
    }
    Some(params)
}
