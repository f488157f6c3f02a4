use std::mem::take;
use std::sync::Arc;

use axum::body::Bytes;
use tracing::Instrument as _;
use weir::{Initial, Injectable, Injector, Plan, Registry, Source, State, Step};

use crate::handler::DynErrorHandler;
use crate::{
    BuildError, DispatchError, Environ, Exc, Link, PathParams, Recovery, Reply, Route, Router,
    RouterError, exception_handler, request_components,
};

/// Initial slots declared by every [`App`].
///
/// | name          | type          | present                      |
/// |---------------|---------------|------------------------------|
/// | `environ`     | [`Environ`]   | always                       |
/// | `app`         | `Arc<App>`    | always                       |
/// | `path_params` | [`PathParams`]| once a route matched         |
/// | `link`        | [`Link`]      | once a route matched         |
/// | `exc`         | [`Exc`]       | while the error handler runs |
///
/// The error handler also runs when routing fails, so it may only read
/// `environ`, `app` and `exc`.
pub fn initial_slots() -> Initial {
    Initial::new()
        .slot::<Environ>("environ")
        .slot::<Exc>("exc")
        .slot::<Arc<App>>("app")
        .slot::<PathParams>("path_params")
        .slot::<Link>("link")
}

/// The request dispatcher.
///
/// An `App` owns the router, the injector with every handler plan already
/// built and the error handler. Each call to [`dispatch`](App::dispatch)
/// looks up the route, runs its handler against a fresh [`State`] and falls
/// back to the error handler, reusing that state, when anything fails.
///
/// # Examples
///
/// ```rust
/// use weir::injectable;
/// use weir_http::{App, Environ, PathParams, Route};
///
/// #[injectable]
/// fn hello(path_params: PathParams) -> String {
///     format!("Hello, {}", path_params.get("name").unwrap_or("stranger"))
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let app = App::builder()
///     .add_route(Route::get("/hello/{name}", hello))
///     .build()?;
///
/// let reply = app.dispatch(Environ::new("GET", "/hello/Ann")).await?;
/// assert_eq!(reply.status_text, "200 OK");
/// assert_eq!(reply.text(), "Hello, Ann");
/// # Ok(())
/// # }
/// ```
pub struct App {
    router: Router,
    injector: Injector,
    error_handler: Arc<dyn DynErrorHandler>,
}

impl App {
    pub fn builder() -> AppBuilder {
        AppBuilder::default()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn injector(&self) -> &Injector {
        &self.injector
    }

    /// Dispatches one request and encodes the response.
    ///
    /// Fails only when the error handler propagates the error or cannot run.
    pub async fn dispatch(self: &Arc<Self>, environ: Environ) -> Result<Reply, DispatchError> {
        let method = environ.method().to_ascii_uppercase();
        let path = environ.path().to_string();
        let span = tracing::info_span!("request", method = %method, path = %path);
        let mut state = State::new()
            .with("environ", environ)
            .with("app", self.clone());

        let result = match self.router.lookup(&path, &method) {
            Ok((route, path_params)) => {
                tracing::debug!(parent: &span, route = route.name(), "Route matched");
                state.set("link", route.link());
                state.set("path_params", path_params);
                route
                    .handler()
                    .run(&self.injector, &mut state)
                    .instrument(span.clone())
                    .await
                    .map_err(Exc::from_inject)
            }
            Err(err) => Err(Exc::new(err)),
        };

        let response = match result {
            Ok(v) => v,
            Err(exc) => {
                tracing::debug!(parent: &span, %exc, "Handling error");
                state.set("exc", exc.clone());
                let recovery = self
                    .error_handler
                    .run(&self.injector, &mut state)
                    .instrument(span.clone())
                    .await;
                match recovery {
                    Ok(Recovery::Respond(v)) => v,
                    Ok(Recovery::Propagate) => {
                        tracing::error!(parent: &span, %exc, "Unhandled error");
                        return Err(DispatchError::Unhandled(exc));
                    }
                    Err(err) => {
                        tracing::error!(parent: &span, %exc, %err, "Error handler failed");
                        return Err(DispatchError::ErrorHandler(err));
                    }
                }
            }
        };

        let reply = response.into_reply();
        if reply.status >= 500 {
            tracing::error!(parent: &span, status = reply.status, "Response");
        } else if reply.status >= 400 {
            tracing::warn!(parent: &span, status = reply.status, "Response");
        } else {
            tracing::info!(parent: &span, status = reply.status, "Response");
        }
        Ok(reply)
    }

    /// Dispatches a request and reports the status line and headers through
    /// `start_response` before returning the body chunks.
    pub async fn call<F>(
        self: &Arc<Self>,
        environ: Environ,
        start_response: F,
    ) -> Result<Vec<Bytes>, DispatchError>
    where
        F: FnOnce(&str, &[(String, String)]),
    {
        let reply = self.dispatch(environ).await?;
        start_response(&reply.status_text, &reply.headers);
        Ok(vec![reply.body])
    }

    pub fn reverse_url(&self, name: &str, params: &[(&str, &str)]) -> Result<String, RouterError> {
        self.router.reverse(name, params)
    }

    /// Static files are not served; every path resolves to `#`.
    pub fn static_url(&self, path: &str) -> &'static str {
        let _ = path;
        "#"
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("router", &self.router)
            .field("injector", &self.injector)
            .field("error_handler", &self.error_handler.name())
            .finish()
    }
}

// Slots filled only once a route matched.
const ROUTE_SLOTS: [&str; 2] = ["link", "path_params"];

fn route_slot(plan: &Plan) -> Option<&'static str> {
    plan.steps()
        .iter()
        .flat_map(Step::inputs)
        .chain(plan.inputs())
        .find_map(|source| match source {
            Source::Initial(name) if ROUTE_SLOTS.contains(name) => Some(*name),
            _ => None,
        })
}

/// Collects routes, providers and the error handler of an [`App`].
#[derive(Default)]
pub struct AppBuilder {
    routes: Vec<Route>,
    registry: Registry,
    error_handler: Option<Arc<dyn DynErrorHandler>>,
}

impl AppBuilder {
    pub fn add_route(&mut self, route: Route) -> &mut Self {
        self.routes.push(route);
        self
    }

    pub fn add_routes(&mut self, routes: impl IntoIterator<Item = Route>) -> &mut Self {
        self.routes.extend(routes);
        self
    }

    /// Registers a provider. It replaces a request component or an earlier
    /// provider of the same type.
    pub fn add_provider<T>(&mut self, provider: T) -> &mut Self
    where
        T: Injectable,
        T::Output: Clone + Sync,
    {
        self.registry.register(provider);
        self
    }

    pub fn add_providers(&mut self, registry: Registry) -> &mut Self {
        self.registry.merge(registry);
        self
    }

    /// Replaces [`exception_handler`] as the error handler.
    pub fn error_handler<T>(&mut self, handler: T) -> &mut Self
    where
        T: Injectable<Output = Recovery>,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Builds the router and the plan of every handler and of the error
    /// handler. Any configuration error is reported here rather than per
    /// request.
    pub fn build(&mut self) -> Result<Arc<App>, BuildError> {
        let router = Router::new(take(&mut self.routes))?;
        let mut registry = request_components();
        registry.merge(take(&mut self.registry));
        let injector = Injector::new(registry, initial_slots());
        let error_handler = self
            .error_handler
            .take()
            .unwrap_or_else(|| Arc::new(exception_handler) as Arc<dyn DynErrorHandler>);

        for route in router.routes() {
            route
                .handler()
                .plan(&injector)
                .map_err(|source| BuildError::Plan {
                    target: route.handler_name(),
                    source,
                })?;
        }
        let plan = error_handler
            .plan(&injector)
            .map_err(|source| BuildError::Plan {
                target: error_handler.name(),
                source,
            })?;
        if let Some(slot) = route_slot(&plan) {
            return Err(BuildError::RouteSlot {
                target: error_handler.name(),
                slot,
            });
        }

        tracing::debug!(
            routes = router.len(),
            providers = injector.registry().len(),
            "App built"
        );
        Ok(Arc::new(App {
            router,
            injector,
            error_handler,
        }))
    }
}
