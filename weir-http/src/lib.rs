//! # weir-http
//!
//! Request routing and dispatch on top of the weir injector.
//!
//! An [`App`] maps each request to a [`Route`], runs the route's handler with
//! every parameter injected from the request state and the registered
//! providers, and turns the handler's output into a [`Reply`]. Failures are
//! passed to an error handler which either answers them or propagates them.
//!
//! ## Example
//!
//! ```rust
//! use weir::injectable;
//! use weir_http::{App, Environ, HttpError, Json, QueryParams, Route};
//!
//! #[injectable]
//! fn search(query: QueryParams) -> Result<Json<Vec<String>>, HttpError> {
//!     let term = query
//!         .get("q")
//!         .ok_or_else(|| HttpError::bad_request("Missing q"))?;
//!     Ok(Json(vec![term.to_string()]))
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let app = App::builder().add_route(Route::get("/search", search)).build()?;
//!
//! let reply = app
//!     .dispatch(Environ::new("GET", "/search").with_query("q=weir"))
//!     .await?;
//! assert_eq!(reply.text(), r#"["weir"]"#);
//!
//! let reply = app.dispatch(Environ::new("GET", "/search")).await?;
//! assert_eq!(reply.status, 400);
//! # Ok(())
//! # }
//! ```
//!
//! ## Injected values
//!
//! Handlers may take any of the [initial slots](initial_slots) by name, the
//! request components of [`request_components`] and any value produced by a
//! provider added with [`AppBuilder::add_provider`].

mod app;
mod components;
mod environ;
mod error;
mod handler;
mod response;
mod router;
mod server;

pub use app::*;
pub use components::*;
pub use environ::*;
pub use error::*;
pub use handler::{Recovery, exception_handler};
pub use response::*;
pub use router::*;
pub use server::*;
