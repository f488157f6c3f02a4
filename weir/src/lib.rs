//! # weir
//!
//! A dependency injection core that turns callables declared by parameter type
//! into cached execution plans.
//!
//! ## Core Concepts
//!
//! - **Injectable**: A callable whose parameters are satisfied by the injector
//! - **Registry**: Ordered provider rules, one per produced type
//! - **Initial**: Named slots whose values are supplied per call instead of provided
//! - **Plan**: The ordered, deduplicated provider calls needed by one callable
//! - **Injector**: Builds plans once, caches them and runs them against a [`State`]
//!
//! ## Basic Usage
//!
//! ```rust
//! use weir::{Initial, Injector, Registry, State, injectable};
//!
//! #[derive(Clone)]
//! struct Greeting(String);
//!
//! #[injectable]
//! fn default_greeting() -> Greeting {
//!     Greeting("Hello".to_string())
//! }
//!
//! #[injectable]
//! async fn hello(greeting: Greeting, name: String) -> String {
//!     format!("{}, {name}", greeting.0)
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let injector = Injector::new(
//!         Registry::new().with(default_greeting),
//!         Initial::new().slot::<String>("name"),
//!     );
//!
//!     let mut state = State::new().with("name", "Ann".to_string());
//!     assert_eq!(injector.run(&hello, &mut state).await?, "Hello, Ann");
//!     Ok(())
//! }
//! ```
//!
//! ## Parameter Binding
//!
//! Every parameter is bound once, when the plan is built:
//!
//! 1. By name, to a declared initial slot with the same name.
//! 2. By type, to the first declared initial slot of that type.
//! 3. By type, to the registered provider of that type.
//!
//! A parameter that matches none of them makes plan building fail with
//! [`PlanError::UnsatisfiableDependency`]; providers that require each other make
//! it fail with [`PlanError::CyclicDependency`].
//!
//! ## Features
//!
//! - `macros` (default): Enables the `#[injectable]` attribute macro
//!
//! The macro defines a unit struct named after the function, so a parameter must
//! not share its name with another injectable function in scope.

mod injectable;
mod injector;
mod key;
mod plan;
mod registry;
mod state;

pub use injectable::*;
pub use injector::*;
pub use key::*;
pub use plan::*;
pub use registry::*;
pub use state::*;

#[cfg(feature = "macros")]
pub use weir_macros::*;
