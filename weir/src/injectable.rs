use std::any::type_name;
use std::future::Future;

use async_trait::async_trait;

use crate::state::Value;
use crate::{InjectError, Key, Param, Source, State};

/// Type alias for boxed errors that can be sent across threads.
///
/// Providers and handlers fail with this type; the injector never inspects it
/// and hands it back to the caller untouched.
pub type StdError = Box<dyn std::error::Error + Send + Sync>;

/// A callable whose parameters are satisfied by the injector.
///
/// Request handlers, error handlers and providers are all `Injectable`. An
/// injectable whose output is `Clone + Sync` can be registered as a provider:
/// it then produces [`Key::of::<Self::Output>()`](Key::of) and requires its
/// [`params`](Injectable::params).
///
/// The injector identifies a callable by its type, so every distinct
/// injectable should be a distinct type. The `#[injectable]` macro generates
/// one unit struct per function.
///
/// # Examples
///
/// ```rust
/// use weir::{Args, Injectable, Param, StdError};
///
/// #[derive(Clone)]
/// struct Greeting(String);
///
/// struct Greet;
///
/// impl Injectable for Greet {
///     type Output = String;
///
///     fn params(&self) -> Vec<Param> {
///         vec![Param::new::<Greeting>("greeting")]
///     }
///
///     async fn call(&self, mut args: Args<'_>) -> Result<String, StdError> {
///         let greeting: Greeting = args.next()?;
///         Ok(format!("{}!", greeting.0))
///     }
/// }
/// ```
pub trait Injectable: Send + Sync + 'static {
    /// The value returned by the callable.
    type Output: Send + 'static;

    /// Formal parameters in declaration order.
    fn params(&self) -> Vec<Param>;

    /// Invokes the callable with arguments bound by the injector.
    ///
    /// Arguments must be consumed from `args` in the order of
    /// [`params`](Injectable::params).
    fn call(
        &self,
        args: Args<'_>,
    ) -> impl Future<Output = Result<Self::Output, StdError>> + Send;

    /// Name used in diagnostics.
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

/// Arguments bound to one call of an [`Injectable`].
pub struct Args<'a> {
    state: &'a State,
    sources: &'a [Source],
    position: usize,
}

impl<'a> Args<'a> {
    pub(crate) fn new(state: &'a State, sources: &'a [Source]) -> Self {
        Self {
            state,
            sources,
            position: 0,
        }
    }

    /// Takes the next argument by value.
    pub fn next<T>(&mut self) -> Result<T, InjectError>
    where
        T: Clone + 'static,
    {
        self.next_ref::<T>().cloned()
    }

    /// Takes the next argument by reference.
    pub fn next_ref<T>(&mut self) -> Result<&'a T, InjectError>
    where
        T: 'static,
    {
        let position = self.position;
        let source = self
            .sources
            .get(position)
            .ok_or(InjectError::ArgumentMismatch {
                position,
                expected: type_name::<T>(),
            })?;
        self.position += 1;
        self.state
            .value(source)
            .and_then(|v| v.downcast_ref::<T>())
            .ok_or(InjectError::ArgumentMismatch {
                position,
                expected: type_name::<T>(),
            })
    }

    /// Number of arguments not taken yet.
    pub fn remaining(&self) -> usize {
        self.sources.len() - self.position
    }
}

/// Object-safe view of a provider stored in the registry.
#[async_trait]
pub(crate) trait DynProvider: Send + Sync {
    fn produces(&self) -> Key;

    fn requires(&self) -> Vec<Param>;

    fn name(&self) -> &'static str;

    async fn provide(&self, args: Args<'_>) -> Result<Value, StdError>;
}

#[async_trait]
impl<T> DynProvider for T
where
    T: Injectable,
    T::Output: Clone + Sync,
{
    fn produces(&self) -> Key {
        Key::of::<T::Output>()
    }

    fn requires(&self) -> Vec<Param> {
        Injectable::params(self)
    }

    fn name(&self) -> &'static str {
        Injectable::name(self)
    }

    async fn provide(&self, args: Args<'_>) -> Result<Value, StdError> {
        Ok(Box::new(self.call(args).await?))
    }
}
