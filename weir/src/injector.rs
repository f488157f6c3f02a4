use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::{Initial, Injectable, Plan, PlanError, Registry, State, StdError};

/// Errors returned by [`Injector::run`].
#[derive(Debug)]
pub enum InjectError {
    /// The plan for the target could not be built.
    Plan(PlanError),
    /// An initial slot required by the plan is absent from the state.
    MissingState {
        name: &'static str,
        callable: &'static str,
    },
    /// An argument was taken with a type that does not match its source.
    ArgumentMismatch {
        position: usize,
        expected: &'static str,
    },
    /// A provider or the target itself failed.
    Failed {
        callable: &'static str,
        source: StdError,
    },
}

impl InjectError {
    /// Returns the error raised by a provider or target, if that is what failed.
    pub fn into_failure(self) -> Result<StdError, Self> {
        match self {
            InjectError::Failed { source, .. } => Ok(source),
            other => Err(other),
        }
    }
}

impl fmt::Display for InjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InjectError::Plan(e) => write!(f, "Plan error: {e}"),
            InjectError::MissingState { name, callable } => {
                write!(f, "Missing state {name} required by {callable}")
            }
            InjectError::ArgumentMismatch { position, expected } => {
                write!(f, "Argument {position} is not of type {expected}")
            }
            InjectError::Failed { callable, source } => write!(f, "{callable} failed: {source}"),
        }
    }
}

impl std::error::Error for InjectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InjectError::Plan(e) => Some(e),
            InjectError::Failed { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<PlanError> for InjectError {
    fn from(value: PlanError) -> Self {
        Self::Plan(value)
    }
}

/// Resolves injectable callables against a registry.
///
/// The injector owns an immutable [`Registry`], the declared [`Initial`] slots
/// and a cache of execution plans keyed by the target's type. Plans are built
/// on first use; concurrent first uses may build the same plan twice, but only
/// one complete plan is ever stored.
///
/// # Examples
///
/// ```rust
/// use weir::{Args, Initial, Injectable, Injector, Param, Registry, State, StdError};
///
/// struct Hello;
///
/// impl Injectable for Hello {
///     type Output = String;
///
///     fn params(&self) -> Vec<Param> {
///         vec![Param::new::<String>("name")]
///     }
///
///     async fn call(&self, mut args: Args<'_>) -> Result<String, StdError> {
///         let name: String = args.next()?;
///         Ok(format!("Hello, {name}"))
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let injector = Injector::new(Registry::new(), Initial::new().slot::<String>("name"));
/// let mut state = State::new().with("name", "Ann".to_string());
/// assert_eq!(injector.run(&Hello, &mut state).await?, "Hello, Ann");
/// # Ok(())
/// # }
/// ```
pub struct Injector {
    registry: Registry,
    initial: Initial,
    plans: DashMap<TypeId, Arc<Plan>>,
}

impl Injector {
    pub fn new(registry: Registry, initial: Initial) -> Self {
        Self {
            registry,
            initial,
            plans: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn initial(&self) -> &Initial {
        &self.initial
    }

    /// Returns the execution plan of `target`, building and caching it on first use.
    pub fn plan<T>(&self, target: &T) -> Result<Arc<Plan>, PlanError>
    where
        T: Injectable,
    {
        let type_id = TypeId::of::<T>();
        if let Some(plan) = self.plans.get(&type_id) {
            return Ok(plan.value().clone());
        }
        let plan = Plan::build(
            target.name(),
            &target.params(),
            &self.registry,
            &self.initial,
        )
        .inspect_err(|err| tracing::error!(callable = target.name(), %err, "Cannot build plan"))?;
        tracing::debug!(
            callable = target.name(),
            steps = plan.steps().len(),
            "Plan built"
        );
        Ok(self
            .plans
            .entry(type_id)
            .or_insert(Arc::new(plan))
            .value()
            .clone())
    }

    /// Checks whether a plan for `T` is cached.
    pub fn is_planned<T>(&self) -> bool
    where
        T: Injectable,
    {
        self.plans.contains_key(&TypeId::of::<T>())
    }

    /// Runs the plan of `target` against `state` and then calls `target`.
    ///
    /// Values produced by providers are stored in `state`; a step whose value
    /// is already present is skipped.
    pub async fn run<T>(&self, target: &T, state: &mut State) -> Result<T::Output, InjectError>
    where
        T: Injectable,
    {
        let plan = self.plan(target)?;
        plan.execute(target, state).await
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("registry", &self.registry)
            .field("initial", &self.initial)
            .field("plans", &self.plans.len())
            .finish()
    }
}
