use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::injectable::DynProvider;
use crate::{Args, InjectError, Initial, Injectable, Key, Param, Registry, Source, State};

/// Errors detected while building an execution plan.
///
/// All of them are configuration errors: a callable whose plan cannot be built
/// must never be dispatched to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlanError {
    /// No initial slot and no provider can satisfy a required type.
    UnsatisfiableDependency {
        key: &'static str,
        requested_by: &'static str,
    },
    /// A type transitively requires itself. The first type is repeated at the end.
    CyclicDependency { cycle: Vec<&'static str> },
    /// A parameter is named like an initial slot of another type.
    ParamTypeMismatch {
        param: &'static str,
        callable: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::UnsatisfiableDependency { key, requested_by } => {
                write!(f, "Unsatisfiable dependency {key} requested by {requested_by}")
            }
            PlanError::CyclicDependency { cycle } => {
                write!(f, "Cyclic dependency: {}", cycle.join(" -> "))
            }
            PlanError::ParamTypeMismatch {
                param,
                callable,
                expected,
                found,
            } => write!(
                f,
                "Parameter {param} of {callable} has type {found}, but initial slot {param} has type {expected}"
            ),
        }
    }
}

impl std::error::Error for PlanError {}

/// One provider call of an execution plan.
#[derive(Clone)]
pub struct Step {
    provider: Arc<dyn DynProvider>,
    inputs: Vec<Source>,
}

impl Step {
    pub fn produces(&self) -> Key {
        self.provider.produces()
    }

    pub fn inputs(&self) -> &[Source] {
        &self.inputs
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }
}

impl PartialEq for Step {
    fn eq(&self, other: &Self) -> bool {
        self.produces() == other.produces() && self.inputs == other.inputs
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("produces", &self.produces())
            .field("provider", &self.provider_name())
            .field("inputs", &self.inputs)
            .finish()
    }
}

/// Ordered provider calls that satisfy every input of one target callable.
///
/// Every [`Source::Provided`] input of a step is produced by a strictly earlier
/// step, and each provided type appears at most once.
#[derive(Clone, Debug, PartialEq)]
pub struct Plan {
    target: &'static str,
    steps: Vec<Step>,
    inputs: Vec<Source>,
}

impl Plan {
    pub(crate) fn build(
        target: &'static str,
        params: &[Param],
        registry: &Registry,
        initial: &Initial,
    ) -> Result<Self, PlanError> {
        let mut builder = PlanBuilder {
            registry,
            initial,
            steps: Vec::new(),
            marks: HashMap::new(),
            path: Vec::new(),
        };
        let mut inputs = Vec::with_capacity(params.len());
        for param in params {
            inputs.push(builder.bind(param, target)?);
        }
        Ok(Self {
            target,
            steps: builder.steps,
            inputs,
        })
    }

    pub fn target(&self) -> &'static str {
        self.target
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Sources of the target's own arguments.
    pub fn inputs(&self) -> &[Source] {
        &self.inputs
    }

    pub(crate) async fn execute<T>(
        &self,
        target: &T,
        state: &mut State,
    ) -> Result<T::Output, InjectError>
    where
        T: Injectable,
    {
        for step in &self.steps {
            let key = step.produces();
            if state.contains(&Source::Provided(key)) {
                continue;
            }
            let name = step.provider_name();
            check_inputs(state, &step.inputs, name)?;
            let value = step
                .provider
                .provide(Args::new(state, &step.inputs))
                .await
                .map_err(|source| InjectError::Failed {
                    callable: name,
                    source,
                })?;
            state.insert_provided(key, value);
        }
        check_inputs(state, &self.inputs, self.target)?;
        target
            .call(Args::new(state, &self.inputs))
            .await
            .map_err(|source| InjectError::Failed {
                callable: self.target,
                source,
            })
    }
}

fn check_inputs(
    state: &State,
    inputs: &[Source],
    callable: &'static str,
) -> Result<(), InjectError> {
    for input in inputs {
        if !state.contains(input) {
            return Err(match *input {
                Source::Initial(name) => InjectError::MissingState {
                    name,
                    callable,
                },
                Source::Provided(key) => InjectError::MissingState {
                    name: key.name(),
                    callable,
                },
            });
        }
    }
    Ok(())
}

enum Mark {
    Pending,
    Ready,
}

struct PlanBuilder<'a> {
    registry: &'a Registry,
    initial: &'a Initial,
    steps: Vec<Step>,
    marks: HashMap<Key, Mark>,
    path: Vec<Key>,
}

impl PlanBuilder<'_> {
    fn bind(&mut self, param: &Param, callable: &'static str) -> Result<Source, PlanError> {
        if let Some(slot) = self.initial.by_name(param.name()) {
            if slot.key() != param.key() {
                return Err(PlanError::ParamTypeMismatch {
                    param: param.name(),
                    callable,
                    expected: slot.key().name(),
                    found: param.key().name(),
                });
            }
            return Ok(Source::Initial(slot.name()));
        }
        if let Some(slot) = self.initial.by_key(param.key()) {
            return Ok(Source::Initial(slot.name()));
        }
        self.require(param.key(), callable)?;
        Ok(Source::Provided(param.key()))
    }

    fn require(&mut self, key: Key, callable: &'static str) -> Result<(), PlanError> {
        match self.marks.get(&key) {
            Some(Mark::Ready) => return Ok(()),
            Some(Mark::Pending) => {
                let start = self.path.iter().position(|v| *v == key).unwrap_or(0);
                let mut cycle: Vec<_> = self.path[start..].iter().map(Key::name).collect();
                cycle.push(key.name());
                return Err(PlanError::CyclicDependency { cycle });
            }
            None => {}
        }
        let registry = self.registry;
        let provider = registry
            .provider(key)
            .ok_or(PlanError::UnsatisfiableDependency {
                key: key.name(),
                requested_by: callable,
            })?;
        self.marks.insert(key, Mark::Pending);
        self.path.push(key);
        let name = provider.name();
        let mut inputs = Vec::new();
        for param in provider.requires() {
            inputs.push(self.bind(&param, name)?);
        }
        self.path.pop();
        self.marks.insert(key, Mark::Ready);
        self.steps.push(Step {
            provider: provider.clone(),
            inputs,
        });
        Ok(())
    }
}
