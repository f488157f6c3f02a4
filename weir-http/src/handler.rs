use std::sync::Arc;

use async_trait::async_trait;
use weir::{InjectError, Injectable, Injector, Plan, PlanError, State, injectable};

use crate::{Exc, HttpError, IntoResponse, Response, RouteError};

/// Outcome of an error handler.
#[derive(Clone, Debug, PartialEq)]
pub enum Recovery {
    /// Answer the request with this response.
    Respond(Response),
    /// The error is not recognized; dispatch fails with it.
    Propagate,
}

impl Recovery {
    pub fn respond(response: impl IntoResponse) -> Self {
        Recovery::Respond(response.into_response())
    }
}

/// Default error handler: answers [`HttpError`] and [`RouteError`] and
/// propagates everything else.
#[injectable]
pub fn exception_handler(exc: Exc) -> Recovery {
    if let Some(err) = exc.downcast_ref::<HttpError>() {
        return Recovery::respond(err.clone());
    }
    if let Some(err) = exc.downcast_ref::<RouteError>() {
        return Recovery::respond(err.to_http_error());
    }
    Recovery::Propagate
}

#[async_trait]
pub(crate) trait DynHandler: Send + Sync {
    fn name(&self) -> &'static str;

    fn plan(&self, injector: &Injector) -> Result<Arc<Plan>, PlanError>;

    async fn run(&self, injector: &Injector, state: &mut State) -> Result<Response, InjectError>;
}

#[async_trait]
impl<T> DynHandler for T
where
    T: Injectable,
    T::Output: IntoResponse,
{
    fn name(&self) -> &'static str {
        Injectable::name(self)
    }

    fn plan(&self, injector: &Injector) -> Result<Arc<Plan>, PlanError> {
        injector.plan(self)
    }

    async fn run(&self, injector: &Injector, state: &mut State) -> Result<Response, InjectError> {
        injector
            .run(self, state)
            .await
            .map(IntoResponse::into_response)
    }
}

#[async_trait]
pub(crate) trait DynErrorHandler: Send + Sync {
    fn name(&self) -> &'static str;

    fn plan(&self, injector: &Injector) -> Result<Arc<Plan>, PlanError>;

    async fn run(&self, injector: &Injector, state: &mut State) -> Result<Recovery, InjectError>;
}

#[async_trait]
impl<T> DynErrorHandler for T
where
    T: Injectable<Output = Recovery>,
{
    fn name(&self) -> &'static str {
        Injectable::name(self)
    }

    fn plan(&self, injector: &Injector) -> Result<Arc<Plan>, PlanError> {
        injector.plan(self)
    }

    async fn run(&self, injector: &Injector, state: &mut State) -> Result<Recovery, InjectError> {
        injector.run(self, state).await
    }
}
