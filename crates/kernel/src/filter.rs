//! Filters and the chain that drives them.
//!
//! A filter receives the exchange and a [`Next`] token. It may
//! - continue with [`Next::proceed`],
//! - continue and register work to run once everything downstream completed, with [`Next::then`],
//! - stop the chain by returning [`Flow::complete`],
//! - fail, which aborts the chain without running any registered after-hook.
mod chain;
pub use chain::*;

use std::{fmt, future::Future, sync::Arc};

use futures_util::future::{ready, BoxFuture};

use crate::{error::GatewayError, Exchange};

/// Orders used by the built in global filters.
pub mod order {
    /// Sorts last.
    pub const LOWEST_PRECEDENCE: i32 = i32::MAX;
    pub const HIGHEST_PRECEDENCE: i32 = i32::MIN;
    pub const WRITE_RESPONSE: i32 = -1;
    pub const ROUTE_TO_URL: i32 = 10000;
    pub const UPSTREAM_FORWARDER: i32 = LOWEST_PRECEDENCE;
    pub const FORWARD_ROUTING: i32 = LOWEST_PRECEDENCE;
}

pub trait GatewayFilter: Send + Sync + 'static {
    fn filter(&self, exchange: &mut Exchange, next: Next) -> impl Future<Output = Result<Flow, GatewayError>> + Send;
}

/// Work that runs after the rest of the chain has completed.
pub trait AfterHook: Send + 'static {
    fn after<'a>(self: Box<Self>, exchange: &'a mut Exchange) -> BoxFuture<'a, Result<(), GatewayError>>;
}

impl<F> AfterHook for F
where
    F: FnOnce(&mut Exchange) -> Result<(), GatewayError> + Send + 'static,
{
    fn after<'a>(self: Box<Self>, exchange: &'a mut Exchange) -> BoxFuture<'a, Result<(), GatewayError>> {
        Box::pin(ready((*self)(exchange)))
    }
}

/// Permission to continue the chain, only the chain can create it.
#[derive(Debug)]
pub struct Next {
    _priv: (),
}

impl Next {
    pub(crate) fn new() -> Self {
        Self { _priv: () }
    }
    /// Continue with the next filter.
    pub fn proceed(self) -> Flow {
        Flow(FlowKind::Continue(None))
    }
    /// Continue with the next filter, and run `hook` once the chain has completed.
    pub fn then<H: AfterHook>(self, hook: H) -> Flow {
        Flow(FlowKind::Continue(Some(Box::new(hook))))
    }
}

/// What a filter decided to do with the rest of the chain.
pub struct Flow(FlowKind);

pub(crate) enum FlowKind {
    Continue(Option<Box<dyn AfterHook>>),
    Complete,
}

impl Flow {
    /// Stop the chain here, the remaining filters are skipped.
    pub fn complete() -> Self {
        Self(FlowKind::Complete)
    }
    pub fn is_complete(&self) -> bool {
        matches!(self.0, FlowKind::Complete)
    }
    pub(crate) fn into_kind(self) -> FlowKind {
        self.0
    }
}

impl fmt::Debug for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            FlowKind::Continue(hook) => f.debug_struct("Continue").field("has_hook", &hook.is_some()).finish(),
            FlowKind::Complete => f.write_str("Complete"),
        }
    }
}

trait DynGatewayFilter: Send + Sync + 'static {
    fn filter_dyn<'a>(&'a self, exchange: &'a mut Exchange, next: Next) -> BoxFuture<'a, Result<Flow, GatewayError>>;
}

impl<F: GatewayFilter> DynGatewayFilter for F {
    fn filter_dyn<'a>(&'a self, exchange: &'a mut Exchange, next: Next) -> BoxFuture<'a, Result<Flow, GatewayError>> {
        Box::pin(self.filter(exchange, next))
    }
}

/// A shared, type erased filter with an optional explicit order.
#[derive(Clone)]
pub struct BoxFilter {
    name: Arc<str>,
    order: Option<i32>,
    inner: Arc<dyn DynGatewayFilter>,
}

impl fmt::Debug for BoxFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxFilter").field("name", &self.name).field("order", &self.order).finish()
    }
}

impl BoxFilter {
    pub fn new<F: GatewayFilter>(name: impl Into<Arc<str>>, filter: F) -> Self {
        Self {
            name: name.into(),
            order: None,
            inner: Arc::new(filter),
        }
    }
    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    /// The explicit order, if the filter declares one.
    pub fn order(&self) -> Option<i32> {
        self.order
    }
    /// Attach the effective order, falling back to `default` when none was declared.
    pub fn ordered_or(self, default: i32) -> OrderedFilter {
        OrderedFilter {
            order: self.order.unwrap_or(default),
            filter: self,
        }
    }
    /// # Errors
    /// Whatever the filter fails with.
    pub fn filter<'a>(&'a self, exchange: &'a mut Exchange, next: Next) -> BoxFuture<'a, Result<Flow, GatewayError>> {
        self.inner.filter_dyn(exchange, next)
    }
}

/// A filter with its effective order.
#[derive(Debug, Clone)]
pub struct OrderedFilter {
    pub order: i32,
    pub filter: BoxFilter,
}

impl OrderedFilter {
    pub fn new(order: i32, filter: BoxFilter) -> Self {
        Self { order, filter }
    }
    pub fn name(&self) -> &str {
        self.filter.name()
    }
}

/// A filter built from a synchronous closure.
pub struct FnFilter<F>(pub F);

impl<F> GatewayFilter for FnFilter<F>
where
    F: Fn(&mut Exchange, Next) -> Result<Flow, GatewayError> + Send + Sync + 'static,
{
    fn filter(&self, exchange: &mut Exchange, next: Next) -> impl Future<Output = Result<Flow, GatewayError>> + Send {
        ready((self.0)(exchange, next))
    }
}

impl<F> fmt::Debug for FnFilter<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnFilter")
    }
}
