use std::sync::Arc;

use tracing::trace;

use super::{AfterHook, FlowKind, Next, OrderedFilter};
use crate::{error::GatewayError, Exchange};

/// How the forward pass of a chain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Every filter continued.
    Exhausted,
    /// The filter at this position completed the chain.
    Completed { at: usize },
}

/// Merge global and route filters into one list, sorted by order.
///
/// The sort is stable: on equal order, global filters come before route filters and each list
/// keeps its own relative order.
pub fn merge_and_sort(global: &[OrderedFilter], route: &[OrderedFilter]) -> Vec<OrderedFilter> {
    let mut combined = Vec::with_capacity(global.len() + route.len());
    combined.extend_from_slice(global);
    combined.extend_from_slice(route);
    combined.sort_by_key(|filter| filter.order);
    combined
}

/// A sorted list of filters and a driver that runs them in order.
#[derive(Debug, Clone)]
pub struct FilterChain {
    filters: Arc<[OrderedFilter]>,
}

impl FilterChain {
    pub fn new(filters: impl Into<Arc<[OrderedFilter]>>) -> Self {
        Self { filters: filters.into() }
    }
    pub fn filters(&self) -> &[OrderedFilter] {
        &self.filters
    }

    /// Run the chain against `exchange`.
    ///
    /// Filters are invoked one after another from this loop, so the stack depth does not grow
    /// with the number of filters. After-hooks run in reverse registration order once the forward
    /// pass ends.
    ///
    /// # Errors
    /// The first error raised by a filter or after-hook. Pending after-hooks are dropped.
    pub async fn run(&self, exchange: &mut Exchange) -> Result<ChainOutcome, GatewayError> {
        let mut hooks: Vec<(usize, Box<dyn AfterHook>)> = Vec::new();
        let mut index = 0;
        let outcome = loop {
            let Some(current) = self.filters.get(index) else {
                break ChainOutcome::Exhausted;
            };
            trace!(index, filter = current.name(), order = current.order, "[Rg.Chain] enter filter");
            match current.filter.filter(exchange, Next::new()).await?.into_kind() {
                FlowKind::Continue(hook) => {
                    if let Some(hook) = hook {
                        hooks.push((index, hook));
                    }
                    index += 1;
                }
                FlowKind::Complete => {
                    trace!(index, filter = current.name(), "[Rg.Chain] chain completed by filter");
                    break ChainOutcome::Completed { at: index };
                }
            }
        };
        while let Some((index, hook)) = hooks.pop() {
            trace!(index, "[Rg.Chain] run after hook");
            hook.after(exchange).await?;
        }
        Ok(outcome)
    }
}
