//! Asynchronous boolean conditions over an [`Exchange`], and the combinators used to build
//! the match condition of a route.
//!
//! `and` and `or` always evaluate both operands, concurrently, so side effects of either side
//! are never skipped.
use std::{fmt, future::Future, sync::Arc};

use futures_util::future::{join, ready, BoxFuture};

use crate::{BoxError, Exchange};

/// A condition evaluated against a request.
pub trait RoutePredicate: Send + Sync + 'static {
    fn test(&self, exchange: &Exchange) -> impl Future<Output = Result<bool, BoxError>> + Send;
}

trait DynRoutePredicate: Send + Sync + 'static {
    fn test_dyn<'a>(&'a self, exchange: &'a Exchange) -> BoxFuture<'a, Result<bool, BoxError>>;
}

impl<P: RoutePredicate> DynRoutePredicate for P {
    fn test_dyn<'a>(&'a self, exchange: &'a Exchange) -> BoxFuture<'a, Result<bool, BoxError>> {
        Box::pin(self.test(exchange))
    }
}

/// A shared, type erased predicate.
#[derive(Clone)]
pub struct Predicate {
    description: Arc<str>,
    inner: Arc<dyn DynRoutePredicate>,
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.description).finish()
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

impl Predicate {
    pub fn new<P: RoutePredicate>(description: impl Into<Arc<str>>, predicate: P) -> Self {
        Self {
            description: description.into(),
            inner: Arc::new(predicate),
        }
    }

    /// Lift a synchronous closure into a predicate.
    pub fn from_fn<F>(description: impl Into<Arc<str>>, f: F) -> Self
    where
        F: Fn(&Exchange) -> bool + Send + Sync + 'static,
    {
        Self::new(description, FnPredicate(f))
    }

    /// The predicate that holds for every request.
    pub fn always() -> Self {
        Self::from_fn("true", |_| true)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// # Errors
    /// If the predicate itself fails.
    pub fn test<'a>(&'a self, exchange: &'a Exchange) -> BoxFuture<'a, Result<bool, BoxError>> {
        self.inner.test_dyn(exchange)
    }

    #[must_use]
    pub fn and(self, other: Predicate) -> Self {
        let description = format!("({} && {})", self.description, other.description);
        Self::new(description, And(self, other))
    }

    #[must_use]
    pub fn or(self, other: Predicate) -> Self {
        let description = format!("({} || {})", self.description, other.description);
        Self::new(description, Or(self, other))
    }

    #[must_use]
    pub fn negate(self) -> Self {
        let description = format!("!{}", self.description);
        Self::new(description, Not(self))
    }

    /// Combine predicates left to right with `and`.
    ///
    /// An empty list yields [`Predicate::always`].
    pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        predicates.into_iter().reduce(Predicate::and).unwrap_or_else(Predicate::always)
    }
}

struct FnPredicate<F>(F);

impl<F> RoutePredicate for FnPredicate<F>
where
    F: Fn(&Exchange) -> bool + Send + Sync + 'static,
{
    fn test(&self, exchange: &Exchange) -> impl Future<Output = Result<bool, BoxError>> + Send {
        ready(Ok((self.0)(exchange)))
    }
}

struct And(Predicate, Predicate);

impl RoutePredicate for And {
    async fn test(&self, exchange: &Exchange) -> Result<bool, BoxError> {
        let (left, right) = join(self.0.test(exchange), self.1.test(exchange)).await;
        Ok(left? & right?)
    }
}

struct Or(Predicate, Predicate);

impl RoutePredicate for Or {
    async fn test(&self, exchange: &Exchange) -> Result<bool, BoxError> {
        let (left, right) = join(self.0.test(exchange), self.1.test(exchange)).await;
        Ok(left? | right?)
    }
}

struct Not(Predicate);

impl RoutePredicate for Not {
    async fn test(&self, exchange: &Exchange) -> Result<bool, BoxError> {
        Ok(!self.0.test(exchange).await?)
    }
}
