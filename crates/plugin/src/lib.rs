#![deny(clippy::unwrap_used, clippy::dbg_macro, clippy::unimplemented, clippy::todo, clippy::inline_always)]
//! # Relaygate plugin crate.
//!
//! Named predicate and filter factories, the registry that holds them, and the conversion of
//! route definitions into routes.
use std::{
    borrow::Cow,
    collections::HashMap,
    fmt::Debug,
    sync::{Arc, OnceLock, PoisonError, RwLock},
};

use serde::de::DeserializeOwned;

pub use relaygate_kernel::BoxError;
pub use relaygate_kernel::{
    filter::{BoxFilter, GatewayFilter},
    predicate::{Predicate, RoutePredicate},
    GatewayError,
};
pub use relaygate_model;
pub use relaygate_model::{FilterDefinition, PredicateDefinition};
pub use serde_json;

pub mod binding;
pub mod filters;
pub mod path_pattern;
pub mod predicates;
pub mod route;

pub use binding::ShortcutType;
pub use route::RouteCompiler;

/// # Predicate factory
/// A predicate that can be created by name from a [`PredicateDefinition`].
///
/// The definition arguments are bound to [`Config`](PredicateFactory::Config) first, see
/// [`binding`] for how positional arguments are assigned.
///
/// # Example
/// ```rust
/// # use relaygate_plugin::{PredicateFactory, RoutePredicate, BoxError};
/// # use relaygate_kernel::Exchange;
/// #[derive(serde::Deserialize)]
/// pub struct Config {
///     header: String,
/// }
///
/// pub struct HasHeader(String);
///
/// impl RoutePredicate for HasHeader {
///     async fn test(&self, exchange: &Exchange) -> Result<bool, BoxError> {
///         Ok(exchange.request().headers().contains_key(self.0.as_str()))
///     }
/// }
///
/// impl PredicateFactory for HasHeader {
///     const NAME: &'static str = "has-header";
///     const SHORTCUT_FIELDS: &'static [&'static str] = &["header"];
///     type Config = Config;
///     fn create(config: Config) -> Result<Self, BoxError> {
///         Ok(Self(config.header))
///     }
/// }
/// ```
pub trait PredicateFactory: RoutePredicate + Sized {
    /// Factory name, it should be unique registry-wise.
    ///
    /// Lookup ignores ascii case, use a **kebab-case** name.
    const NAME: &'static str;
    /// Config fields that positional arguments are assigned to, in order.
    const SHORTCUT_FIELDS: &'static [&'static str] = &[];
    const SHORTCUT_TYPE: ShortcutType = ShortcutType::Default;
    type Config: DeserializeOwned;
    fn create(config: Self::Config) -> Result<Self, BoxError>;
}

/// # Filter factory
/// A filter that can be created by name from a [`FilterDefinition`].
pub trait FilterFactory: GatewayFilter + Sized {
    /// Factory name, it should be unique registry-wise.
    const NAME: &'static str;
    const SHORTCUT_FIELDS: &'static [&'static str] = &[];
    const SHORTCUT_TYPE: ShortcutType = ShortcutType::Default;
    type Config: DeserializeOwned;
    fn create(config: Self::Config) -> Result<Self, BoxError>;
    /// Explicit order of the created filter.
    ///
    /// When `None`, the route builder uses the position of the filter in the route's filter list.
    fn order(&self) -> Option<i32> {
        None
    }
}

type MakePredicate = dyn Fn(&PredicateDefinition) -> Result<Predicate, BoxError> + Send + Sync;
type MakeFilter = dyn Fn(&FilterDefinition) -> Result<BoxFilter, BoxError> + Send + Sync;

/// Predicate factory trait object.
pub struct PredicateFactoryObject {
    pub name: Cow<'static, str>,
    pub make: Box<MakePredicate>,
}

impl Debug for PredicateFactoryObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredicateFactoryObject").field("name", &self.name).finish()
    }
}

impl PredicateFactoryObject {
    pub fn from_trait<P: PredicateFactory>() -> Self {
        Self {
            name: P::NAME.into(),
            make: Box::new(|definition| {
                let config = binding::bind::<P::Config>(&definition.args, P::SHORTCUT_FIELDS, P::SHORTCUT_TYPE)?;
                Ok(Predicate::new(definition.to_string(), P::create(config)?))
            }),
        }
    }
    /// A factory backed by a closure, for predicates that don't fit the [`PredicateFactory`] shape.
    pub fn from_fn<F>(name: impl Into<Cow<'static, str>>, make: F) -> Self
    where
        F: Fn(&PredicateDefinition) -> Result<Predicate, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            make: Box::new(make),
        }
    }
}

/// Filter factory trait object.
pub struct FilterFactoryObject {
    pub name: Cow<'static, str>,
    pub make: Box<MakeFilter>,
}

impl Debug for FilterFactoryObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterFactoryObject").field("name", &self.name).finish()
    }
}

impl FilterFactoryObject {
    pub fn from_trait<F: FilterFactory>() -> Self {
        Self {
            name: F::NAME.into(),
            make: Box::new(|definition| {
                let config = binding::bind::<F::Config>(&definition.args, F::SHORTCUT_FIELDS, F::SHORTCUT_TYPE)?;
                let filter = F::create(config)?;
                Ok(match filter.order() {
                    Some(order) => BoxFilter::new(F::NAME, filter).with_order(order),
                    None => BoxFilter::new(F::NAME, filter),
                })
            }),
        }
    }
    pub fn from_fn<F>(name: impl Into<Cow<'static, str>>, make: F) -> Self
    where
        F: Fn(&FilterDefinition) -> Result<BoxFilter, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            make: Box::new(make),
        }
    }
}

fn registry_key(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Name to factory lookup for predicates and filters.
///
/// Clones share the same factories.
#[derive(Default, Clone, Debug)]
pub struct FactoryRegistry {
    predicates: Arc<RwLock<HashMap<String, PredicateFactoryObject>>>,
    filters: Arc<RwLock<HashMap<String, FilterFactoryObject>>>,
}

impl FactoryRegistry {
    /// Get the global registry.
    ///
    /// Once the registry is initialized, it holds all factories of this crate.
    pub fn global() -> &'static Self {
        static INIT: OnceLock<FactoryRegistry> = OnceLock::new();
        INIT.get_or_init(|| {
            let registry = FactoryRegistry::new();
            registry.register_prelude();
            registry
        })
    }

    /// register all factories in this crate
    pub fn register_prelude(&self) {
        #[cfg(feature = "datetime")]
        {
            self.register_predicate::<predicates::datetime::AfterPredicate>();
            self.register_predicate::<predicates::datetime::BeforePredicate>();
            self.register_predicate::<predicates::datetime::BetweenPredicate>();
        }
        self.register_predicate::<predicates::path::PathPredicate>();
        self.register_predicate::<predicates::method::MethodPredicate>();
        self.register_predicate::<predicates::header::HeaderPredicate>();
        self.register_predicate::<predicates::host::HostPredicate>();
        self.register_predicate::<predicates::query::QueryPredicate>();
        self.register_predicate::<predicates::cookie::CookiePredicate>();
        #[cfg(feature = "remote-addr")]
        self.register_predicate::<predicates::remote_addr::RemoteAddrPredicate>();

        self.register_filter::<filters::header::AddRequestHeaderFilter>();
        self.register_filter::<filters::header::AddResponseHeaderFilter>();
        self.register_filter::<filters::header::RemoveRequestHeaderFilter>();
        self.register_filter::<filters::header::RemoveResponseHeaderFilter>();
        #[cfg(feature = "rewrite")]
        {
            self.register_filter::<filters::rewrite_path::RewritePathFilter>();
            self.register_filter::<filters::path::StripPrefixFilter>();
            self.register_filter::<filters::path::PrefixPathFilter>();
        }
        #[cfg(feature = "redirect")]
        self.register_filter::<filters::redirect_to::RedirectToFilter>();
        self.register_filter::<filters::preserve_host::PreserveHostHeaderFilter>();
        self.register_filter::<filters::set_status::SetStatusFilter>();
    }

    /// create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// register by [`PredicateFactory`] trait
    pub fn register_predicate<P: PredicateFactory>(&self) {
        self.register_custom_predicate(PredicateFactoryObject::from_trait::<P>())
    }

    /// register by [`FilterFactory`] trait
    pub fn register_filter<F: FilterFactory>(&self) {
        self.register_custom_filter(FilterFactoryObject::from_trait::<F>())
    }

    /// register a custom predicate factory, replacing any factory with the same name
    pub fn register_custom_predicate(&self, factory: PredicateFactoryObject) {
        let mut map = self.predicates.write().unwrap_or_else(PoisonError::into_inner);
        if map.insert(registry_key(&factory.name), factory).is_some() {
            tracing::debug!("[Rg.Registry] predicate factory replaced");
        }
    }

    /// register a custom filter factory, replacing any factory with the same name
    pub fn register_custom_filter(&self, factory: FilterFactoryObject) {
        let mut map = self.filters.write().unwrap_or_else(PoisonError::into_inner);
        if map.insert(registry_key(&factory.name), factory).is_some() {
            tracing::debug!("[Rg.Registry] filter factory replaced");
        }
    }

    pub fn contains_predicate(&self, name: &str) -> bool {
        self.predicates.read().unwrap_or_else(PoisonError::into_inner).contains_key(&registry_key(name))
    }

    pub fn contains_filter(&self, name: &str) -> bool {
        self.filters.read().unwrap_or_else(PoisonError::into_inner).contains_key(&registry_key(name))
    }

    /// Create the predicate described by `definition`, for the route `route`.
    ///
    /// # Errors
    /// [`GatewayError::UnknownPredicate`] if no factory has that name, [`GatewayError::Binding`]
    /// if the arguments don't fit its config.
    pub fn predicate(&self, route: &str, definition: &PredicateDefinition) -> Result<Predicate, GatewayError> {
        let map = self.predicates.read().unwrap_or_else(PoisonError::into_inner);
        let Some(factory) = map.get(&registry_key(&definition.name)) else {
            return Err(GatewayError::UnknownPredicate {
                route: route.to_string(),
                name: definition.name.clone(),
            });
        };
        (factory.make)(definition).map_err(|e| GatewayError::Binding {
            route: route.to_string(),
            name: definition.name.clone(),
            message: e.to_string(),
        })
    }

    /// Create the filter described by `definition`, for the route `route`.
    ///
    /// # Errors
    /// [`GatewayError::UnknownFilter`] if no factory has that name, [`GatewayError::Binding`]
    /// if the arguments don't fit its config.
    pub fn filter(&self, route: &str, definition: &FilterDefinition) -> Result<BoxFilter, GatewayError> {
        let map = self.filters.read().unwrap_or_else(PoisonError::into_inner);
        let Some(factory) = map.get(&registry_key(&definition.name)) else {
            return Err(GatewayError::UnknownFilter {
                route: route.to_string(),
                name: definition.name.clone(),
            });
        };
        (factory.make)(definition).map_err(|e| GatewayError::Binding {
            route: route.to_string(),
            name: definition.name.clone(),
            message: e.to_string(),
        })
    }
}
