use hyper::Method;
use relaygate_kernel::Exchange;
use serde::Deserialize;

use crate::{BoxError, PredicateFactory, RoutePredicate, ShortcutType};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodConfig {
    pub methods: Vec<String>,
}

/// Holds when the request method is one of `methods`.
#[derive(Debug, Clone)]
pub struct MethodPredicate {
    pub methods: Vec<Method>,
}

impl RoutePredicate for MethodPredicate {
    async fn test(&self, exchange: &Exchange) -> Result<bool, BoxError> {
        Ok(self.methods.contains(exchange.request().method()))
    }
}

impl PredicateFactory for MethodPredicate {
    const NAME: &'static str = "method";
    const SHORTCUT_FIELDS: &'static [&'static str] = &["methods"];
    const SHORTCUT_TYPE: ShortcutType = ShortcutType::GatherList;
    type Config = MethodConfig;
    fn create(config: MethodConfig) -> Result<Self, BoxError> {
        let methods = config.methods.iter().map(|method| Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())).collect::<Result<_, _>>()?;
        Ok(Self { methods })
    }
}
