use hyper::StatusCode;
use relaygate_kernel::{
    filter::{Flow, Next},
    Exchange, GatewayError,
};
use serde::Deserialize;

use crate::{binding::parse, BoxError, FilterFactory, GatewayFilter};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetStatusConfig {
    #[serde(deserialize_with = "parse")]
    pub status: StatusCode,
}

/// Overrides the response status once the rest of the chain has run.
#[derive(Debug, Clone, Copy)]
pub struct SetStatusFilter {
    pub status: StatusCode,
}

impl GatewayFilter for SetStatusFilter {
    async fn filter(&self, _exchange: &mut Exchange, next: Next) -> Result<Flow, GatewayError> {
        let status = self.status;
        Ok(next.then(move |exchange: &mut Exchange| -> Result<(), GatewayError> {
            exchange.response_mut().set_status(status);
            Ok(())
        }))
    }
}

impl FilterFactory for SetStatusFilter {
    const NAME: &'static str = "set-status";
    const SHORTCUT_FIELDS: &'static [&'static str] = &["status"];
    type Config = SetStatusConfig;
    fn create(config: SetStatusConfig) -> Result<Self, BoxError> {
        Ok(Self { status: config.status })
    }
}
