use relaygate_kernel::{
    exchange::PreserveHostHeader,
    filter::{Flow, Next},
    Exchange, GatewayError,
};
use serde::Deserialize;

use crate::{BoxError, FilterFactory, GatewayFilter};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreserveHostHeaderConfig {}

/// Sends the inbound `Host` header upstream instead of the one derived from the route uri.
#[derive(Debug, Clone, Copy)]
pub struct PreserveHostHeaderFilter;

impl GatewayFilter for PreserveHostHeaderFilter {
    async fn filter(&self, exchange: &mut Exchange, next: Next) -> Result<Flow, GatewayError> {
        exchange.insert_attribute(PreserveHostHeader(true));
        Ok(next.proceed())
    }
}

impl FilterFactory for PreserveHostHeaderFilter {
    const NAME: &'static str = "preserve-host-header";
    type Config = PreserveHostHeaderConfig;
    fn create(_config: PreserveHostHeaderConfig) -> Result<Self, BoxError> {
        Ok(Self)
    }
}

#[cfg(test)]
mod test {
    use hyper::Request;
    use relaygate_kernel::exchange::PreserveHostHeader;

    use crate::filters::test_util::{builds, run};

    #[tokio::test]
    async fn test_preserve_host() {
        let exchange = run("preserve-host-header", Request::new(())).await;
        assert!(exchange.attribute::<PreserveHostHeader>().is_some_and(|preserve| preserve.0));
        assert!(!builds("preserve-host-header=true"));
    }
}
