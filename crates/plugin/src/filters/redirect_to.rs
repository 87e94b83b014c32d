use hyper::{
    header::{self, HeaderValue},
    StatusCode, Uri,
};
use relaygate_kernel::{
    filter::{Flow, Next},
    Exchange, GatewayError,
};
use serde::Deserialize;

use crate::{binding::parse, BoxError, FilterFactory, GatewayFilter};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedirectToConfig {
    #[serde(deserialize_with = "parse")]
    pub status: StatusCode,
    pub url: String,
}

/// Answers with a redirect to a fixed url instead of routing the request.
///
/// A response that was already committed is left alone and the chain continues.
#[derive(Debug, Clone)]
pub struct RedirectToFilter {
    pub status: StatusCode,
    pub location: HeaderValue,
}

impl GatewayFilter for RedirectToFilter {
    async fn filter(&self, exchange: &mut Exchange, next: Next) -> Result<Flow, GatewayError> {
        if exchange.response().is_committed() {
            return Ok(next.proceed());
        }
        let response = exchange.response_mut();
        response.set_status(self.status);
        response.headers_mut().insert(header::LOCATION, self.location.clone());
        response.commit();
        tracing::debug!(status = %self.status, location = ?self.location, "[Rg.Filter.RedirectTo] redirect");
        Ok(Flow::complete())
    }
}

impl FilterFactory for RedirectToFilter {
    const NAME: &'static str = "redirect-to";
    const SHORTCUT_FIELDS: &'static [&'static str] = &["status", "url"];
    type Config = RedirectToConfig;
    fn create(config: RedirectToConfig) -> Result<Self, BoxError> {
        if !config.status.is_redirection() {
            return Err(format!("status must be a 3xx code, but was {}", config.status.as_u16()).into());
        }
        let url = config.url.trim();
        url.parse::<Uri>()?;
        Ok(Self {
            status: config.status,
            location: HeaderValue::from_str(url)?,
        })
    }
}
