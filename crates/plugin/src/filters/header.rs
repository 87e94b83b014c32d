//! Request and response header modifiers.
use hyper::header::{HeaderName, HeaderValue};
use relaygate_kernel::{
    filter::{Flow, Next},
    Exchange, GatewayError,
};
use serde::Deserialize;

use crate::{BoxError, FilterFactory, GatewayFilter};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NameValueConfig {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NameConfig {
    pub name: String,
}

fn header_name(name: &str) -> Result<HeaderName, BoxError> {
    Ok(HeaderName::from_bytes(name.trim().as_bytes())?)
}

/// Appends a header to the request sent upstream.
#[derive(Debug, Clone)]
pub struct AddRequestHeaderFilter {
    pub name: HeaderName,
    pub value: HeaderValue,
}

impl GatewayFilter for AddRequestHeaderFilter {
    async fn filter(&self, exchange: &mut Exchange, next: Next) -> Result<Flow, GatewayError> {
        exchange.request_mut().headers_mut().append(self.name.clone(), self.value.clone());
        Ok(next.proceed())
    }
}

impl FilterFactory for AddRequestHeaderFilter {
    const NAME: &'static str = "add-request-header";
    const SHORTCUT_FIELDS: &'static [&'static str] = &["name", "value"];
    type Config = NameValueConfig;
    fn create(config: NameValueConfig) -> Result<Self, BoxError> {
        Ok(Self {
            name: header_name(&config.name)?,
            value: HeaderValue::try_from(config.value)?,
        })
    }
}

/// Appends a header to the response. An upstream header of the same name replaces it.
#[derive(Debug, Clone)]
pub struct AddResponseHeaderFilter {
    pub name: HeaderName,
    pub value: HeaderValue,
}

impl GatewayFilter for AddResponseHeaderFilter {
    async fn filter(&self, exchange: &mut Exchange, next: Next) -> Result<Flow, GatewayError> {
        exchange.response_mut().headers_mut().append(self.name.clone(), self.value.clone());
        Ok(next.proceed())
    }
}

impl FilterFactory for AddResponseHeaderFilter {
    const NAME: &'static str = "add-response-header";
    const SHORTCUT_FIELDS: &'static [&'static str] = &["name", "value"];
    type Config = NameValueConfig;
    fn create(config: NameValueConfig) -> Result<Self, BoxError> {
        Ok(Self {
            name: header_name(&config.name)?,
            value: HeaderValue::try_from(config.value)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RemoveRequestHeaderFilter {
    pub name: HeaderName,
}

impl GatewayFilter for RemoveRequestHeaderFilter {
    async fn filter(&self, exchange: &mut Exchange, next: Next) -> Result<Flow, GatewayError> {
        exchange.request_mut().headers_mut().remove(&self.name);
        Ok(next.proceed())
    }
}

impl FilterFactory for RemoveRequestHeaderFilter {
    const NAME: &'static str = "remove-request-header";
    const SHORTCUT_FIELDS: &'static [&'static str] = &["name"];
    type Config = NameConfig;
    fn create(config: NameConfig) -> Result<Self, BoxError> {
        Ok(Self {
            name: header_name(&config.name)?,
        })
    }
}

/// Removes a header from the response once the upstream answered.
#[derive(Debug, Clone)]
pub struct RemoveResponseHeaderFilter {
    pub name: HeaderName,
}

impl GatewayFilter for RemoveResponseHeaderFilter {
    async fn filter(&self, _exchange: &mut Exchange, next: Next) -> Result<Flow, GatewayError> {
        let name = self.name.clone();
        Ok(next.then(move |exchange: &mut Exchange| -> Result<(), GatewayError> {
            exchange.response_mut().headers_mut().remove(&name);
            Ok(())
        }))
    }
}

impl FilterFactory for RemoveResponseHeaderFilter {
    const NAME: &'static str = "remove-response-header";
    const SHORTCUT_FIELDS: &'static [&'static str] = &["name"];
    type Config = NameConfig;
    fn create(config: NameConfig) -> Result<Self, BoxError> {
        Ok(Self {
            name: header_name(&config.name)?,
        })
    }
}
