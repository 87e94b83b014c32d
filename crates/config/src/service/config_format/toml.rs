use std::ffi::{OsStr, OsString};

use super::ConfigFormat;
use crate::BoxError;

#[derive(Debug, Clone)]
pub struct Toml {
    pub extension: OsString,
}

impl Default for Toml {
    fn default() -> Self {
        Self {
            extension: OsString::from("toml"),
        }
    }
}

impl ConfigFormat for Toml {
    fn extension(&self) -> &OsStr {
        &self.extension
    }
    fn de<T: serde::de::DeserializeOwned>(&self, slice: &[u8]) -> Result<T, BoxError> {
        let text = std::str::from_utf8(slice)?;
        Ok(toml::from_str(text)?)
    }
    fn ser<T: serde::Serialize>(&self, t: &T) -> Result<Vec<u8>, BoxError> {
        Ok(toml::to_string_pretty(t)?.into_bytes())
    }
}

#[cfg(test)]
mod test {
    use relaygate_model::GatewayConfig;

    use super::*;

    #[test]
    fn test_toml_gateway_config() {
        let text = r#"
default_filters = ["add-response-header=x-gateway,relaygate"]

[server]
name = "edge"
port = 8080

[[routes]]
id = "api"
uri = "http://localhost:9000"
order = 1
predicates = ["path=/api/**"]
filters = [{ name = "strip-prefix", args = { parts = "1" } }]
"#;
        let config: GatewayConfig = Toml::default().de(text.as_bytes()).expect("valid toml");
        assert_eq!(config.server.name, "edge");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.default_filters.len(), 1);
        let route = config.routes.first().expect("one route");
        assert_eq!(route.id, "api");
        assert_eq!(route.predicates.first().map(|p| p.name.as_str()), Some("path"));
        assert_eq!(route.filters.first().and_then(|f| f.args.get("parts")).map(String::as_str), Some("1"));
    }
}
