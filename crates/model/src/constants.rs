pub const DEFAULT_GATEWAY_NAME: &str = "relaygate";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

/// Key prefix of positional arguments produced by the `name=v0,v1` shorthand.
pub const GENERATED_KEY_PREFIX: &str = "_genkey_";

pub const SCHEME_HTTP: &str = "http";
pub const SCHEME_HTTPS: &str = "https";
pub const SCHEME_FORWARD: &str = "forward";
