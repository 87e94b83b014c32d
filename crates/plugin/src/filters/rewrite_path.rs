use regex::Regex;
use relaygate_kernel::{
    filter::{Flow, Next},
    Exchange, GatewayError,
};
use serde::Deserialize;

use super::rewrite_request_path;
use crate::{BoxError, FilterFactory, GatewayFilter};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RewritePathConfig {
    pub regexp: String,
    pub replacement: String,
}

/// Rewrites the request path with a regex replacement.
///
/// `$\` in the configured replacement stands for `$`, so `${name}` can be written as `$\{name}`
/// where `${...}` would be interpolated by the config format. `$name`, `${name}` and `$N` refer to
/// a capture group only when the regex has that group, any other `$` is kept as is.
#[derive(Debug, Clone)]
pub struct RewritePathFilter {
    pub regexp: Regex,
    pub replacement: String,
}

impl GatewayFilter for RewritePathFilter {
    async fn filter(&self, exchange: &mut Exchange, next: Next) -> Result<Flow, GatewayError> {
        let path = exchange.request().uri().path();
        let rewritten = self.regexp.replace_all(path, self.replacement.as_str()).into_owned();
        tracing::trace!(from = path, to = %rewritten, "[Rg.Filter.RewritePath] rewrite");
        rewrite_request_path(exchange, &rewritten)?;
        Ok(next.proceed())
    }
}

impl FilterFactory for RewritePathFilter {
    const NAME: &'static str = "rewrite-path";
    const SHORTCUT_FIELDS: &'static [&'static str] = &["regexp", "replacement"];
    type Config = RewritePathConfig;
    fn create(config: RewritePathConfig) -> Result<Self, BoxError> {
        let regexp = Regex::new(&config.regexp)?;
        let replacement = escape_unknown_groups(&config.replacement.replace("$\\", "$"), &regexp);
        Ok(Self { regexp, replacement })
    }
}

fn is_group(regexp: &Regex, name: &str) -> bool {
    match name.parse::<usize>() {
        Ok(index) => index < regexp.captures_len(),
        Err(_) => regexp.capture_names().flatten().any(|group| group == name),
    }
}

/// Escape every `$` of `replacement` that doesn't reference a group of `regexp`.
fn escape_unknown_groups(replacement: &str, regexp: &Regex) -> String {
    let mut escaped = String::with_capacity(replacement.len());
    let mut rest = replacement;
    while let Some(at) = rest.find('$') {
        escaped.push_str(&rest[..at]);
        let after = &rest[at + 1..];
        if let Some(tail) = after.strip_prefix('$') {
            escaped.push_str("$$");
            rest = tail;
            continue;
        }
        let (name, len) = match after.strip_prefix('{').and_then(|braced| braced.find('}').map(|end| (&braced[..end], end + 2))) {
            Some((name, len)) => (name, len),
            None => {
                let end = after.find(|c: char| !(c.is_ascii_alphanumeric() || c == '_')).unwrap_or(after.len());
                (&after[..end], end)
            }
        };
        if !name.is_empty() && is_group(regexp, name) {
            escaped.push_str(&rest[at..at + 1 + len]);
            rest = &after[len..];
        } else {
            escaped.push_str("$$");
            rest = after;
        }
    }
    escaped.push_str(rest);
    escaped
}
