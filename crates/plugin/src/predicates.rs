//! Built in predicate factories.
#[cfg(feature = "datetime")]
pub mod datetime;
pub mod cookie;
pub mod header;
pub mod host;
pub mod method;
pub mod path;
pub mod query;
#[cfg(feature = "remote-addr")]
pub mod remote_addr;

use regex::Regex;

/// Compile `regexp` so that it must match a whole value.
pub(crate) fn full_match(regexp: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{regexp})$"))
}
