//! Binding of definition arguments to factory configs.
//!
//! Arguments are first normalized into a json object keyed by config field, then deserialized
//! with serde:
//! - explicit arguments keep their key, which must name a config field,
//! - positional arguments (`_genkey_N`) take the name of the shortcut field at their position,
//! - gather list factories collect every value, in order, into their single shortcut field.
//!
//! All values are strings, non string fields are parsed with [`parse`].
use std::{fmt::Display, str::FromStr};

use relaygate_model::{constants::GENERATED_KEY_PREFIX, Args};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::BoxError;

/// How positional arguments are assigned to config fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShortcutType {
    /// The n-th argument goes to the n-th shortcut field.
    #[default]
    Default,
    /// Every value goes, in order, into a list under the only shortcut field.
    GatherList,
    /// Like [`ShortcutType::GatherList`], but a trailing `true` or `false` is bound to the
    /// second shortcut field instead.
    GatherListTailFlag,
}

/// Turn `args` into a json object keyed by config field.
///
/// # Errors
/// If there are more positional arguments than shortcut fields, or the shortcut fields don't fit
/// the shortcut type.
pub fn normalize(args: &Args, fields: &[&str], shortcut: ShortcutType) -> Result<Value, BoxError> {
    let mut map = Map::new();
    match shortcut {
        ShortcutType::Default => {
            for (index, (key, value)) in args.iter().enumerate() {
                let field = if key.starts_with(GENERATED_KEY_PREFIX) {
                    match fields.get(index) {
                        Some(field) => *field,
                        None => return Err(format!("too many arguments, at most {} expected ({})", fields.len(), fields.join(", ")).into()),
                    }
                } else {
                    key.as_str()
                };
                map.insert(field.to_string(), Value::String(value.clone()));
            }
        }
        ShortcutType::GatherList => {
            let [field] = fields else {
                return Err("gather list binding needs exactly one shortcut field".into());
            };
            map.insert(field.to_string(), gather(args.values()));
        }
        ShortcutType::GatherListTailFlag => {
            let [field, flag] = fields else {
                return Err("gather list binding with a tail flag needs exactly two shortcut fields".into());
            };
            let mut values: Vec<&String> = args.values().collect();
            if values.len() > 1 {
                if let Some(last) = values.last().filter(|last| last.eq_ignore_ascii_case("true") || last.eq_ignore_ascii_case("false")) {
                    map.insert(flag.to_string(), Value::String(last.to_ascii_lowercase()));
                    values.pop();
                }
            }
            map.insert(field.to_string(), gather(values));
        }
    }
    Ok(Value::Object(map))
}

fn gather<'a>(values: impl IntoIterator<Item = &'a String>) -> Value {
    Value::Array(values.into_iter().map(|value| Value::String(value.clone())).collect())
}

/// Normalize `args` and deserialize them into `T`.
///
/// # Errors
/// If normalization fails, a required field is missing or a value is invalid.
pub fn bind<T: DeserializeOwned>(args: &Args, fields: &[&str], shortcut: ShortcutType) -> Result<T, BoxError> {
    let value = normalize(args, fields, shortcut)?;
    Ok(serde_json::from_value(value)?)
}

/// Deserialize a string argument with [`FromStr`], for use in `#[serde(deserialize_with)]`.
///
/// # Errors
/// If the value is not a string or does not parse.
pub fn parse<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let text = String::deserialize(deserializer)?;
    text.trim().parse().map_err(|e| serde::de::Error::custom(format!("invalid value `{text}`: {e}")))
}

#[cfg(test)]
mod test {
    use relaygate_model::generate_key;
    use serde_json::json;

    use super::*;

    fn args(pairs: &[(&str, &str)]) -> Args {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(deny_unknown_fields)]
    struct Redirect {
        #[serde(deserialize_with = "parse")]
        status: u16,
        url: String,
    }

    #[test]
    fn test_positional_and_explicit() {
        let positional = args(&[(&generate_key(0), "302"), (&generate_key(1), "http://example.org")]);
        let bound: Redirect = bind(&positional, &["status", "url"], ShortcutType::Default).expect("bound");
        assert_eq!(bound, Redirect { status: 302, url: "http://example.org".into() });

        let explicit = args(&[("url", "http://example.org"), ("status", "301")]);
        let bound: Redirect = bind(&explicit, &["status", "url"], ShortcutType::Default).expect("bound");
        assert_eq!(bound.status, 301);
    }

    #[test]
    fn test_binding_errors() {
        let too_many = args(&[(&generate_key(0), "302"), (&generate_key(1), "u"), (&generate_key(2), "extra")]);
        assert!(bind::<Redirect>(&too_many, &["status", "url"], ShortcutType::Default).is_err());

        let missing = args(&[(&generate_key(0), "302")]);
        let err = bind::<Redirect>(&missing, &["status", "url"], ShortcutType::Default).expect_err("missing url");
        assert!(err.to_string().contains("url"));

        let unknown = args(&[("status", "302"), ("url", "u"), ("location", "x")]);
        assert!(bind::<Redirect>(&unknown, &["status", "url"], ShortcutType::Default).is_err());

        let invalid = args(&[("status", "moved"), ("url", "u")]);
        assert!(bind::<Redirect>(&invalid, &["status", "url"], ShortcutType::Default).is_err());
    }

    #[test]
    fn test_gather_list() {
        let values = args(&[(&generate_key(0), "GET"), (&generate_key(1), "POST")]);
        let value = normalize(&values, &["methods"], ShortcutType::GatherList).expect("normalized");
        assert_eq!(value, json!({"methods": ["GET", "POST"]}));
        assert!(normalize(&values, &["a", "b"], ShortcutType::GatherList).is_err());
    }

    #[test]
    fn test_gather_list_tail_flag() {
        let values = args(&[(&generate_key(0), "/a/**"), (&generate_key(1), "/b"), (&generate_key(2), "False")]);
        let value = normalize(&values, &["patterns", "flag"], ShortcutType::GatherListTailFlag).expect("normalized");
        assert_eq!(value, json!({"patterns": ["/a/**", "/b"], "flag": "false"}));

        let single = args(&[(&generate_key(0), "true")]);
        let value = normalize(&single, &["patterns", "flag"], ShortcutType::GatherListTailFlag).expect("normalized");
        assert_eq!(value, json!({"patterns": ["true"]}));
    }
}
