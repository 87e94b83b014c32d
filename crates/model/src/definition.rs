use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{constants::GENERATED_KEY_PREFIX, BoxError};

/// Ordered argument map of a predicate or filter spec.
///
/// Order matters: positional (`_genkey_N`) values are bound by position.
pub type Args = IndexMap<String, String>;

/// The generated key of the `index`-th positional argument.
pub fn generate_key(index: usize) -> String {
    format!("{GENERATED_KEY_PREFIX}{index}")
}

fn parse_shorthand(text: &str) -> Result<(String, Args), BoxError> {
    let text = text.trim();
    let (name, values) = match text.split_once('=') {
        Some((name, values)) => (name.trim(), Some(values)),
        None => (text, None),
    };
    if name.is_empty() {
        return Err(format!("unable to parse definition `{text}`, it must be of the form name=value").into());
    }
    let args = values
        .into_iter()
        .flat_map(|values| values.split(','))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .enumerate()
        .map(|(index, value)| (generate_key(index), value.to_string()))
        .collect();
    Ok((name.to_string(), args))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DefinitionRepr {
    Shorthand(String),
    Full {
        name: String,
        #[serde(default)]
        args: Args,
    },
}

macro_rules! definition {
    ($(#[$meta:meta])* $ty:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
        pub struct $ty {
            /// Name of the factory, looked up in the registry.
            pub name: String,
            pub args: Args,
        }

        impl $ty {
            pub fn new(name: impl Into<String>) -> Self {
                Self { name: name.into(), args: Args::new() }
            }
            /// Add an explicit `key=value` argument.
            pub fn arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
                self.args.insert(key.into(), value.into());
                self
            }
            /// Append a positional argument.
            pub fn positional(mut self, value: impl Into<String>) -> Self {
                let key = generate_key(self.args.len());
                self.args.insert(key, value.into());
                self
            }
        }

        impl FromStr for $ty {
            type Err = BoxError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let (name, args) = parse_shorthand(s)?;
                Ok(Self { name, args })
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                match DefinitionRepr::deserialize(deserializer)? {
                    DefinitionRepr::Shorthand(text) => text.parse().map_err(serde::de::Error::custom),
                    DefinitionRepr::Full { name, args } => Ok(Self { name, args }),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.name)?;
                let mut args = self.args.iter();
                if let Some((key, value)) = args.next() {
                    write!(f, "={key}:{value}")?;
                    for (key, value) in args {
                        write!(f, ",{key}:{value}")?;
                    }
                }
                Ok(())
            }
        }
    };
}

definition! {
    /// A predicate spec: the name of a predicate factory and the arguments bound to its config.
    PredicateDefinition
}

definition! {
    /// A filter spec: the name of a filter factory and the arguments bound to its config.
    FilterDefinition
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_shorthand() {
        let def: PredicateDefinition = "path=/foo/**, /bar".parse().expect("valid shorthand");
        assert_eq!(def.name, "path");
        assert_eq!(def.args.get("_genkey_0").map(String::as_str), Some("/foo/**"));
        assert_eq!(def.args.get("_genkey_1").map(String::as_str), Some("/bar"));

        let def: FilterDefinition = "preserve-host-header".parse().expect("name only");
        assert!(def.args.is_empty());

        assert!("=foo".parse::<FilterDefinition>().is_err());
    }

    #[test]
    fn test_deserialize_both_forms() {
        let defs: Vec<FilterDefinition> = serde_json::from_str(
            r#"[
                "redirect-to=302,http://example.org",
                {"name": "add-request-header", "args": {"name": "x-a", "value": "1"}}
            ]"#,
        )
        .expect("valid definitions");
        assert_eq!(defs[0], FilterDefinition::new("redirect-to").positional("302").positional("http://example.org"));
        assert_eq!(defs[1], FilterDefinition::new("add-request-header").arg("name", "x-a").arg("value", "1"));
    }
}
