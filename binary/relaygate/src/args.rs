use std::{path::PathBuf, str::FromStr};

use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub enum Config {
    File(PathBuf),
}

impl FromStr for Config {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some((kind, resource)) = s.split_once(':') {
            match kind {
                "file" => Ok(Config::File(PathBuf::from(resource))),
                _ => Err(format!("unknown config backend kind: {}", kind)),
            }
        } else {
            Err("missing config backend kind".to_string())
        }
    }
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Config::File(path) => write!(f, "file:{}", path.display()),
        }
    }
}

impl Serialize for Config {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Config {
    fn deserialize<D>(deserializer: D) -> Result<Config, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Config::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Relaygate start up arguments
#[derive(Debug, Serialize, Deserialize, Clone, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The config source
    ///
    /// # Example
    /// ## File
    /// `-c file:/path/to/relaygate.toml`, a `.json` file is read as json
    #[arg(short, long, env = "RELAYGATE_CONFIG")]
    pub config: Config,
    /// Size of the worker pool, overrides `server.worker_threads` of the config
    #[arg(short, long, env = "RELAYGATE_WORKER_THREADS")]
    pub worker_threads: Option<usize>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_args() {
        let args = Args::try_parse_from(["relaygate", "-c", "file:conf/relaygate.toml", "-w", "2"]).expect("valid args");
        assert!(matches!(args.config, Config::File(ref path) if path == &PathBuf::from("conf/relaygate.toml")));
        assert_eq!(args.worker_threads, Some(2));
        assert!(Args::try_parse_from(["relaygate", "-c", "redis:localhost"]).is_err());
        assert!(Args::try_parse_from(["relaygate", "-c", "relaygate.toml"]).is_err());
    }
}
