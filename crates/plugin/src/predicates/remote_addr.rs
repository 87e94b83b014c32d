use std::net::IpAddr;

use ipnet::IpNet;
use relaygate_kernel::Exchange;
use serde::Deserialize;

use crate::{BoxError, PredicateFactory, RoutePredicate, ShortcutType};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteAddrConfig {
    pub sources: Vec<String>,
}

/// Holds when the peer address is in one of the networks. A plain ip is a single host network.
#[derive(Debug, Clone)]
pub struct RemoteAddrPredicate {
    pub sources: Vec<IpNet>,
}

impl RoutePredicate for RemoteAddrPredicate {
    async fn test(&self, exchange: &Exchange) -> Result<bool, BoxError> {
        let Some(peer) = exchange.peer_addr() else {
            tracing::debug!("[Rg.Predicate.RemoteAddr] no peer address");
            return Ok(false);
        };
        let ip = peer.ip().to_canonical();
        Ok(self.sources.iter().any(|net| net.contains(&ip)))
    }
}

impl PredicateFactory for RemoteAddrPredicate {
    const NAME: &'static str = "remote-addr";
    const SHORTCUT_FIELDS: &'static [&'static str] = &["sources"];
    const SHORTCUT_TYPE: ShortcutType = ShortcutType::GatherList;
    type Config = RemoteAddrConfig;
    fn create(config: RemoteAddrConfig) -> Result<Self, BoxError> {
        let nets: Vec<IpNet> = config
            .sources
            .iter()
            .map(|source| {
                let source = source.trim();
                source.parse::<IpNet>().or_else(|_| source.parse::<IpAddr>().map(IpNet::from)).map_err(|e| format!("invalid source `{source}`: {e}"))
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { sources: IpNet::aggregate(&nets) })
    }
}
