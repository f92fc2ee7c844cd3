//! Chain client cache keyed by network.
//!
//! One long-lived [`ChainClient`] per network, shared across concurrent
//! requests; reads and submissions are independent per request, so sharing is
//! safe. Connections are established lazily on first use and re-established
//! on demand after [`ChainClientCache::invalidate`] drops a handle observed
//! disconnected.
//!
//! Environment variables:
//! - `RPC_URL_VARA` — endpoint override for Vara mainnet,
//! - `RPC_URL_VARA_TESTNET` — endpoint override for Vara testnet.
//!
//! Without overrides, the public endpoints from [`Network::default_rpc_url`]
//! are used.

use dashmap::DashMap;
use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use crate::chain::{ChainClient, ChainError};
use crate::network::Network;

const ENV_RPC_VARA: &str = "RPC_URL_VARA";
const ENV_RPC_VARA_TESTNET: &str = "RPC_URL_VARA_TESTNET";

/// Lazily connected [`ChainClient`] instances keyed by network.
#[derive(Debug)]
pub struct ChainClientCache {
    endpoints: HashMap<Network, String>,
    clients: DashMap<Network, Arc<ChainClient>>,
}

impl ChainClientCache {
    /// Build a cache with the given endpoint per network. Networks missing
    /// from `endpoints` fall back to their public endpoint.
    pub fn new(endpoints: HashMap<Network, String>) -> Self {
        let endpoints = Network::variants()
            .iter()
            .map(|network| {
                let url = endpoints
                    .get(network)
                    .cloned()
                    .unwrap_or_else(|| network.default_rpc_url().to_string());
                (*network, url)
            })
            .collect();
        ChainClientCache {
            endpoints,
            clients: DashMap::new(),
        }
    }

    /// Build a cache from `RPC_URL_*` environment overrides.
    pub fn from_env() -> Self {
        let mut endpoints = HashMap::new();
        for network in Network::variants() {
            let env_var = match network {
                Network::Vara => ENV_RPC_VARA,
                Network::VaraTestnet => ENV_RPC_VARA_TESTNET,
            };
            match env::var(env_var) {
                Ok(url) => {
                    tracing::info!(%network, url, "using configured rpc endpoint");
                    endpoints.insert(*network, url);
                }
                Err(_) => {
                    tracing::debug!(
                        %network,
                        url = network.default_rpc_url(),
                        "using default rpc endpoint"
                    );
                }
            }
        }
        Self::new(endpoints)
    }

    /// Configured endpoint for a network.
    pub fn endpoint(&self, network: Network) -> &str {
        self.endpoints
            .get(&network)
            .map(String::as_str)
            .unwrap_or_else(|| network.default_rpc_url())
    }

    /// The connected client for `network`, connecting on first use.
    pub async fn by_network(&self, network: Network) -> Result<Arc<ChainClient>, ChainError> {
        if let Some(client) = self.clients.get(&network) {
            return Ok(Arc::clone(&client));
        }
        let client = Arc::new(ChainClient::connect(network, self.endpoint(network)).await?);
        // Two concurrent first uses may both connect; the later insert wins
        // and the spare handle is dropped with its caller.
        self.clients.insert(network, client.clone());
        Ok(client)
    }

    /// Drop the cached handle for `network` so the next use reconnects.
    pub fn invalidate(&self, network: Network) {
        if self.clients.remove(&network).is_some() {
            tracing::warn!(%network, "dropped chain client, will reconnect on demand");
        }
    }
}

impl Default for ChainClientCache {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_network_has_an_endpoint() {
        let cache = ChainClientCache::default();
        for network in Network::variants() {
            assert!(cache.endpoint(*network).starts_with("wss://"));
        }
    }

    #[test]
    fn explicit_endpoint_overrides_default() {
        let mut endpoints = HashMap::new();
        endpoints.insert(Network::VaraTestnet, "ws://localhost:9944".to_string());
        let cache = ChainClientCache::new(endpoints);
        assert_eq!(cache.endpoint(Network::VaraTestnet), "ws://localhost:9944");
        assert_eq!(
            cache.endpoint(Network::Vara),
            Network::Vara.default_rpc_url()
        );
    }

    #[test]
    fn invalidate_is_a_noop_without_connection() {
        let cache = ChainClientCache::default();
        cache.invalidate(Network::Vara);
    }
}
