//! Supported network registry.
//!
//! Defines the Vara networks a facilitator can verify and settle payments on,
//! together with their public RPC endpoints. Anything outside this registry is
//! rejected before any chain or facilitator interaction happens.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Supported Vara networks.
///
/// Used to differentiate between testnet and mainnet environments for the x402 protocol.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Network {
    /// Vara mainnet.
    #[serde(rename = "vara")]
    Vara,
    /// Vara testnet.
    #[serde(rename = "vara-testnet")]
    VaraTestnet,
}

impl Display for Network {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Vara => write!(f, "vara"),
            Network::VaraTestnet => write!(f, "vara-testnet"),
        }
    }
}

/// Error returned when a network name is not in the supported registry.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Unsupported network: {0}")]
pub struct UnsupportedNetworkError(pub String);

impl FromStr for Network {
    type Err = UnsupportedNetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vara" => Ok(Network::Vara),
            "vara-testnet" => Ok(Network::VaraTestnet),
            other => Err(UnsupportedNetworkError(other.to_string())),
        }
    }
}

impl Network {
    /// Return all known [`Network`] variants.
    pub fn variants() -> &'static [Network] {
        &[Network::Vara, Network::VaraTestnet]
    }

    /// Public WebSocket RPC endpoint used when no override is configured.
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Network::Vara => "wss://rpc.vara.network",
            Network::VaraTestnet => "wss://testnet.vara.network",
        }
    }

    /// Decimal places of the native token in atomic units.
    pub fn decimals(&self) -> u32 {
        12
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_to_wire_names() {
        assert_eq!(
            serde_json::to_string(&Network::Vara).unwrap(),
            "\"vara\""
        );
        assert_eq!(
            serde_json::to_string(&Network::VaraTestnet).unwrap(),
            "\"vara-testnet\""
        );
    }

    #[test]
    fn parses_registry_members() {
        assert_eq!("vara".parse::<Network>().unwrap(), Network::Vara);
        assert_eq!(
            "vara-testnet".parse::<Network>().unwrap(),
            Network::VaraTestnet
        );
    }

    #[test]
    fn rejects_unknown_network() {
        let err = "unknown-chain".parse::<Network>().unwrap_err();
        assert_eq!(err.to_string(), "Unsupported network: unknown-chain");
    }

    #[test]
    fn rejects_unknown_network_in_json() {
        let result = serde_json::from_str::<Network>("\"base-sepolia\"");
        assert!(result.is_err());
    }
}
