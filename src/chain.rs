//! Chain client for Vara networks.
//!
//! Wraps a subxt client and the legacy RPC surface behind the handful of
//! operations the payment flow needs: header and nonce reads for building
//! unsigned transactions, dynamic call encoding for transfers, and extrinsic
//! submission with or without a status watch. Everything else about the chain
//! stays behind this boundary.

use subxt::backend::legacy::LegacyRpcMethods;
use subxt::backend::rpc::RpcClient;
use subxt::config::Header as _;
use subxt::dynamic::Value;
use subxt::tx::{SubmittableExtrinsic, TxProgress};
use subxt::utils::AccountId32;
use subxt::{OnlineClient, PolkadotConfig};

use crate::network::Network;
use crate::types::{Hash32, HexBalance, HexBytes, HexU32, UnsignedTransaction};

/// Signed-extension set of the Vara runtime, in declaration order. Carried
/// inside every unsigned transaction so signers and verifiers agree on the
/// extension data layout.
pub const SIGNED_EXTENSIONS: &[&str] = &[
    "CheckNonZeroSender",
    "CheckSpecVersion",
    "CheckTxVersion",
    "CheckGenesis",
    "CheckMortality",
    "CheckNonce",
    "CheckWeight",
    "ChargeTransactionPayment",
];

/// Extrinsic format version produced by the builder.
const EXTRINSIC_VERSION: u8 = 4;

/// Errors from chain interaction.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("chain rpc error: {0}")]
    Rpc(#[from] subxt::Error),
    #[error("no block header available from {0}")]
    MissingHeader(Network),
    #[error(transparent)]
    Encoding(#[from] crate::extrinsic::ExtrinsicError),
}

/// Options for building an unsigned transaction.
#[derive(Debug, Clone, Copy)]
pub struct UnsignedOptions {
    /// How many blocks the transaction stays valid for.
    pub era_period: u64,
    /// Tip in atomic units paid on top of the inclusion fee.
    pub tip: u128,
}

impl Default for UnsignedOptions {
    fn default() -> Self {
        UnsignedOptions {
            era_period: 64,
            tip: 0,
        }
    }
}

/// A connected client for one network.
pub struct ChainClient {
    network: Network,
    client: OnlineClient<PolkadotConfig>,
    rpc: LegacyRpcMethods<PolkadotConfig>,
}

impl ChainClient {
    /// Connect to `url` and fetch the runtime data the builder needs.
    pub async fn connect(network: Network, url: &str) -> Result<Self, ChainError> {
        let rpc_client = RpcClient::from_url(url).await?;
        let client = OnlineClient::<PolkadotConfig>::from_rpc_client(rpc_client.clone()).await?;
        let rpc = LegacyRpcMethods::<PolkadotConfig>::new(rpc_client);
        tracing::info!(%network, url, "connected chain client");
        Ok(ChainClient {
            network,
            client,
            rpc,
        })
    }

    /// Network this client is connected to.
    pub fn network(&self) -> Network {
        self.network
    }

    /// Genesis hash of the connected chain.
    pub fn genesis_hash(&self) -> [u8; 32] {
        self.client.genesis_hash().0
    }

    /// Number and hash of the best known block, fetched in a single call so
    /// era and nonce computations share one state snapshot.
    pub async fn latest_header(&self) -> Result<(u32, [u8; 32]), ChainError> {
        let header = self
            .rpc
            .chain_get_header(None)
            .await?
            .ok_or(ChainError::MissingHeader(self.network))?;
        let hash = header.hash();
        Ok((header.number, hash.0))
    }

    /// Next unused nonce for an account, including transactions still in the
    /// pool. A stale nonce fails at settlement, not at verification.
    pub async fn account_nonce(&self, public: [u8; 32]) -> Result<u64, ChainError> {
        let account = AccountId32(public);
        Ok(self.rpc.system_account_next_index(&account).await?)
    }

    /// SCALE call bytes of `Balances::transfer_keep_alive(dest, amount)`,
    /// encoded against the connected runtime's metadata.
    pub fn transfer_call_data(&self, dest: [u8; 32], amount: u128) -> Result<Vec<u8>, ChainError> {
        let call = subxt::dynamic::tx(
            "Balances",
            "transfer_keep_alive",
            vec![
                Value::unnamed_variant("Id", [Value::from_bytes(dest)]),
                Value::u128(amount),
            ],
        );
        Ok(self.client.tx().call_data(&call)?)
    }

    /// Build an unsigned transaction for `call_data` sent by `address`.
    ///
    /// One header fetch anchors the era, the block hash, and the block
    /// number; the nonce is read afterwards against the same chain state.
    /// Any RPC failure propagates; no partial transaction is ever returned.
    pub async fn build_unsigned(
        &self,
        address: &str,
        call_data: Vec<u8>,
        options: UnsignedOptions,
    ) -> Result<UnsignedTransaction, ChainError> {
        let public = crate::extrinsic::decode_address(address)?;
        let (block_number, block_hash) = self.latest_header().await?;
        let era = crate::era::Era::mortal(options.era_period, u64::from(block_number));
        let nonce = self.account_nonce(public).await?;
        let runtime_version = self.client.runtime_version();

        Ok(UnsignedTransaction {
            spec_version: HexU32(runtime_version.spec_version),
            transaction_version: HexU32(runtime_version.transaction_version),
            address: address.to_string(),
            block_hash: Hash32(block_hash),
            block_number: HexU32(block_number),
            era,
            genesis_hash: Hash32(self.genesis_hash()),
            method: HexBytes(call_data),
            nonce: HexU32(nonce as u32),
            signed_extensions: SIGNED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            tip: HexBalance(options.tip),
            version: EXTRINSIC_VERSION,
        })
    }

    /// Submit a signed extrinsic to the pool and return its hash. Pool
    /// acceptance is not on-chain inclusion.
    pub async fn submit(&self, extrinsic: Vec<u8>) -> Result<Hash32, ChainError> {
        let tx = SubmittableExtrinsic::from_bytes(self.client.clone(), extrinsic);
        let hash = tx.submit().await?;
        Ok(Hash32(hash.0))
    }

    /// Submit a signed extrinsic and return a status watch. Dropping the
    /// returned progress releases the underlying subscription.
    pub async fn submit_and_watch(
        &self,
        extrinsic: Vec<u8>,
    ) -> Result<TxProgress<PolkadotConfig, OnlineClient<PolkadotConfig>>, ChainError> {
        let tx = SubmittableExtrinsic::from_bytes(self.client.clone(), extrinsic);
        Ok(tx.submit_and_watch().await?)
    }
}

impl std::fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainClient")
            .field("network", &self.network)
            .finish_non_exhaustive()
    }
}
