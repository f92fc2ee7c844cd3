//! Facilitator implementation backed by a live chain connection.
//!
//! Verification is purely cryptographic: the canonical payload is re-encoded
//! from the submitted transaction and checked against the claimed sender.
//! Amount sufficiency or nonce freshness are not checked here; the chain
//! itself is the authority on those at settlement time.
//!
//! Settlement reattaches the signature to the call, submits the extrinsic,
//! and either reports pool acceptance immediately or watches the submission
//! until its block is finalized, classifying the terminal system event.

use std::sync::Arc;
use std::time::Duration;
use subxt::error::DispatchError;
use tracing::instrument;

use crate::chain::ChainError;
use crate::extrinsic::{self, ExtrinsicError};
use crate::facilitator::Facilitator;
use crate::network::Network;
use crate::provider_cache::ChainClientCache;
use crate::types::{
    Hash32, PaymentPayload, Scheme, SettleResponse, SupportedPaymentKind, SupportedResponse,
    VerifyResponse, X402Version,
};

/// Reason string reported for a cryptographically invalid signature.
const BAD_SIGNATURE: &str = "bad signature";

/// Errors that abort a verification or settlement attempt.
///
/// These map to request-level HTTP failures: a malformed transaction is a
/// 400-class problem, an unreachable chain a 502-class one. Chain-level
/// payment rejections never appear here; they are carried inside
/// [`SettleResponse`].
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// The transaction could not be re-encoded for checking or submission.
    #[error("malformed transaction: {0}")]
    MalformedTransaction(#[from] ExtrinsicError),
    /// The chain client could not be reached or created.
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Settlement behavior of a [`FacilitatorLocal`].
#[derive(Debug, Clone, Copy)]
pub struct SettleOptions {
    /// When false, report pool acceptance and return immediately. When true,
    /// watch the submission until its block is finalized.
    pub wait_for_finalization: bool,
    /// Upper bound on the finalization watch. On expiry the watch is torn
    /// down and the settlement reported as failed.
    pub timeout: Duration,
}

impl Default for SettleOptions {
    fn default() -> Self {
        SettleOptions {
            wait_for_finalization: false,
            timeout: Duration::from_secs(60),
        }
    }
}

/// [`Facilitator`] that verifies and settles payments against chain clients
/// from a shared [`ChainClientCache`].
#[derive(Clone, Debug)]
pub struct FacilitatorLocal {
    clients: Arc<ChainClientCache>,
    options: SettleOptions,
}

impl FacilitatorLocal {
    pub fn new(clients: Arc<ChainClientCache>, options: SettleOptions) -> Self {
        FacilitatorLocal { clients, options }
    }

    /// The connection cache this facilitator settles through.
    pub fn clients(&self) -> &Arc<ChainClientCache> {
        &self.clients
    }
}

impl Facilitator for FacilitatorLocal {
    type Error = PaymentError;

    /// Check the payment signature against the claimed sender.
    ///
    /// Valid yields `isValid: true`; a cryptographic mismatch yields
    /// `isValid: false` with reason `"bad signature"`. A transaction too
    /// malformed to re-encode is a [`PaymentError::MalformedTransaction`].
    #[instrument(skip_all, fields(network = %payload.network))]
    async fn verify(&self, payload: &PaymentPayload) -> Result<VerifyResponse, PaymentError> {
        let transaction = &payload.payload.transaction;
        let valid = extrinsic::verify_signature(transaction, &payload.payload.signature)?;
        if valid {
            Ok(VerifyResponse::valid())
        } else {
            tracing::warn!(sender = %transaction.address, "payment signature rejected");
            Ok(VerifyResponse::invalid(BAD_SIGNATURE))
        }
    }

    /// Submit the signed transaction and classify the outcome.
    ///
    /// The signature is re-checked first so an unverified payload can never
    /// reach the chain through this path. Exactly one terminal
    /// [`SettleResponse`] is produced per call, and the finalization watch is
    /// released on every exit path.
    #[instrument(skip_all, fields(network = %payload.network, wait = self.options.wait_for_finalization))]
    async fn settle(&self, payload: &PaymentPayload) -> Result<SettleResponse, PaymentError> {
        let transaction = &payload.payload.transaction;
        let valid = extrinsic::verify_signature(transaction, &payload.payload.signature)?;
        if !valid {
            return Ok(SettleResponse::failure(BAD_SIGNATURE, None));
        }

        let extrinsic_bytes = extrinsic::signed_extrinsic(transaction, &payload.payload.signature)?;
        let tx_hash = Hash32(extrinsic::extrinsic_hash(&extrinsic_bytes));
        let chain = self.clients.by_network(payload.network).await?;

        if !self.options.wait_for_finalization {
            return match chain.submit(extrinsic_bytes).await {
                Ok(hash) => {
                    tracing::info!(tx = %hash, "extrinsic accepted into pool");
                    Ok(SettleResponse {
                        success: true,
                        tx_hash: Some(hash),
                        block_hash: None,
                        message: None,
                    })
                }
                Err(err) => Ok(self.submission_failure(payload.network, tx_hash, err)),
            };
        }

        let progress = match chain.submit_and_watch(extrinsic_bytes).await {
            Ok(progress) => progress,
            Err(err) => return Ok(self.submission_failure(payload.network, tx_hash, err)),
        };

        match tokio::time::timeout(self.options.timeout, progress.wait_for_finalized()).await {
            // Dropping the expired watch releases its status subscription.
            Err(_elapsed) => {
                tracing::warn!(tx = %tx_hash, "finalization watch timed out");
                Ok(SettleResponse::failure(
                    format!(
                        "finalization not observed within {}s",
                        self.options.timeout.as_secs()
                    ),
                    Some(tx_hash),
                ))
            }
            Ok(Err(err)) => Ok(self.submission_failure(
                payload.network,
                tx_hash,
                ChainError::Rpc(err),
            )),
            Ok(Ok(in_block)) => {
                let block_hash = Hash32(in_block.block_hash().0);
                match in_block.wait_for_success().await {
                    Ok(_events) => {
                        tracing::info!(tx = %tx_hash, block = %block_hash, "extrinsic finalized");
                        Ok(SettleResponse {
                            success: true,
                            tx_hash: Some(tx_hash),
                            block_hash: Some(block_hash),
                            message: Some("extrinsic executed successfully".to_string()),
                        })
                    }
                    Err(err) => {
                        let message = dispatch_failure_message(&err);
                        tracing::warn!(tx = %tx_hash, block = %block_hash, %message, "extrinsic failed on-chain");
                        Ok(SettleResponse {
                            success: false,
                            tx_hash: Some(tx_hash),
                            block_hash: Some(block_hash),
                            message: Some(message),
                        })
                    }
                }
            }
        }
    }

    async fn supported(&self) -> Result<SupportedResponse, PaymentError> {
        let kinds = Network::variants()
            .iter()
            .map(|network| SupportedPaymentKind {
                x402_version: X402Version::V1,
                scheme: Scheme::Exact,
                network: *network,
            })
            .collect();
        Ok(SupportedResponse { kinds })
    }
}

impl FacilitatorLocal {
    /// Fold a submission-layer rejection into a failed settlement. The
    /// cached connection is dropped so a broken socket heals on the next
    /// attempt; pool rejections merely pay one cheap reconnect.
    fn submission_failure(
        &self,
        network: Network,
        tx_hash: Hash32,
        err: ChainError,
    ) -> SettleResponse {
        tracing::warn!(tx = %tx_hash, error = %err, "extrinsic submission rejected");
        self.clients.invalidate(network);
        SettleResponse::failure(err.to_string(), Some(tx_hash))
    }
}

/// Human-readable reason for an on-chain dispatch failure, decoded with
/// precedence: module error, then token error, then a generic rendering.
fn dispatch_failure_message(err: &subxt::Error) -> String {
    match err {
        subxt::Error::Runtime(DispatchError::Module(module_error)) => {
            format!("module error: {module_error:?}")
        }
        subxt::Error::Runtime(DispatchError::Token(token_error)) => {
            format!("token error: {token_error:?}")
        }
        other => format!("dispatch error: {other}"),
    }
}
