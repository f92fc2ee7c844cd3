//! Wallet signing abstraction.
//!
//! Payments are signed either by an in-process sr25519 keypair or by an
//! externally injected account whose signing capability lives outside this
//! process (a browser wallet, a hardware signer, a remote agent). Both
//! variants sign the same canonical payload reduction, so the verifier never
//! needs to know which one produced a signature.

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use subxt::utils::AccountId32;
use subxt_signer::sr25519::Keypair;

use crate::extrinsic::{self, ExtrinsicError};
use crate::types::{SignatureBytes, UnsignedTransaction};

/// Errors raised while producing a payment signature.
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    /// The injected account carries no signing capability.
    #[error("no signer available for account {0}")]
    NoSigner(String),
    /// The transaction could not be reduced to its signing payload.
    #[error(transparent)]
    Encoding(#[from] ExtrinsicError),
    /// The delegated signer failed or the user rejected the request.
    #[error("delegated signing failed: {0}")]
    Delegated(String),
}

/// Signing capability of an externally injected account.
///
/// Implementations forward the whole transaction to the external signer and
/// may suspend for as long as user interaction takes.
#[async_trait]
pub trait PayloadSigner: Send + Sync {
    /// Sign the canonical payload of `tx`, returning a multi-signature
    /// (scheme byte plus raw signature) or a bare 64-byte signature.
    async fn sign_payload(&self, tx: &UnsignedTransaction) -> Result<SignatureBytes, SignerError>;
}

/// An account injected by an external wallet. The signing capability is
/// optional: enumerating accounts is possible without one, signing is not.
#[derive(Clone)]
pub struct InjectedAccount {
    /// SS58 address of the account.
    pub address: String,
    /// Delegated signing capability, when the wallet granted one.
    pub signer: Option<Arc<dyn PayloadSigner>>,
}

impl Debug for InjectedAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InjectedAccount")
            .field("address", &self.address)
            .field("signer", &self.signer.as_ref().map(|_| "<capability>"))
            .finish()
    }
}

/// A wallet that can sign payment transactions.
#[derive(Clone)]
pub enum WalletSigner {
    /// In-process sr25519 keypair. Signs synchronously with respect to the
    /// caller, no external interaction.
    Keypair(Keypair),
    /// Externally injected account. Signing is delegated and fully
    /// asynchronous; it may prompt the user for confirmation.
    Injected(InjectedAccount),
}

impl Debug for WalletSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalletSigner::Keypair(_) => f.write_str("WalletSigner::Keypair(..)"),
            WalletSigner::Injected(account) => {
                write!(f, "WalletSigner::Injected({})", account.address)
            }
        }
    }
}

impl WalletSigner {
    /// Wrap an injected account, keeping whatever signing capability it has.
    pub fn injected(address: impl Into<String>, signer: Option<Arc<dyn PayloadSigner>>) -> Self {
        WalletSigner::Injected(InjectedAccount {
            address: address.into(),
            signer,
        })
    }

    /// The address payments are sent from.
    pub fn address(&self) -> String {
        match self {
            WalletSigner::Keypair(pair) => AccountId32(pair.public_key().0).to_string(),
            WalletSigner::Injected(account) => account.address.clone(),
        }
    }

    /// Sign the canonical payload of `tx`.
    ///
    /// The keypair variant reduces the transaction locally and signs it with
    /// sr25519. The injected variant forwards the transaction to the
    /// delegated capability and fails with [`SignerError::NoSigner`] when the
    /// wallet granted none.
    pub async fn sign(&self, tx: &UnsignedTransaction) -> Result<SignatureBytes, SignerError> {
        match self {
            WalletSigner::Keypair(pair) => {
                let message = extrinsic::hash_or_raw(extrinsic::signing_payload(tx)?);
                let signature = pair.sign(&message);
                let mut bytes = Vec::with_capacity(65);
                bytes.push(0x01);
                bytes.extend_from_slice(&signature.0);
                Ok(SignatureBytes(bytes))
            }
            WalletSigner::Injected(account) => {
                let signer = account
                    .signer
                    .as_ref()
                    .ok_or_else(|| SignerError::NoSigner(account.address.clone()))?;
                signer.sign_payload(tx).await
            }
        }
    }
}

impl From<Keypair> for WalletSigner {
    fn from(pair: Keypair) -> Self {
        WalletSigner::Keypair(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extrinsic::verify_signature;

    fn alice_transaction() -> UnsignedTransaction {
        let mut tx = crate::types::tests::sample_transaction();
        let alice = subxt_signer::sr25519::dev::alice();
        tx.address = AccountId32(alice.public_key().0).to_string();
        tx
    }

    #[tokio::test]
    async fn keypair_signature_is_verifier_compatible() {
        let signer = WalletSigner::from(subxt_signer::sr25519::dev::alice());
        let tx = alice_transaction();
        let signature = signer.sign(&tx).await.unwrap();
        assert_eq!(signature.0.len(), 65);
        assert_eq!(signature.0[0], 0x01);
        assert!(verify_signature(&tx, &signature).unwrap());
    }

    #[tokio::test]
    async fn keypair_address_is_ss58() {
        let signer = WalletSigner::from(subxt_signer::sr25519::dev::alice());
        let address = signer.address();
        assert!(extrinsic::decode_address(&address).is_ok());
    }

    #[tokio::test]
    async fn injected_account_without_capability_cannot_sign() {
        let signer = WalletSigner::injected("5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY", None);
        let tx = alice_transaction();
        let err = signer.sign(&tx).await.unwrap_err();
        assert!(matches!(err, SignerError::NoSigner(_)));
        assert!(err.to_string().contains("no signer available"));
    }

    #[tokio::test]
    async fn injected_account_delegates_to_capability() {
        struct FixedSigner(SignatureBytes);

        #[async_trait]
        impl PayloadSigner for FixedSigner {
            async fn sign_payload(
                &self,
                _tx: &UnsignedTransaction,
            ) -> Result<SignatureBytes, SignerError> {
                Ok(self.0.clone())
            }
        }

        let canned = SignatureBytes(vec![0x01; 65]);
        let signer = WalletSigner::injected(
            "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY",
            Some(Arc::new(FixedSigner(canned.clone()))),
        );
        let tx = alice_transaction();
        assert_eq!(signer.sign(&tx).await.unwrap(), canned);
    }
}
