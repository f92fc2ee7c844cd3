//! Canonical extrinsic encoding and signature checking.
//!
//! Both the signer and the verifier reduce an [`UnsignedTransaction`] to the
//! same byte string: the SCALE call bytes followed by the explicit and
//! implicit signed-extension data, hashed with blake2-256 when longer than
//! 256 bytes. The chain verifies extrinsics against exactly this reduction,
//! so the verifier must reproduce it bit for bit; checking the raw bytes of
//! an oversized payload always fails.
//!
//! Extension layout handled here, in runtime declaration order:
//! CheckNonZeroSender, CheckSpecVersion, CheckTxVersion, CheckGenesis,
//! CheckMortality (era), CheckNonce (compact), CheckWeight,
//! ChargeTransactionPayment (compact tip), and optionally CheckMetadataHash
//! (mode byte plus implicit `None`) when the transaction lists it.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use codec::{Compact, Encode};
use std::str::FromStr;
use subxt::utils::AccountId32;

use crate::types::{SignatureBytes, UnsignedTransaction};

/// Extrinsic format version this implementation understands.
const EXTRINSIC_VERSION: u8 = 4;

/// Payloads longer than this are hashed before signing, mirroring the
/// chain-side rule for oversized signing payloads.
const SIGNING_PAYLOAD_HASH_THRESHOLD: usize = 256;

type Blake2b256 = Blake2b<U32>;

/// Errors raised while encoding or checking an extrinsic. These indicate a
/// malformed transaction, which callers surface as a request error rather
/// than a signature failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExtrinsicError {
    #[error("invalid sender address: {0}")]
    InvalidAddress(String),
    #[error("unsupported signature encoding of {0} bytes")]
    SignatureLength(usize),
    #[error("unsupported extrinsic format version {0}")]
    UnsupportedVersion(u8),
}

/// blake2-256 of `data`, the hash the chain derives transaction ids with.
pub fn blake2_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Resolve a sender address to its 32-byte public key.
///
/// Accepts an SS58 string of any network prefix, or a raw 0x-prefixed
/// 32-byte hex public key.
pub fn decode_address(address: &str) -> Result<[u8; 32], ExtrinsicError> {
    if let Some(raw) = address.strip_prefix("0x") {
        let bytes =
            hex::decode(raw).map_err(|_| ExtrinsicError::InvalidAddress(address.to_string()))?;
        bytes
            .try_into()
            .map_err(|_| ExtrinsicError::InvalidAddress(address.to_string()))
    } else {
        let account = AccountId32::from_str(address)
            .map_err(|_| ExtrinsicError::InvalidAddress(address.to_string()))?;
        Ok(account.0)
    }
}

fn has_metadata_hash_extension(tx: &UnsignedTransaction) -> bool {
    tx.signed_extensions
        .iter()
        .any(|name| name == "CheckMetadataHash")
}

/// The canonical signing payload of a transaction: call bytes, explicit
/// extension data, then the implicit data every signer commits to.
pub fn signing_payload(tx: &UnsignedTransaction) -> Result<Vec<u8>, ExtrinsicError> {
    if tx.version != EXTRINSIC_VERSION {
        return Err(ExtrinsicError::UnsupportedVersion(tx.version));
    }
    let metadata_hash = has_metadata_hash_extension(tx);

    let mut payload = tx.method.0.clone();
    // Explicit extension data.
    payload.extend_from_slice(&tx.era.encode());
    Compact(u64::from(tx.nonce.0)).encode_to(&mut payload);
    Compact(tx.tip.0).encode_to(&mut payload);
    if metadata_hash {
        // CheckMetadataHash mode byte, disabled.
        payload.push(0x00);
    }
    // Implicit extension data.
    tx.spec_version.0.encode_to(&mut payload);
    tx.transaction_version.0.encode_to(&mut payload);
    payload.extend_from_slice(&tx.genesis_hash.0);
    payload.extend_from_slice(&tx.block_hash.0);
    if metadata_hash {
        // Option<Hash>, None while the mode byte is disabled.
        payload.push(0x00);
    }
    Ok(payload)
}

/// Hash the payload when it exceeds the signing threshold, otherwise pass it
/// through untouched.
pub fn hash_or_raw(payload: Vec<u8>) -> Vec<u8> {
    if payload.len() > SIGNING_PAYLOAD_HASH_THRESHOLD {
        blake2_256(&payload).to_vec()
    } else {
        payload
    }
}

fn verify_sr25519(signature: &[u8], message: &[u8], public: &[u8; 32]) -> bool {
    let Ok(raw) = <[u8; 64]>::try_from(signature) else {
        return false;
    };
    subxt_signer::sr25519::verify(
        &subxt_signer::sr25519::Signature(raw),
        message,
        &subxt_signer::sr25519::PublicKey(*public),
    )
}

fn verify_ed25519(signature: &[u8], message: &[u8], public: &[u8; 32]) -> bool {
    let Ok(raw) = <[u8; 64]>::try_from(signature) else {
        return false;
    };
    let Ok(key) = ed25519_dalek::VerifyingKey::from_bytes(public) else {
        return false;
    };
    let signature = ed25519_dalek::Signature::from_bytes(&raw);
    ed25519_dalek::Verifier::verify(&key, message, &signature).is_ok()
}

/// Check a payment signature against the transaction's claimed sender.
///
/// Prefixed signatures dispatch on their scheme byte; bare 64-byte
/// signatures are tried against both 32-byte-key schemes, matching how the
/// chain's own multi-signature verification behaves. An unknown scheme byte
/// is reported as an invalid signature, not an error.
///
/// Returns `Ok(false)` for a cryptographic mismatch; `Err` is reserved for a
/// transaction too malformed to re-encode.
pub fn verify_signature(
    tx: &UnsignedTransaction,
    signature: &SignatureBytes,
) -> Result<bool, ExtrinsicError> {
    let signer = decode_address(&tx.address)?;
    let message = hash_or_raw(signing_payload(tx)?);
    let valid = match signature.0.as_slice() {
        [0x00, rest @ ..] if rest.len() == 64 => verify_ed25519(rest, &message, &signer),
        [0x01, rest @ ..] if rest.len() == 64 => verify_sr25519(rest, &message, &signer),
        raw if raw.len() == 64 => {
            verify_sr25519(raw, &message, &signer) || verify_ed25519(raw, &message, &signer)
        }
        _ => false,
    };
    Ok(valid)
}

/// Reassemble the submittable signed extrinsic from a transaction and its
/// signature: length-prefixed version byte, sender, multi-signature, explicit
/// extension data, and the call.
pub fn signed_extrinsic(
    tx: &UnsignedTransaction,
    signature: &SignatureBytes,
) -> Result<Vec<u8>, ExtrinsicError> {
    if tx.version != EXTRINSIC_VERSION {
        return Err(ExtrinsicError::UnsupportedVersion(tx.version));
    }
    let signer = decode_address(&tx.address)?;
    let multi_signature: Vec<u8> = match signature.0.len() {
        // Already carries its scheme byte.
        65 | 66 => signature.0.clone(),
        // Bare signature: sr25519 is the chain's default scheme.
        64 => {
            let mut bytes = Vec::with_capacity(65);
            bytes.push(0x01);
            bytes.extend_from_slice(&signature.0);
            bytes
        }
        n => return Err(ExtrinsicError::SignatureLength(n)),
    };

    let mut body = Vec::new();
    // Signed flag plus format version.
    body.push(0b1000_0000 | tx.version);
    // MultiAddress::Id
    body.push(0x00);
    body.extend_from_slice(&signer);
    body.extend_from_slice(&multi_signature);
    body.extend_from_slice(&tx.era.encode());
    Compact(u64::from(tx.nonce.0)).encode_to(&mut body);
    Compact(tx.tip.0).encode_to(&mut body);
    if has_metadata_hash_extension(tx) {
        body.push(0x00);
    }
    body.extend_from_slice(&tx.method.0);

    let mut extrinsic = Vec::with_capacity(body.len() + 4);
    Compact(body.len() as u32).encode_to(&mut extrinsic);
    extrinsic.extend_from_slice(&body);
    Ok(extrinsic)
}

/// Transaction id of a submittable extrinsic.
pub fn extrinsic_hash(extrinsic: &[u8]) -> [u8; 32] {
    blake2_256(extrinsic)
}
