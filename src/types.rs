//! Type definitions for the x402 protocol on Vara.
//!
//! The key objects are [`PaymentRequirements`] (the challenge a resource
//! server issues inside a 402 response), [`UnsignedTransaction`] (the signer
//! payload a client builds against live chain state), [`PaymentPayload`] (the
//! base64 JSON envelope carried in the `X-PAYMENT` header), and the
//! [`VerifyResponse`]/[`SettleResponse`] results a facilitator returns.
//!
//! Wire conventions: objects serialize as camelCase JSON; integer scalars are
//! fixed-width `0x` hex strings; hashes are 32-byte `0x` hex; amounts are
//! decimal strings in atomic units. The `X-PAYMENT` and `X-PAYMENT-RESPONSE`
//! headers carry base64-encoded JSON.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as b64;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use std::fmt::{Debug, Display};
use url::Url;

use crate::era::Era;
use crate::network::Network;

/// Represents the protocol version. Currently only version 1 is supported.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum X402Version {
    /// Version `1`.
    V1,
}

impl Serialize for X402Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            X402Version::V1 => serializer.serialize_u8(1),
        }
    }
}

impl Display for X402Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            X402Version::V1 => write!(f, "1"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unsupported x402Version: {0}")]
pub struct X402VersionError(pub u8);

impl TryFrom<u8> for X402Version {
    type Error = X402VersionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(X402Version::V1),
            _ => Err(X402VersionError(value)),
        }
    }
}

impl<'de> Deserialize<'de> for X402Version {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let num = u8::deserialize(deserializer)?;
        X402Version::try_from(num).map_err(serde::de::Error::custom)
    }
}

/// Enumerates payment schemes. Only "exact" is supported, meaning the amount
/// to be transferred must match the challenge exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Exact,
}

impl Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Exact => write!(f, "exact"),
        }
    }
}

/// A `u32` scalar carried on the wire as a fixed-width hex string, e.g.
/// `"0x00000fa0"`. Used for spec version, transaction version, block number,
/// and nonce fields.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct HexU32(pub u32);

impl Debug for HexU32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HexU32(0x{:08x})", self.0)
    }
}

impl Serialize for HexU32 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{:08x}", self.0))
    }
}

impl<'de> Deserialize<'de> for HexU32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let raw = s
            .strip_prefix("0x")
            .ok_or_else(|| serde::de::Error::custom("hex scalar must be 0x-prefixed"))?;
        let value = u32::from_str_radix(raw, 16)
            .map_err(|_| serde::de::Error::custom("invalid hex scalar"))?;
        Ok(HexU32(value))
    }
}

/// A `u128` balance carried on the wire as a fixed-width hex string.
/// Used for the tip field.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct HexBalance(pub u128);

impl Debug for HexBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HexBalance(0x{:032x})", self.0)
    }
}

impl Serialize for HexBalance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{:032x}", self.0))
    }
}

impl<'de> Deserialize<'de> for HexBalance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let raw = s
            .strip_prefix("0x")
            .ok_or_else(|| serde::de::Error::custom("hex balance must be 0x-prefixed"))?;
        let value = u128::from_str_radix(raw, 16)
            .map_err(|_| serde::de::Error::custom("invalid hex balance"))?;
        Ok(HexBalance(value))
    }
}

/// A 32-byte hash encoded as a 0x-prefixed hex string with 64 hex characters.
/// Used for block hashes, the genesis hash, and transaction hashes.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Hash32(pub [u8; 32]);

impl Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash32(0x{})", hex::encode(self.0))
    }
}

impl Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Hash32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;

        static HASH_REGEX: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{64}$").expect("valid hash regex"));

        if !HASH_REGEX.is_match(&s) {
            return Err(serde::de::Error::custom("invalid 32-byte hash format"));
        }

        let bytes = hex::decode(&s[2..]).map_err(|_| serde::de::Error::custom("invalid hex"))?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("hash must be exactly 32 bytes"))?;
        Ok(Hash32(array))
    }
}

impl Serialize for Hash32 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Opaque bytes encoded as a 0x-prefixed hex string. Used for encoded call
/// data and token asset identifiers.
#[derive(Clone, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

impl Debug for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HexBytes(0x{})", hex::encode(&self.0))
    }
}

impl Display for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let raw = s
            .strip_prefix("0x")
            .ok_or_else(|| serde::de::Error::custom("hex bytes must be 0x-prefixed"))?;
        let bytes = hex::decode(raw).map_err(|_| serde::de::Error::custom("invalid hex bytes"))?;
        Ok(HexBytes(bytes))
    }
}

impl Serialize for HexBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// A chain signature as carried on the wire: hex bytes, either a bare 64-byte
/// signature or a 65/66-byte value whose first byte selects the signature
/// scheme (0x00 ed25519, 0x01 sr25519, 0x02 ecdsa).
///
/// Length is validated at decode time; which schemes actually verify is
/// decided by the verifier.
#[derive(Clone, PartialEq, Eq)]
pub struct SignatureBytes(pub Vec<u8>);

impl Debug for SignatureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureBytes(0x{})", hex::encode(&self.0))
    }
}

impl Display for SignatureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for SignatureBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let raw = s
            .strip_prefix("0x")
            .ok_or_else(|| serde::de::Error::custom("signature must be 0x-prefixed"))?;
        let bytes = hex::decode(raw).map_err(|_| serde::de::Error::custom("invalid hex"))?;
        if !(64..=66).contains(&bytes.len()) {
            return Err(serde::de::Error::custom(
                "signature must be 64 to 66 bytes long",
            ));
        }
        Ok(SignatureBytes(bytes))
    }
}

impl Serialize for SignatureBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// A precise on-chain amount in atomic units (1 VARA = 10^12 atomic units).
/// Represented as a decimal string in JSON to prevent precision loss.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct AtomicAmount(pub u128);

impl Display for AtomicAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for AtomicAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for AtomicAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let value = s
            .parse::<u128>()
            .map_err(|_| serde::de::Error::custom("amount must be a decimal integer string"))?;
        Ok(AtomicAmount(value))
    }
}

impl From<u128> for AtomicAmount {
    fn from(value: u128) -> Self {
        AtomicAmount(value)
    }
}

/// The unsigned transaction a client builds against live chain state and a
/// wallet signs. Every field participates in the canonical signing payload,
/// so mutating any of them after signing invalidates the signature.
///
/// The era and nonce must come from the same chain state snapshot; the
/// builder guarantees this by anchoring both to one fetched header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedTransaction {
    pub spec_version: HexU32,
    pub transaction_version: HexU32,
    /// Sender address: an SS58 string or a 0x-prefixed 32-byte public key.
    pub address: String,
    /// Hash of the header the era is anchored to.
    pub block_hash: Hash32,
    pub block_number: HexU32,
    pub era: Era,
    pub genesis_hash: Hash32,
    /// SCALE-encoded call bytes.
    pub method: HexBytes,
    pub nonce: HexU32,
    /// Names of the runtime's signed extensions, in declaration order.
    pub signed_extensions: Vec<String>,
    pub tip: HexBalance,
    /// Extrinsic format version. Only version 4 is understood.
    pub version: u8,
}

/// Transaction plus signature, the inner object of a [`PaymentPayload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactPaymentPayload {
    pub transaction: UnsignedTransaction,
    pub signature: SignatureBytes,
}

/// Describes a signed request to transfer funds on-chain. This is the object
/// carried base64-encoded inside the `X-PAYMENT` request header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    pub x402_version: X402Version,
    pub scheme: Scheme,
    pub network: Network,
    /// Token program identifier for asset transfers; absent for native
    /// transfers.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub asset: Option<HexBytes>,
    pub payload: ExactPaymentPayload,
}

/// Error returned when decoding a base64-encoded [`PaymentPayload`] fails.
///
/// Signals that a client-supplied `X-PAYMENT` header could not be decoded.
/// Decoding only fails for structural reasons; business-level rejections
/// happen later, in verification or settlement.
#[derive(Debug, thiserror::Error)]
pub enum PaymentPayloadB64DecodingError {
    /// The input bytes were not valid base64.
    #[error("base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
    /// The JSON structure was invalid or did not conform to [`PaymentPayload`].
    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TryFrom<Base64Bytes<'_>> for PaymentPayload {
    type Error = PaymentPayloadB64DecodingError;

    fn try_from(value: Base64Bytes<'_>) -> Result<Self, Self::Error> {
        let decoded = value.decode()?;
        serde_json::from_slice(&decoded).map_err(PaymentPayloadB64DecodingError::from)
    }
}

impl PaymentPayload {
    /// Encode to the exact string placed in the `X-PAYMENT` header.
    pub fn to_base64(&self) -> Result<Base64Bytes<'static>, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        Ok(Base64Bytes::encode(json))
    }
}

/// Requirements set by a payment-gated endpoint for an acceptable payment.
/// Regenerated for every 402 response, never cached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    pub scheme: Scheme,
    pub network: Network,
    pub max_amount_required: AtomicAmount,
    pub resource: Url,
    pub description: String,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub output_schema: Option<serde_json::Value>,
    /// Recipient address of the transfer.
    pub pay_to: String,
    pub max_timeout_seconds: u64,
    /// Token program identifier for asset transfers; absent for native
    /// transfers.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub asset: Option<HexBytes>,
    #[serde(default)]
    pub extra: Option<serde_json::Value>,
}

/// Body of an HTTP 402 response: the protocol version, the list of
/// acceptable payments, and an optional error explaining why the previous
/// attempt was rejected.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequiredResponse {
    pub x402_version: X402Version,
    pub accepts: Vec<PaymentRequirements>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

/// Result of verifying a payment payload's signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub is_valid: bool,
    #[serde(default)]
    pub invalid_reason: Option<String>,
}

impl VerifyResponse {
    /// A successful verification.
    pub fn valid() -> Self {
        VerifyResponse {
            is_valid: true,
            invalid_reason: None,
        }
    }

    /// A failed verification with the given reason.
    pub fn invalid(reason: impl Into<String>) -> Self {
        VerifyResponse {
            is_valid: false,
            invalid_reason: Some(reason.into()),
        }
    }
}

/// Result of a settlement attempt. `block_hash` is only present after the
/// transaction was observed in a finalized block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleResponse {
    pub success: bool,
    #[serde(default)]
    pub tx_hash: Option<Hash32>,
    #[serde(default)]
    pub block_hash: Option<Hash32>,
    #[serde(default)]
    pub message: Option<String>,
}

impl SettleResponse {
    /// A failed settlement with the given message.
    pub fn failure(message: impl Into<String>, tx_hash: Option<Hash32>) -> Self {
        SettleResponse {
            success: false,
            tx_hash,
            block_hash: None,
            message: Some(message.into()),
        }
    }
}

/// Error returned when encoding a [`SettleResponse`] into base64 fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to encode settle response as base64: {0}")]
pub struct SettleResponseB64EncodingError(#[from] pub serde_json::Error);

impl TryFrom<SettleResponse> for Base64Bytes<'static> {
    type Error = SettleResponseB64EncodingError;

    /// The `X-PAYMENT-RESPONSE` header always carries the settlement result
    /// as base64-encoded JSON, never a bare transaction hash.
    fn try_from(value: SettleResponse) -> Result<Self, Self::Error> {
        let json = serde_json::to_vec(&value)?;
        Ok(Base64Bytes::encode(json))
    }
}

/// A simple error structure returned on request-level failures, mirroring
/// the `{error, message}` bodies of the facilitator HTTP API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ErrorResponse {
            error: "Bad request".to_string(),
            message: message.into(),
        }
    }
}

/// One payment kind a facilitator supports: version, scheme, and network.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedPaymentKind {
    pub x402_version: X402Version,
    pub scheme: Scheme,
    pub network: Network,
}

/// Response of `GET /supported`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedResponse {
    pub kinds: Vec<SupportedPaymentKind>,
}

/// Contains bytes of the base64 encoding of some other bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base64Bytes<'a>(pub Cow<'a, [u8]>);

impl Base64Bytes<'_> {
    /// Decode base64 string bytes to the raw binary payload.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        b64.decode(&self.0)
    }

    /// Encode raw binary input into base64 string bytes.
    pub fn encode<T: AsRef<[u8]>>(input: T) -> Base64Bytes<'static> {
        let encoded = b64.encode(input.as_ref());
        Base64Bytes(Cow::Owned(encoded.into_bytes()))
    }
}

impl AsRef<[u8]> for Base64Bytes<'_> {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl<'a> From<&'a [u8]> for Base64Bytes<'a> {
    fn from(slice: &'a [u8]) -> Self {
        Base64Bytes(Cow::Borrowed(slice))
    }
}

impl Display for Base64Bytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.0.as_ref()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_transaction() -> UnsignedTransaction {
        UnsignedTransaction {
            spec_version: HexU32(1360),
            transaction_version: HexU32(1),
            address: "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY".to_string(),
            block_hash: Hash32([0xab; 32]),
            block_number: HexU32(123),
            era: Era::mortal(64, 123),
            genesis_hash: Hash32([0xcd; 32]),
            method: HexBytes(vec![0x04, 0x03, 0x00, 0x01]),
            nonce: HexU32(7),
            signed_extensions: vec![
                "CheckNonZeroSender".to_string(),
                "CheckSpecVersion".to_string(),
                "CheckTxVersion".to_string(),
                "CheckGenesis".to_string(),
                "CheckMortality".to_string(),
                "CheckNonce".to_string(),
                "CheckWeight".to_string(),
                "ChargeTransactionPayment".to_string(),
            ],
            tip: HexBalance(0),
            version: 4,
        }
    }

    pub(crate) fn sample_payload() -> PaymentPayload {
        PaymentPayload {
            x402_version: X402Version::V1,
            scheme: Scheme::Exact,
            network: Network::VaraTestnet,
            asset: None,
            payload: ExactPaymentPayload {
                transaction: sample_transaction(),
                signature: SignatureBytes(vec![0x01; 65]),
            },
        }
    }

    #[test]
    fn hex_scalars_serialize_fixed_width() {
        assert_eq!(
            serde_json::to_string(&HexU32(0xfa0)).unwrap(),
            "\"0x00000fa0\""
        );
        assert_eq!(
            serde_json::to_string(&HexBalance(5)).unwrap(),
            "\"0x00000000000000000000000000000005\""
        );
    }

    #[test]
    fn hex_scalars_accept_short_hex() {
        let v: HexU32 = serde_json::from_str("\"0x7\"").unwrap();
        assert_eq!(v.0, 7);
        let b: HexBalance = serde_json::from_str("\"0xde0b6b3a7640000\"").unwrap();
        assert_eq!(b.0, 1_000_000_000_000_000_000);
    }

    #[test]
    fn hash_requires_exact_width() {
        assert!(serde_json::from_str::<Hash32>("\"0xabcd\"").is_err());
        let json = format!("\"0x{}\"", "ab".repeat(32));
        let hash: Hash32 = serde_json::from_str(&json).unwrap();
        assert_eq!(hash, Hash32([0xab; 32]));
    }

    #[test]
    fn signature_length_is_validated() {
        let ok = format!("\"0x{}\"", "11".repeat(65));
        assert!(serde_json::from_str::<SignatureBytes>(&ok).is_ok());
        let too_short = format!("\"0x{}\"", "11".repeat(10));
        assert!(serde_json::from_str::<SignatureBytes>(&too_short).is_err());
        let too_long = format!("\"0x{}\"", "11".repeat(80));
        assert!(serde_json::from_str::<SignatureBytes>(&too_long).is_err());
    }

    #[test]
    fn atomic_amount_is_a_decimal_string() {
        let amount = AtomicAmount(100_000_000_000);
        assert_eq!(serde_json::to_string(&amount).unwrap(), "\"100000000000\"");
        let back: AtomicAmount = serde_json::from_str("\"100000000000\"").unwrap();
        assert_eq!(back, amount);
        assert!(serde_json::from_str::<AtomicAmount>("\"12.5\"").is_err());
        assert!(serde_json::from_str::<AtomicAmount>("\"-3\"").is_err());
    }

    #[test]
    fn payment_payload_round_trips_through_header_encoding() {
        let payload = sample_payload();
        let header = payload.to_base64().unwrap();
        let decoded = PaymentPayload::try_from(Base64Bytes::from(header.as_ref())).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn payload_wire_shape_is_versioned_envelope() {
        let json = serde_json::to_value(sample_payload()).unwrap();
        assert_eq!(json["x402Version"], 1);
        assert_eq!(json["scheme"], "exact");
        assert_eq!(json["network"], "vara-testnet");
        assert!(json["payload"]["transaction"]["specVersion"].is_string());
        assert!(json["payload"]["signature"].is_string());
        assert!(json.get("asset").is_none());
    }

    #[test]
    fn decoding_rejects_malformed_base64() {
        let result = PaymentPayload::try_from(Base64Bytes::from("%%%not-base64%%%".as_bytes()));
        assert!(matches!(
            result,
            Err(PaymentPayloadB64DecodingError::Base64Decode(_))
        ));
    }

    #[test]
    fn decoding_rejects_malformed_json() {
        let header = Base64Bytes::encode(b"{\"not\": \"a payload\"");
        let result = PaymentPayload::try_from(header);
        assert!(matches!(
            result,
            Err(PaymentPayloadB64DecodingError::Json(_))
        ));
    }

    #[test]
    fn decoding_rejects_unknown_network() {
        let mut json = serde_json::to_value(sample_payload()).unwrap();
        json["network"] = serde_json::Value::String("unknown-chain".to_string());
        let header = Base64Bytes::encode(serde_json::to_vec(&json).unwrap());
        let result = PaymentPayload::try_from(header);
        assert!(matches!(
            result,
            Err(PaymentPayloadB64DecodingError::Json(_))
        ));
    }

    #[test]
    fn decoding_rejects_missing_signature() {
        let mut json = serde_json::to_value(sample_payload()).unwrap();
        json["payload"]
            .as_object_mut()
            .unwrap()
            .remove("signature");
        let header = Base64Bytes::encode(serde_json::to_vec(&json).unwrap());
        assert!(PaymentPayload::try_from(header).is_err());
    }

    #[test]
    fn verify_response_wire_shape() {
        let valid = serde_json::to_value(VerifyResponse::valid()).unwrap();
        assert_eq!(valid["isValid"], true);
        assert_eq!(valid["invalidReason"], serde_json::Value::Null);

        let invalid = serde_json::to_value(VerifyResponse::invalid("bad signature")).unwrap();
        assert_eq!(invalid["isValid"], false);
        assert_eq!(invalid["invalidReason"], "bad signature");
    }

    #[test]
    fn settle_response_header_is_base64_json_envelope() {
        let response = SettleResponse {
            success: true,
            tx_hash: Some(Hash32([0x11; 32])),
            block_hash: None,
            message: None,
        };
        let header: Base64Bytes<'static> = response.clone().try_into().unwrap();
        let decoded: SettleResponse =
            serde_json::from_slice(&header.decode().unwrap()).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn payment_requirements_wire_shape() {
        let requirements = PaymentRequirements {
            scheme: Scheme::Exact,
            network: Network::VaraTestnet,
            max_amount_required: AtomicAmount(100_000_000_000),
            resource: "https://api.example.com/premium".parse().unwrap(),
            description: "Premium content".to_string(),
            mime_type: "application/json".to_string(),
            output_schema: None,
            pay_to: "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY".to_string(),
            max_timeout_seconds: 60,
            asset: None,
            extra: None,
        };
        let json = serde_json::to_value(&requirements).unwrap();
        assert_eq!(json["maxAmountRequired"], "100000000000");
        assert_eq!(json["payTo"], requirements.pay_to);
        assert_eq!(json["maxTimeoutSeconds"], 60);
        assert!(json.get("outputSchema").is_none());
        assert_eq!(json["extra"], serde_json::Value::Null);
    }
}
