//! Core trait defining the verification and settlement interface of x402
//! facilitators.
//!
//! Implementors validate incoming payment payloads ([`Facilitator::verify`])
//! and execute on-chain transfers ([`Facilitator::settle`]). For one payment
//! attempt, verification must complete successfully before settlement is
//! attempted; settling an unverified payload is a protocol violation.

use std::fmt::{Debug, Display};
use std::sync::Arc;

use crate::types::{PaymentPayload, SettleResponse, SupportedResponse, VerifyResponse};

/// Asynchronous interface of x402 payment facilitators.
pub trait Facilitator {
    /// The error type returned by this facilitator.
    type Error: Debug + Display;

    /// Verify that a payment payload's signature is valid for its claimed
    /// sender and transaction content.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] when the payload is too malformed to check or
    /// the facilitator is unreachable. A cryptographically invalid signature
    /// is not an error; it is reported inside the [`VerifyResponse`].
    fn verify(
        &self,
        payload: &PaymentPayload,
    ) -> impl Future<Output = Result<VerifyResponse, Self::Error>> + Send;

    /// Submit the signed transaction for settlement and classify the
    /// outcome.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] for malformed payloads and transport
    /// failures. Chain-level rejections (stale nonce, pool validation,
    /// dispatch failures) are reported inside the [`SettleResponse`].
    fn settle(
        &self,
        payload: &PaymentPayload,
    ) -> impl Future<Output = Result<SettleResponse, Self::Error>> + Send;

    /// The payment kinds this facilitator can process.
    fn supported(&self) -> impl Future<Output = Result<SupportedResponse, Self::Error>> + Send;
}

impl<T: Facilitator> Facilitator for Arc<T> {
    type Error = T::Error;

    fn verify(
        &self,
        payload: &PaymentPayload,
    ) -> impl Future<Output = Result<VerifyResponse, Self::Error>> + Send {
        self.as_ref().verify(payload)
    }

    fn settle(
        &self,
        payload: &PaymentPayload,
    ) -> impl Future<Output = Result<SettleResponse, Self::Error>> + Send {
        self.as_ref().settle(payload)
    }

    fn supported(&self) -> impl Future<Output = Result<SupportedResponse, Self::Error>> + Send {
        self.as_ref().supported()
    }
}
