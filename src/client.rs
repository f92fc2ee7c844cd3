//! Paying HTTP client.
//!
//! Wraps a reqwest client with the buyer side of the protocol: send the
//! request, and when the server answers `402 Payment Required`, build a
//! transfer matching the first acceptable payment, sign it with the
//! configured wallet, and resend the request with the `X-PAYMENT` header
//! attached.
//!
//! Native-token challenges are handled end to end. For token-asset
//! challenges the transfer call depends on the token program, so callers
//! construct the call bytes themselves and use
//! [`X402Client::payment_header_for_call`].

use reqwest::header::HeaderValue;
use reqwest::{Request, Response, StatusCode};
use std::sync::Arc;
use tracing::instrument;

use crate::chain::{ChainError, UnsignedOptions};
use crate::extrinsic::{self, ExtrinsicError};
use crate::provider_cache::ChainClientCache;
use crate::signer::{SignerError, WalletSigner};
use crate::types::{
    ExactPaymentPayload, PaymentPayload, PaymentRequiredResponse, PaymentRequirements, Scheme,
    X402Version,
};

/// Errors that can occur while constructing or applying a payment.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),
    /// The 402 response listed nothing to pay.
    #[error("402 response carried no payment requirements")]
    NoPaymentRequirements,
    /// The original request could not be cloned for a retry, which happens
    /// with streaming bodies.
    #[error("request is not cloneable; streaming bodies cannot be retried")]
    RequestNotCloneable,
    /// The challenge asks for a token asset; build the call yourself and use
    /// [`X402Client::payment_header_for_call`].
    #[error("token asset transfers need a caller-provided call")]
    UnsupportedAsset,
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Address(#[from] ExtrinsicError),
    #[error(transparent)]
    Signer(#[from] SignerError),
    #[error("failed to encode payment payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to place payment header: {0}")]
    HeaderValue(#[from] http::header::InvalidHeaderValue),
}

/// An HTTP client that pays x402 challenges with the configured wallet.
#[derive(Clone, Debug)]
pub struct X402Client {
    http: reqwest::Client,
    signer: Arc<WalletSigner>,
    clients: Arc<ChainClientCache>,
    options: UnsignedOptions,
}

impl X402Client {
    pub fn new(signer: WalletSigner, clients: Arc<ChainClientCache>) -> Self {
        X402Client {
            http: reqwest::Client::new(),
            signer: Arc::new(signer),
            clients,
            options: UnsignedOptions::default(),
        }
    }

    /// Use a preconfigured reqwest client, e.g. with custom timeouts.
    pub fn with_http(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Override era period and tip for built transactions.
    pub fn with_options(mut self, options: UnsignedOptions) -> Self {
        self.options = options;
        self
    }

    /// `GET` a resource, transparently paying one 402 challenge.
    pub async fn get(&self, url: impl reqwest::IntoUrl) -> Result<Response, ClientError> {
        let request = self.http.get(url).build()?;
        self.send(request).await
    }

    /// Send a request, transparently paying one 402 challenge.
    ///
    /// Anything other than a 402 response passes through untouched. A second
    /// 402, for example when the payment was rejected, is returned to the
    /// caller rather than retried; each unsigned transaction is single-use.
    #[instrument(skip_all, fields(url = %request.url()))]
    pub async fn send(&self, request: Request) -> Result<Response, ClientError> {
        let retry = request
            .try_clone()
            .ok_or(ClientError::RequestNotCloneable)?;
        let response = self.http.execute(request).await?;
        if response.status() != StatusCode::PAYMENT_REQUIRED {
            return Ok(response);
        }

        let challenge: PaymentRequiredResponse = response.json().await?;
        let requirements = challenge
            .accepts
            .first()
            .ok_or(ClientError::NoPaymentRequirements)?;
        tracing::debug!(
            network = %requirements.network,
            amount = %requirements.max_amount_required,
            "paying 402 challenge"
        );

        let header = self.payment_header(requirements).await?;
        let mut retry = retry;
        retry
            .headers_mut()
            .insert("X-PAYMENT", HeaderValue::from_str(&header)?);
        Ok(self.http.execute(retry).await?)
    }

    /// Build, sign, and encode the payment for a native-token challenge,
    /// returning the exact `X-PAYMENT` header value.
    pub async fn payment_header(
        &self,
        requirements: &PaymentRequirements,
    ) -> Result<String, ClientError> {
        if requirements.asset.is_some() {
            return Err(ClientError::UnsupportedAsset);
        }
        let chain = self.clients.by_network(requirements.network).await?;
        let dest = extrinsic::decode_address(&requirements.pay_to)?;
        let call_data = chain.transfer_call_data(dest, requirements.max_amount_required.0)?;
        self.payment_header_for_call(requirements, call_data).await
    }

    /// Like [`X402Client::payment_header`], but with caller-provided call
    /// bytes, e.g. a token program transfer.
    pub async fn payment_header_for_call(
        &self,
        requirements: &PaymentRequirements,
        call_data: Vec<u8>,
    ) -> Result<String, ClientError> {
        let chain = self.clients.by_network(requirements.network).await?;
        let transaction = chain
            .build_unsigned(&self.signer.address(), call_data, self.options)
            .await?;
        let signature = self.signer.sign(&transaction).await?;
        let payload = PaymentPayload {
            x402_version: X402Version::V1,
            scheme: Scheme::Exact,
            network: requirements.network,
            asset: requirements.asset.clone(),
            payload: ExactPaymentPayload {
                transaction,
                signature,
            },
        };
        Ok(payload.to_base64()?.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Network;
    use crate::types::AtomicAmount;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> X402Client {
        X402Client::new(
            WalletSigner::from(subxt_signer::sr25519::dev::alice()),
            Arc::new(ChainClientCache::default()),
        )
    }

    #[tokio::test]
    async fn non_402_responses_pass_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/open"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .expect(1)
            .mount(&server)
            .await;

        let response = client()
            .get(format!("{}/open", server.uri()))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn empty_challenge_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/premium"))
            .respond_with(ResponseTemplate::new(402).set_body_json(serde_json::json!({
                "x402Version": 1,
                "accepts": [],
            })))
            .mount(&server)
            .await;

        let err = client()
            .get(format!("{}/premium", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NoPaymentRequirements));
    }

    #[tokio::test]
    async fn asset_challenges_require_caller_provided_calls() {
        let requirements = PaymentRequirements {
            scheme: Scheme::Exact,
            network: Network::VaraTestnet,
            max_amount_required: AtomicAmount(1),
            resource: "https://api.example.com/premium".parse().unwrap(),
            description: String::new(),
            mime_type: "application/json".to_string(),
            output_schema: None,
            pay_to: "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY".to_string(),
            max_timeout_seconds: 60,
            asset: Some(crate::types::HexBytes(vec![0xaa; 32])),
            extra: None,
        };
        let err = client().payment_header(&requirements).await.unwrap_err();
        assert!(matches!(err, ClientError::UnsupportedAsset));
    }
}
