//! Axum middleware enforcing x402 payments on protected routes.
//!
//! Requests without an `X-PAYMENT` header receive a `402 Payment Required`
//! JSON challenge listing the acceptable payments. Requests carrying a
//! payment are decoded, verified, and settled through the configured
//! [`Facilitator`] before the wrapped handler runs; the settlement result is
//! returned in the `X-PAYMENT-RESPONSE` header as base64-encoded JSON (this
//! implementation never uses the bare-hash header variant).
//!
//! Verification strictly precedes settlement. The response mapping follows
//! the protocol's error taxonomy: malformed header 400, failed verification
//! 403, failed settlement 402, unreachable facilitator or chain 502.
//!
//! ## Example
//!
//! ```ignore
//! let clients = Arc::new(ChainClientCache::from_env());
//! let facilitator = FacilitatorLocal::new(clients, SettleOptions::default());
//! let price_tag = PriceTag::native(
//!     Network::VaraTestnet,
//!     "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY",
//!     AtomicAmount(100_000_000_000),
//! );
//!
//! let app = Router::new().route(
//!     "/premium",
//!     get(premium_handler).layer(X402Layer::new(facilitator).with_price_tag(price_tag)),
//! );
//! ```

use axum::body::Body;
use axum::extract::Request;
use axum::http::{HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::util::BoxCloneSyncService;
use tower::{Layer, Service};
use url::Url;

use crate::facilitator::Facilitator;
use crate::network::Network;
use crate::types::{
    AtomicAmount, Base64Bytes, HexBytes, PaymentPayload, PaymentRequiredResponse,
    PaymentRequirements, Scheme, X402Version,
};

/// One acceptable payment for a protected route.
#[derive(Debug, Clone)]
pub struct PriceTag {
    pub network: Network,
    /// Recipient address of the transfer.
    pub pay_to: String,
    pub amount: AtomicAmount,
    /// Token program identifier for asset transfers; `None` means the native
    /// token.
    pub asset: Option<HexBytes>,
    pub description: String,
    pub mime_type: String,
    pub max_timeout_seconds: u64,
}

impl PriceTag {
    /// A native-token price tag with default metadata.
    pub fn native(network: Network, pay_to: impl Into<String>, amount: AtomicAmount) -> Self {
        PriceTag {
            network,
            pay_to: pay_to.into(),
            amount,
            asset: None,
            description: String::new(),
            mime_type: "application/json".to_string(),
            max_timeout_seconds: 60,
        }
    }

    /// Charge a token asset instead of the native token.
    pub fn with_asset(mut self, asset: HexBytes) -> Self {
        self.asset = Some(asset);
        self
    }

    /// Describe what the payment grants access to.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// MIME type of the protected resource.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    fn as_requirements(&self, resource: Url) -> PaymentRequirements {
        PaymentRequirements {
            scheme: Scheme::Exact,
            network: self.network,
            max_amount_required: self.amount,
            resource,
            description: self.description.clone(),
            mime_type: self.mime_type.clone(),
            output_schema: None,
            pay_to: self.pay_to.clone(),
            max_timeout_seconds: self.max_timeout_seconds,
            asset: self.asset.clone(),
            extra: None,
        }
    }
}

/// Layer wrapping routes with payment enforcement.
#[derive(Clone)]
pub struct X402Layer<F> {
    facilitator: F,
    accepts: Arc<Vec<PriceTag>>,
    base_url: Option<Arc<Url>>,
}

impl<F> X402Layer<F> {
    pub fn new(facilitator: F) -> Self {
        X402Layer {
            facilitator,
            accepts: Arc::new(Vec::new()),
            base_url: None,
        }
    }

    /// Add an acceptable payment. Routes can accept several, e.g. mainnet
    /// and testnet variants.
    pub fn with_price_tag(mut self, price_tag: PriceTag) -> Self {
        let mut accepts = (*self.accepts).clone();
        accepts.push(price_tag);
        self.accepts = Arc::new(accepts);
        self
    }

    /// Base URL used to render the resource field of challenges. Defaults to
    /// `http://localhost/`, which is only suitable for development.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(Arc::new(base_url));
        self
    }
}

impl<S, F> Layer<S> for X402Layer<F>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + Sync + 'static,
    S::Future: Send + 'static,
    F: Facilitator + Clone,
{
    type Service = X402Gate<F>;

    fn layer(&self, inner: S) -> Self::Service {
        X402Gate {
            facilitator: self.facilitator.clone(),
            accepts: self.accepts.clone(),
            base_url: self.base_url.clone(),
            inner: BoxCloneSyncService::new(inner),
        }
    }
}

/// Service that enforces payment before forwarding to the wrapped handler.
#[derive(Clone)]
pub struct X402Gate<F> {
    facilitator: F,
    accepts: Arc<Vec<PriceTag>>,
    base_url: Option<Arc<Url>>,
    inner: BoxCloneSyncService<Request, Response, Infallible>,
}

impl<F> Service<Request> for X402Gate<F>
where
    F: Facilitator + Clone + Send + Sync + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let gate = self.clone();
        Box::pin(async move { Ok(gate.handle_request(request).await) })
    }
}

impl<F> X402Gate<F>
where
    F: Facilitator + Clone + Send + Sync + 'static,
{
    fn resource_url(&self, uri: &Uri) -> Url {
        let mut url = self
            .base_url
            .as_deref()
            .cloned()
            .unwrap_or_else(|| Url::parse("http://localhost/").expect("valid literal url"));
        url.set_path(uri.path());
        url.set_query(uri.query());
        url
    }

    fn requirements(&self, uri: &Uri) -> Vec<PaymentRequirements> {
        let resource = self.resource_url(uri);
        self.accepts
            .iter()
            .map(|tag| tag.as_requirements(resource.clone()))
            .collect()
    }

    fn payment_required(&self, uri: &Uri, error: Option<String>) -> Response {
        let body = PaymentRequiredResponse {
            x402_version: X402Version::V1,
            accepts: self.requirements(uri),
            error,
        };
        (StatusCode::PAYMENT_REQUIRED, axum::Json(body)).into_response()
    }

    async fn handle_request(mut self, request: Request) -> Response {
        let uri = request.uri().clone();

        let Some(header) = request.headers().get("X-PAYMENT").map(HeaderValue::as_bytes) else {
            return self.payment_required(&uri, Some("X-PAYMENT header is required".to_string()));
        };

        let payload = match PaymentPayload::try_from(Base64Bytes::from(header)) {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!(error = %error, "rejected malformed payment header");
                return (
                    StatusCode::BAD_REQUEST,
                    axum::Json(json!({
                        "error": "Bad request",
                        "message": "Invalid payment data",
                    })),
                )
                    .into_response();
            }
        };

        let verification = match self.facilitator.verify(&payload).await {
            Ok(verification) => verification,
            Err(error) => {
                tracing::warn!(error = %error, "facilitator verification unreachable");
                return bad_gateway(error);
            }
        };
        if !verification.is_valid {
            let reason = verification
                .invalid_reason
                .unwrap_or_else(|| "unknown".to_string());
            return (
                StatusCode::FORBIDDEN,
                axum::Json(json!({
                    "error": "Verification error",
                    "message": format!("Error verifying X-PAYMENT header: {reason}"),
                })),
            )
                .into_response();
        }

        // Only a verified payload may reach settlement.
        let settlement = match self.facilitator.settle(&payload).await {
            Ok(settlement) => settlement,
            Err(error) => {
                tracing::warn!(error = %error, "facilitator settlement unreachable");
                return bad_gateway(error);
            }
        };
        if !settlement.success {
            let message = settlement
                .message
                .unwrap_or_else(|| "settlement failed".to_string());
            return self.payment_required(&uri, Some(message));
        }

        let header_value = match Base64Bytes::try_from(settlement)
            .map_err(|e| e.to_string())
            .and_then(|b| HeaderValue::from_bytes(b.as_ref()).map_err(|e| e.to_string()))
        {
            Ok(value) => value,
            Err(error) => {
                tracing::error!(%error, "failed to encode settlement response header");
                return (StatusCode::INTERNAL_SERVER_ERROR, Body::empty()).into_response();
            }
        };

        let mut response = match self.inner.call(request).await {
            Ok(response) => response,
            Err(infallible) => match infallible {},
        };
        response
            .headers_mut()
            .insert("X-PAYMENT-RESPONSE", header_value);
        response
    }
}

fn bad_gateway(error: impl std::fmt::Display) -> Response {
    (
        StatusCode::BAD_GATEWAY,
        axum::Json(json!({
            "error": "Bad gateway",
            "message": error.to_string(),
        })),
    )
        .into_response()
}
