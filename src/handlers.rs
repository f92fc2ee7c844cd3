//! HTTP endpoints implemented by the x402 facilitator service.
//!
//! Server-side handlers for client-submitted payments:
//! - `POST /verify` — check a payment payload's signature,
//! - `POST /settle` — submit the signed transaction for settlement,
//! - `GET /supported` — list supported payment kinds,
//! - `GET /verify`, `GET /settle` — endpoint descriptions.
//!
//! Both POST endpoints take the payment payload as their JSON body, with the
//! network embedded. The network name is checked against the registry before
//! the body is interpreted any further, so an unknown network always yields
//! `400 Unsupported network: <name>` rather than a schema error.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use tracing::instrument;

use crate::facilitator::Facilitator;
use crate::facilitator_local::{FacilitatorLocal, PaymentError};
use crate::network::Network;
use crate::types::{ErrorResponse, PaymentPayload};

/// Shared state of the facilitator service.
pub type AppState = Arc<FacilitatorLocal>;

/// Routes of the facilitator HTTP API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/verify", get(get_verify_info).post(post_verify))
        .route("/settle", get(get_settle_info).post(post_settle))
        .route("/supported", get(get_supported))
}

/// `GET /verify`: machine-readable description of the `/verify` endpoint.
#[instrument(skip_all)]
async fn get_verify_info() -> impl IntoResponse {
    Json(json!({
        "endpoint": "/verify",
        "description": "POST to verify x402 payments",
        "body": "PaymentPayload",
    }))
}

/// `GET /settle`: machine-readable description of the `/settle` endpoint.
#[instrument(skip_all)]
async fn get_settle_info() -> impl IntoResponse {
    Json(json!({
        "endpoint": "/settle",
        "description": "POST to settle x402 payments",
        "body": "PaymentPayload",
    }))
}

/// `GET /supported`: payment kinds this facilitator can process.
#[instrument(skip_all)]
async fn get_supported(State(facilitator): State<AppState>) -> impl IntoResponse {
    match facilitator.supported().await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => bad_gateway(error).into_response(),
    }
}

/// Pre-parse the request body far enough to run the registry check, then
/// interpret it as a full payment payload.
fn extract_payload(
    body: serde_json::Value,
) -> Result<PaymentPayload, (StatusCode, Json<ErrorResponse>)> {
    let network_name = body
        .get("network")
        .and_then(|value| value.as_str())
        .unwrap_or_default();
    if Network::from_str(network_name).is_err() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request(format!(
                "Unsupported network: {network_name}"
            ))),
        ));
    }
    serde_json::from_value(body).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request("Invalid payment data")),
        )
    })
}

fn bad_gateway(error: impl std::fmt::Display) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_GATEWAY,
        Json(ErrorResponse {
            error: "Bad gateway".to_string(),
            message: error.to_string(),
        }),
    )
}

/// `POST /verify`: facilitator-side verification of a proposed payment.
///
/// Responds with a `VerifyResponse`; cryptographic invalidity is a valid
/// 200 response with `isValid: false`, while malformed payloads are 400 and
/// chain transport failures 502.
#[instrument(skip_all)]
async fn post_verify(
    State(facilitator): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    let payload = match extract_payload(body) {
        Ok(payload) => payload,
        Err(rejection) => return rejection.into_response(),
    };
    match facilitator.verify(&payload).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(PaymentError::MalformedTransaction(error)) => {
            tracing::warn!(error = %error, "verification rejected malformed transaction");
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::bad_request(error.to_string())),
            )
                .into_response()
        }
        Err(error) => {
            tracing::warn!(error = %error, "verification failed");
            bad_gateway(error).into_response()
        }
    }
}

/// `POST /settle`: facilitator-side settlement of a verified payment.
///
/// Chain-level rejections are valid 200 responses with `success: false`;
/// malformed payloads are 400 and chain transport failures 502.
#[instrument(skip_all)]
async fn post_settle(
    State(facilitator): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    let payload = match extract_payload(body) {
        Ok(payload) => payload,
        Err(rejection) => return rejection.into_response(),
    };
    match facilitator.settle(&payload).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(PaymentError::MalformedTransaction(error)) => {
            tracing::warn!(error = %error, "settlement rejected malformed transaction");
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::bad_request(error.to_string())),
            )
                .into_response()
        }
        Err(error) => {
            tracing::warn!(error = %error, "settlement failed");
            bad_gateway(error).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facilitator_local::SettleOptions;
    use crate::provider_cache::ChainClientCache;
    use crate::signer::WalletSigner;
    use crate::types::tests::sample_payload;
    use crate::types::VerifyResponse;
    use axum::body::Body;
    use axum::http::Request;
    use subxt::utils::AccountId32;
    use tower::ServiceExt;

    fn app() -> Router {
        let facilitator = Arc::new(FacilitatorLocal::new(
            Arc::new(ChainClientCache::default()),
            SettleOptions::default(),
        ));
        routes().with_state(facilitator)
    }

    fn post(path: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn unsupported_network_yields_400_with_message() {
        let response = app()
            .oneshot(post("/verify", serde_json::json!({"network": "unknown-chain"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Bad request");
        assert_eq!(body["message"], "Unsupported network: unknown-chain");
    }

    #[tokio::test]
    async fn settle_checks_the_registry_too() {
        let response = app()
            .oneshot(post("/settle", serde_json::json!({"network": "base"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Unsupported network: base");
    }

    #[tokio::test]
    async fn structurally_invalid_payload_yields_400() {
        let response = app()
            .oneshot(post(
                "/verify",
                serde_json::json!({"network": "vara-testnet", "payload": 42}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Invalid payment data");
    }

    #[tokio::test]
    async fn verify_endpoint_accepts_a_signed_payload() {
        let alice = subxt_signer::sr25519::dev::alice();
        let mut payload = sample_payload();
        payload.payload.transaction.address = AccountId32(alice.public_key().0).to_string();
        payload.payload.signature = WalletSigner::from(alice)
            .sign(&payload.payload.transaction)
            .await
            .unwrap();

        let response = app()
            .oneshot(post("/verify", serde_json::to_value(&payload).unwrap()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: VerifyResponse = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(body, VerifyResponse::valid());
    }

    #[tokio::test]
    async fn verify_endpoint_reports_bad_signature() {
        let response = app()
            .oneshot(post(
                "/verify",
                serde_json::to_value(sample_payload()).unwrap(),
            ))
            .await
            .unwrap();
        // The sample payload carries an all-ones signature.
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["isValid"], false);
        assert_eq!(body["invalidReason"], "bad signature");
    }

    #[tokio::test]
    async fn supported_lists_registry_networks() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/supported")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let kinds = body["kinds"].as_array().unwrap();
        assert_eq!(kinds.len(), 2);
        assert_eq!(kinds[0]["scheme"], "exact");
    }
}
