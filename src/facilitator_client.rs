//! [`Facilitator`] implementation that delegates to a remote facilitator
//! service over HTTP.
//!
//! The client posts payment payloads as JSON to the remote `/verify` and
//! `/settle` endpoints and reads `/supported` for capability discovery. A
//! non-success status is captured as [`FacilitatorClientError::HttpStatus`]
//! so callers can translate it into a 502-class failure instead of
//! propagating a panic or an opaque transport error.

use http::{HeaderMap, StatusCode};
use reqwest::Client;
use std::time::Duration;
use url::Url;

use crate::facilitator::Facilitator;
use crate::types::{PaymentPayload, SettleResponse, SupportedResponse, VerifyResponse};

/// A client for a remote x402 facilitator.
#[derive(Clone, Debug)]
pub struct FacilitatorClient {
    /// Base URL of the facilitator, e.g. `https://facilitator.example/`.
    base_url: Url,
    verify_url: Url,
    settle_url: Url,
    supported_url: Url,
    client: Client,
    /// Custom headers sent with each request, e.g. for authentication.
    headers: HeaderMap,
    /// Optional per-request timeout.
    timeout: Option<Duration>,
}

/// Errors that can occur while talking to a remote facilitator.
#[derive(Debug, thiserror::Error)]
pub enum FacilitatorClientError {
    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        context: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("HTTP error: {context}: {source}")]
    Http {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to deserialize JSON: {context}: {source}")]
    JsonDeserialization {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("facilitator {status}: {context}: {body}")]
    HttpStatus {
        context: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("Failed to read response body: {context}: {source}")]
    ResponseBodyRead {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl FacilitatorClient {
    /// Construct a client from a base URL, deriving the `./verify`,
    /// `./settle`, and `./supported` endpoint URLs.
    pub fn try_new(base_url: Url) -> Result<Self, FacilitatorClientError> {
        let verify_url = base_url
            .join("./verify")
            .map_err(|e| FacilitatorClientError::UrlParse {
                context: "Failed to construct ./verify URL",
                source: e,
            })?;
        let settle_url = base_url
            .join("./settle")
            .map_err(|e| FacilitatorClientError::UrlParse {
                context: "Failed to construct ./settle URL",
                source: e,
            })?;
        let supported_url =
            base_url
                .join("./supported")
                .map_err(|e| FacilitatorClientError::UrlParse {
                    context: "Failed to construct ./supported URL",
                    source: e,
                })?;
        Ok(FacilitatorClient {
            base_url,
            verify_url,
            settle_url,
            supported_url,
            client: Client::new(),
            headers: HeaderMap::new(),
            timeout: None,
        })
    }

    /// Base URL of the remote facilitator.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Attach custom headers to all future requests.
    pub fn with_headers(&self, headers: HeaderMap) -> Self {
        let mut this = self.clone();
        this.headers = headers;
        this
    }

    /// Set a timeout for all future requests.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let mut this = self.clone();
        this.timeout = Some(timeout);
        this
    }

    async fn post_json<T, R>(
        &self,
        url: &Url,
        context: &'static str,
        payload: &T,
    ) -> Result<R, FacilitatorClientError>
    where
        T: serde::Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let mut request = self.client.post(url.clone()).json(payload);
        for (key, value) in self.headers.iter() {
            request = request.header(key, value);
        }
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        let response = request
            .send()
            .await
            .map_err(|e| FacilitatorClientError::Http { context, source: e })?;

        if response.status() == StatusCode::OK {
            response
                .json::<R>()
                .await
                .map_err(|e| FacilitatorClientError::JsonDeserialization { context, source: e })
        } else {
            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| FacilitatorClientError::ResponseBodyRead { context, source: e })?;
            tracing::warn!(%status, context, "remote facilitator rejected request");
            Err(FacilitatorClientError::HttpStatus {
                context,
                status,
                body,
            })
        }
    }

    async fn get_json<R>(
        &self,
        url: &Url,
        context: &'static str,
    ) -> Result<R, FacilitatorClientError>
    where
        R: serde::de::DeserializeOwned,
    {
        let mut request = self.client.get(url.clone());
        for (key, value) in self.headers.iter() {
            request = request.header(key, value);
        }
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        let response = request
            .send()
            .await
            .map_err(|e| FacilitatorClientError::Http { context, source: e })?;

        if response.status() == StatusCode::OK {
            response
                .json::<R>()
                .await
                .map_err(|e| FacilitatorClientError::JsonDeserialization { context, source: e })
        } else {
            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| FacilitatorClientError::ResponseBodyRead { context, source: e })?;
            Err(FacilitatorClientError::HttpStatus {
                context,
                status,
                body,
            })
        }
    }
}

impl Facilitator for FacilitatorClient {
    type Error = FacilitatorClientError;

    async fn verify(
        &self,
        payload: &PaymentPayload,
    ) -> Result<VerifyResponse, FacilitatorClientError> {
        self.post_json(&self.verify_url, "POST /verify", payload)
            .await
    }

    async fn settle(
        &self,
        payload: &PaymentPayload,
    ) -> Result<SettleResponse, FacilitatorClientError> {
        self.post_json(&self.settle_url, "POST /settle", payload)
            .await
    }

    async fn supported(&self) -> Result<SupportedResponse, FacilitatorClientError> {
        self.get_json(&self.supported_url, "GET /supported").await
    }
}

/// Parse a string URL into a [`FacilitatorClient`], normalizing trailing
/// slashes so endpoint joining behaves.
impl TryFrom<&str> for FacilitatorClient {
    type Error = FacilitatorClientError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let mut normalized = value.trim_end_matches('/').to_string();
        normalized.push('/');
        let url = Url::parse(&normalized).map_err(|e| FacilitatorClientError::UrlParse {
            context: "Failed to parse base url",
            source: e,
        })?;
        FacilitatorClient::try_new(url)
    }
}

impl TryFrom<String> for FacilitatorClient {
    type Error = FacilitatorClientError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        FacilitatorClient::try_from(value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::sample_payload;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn verify_posts_payload_and_parses_response() {
        let server = MockServer::start().await;
        let payload = sample_payload();
        Mock::given(method("POST"))
            .and(path("/verify"))
            .and(body_json(&payload))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "isValid": true,
                "invalidReason": null,
            })))
            .mount(&server)
            .await;

        let client = FacilitatorClient::try_from(server.uri().as_str()).unwrap();
        let response = client.verify(&payload).await.unwrap();
        assert_eq!(response, VerifyResponse::valid());
    }

    #[tokio::test]
    async fn settle_parses_settlement_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/settle"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "txHash": format!("0x{}", "ab".repeat(32)),
                "blockHash": null,
                "message": null,
            })))
            .mount(&server)
            .await;

        let client = FacilitatorClient::try_from(server.uri().as_str()).unwrap();
        let response = client.settle(&sample_payload()).await.unwrap();
        assert!(response.success);
        assert!(response.tx_hash.is_some());
        assert!(response.block_hash.is_none());
    }

    #[tokio::test]
    async fn non_success_status_is_captured_not_panicked() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = FacilitatorClient::try_from(server.uri().as_str()).unwrap();
        let err = client.verify(&sample_payload()).await.unwrap_err();
        match err {
            FacilitatorClientError::HttpStatus { status, body, .. } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "boom");
            }
            other => panic!("expected HttpStatus, got {other:?}"),
        }
    }

    #[test]
    fn base_url_normalization_keeps_path_joining_sane() {
        let client = FacilitatorClient::try_from("https://facilitator.example/api").unwrap();
        assert_eq!(client.verify_url.as_str(), "https://facilitator.example/api/verify");
        assert_eq!(client.settle_url.as_str(), "https://facilitator.example/api/settle");
    }
}
