//! Facilitator selection.
//!
//! A resource server either settles payments itself, against a live chain
//! connection, or delegates to a trusted facilitator service over HTTP. Both
//! choices implement [`Facilitator`], so the calling middleware does not
//! change when the deployment does.
//!
//! Selection happens before any I/O: an unknown network name is rejected
//! here, without a chain or HTTP call being attempted.

use std::str::FromStr;
use std::sync::Arc;

use crate::facilitator::Facilitator;
use crate::facilitator_client::{FacilitatorClient, FacilitatorClientError};
use crate::facilitator_local::{FacilitatorLocal, PaymentError, SettleOptions};
use crate::network::Network;
use crate::provider_cache::ChainClientCache;
use crate::types::{PaymentPayload, SettleResponse, SupportedResponse, VerifyResponse};

/// Errors raised while choosing a facilitator.
#[derive(Debug, thiserror::Error)]
pub enum DispatchSetupError {
    /// The requested network is not in the supported registry.
    #[error("Unsupported network: {0}")]
    Unsupported(String),
    /// The remote facilitator URL could not be parsed.
    #[error(transparent)]
    Facilitator(#[from] FacilitatorClientError),
}

/// Error type unifying both facilitator backends.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Local(#[from] PaymentError),
    #[error(transparent)]
    Remote(#[from] FacilitatorClientError),
}

/// A facilitator bound to one network, local or remote.
#[derive(Clone, Debug)]
pub enum FacilitatorDispatch {
    /// Verify and settle in-process against a chain client.
    Local(FacilitatorLocal),
    /// Delegate verification and settlement to a remote service.
    Remote(FacilitatorClient),
}

/// Resolve the facilitator for `network_name`.
///
/// Returns [`DispatchSetupError::Unsupported`] for names outside the
/// registry. With no `facilitator_url` the local facilitator is bound to the
/// shared chain client cache; otherwise a [`FacilitatorClient`] is pointed at
/// the remote service.
pub fn use_facilitator(
    network_name: &str,
    facilitator_url: Option<&str>,
    clients: Arc<ChainClientCache>,
    options: SettleOptions,
) -> Result<(Network, FacilitatorDispatch), DispatchSetupError> {
    let network = Network::from_str(network_name)
        .map_err(|err| DispatchSetupError::Unsupported(err.0))?;
    let facilitator = match facilitator_url {
        None => FacilitatorDispatch::Local(FacilitatorLocal::new(clients, options)),
        Some(url) => FacilitatorDispatch::Remote(FacilitatorClient::try_from(url)?),
    };
    Ok((network, facilitator))
}

impl Facilitator for FacilitatorDispatch {
    type Error = DispatchError;

    async fn verify(&self, payload: &PaymentPayload) -> Result<VerifyResponse, DispatchError> {
        match self {
            FacilitatorDispatch::Local(local) => Ok(local.verify(payload).await?),
            FacilitatorDispatch::Remote(remote) => Ok(remote.verify(payload).await?),
        }
    }

    async fn settle(&self, payload: &PaymentPayload) -> Result<SettleResponse, DispatchError> {
        match self {
            FacilitatorDispatch::Local(local) => Ok(local.settle(payload).await?),
            FacilitatorDispatch::Remote(remote) => Ok(remote.settle(payload).await?),
        }
    }

    async fn supported(&self) -> Result<SupportedResponse, DispatchError> {
        match self {
            FacilitatorDispatch::Local(local) => Ok(local.supported().await?),
            FacilitatorDispatch::Remote(remote) => Ok(remote.supported().await?),
        }
    }
}
