//! x402 payments on Vara.
//!
//! Implements the [x402 protocol](https://www.x402.org) payment flow against
//! Vara networks: a resource server answers unauthenticated requests with
//! `402 Payment Required` and a structured challenge; the client builds and
//! signs a transfer transaction against live chain state and resends the
//! request with the payment in the `X-PAYMENT` header; the server, or a
//! delegated facilitator service, verifies the signature and submits the
//! transaction for settlement before releasing the resource.
//!
//! # Roles
//!
//! - **Facilitator**: verifies and settles payments on-chain. See
//!   [`facilitator`] for the trait, [`facilitator_local`] for the
//!   chain-backed implementation, and [`handlers`] for the HTTP surface the
//!   `x402-vara` binary serves.
//! - **Seller**: a payment-gated service. Protect routes with the
//!   [`paygate`] middleware, which settles locally or delegates to a
//!   facilitator via [`dispatch`].
//! - **Buyer**: pay challenges with [`client::X402Client`] and a
//!   [`signer::WalletSigner`], either an in-process keypair or an injected
//!   wallet account.
//!
//! # Modules
//!
//! - [`chain`] — chain client: header/nonce reads, transfer call encoding,
//!   unsigned transaction building, extrinsic submission.
//! - [`client`] — paying HTTP client that retries 402 responses with an
//!   `X-PAYMENT` header.
//! - [`config`] — environment configuration of the facilitator service.
//! - [`dispatch`] — local-versus-remote facilitator selection.
//! - [`era`] — transaction mortality windows and their two-byte encoding.
//! - [`extrinsic`] — canonical signing payload, signature checking, signed
//!   extrinsic assembly.
//! - [`facilitator`] — the [`Facilitator`](facilitator::Facilitator) trait.
//! - [`facilitator_client`] — HTTP client for a remote facilitator.
//! - [`facilitator_local`] — chain-backed verifier and settler.
//! - [`handlers`] — facilitator HTTP endpoints (verify, settle, supported).
//! - [`money`] — human-readable price parsing into atomic units.
//! - [`network`] — supported-network registry.
//! - [`paygate`] — Axum middleware enforcing payment on protected routes.
//! - [`provider_cache`] — per-network chain client cache.
//! - [`sig_down`] — graceful shutdown signal handling.
//! - [`signer`] — local keypair and injected-wallet signing.
//! - [`telemetry`] — tracing and OpenTelemetry bootstrap.
//! - [`types`] — protocol wire types and the payment header codec.

pub mod chain;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod era;
pub mod extrinsic;
pub mod facilitator;
pub mod facilitator_client;
pub mod facilitator_local;
pub mod handlers;
pub mod money;
pub mod network;
pub mod paygate;
pub mod provider_cache;
pub mod sig_down;
pub mod signer;
pub mod telemetry;
pub mod types;
