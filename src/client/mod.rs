//! # Splitwise HTTP Client
//!
//! This module provides an OAuth 1.0a authenticated HTTP client for the Splitwise API,
//! covering users, groups, expenses, friends and notifications.
//!
//! ## Modules
//!
//! - [`auth`] - OAuth handshake and HMAC-SHA1 request signing
//! - [`client`] - Per-user client with all API methods
//! - [`error`] - Typed errors behind the `anyhow` results
//! - [`types`] - Request payloads and response types
//!
//! ## Quick Start
//!
//! ```no_run
//! use splitwise_client::client::{OAuthConsumer, SplitwiseAuth, DEFAULT_BASE_URL};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let auth = SplitwiseAuth::new(
//!     DEFAULT_BASE_URL.to_string(),
//!     OAuthConsumer::new("consumer-key", "consumer-secret"),
//! );
//!
//! // Send the user to the authorisation page, then exchange the verifier they receive
//! let request_token = auth.get_request_token().await?;
//! println!("Visit {}", auth.authorization_url(&request_token));
//! let access_token = auth.get_access_token(&request_token, "verifier").await?;
//!
//! let client = auth.user_client(access_token);
//! let groups = client.get_groups().await?;
//! println!("Member of {} groups", groups.len());
//! # Ok(())
//! # }
//! ```

pub mod auth;
#[allow(clippy::module_inception)]
pub mod client;
pub mod error;
pub mod types;

pub use auth::{OAuthConsumer, OAuthSigner, OAuthToken, SplitwiseAuth};
pub use client::SplitwiseClient;
pub use error::ApiError;
pub use types::*;

/// Production Splitwise host.
pub const DEFAULT_BASE_URL: &str = "https://secure.splitwise.com";

/// Path prefix of every versioned API endpoint.
pub const API_PATH: &str = "/api/v3.0";

/// Default time allowed for a single request, token exchanges included.
pub const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);
