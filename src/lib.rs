//! # Splitwise Client Library
//!
//! An authenticated client for the Splitwise expense-sharing API. It consists of two main
//! components:
//!
//! ## Client Module
//!
//! The [`client`] module performs the OAuth 1.0a handshake and exposes typed operations for
//! expenses, groups, friends and users.
//!
//! ## Encoding Module
//!
//! The [`encoding`] module turns request parameters into the query-string dialect Splitwise
//! expects, including its `prefix__index__key=value` form for arrays of objects.
//!
//! ## Quick Start
//!
//! ```no_run
//! use splitwise_client::{OAuthConsumer, OAuthToken, SplitwiseClient};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = SplitwiseClient::new(
//!     "https://secure.splitwise.com".to_string(),
//!     OAuthConsumer::new("consumer-key", "consumer-secret"),
//!     OAuthToken::new("access-token", "access-token-secret"),
//! );
//!
//! let me = client.get_current_user().await?;
//! println!("Signed in as {:?}", me.first_name);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod encoding;

pub use client::{ApiError, OAuthConsumer, OAuthToken, SplitwiseAuth, SplitwiseClient};
pub use encoding::{EncodeError, ParamMap, ParamValue};
