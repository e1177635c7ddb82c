//! OAuth 1.0a handshake and request signing for the Splitwise API.
//!
//! Splitwise uses three-legged OAuth 1.0a with HMAC-SHA1 signatures:
//!
//! 1. [`SplitwiseAuth::get_request_token`] obtains a temporary request token.
//! 2. The user visits [`SplitwiseAuth::authorization_url`] and approves access, receiving a
//!    verifier.
//! 3. [`SplitwiseAuth::get_access_token`] exchanges the request token and verifier for a
//!    long-lived access token, which [`SplitwiseAuth::user_client`] binds to a
//!    [`SplitwiseClient`].
//!
//! Every API call is then signed by [`OAuthSigner`].

use anyhow::{Context, Result};
use base64::Engine as _;
use reqwest::{Client, Method, Url};
use ring::hmac;

use crate::client::{client::SplitwiseClient, error::ApiError, API_PATH, REQUEST_TIMEOUT};
use crate::encoding::percent_encode;

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";

/// Application credentials issued by Splitwise when registering an app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthConsumer {
    pub key: String,
    pub secret: String,
}

impl OAuthConsumer {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }
}

/// A request token or access token together with its secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthToken {
    pub token: String,
    pub secret: String,
}

impl OAuthToken {
    pub fn new(token: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            secret: secret.into(),
        }
    }

    /// First characters of the token, safe to log.
    pub fn preview(&self) -> String {
        format!("{}...", self.token.chars().take(10).collect::<String>())
    }

    /// Parses an `oauth_token=...&oauth_token_secret=...` response body.
    pub fn from_form_body(body: &str) -> Result<Self, ApiError> {
        let pairs = decode_form(body)
            .map_err(|e| ApiError::MalformedResponse(format!("token response is not valid form data: {}", e)))?;
        let field = |name: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| ApiError::MalformedResponse(format!("token response is missing `{}`", name)))
        };

        Ok(Self {
            token: field("oauth_token")?,
            secret: field("oauth_token_secret")?,
        })
    }
}

/// Produces OAuth 1.0a `Authorization` headers (RFC 5849, HMAC-SHA1).
#[derive(Debug, Clone)]
pub struct OAuthSigner {
    consumer: OAuthConsumer,
    token: Option<OAuthToken>,
}

impl OAuthSigner {
    pub fn new(consumer: OAuthConsumer, token: Option<OAuthToken>) -> Self {
        Self { consumer, token }
    }

    /// Signs a request with a fresh nonce and the current time.
    ///
    /// `extra_oauth` carries additional protocol parameters such as `oauth_callback` or
    /// `oauth_verifier`; they are both signed and sent in the header.
    pub fn authorization_header(
        &self,
        method: &Method,
        url: &str,
        extra_oauth: &[(&str, &str)],
    ) -> Result<String> {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let timestamp = chrono::Utc::now().timestamp();
        self.authorization_header_at(method, url, extra_oauth, &nonce, timestamp)
    }

    /// Same as [`authorization_header`](Self::authorization_header) with a fixed nonce and
    /// timestamp.
    pub fn authorization_header_at(
        &self,
        method: &Method,
        url: &str,
        extra_oauth: &[(&str, &str)],
        nonce: &str,
        timestamp: i64,
    ) -> Result<String> {
        let mut oauth_params = self.protocol_params(nonce, timestamp);
        oauth_params.extend(extra_oauth.iter().map(|(k, v)| (k.to_string(), v.to_string())));

        let base_string = Self::signature_base_string(method, url, &oauth_params)?;
        let signature = self.sign(&base_string);
        oauth_params.push(("oauth_signature".to_string(), signature));
        oauth_params.sort();

        let fields: Vec<String> = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
            .collect();

        Ok(format!("OAuth {}", fields.join(", ")))
    }

    fn protocol_params(&self, nonce: &str, timestamp: i64) -> Vec<(String, String)> {
        let mut params = vec![
            ("oauth_consumer_key".to_string(), self.consumer.key.clone()),
            ("oauth_nonce".to_string(), nonce.to_string()),
            ("oauth_signature_method".to_string(), SIGNATURE_METHOD.to_string()),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
            ("oauth_version".to_string(), OAUTH_VERSION.to_string()),
        ];
        if let Some(token) = &self.token {
            params.push(("oauth_token".to_string(), token.token.clone()));
        }
        params
    }

    /// Builds the RFC 5849 signature base string.
    ///
    /// Query parameters already present in `url` are decoded and signed together with
    /// `oauth_params`.
    pub fn signature_base_string(
        method: &Method,
        url: &str,
        oauth_params: &[(String, String)],
    ) -> Result<String> {
        let parsed = Url::parse(url).with_context(|| format!("invalid request URL: {}", url))?;

        let host = parsed
            .host_str()
            .with_context(|| format!("request URL has no host: {}", url))?;
        let base_uri = match parsed.port() {
            Some(port) => format!("{}://{}:{}{}", parsed.scheme(), host, port, parsed.path()),
            None => format!("{}://{}{}", parsed.scheme(), host, parsed.path()),
        };

        let mut params: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        params.extend(oauth_params.iter().cloned());

        let mut encoded: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (percent_encode(k).into_owned(), percent_encode(v).into_owned()))
            .collect();
        encoded.sort();

        let normalized = encoded
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        Ok(format!(
            "{}&{}&{}",
            method.as_str().to_uppercase(),
            percent_encode(&base_uri),
            percent_encode(&normalized)
        ))
    }

    /// HMAC-SHA1 over `base_string`, base64 encoded.
    pub fn sign(&self, base_string: &str) -> String {
        let token_secret = self.token.as_ref().map(|t| t.secret.as_str()).unwrap_or("");
        let signing_key = format!(
            "{}&{}",
            percent_encode(&self.consumer.secret),
            percent_encode(token_secret)
        );

        let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, signing_key.as_bytes());
        let tag = hmac::sign(&key, base_string.as_bytes());
        base64::engine::general_purpose::STANDARD.encode(tag.as_ref())
    }
}

/// Decodes an `application/x-www-form-urlencoded` body such as `a=1&b=x+y`.
pub(crate) fn decode_form(body: &str) -> Result<Vec<(String, String)>> {
    let url = Url::parse(&format!("http://localhost/?{}", body.trim()))
        .context("form body is not a valid query")?;
    Ok(url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect())
}

/// # Splitwise OAuth Handshake
///
/// Holds the application's consumer credentials and performs the token exchanges needed to
/// obtain per-user access.
pub struct SplitwiseAuth {
    /// Base URL of the Splitwise service, without a trailing slash
    base_url: String,
    /// HTTP client for token requests
    client: Client,
    consumer: OAuthConsumer,
}

impl SplitwiseAuth {
    pub fn new(base_url: String, consumer: OAuthConsumer) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            consumer,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches a request token to be authorised by a user.
    pub async fn get_request_token(&self) -> Result<OAuthToken> {
        tracing::info!("Requesting OAuth request token");
        let url = format!("{}{}/get_request_token", self.base_url, API_PATH);
        let token = self
            .exchange_token(&url, None, &[("oauth_callback", "oob")])
            .await?;
        tracing::info!("Received request token: {}", token.preview());
        Ok(token)
    }

    /// The page where a user approves a request token.
    pub fn authorization_url(&self, request_token: &OAuthToken) -> String {
        format!(
            "{}/authorize?oauth_token={}",
            self.base_url,
            percent_encode(&request_token.token)
        )
    }

    /// Exchanges an authorised request token for an access token.
    pub async fn get_access_token(
        &self,
        request_token: &OAuthToken,
        verifier: &str,
    ) -> Result<OAuthToken> {
        tracing::info!("Exchanging request token {} for an access token", request_token.preview());
        let url = format!("{}{}/get_access_token", self.base_url, API_PATH);
        let token = self
            .exchange_token(&url, Some(request_token), &[("oauth_verifier", verifier)])
            .await?;
        tracing::info!("Received access token: {}", token.preview());
        Ok(token)
    }

    /// A client acting on behalf of the user who owns `access_token`.
    pub fn user_client(&self, access_token: OAuthToken) -> SplitwiseClient {
        SplitwiseClient::new(self.base_url.clone(), self.consumer.clone(), access_token)
    }

    async fn exchange_token(
        &self,
        url: &str,
        token: Option<&OAuthToken>,
        extra_oauth: &[(&str, &str)],
    ) -> Result<OAuthToken> {
        let signer = OAuthSigner::new(self.consumer.clone(), token.cloned());
        let auth_header = signer.authorization_header(&Method::POST, url, extra_oauth)?;

        tracing::debug!("Making token request to: {}", url);

        let response = self
            .client
            .post(url)
            .header("Authorization", auth_header)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Network error during token exchange: {}", e);
                anyhow::Error::new(e).context(format!("Failed to connect to Splitwise at {}", self.base_url))
            })?;

        let status = response.status();
        tracing::debug!("Token response status: {}", status);

        let body = response
            .text()
            .await
            .context("Failed to read token response body")?;

        if !status.is_success() {
            tracing::error!("Token request failed with status {}: {}", status, body);
            return Err(ApiError::from_status(status.as_u16(), &body).into());
        }

        Ok(OAuthToken::from_form_body(&body)?)
    }
}
