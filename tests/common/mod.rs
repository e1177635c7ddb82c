#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    Router,
};
use serde_json::{json, Value};
use splitwise_client::client::{OAuthConsumer, OAuthSigner, OAuthToken, SplitwiseAuth, SplitwiseClient};
use tokio::net::TcpListener;

pub const CONSUMER_KEY: &str = "test-consumer-key";
pub const CONSUMER_SECRET: &str = "test-consumer-secret";
pub const ACCESS_TOKEN: &str = "test-access-token";
pub const ACCESS_TOKEN_SECRET: &str = "test-access-secret";

/// A request as seen by the mock server.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
}

#[derive(Clone, Default)]
struct MockState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    responses: Arc<Mutex<HashMap<(String, String), MockResponse>>>,
}

#[derive(Clone)]
struct MockResponse {
    status: u16,
    body: String,
    delay: Option<Duration>,
}

/// In-process stand-in for the Splitwise API.
///
/// Responses are registered per method and path; anything unregistered gets the 404 body
/// Splitwise uses for unknown records.
pub struct MockSplitwise {
    pub base_url: String,
    state: MockState,
}

impl MockSplitwise {
    pub async fn start() -> Self {
        let state = MockState::default();
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock server");
        let addr = listener.local_addr().expect("mock server has no address");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock server failed");
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn respond(&self, method: &str, path: &str, status: u16, body: impl Into<String>) {
        self.register(method, path, MockResponse {
            status,
            body: body.into(),
            delay: None,
        });
    }

    /// Like [`respond_json`](Self::respond_json), but the answer is held back for `delay`.
    pub fn respond_json_after(&self, method: &str, path: &str, delay: Duration, body: Value) {
        self.register(method, path, MockResponse {
            status: 200,
            body: body.to_string(),
            delay: Some(delay),
        });
    }

    fn register(&self, method: &str, path: &str, response: MockResponse) {
        self.state
            .responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), response);
    }

    pub fn respond_json(&self, method: &str, path: &str, body: Value) {
        self.respond(method, path, 200, body.to_string());
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests()
            .last()
            .cloned()
            .expect("mock server received no requests")
    }

    pub fn consumer() -> OAuthConsumer {
        OAuthConsumer::new(CONSUMER_KEY, CONSUMER_SECRET)
    }

    pub fn access_token() -> OAuthToken {
        OAuthToken::new(ACCESS_TOKEN, ACCESS_TOKEN_SECRET)
    }

    pub fn auth(&self) -> SplitwiseAuth {
        SplitwiseAuth::new(self.base_url.clone(), Self::consumer())
    }

    pub fn client(&self) -> SplitwiseClient {
        SplitwiseClient::new(self.base_url.clone(), Self::consumer(), Self::access_token())
    }

    /// Full URL of a recorded request, as the client signed it.
    pub fn url_of(&self, request: &RecordedRequest) -> String {
        match &request.query {
            Some(query) => format!("{}{}?{}", self.base_url, request.path, query),
            None => format!("{}{}", self.base_url, request.path),
        }
    }
}

async fn handle(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> impl IntoResponse {
    let recorded = RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };
    state.requests.lock().unwrap().push(recorded);

    let response = state
        .responses
        .lock()
        .unwrap()
        .get(&(method.to_string(), uri.path().to_string()))
        .cloned();

    let response = response.unwrap_or_else(|| MockResponse {
        status: 404,
        body: json!({ "error": "Invalid API Request: record not found" }).to_string(),
        delay: None,
    });

    if let Some(delay) = response.delay {
        tokio::time::sleep(delay).await;
    }

    (
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        [(header::CONTENT_TYPE, "application/json")],
        response.body,
    )
}

/// Parses `OAuth k="v", ...` into decoded pairs.
pub fn parse_oauth_header(header: &str) -> Vec<(String, String)> {
    header
        .strip_prefix("OAuth ")
        .expect("not an OAuth header")
        .split(", ")
        .map(|field| {
            let (key, value) = field.split_once('=').expect("malformed OAuth field");
            let value = value.trim_matches('"');
            (
                urlencoding::decode(key).unwrap().into_owned(),
                urlencoding::decode(value).unwrap().into_owned(),
            )
        })
        .collect()
}

/// Recomputes the signature of a recorded request and checks it matches the one sent.
pub fn assert_signed(
    mock: &MockSplitwise,
    request: &RecordedRequest,
    consumer: OAuthConsumer,
    token: Option<OAuthToken>,
) {
    let header = request
        .authorization
        .as_deref()
        .expect("request carried no Authorization header");
    let mut params = parse_oauth_header(header);

    let position = params
        .iter()
        .position(|(k, _)| k == "oauth_signature")
        .expect("no oauth_signature in header");
    let (_, sent_signature) = params.remove(position);

    let method = reqwest::Method::from_bytes(request.method.as_bytes()).unwrap();
    let base_string = OAuthSigner::signature_base_string(&method, &mock.url_of(request), &params)
        .expect("failed to build signature base string");
    let expected = OAuthSigner::new(consumer, token).sign(&base_string);

    assert_eq!(sent_signature, expected, "signature mismatch for {}", request.path);
}

pub fn init_test_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}
