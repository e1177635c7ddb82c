use splitwise_client::client::{OAuthConsumer, OAuthToken, SplitwiseAuth, DEFAULT_BASE_URL};
use std::env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".to_string().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Get configuration from environment variables
    let base_url = env::var("SPLITWISE_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

    let (consumer_key, consumer_secret) = match (
        env::var("SPLITWISE_CONSUMER_KEY"),
        env::var("SPLITWISE_CONSUMER_SECRET"),
    ) {
        (Ok(key), Ok(secret)) => (key, secret),
        _ => {
            tracing::error!("SPLITWISE_CONSUMER_KEY and SPLITWISE_CONSUMER_SECRET must be set");
            tracing::error!("Register an application at https://secure.splitwise.com/apps to get them");
            std::process::exit(1);
        }
    };

    let auth = SplitwiseAuth::new(base_url.clone(), OAuthConsumer::new(consumer_key, consumer_secret));

    // Already authorised: check the token works
    if let (Ok(token), Ok(secret)) = (
        env::var("SPLITWISE_ACCESS_TOKEN"),
        env::var("SPLITWISE_ACCESS_TOKEN_SECRET"),
    ) {
        let client = auth.user_client(OAuthToken::new(token, secret));

        tracing::info!("Checking Splitwise API access at {}...", base_url);
        if !client.is_service_ok().await {
            tracing::error!("Splitwise health check failed");
            tracing::error!("Please verify:");
            tracing::error!("  - SPLITWISE_BASE_URL is correct: {}", base_url);
            tracing::error!("  - The access token {} has not been revoked", client.get_token_preview());
            std::process::exit(1);
        }

        let user = client.get_current_user().await?;
        tracing::info!(
            "Authenticated as {} {} (id {})",
            user.first_name.as_deref().unwrap_or(""),
            user.last_name.as_deref().unwrap_or(""),
            user.id
        );
        return Ok(());
    }

    // Second leg: exchange an authorised request token
    if let (Ok(token), Ok(secret), Ok(verifier)) = (
        env::var("SPLITWISE_REQUEST_TOKEN"),
        env::var("SPLITWISE_REQUEST_TOKEN_SECRET"),
        env::var("SPLITWISE_OAUTH_VERIFIER"),
    ) {
        let access_token = auth
            .get_access_token(&OAuthToken::new(token, secret), &verifier)
            .await?;
        println!("SPLITWISE_ACCESS_TOKEN={}", access_token.token);
        println!("SPLITWISE_ACCESS_TOKEN_SECRET={}", access_token.secret);
        return Ok(());
    }

    // First leg: obtain a request token for the user to authorise
    let request_token = auth.get_request_token().await?;
    println!("Authorise this application at: {}", auth.authorization_url(&request_token));
    println!("Then re-run with:");
    println!("  SPLITWISE_REQUEST_TOKEN={}", request_token.token);
    println!("  SPLITWISE_REQUEST_TOKEN_SECRET={}", request_token.secret);
    println!("  SPLITWISE_OAUTH_VERIFIER=<verifier shown by Splitwise>");

    Ok(())
}
