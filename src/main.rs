use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{build_router, IntakeProfile, RelayState, WebhookSender};
use intake_core::TokenCodec;
use intake_sms::{SmsClient, SmsConfig};

/// Main entry point for the patient intake relay
///
/// Starts the REST server that serves token-gated intake forms, validates
/// and normalizes submissions, and relays them to the clinic webhook.
/// SMS link delivery and webhook forwarding are optional and enabled
/// through environment variables.
///
/// # Environment Variables
/// - `INTAKE_ADDR`: REST server address (default: "0.0.0.0:8080")
/// - `PUBLIC_BASE_URL`: base URL used in generated form links (default: "http://localhost:8080")
/// - `SECRET_KEY`: HMAC key for form link tokens (ephemeral key generated if unset)
/// - `WEBHOOK_URL`: clinic endpoint for normalized submissions (optional)
/// - `SMS_API_ENDPOINT`, `SMS_API_KEY`, `SMS_FROM_NUMBER`: SMS gateway settings,
///   all three required to enable SMS delivery
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If server startup or runtime fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("intake_relay=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("intake_core=info".parse()?)
                .add_directive("intake_sms=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("INTAKE_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into());
    let public_base_url =
        std::env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".into());

    let secret_key = match std::env::var("SECRET_KEY") {
        Ok(key) if !key.trim().is_empty() => key,
        _ => {
            tracing::warn!(
                "SECRET_KEY is not set; using an ephemeral key, issued links will not survive a restart"
            );
            hex::encode(rand::random::<[u8; 32]>())
        }
    };
    let codec = Arc::new(TokenCodec::new(&secret_key)?);

    let webhook = match std::env::var("WEBHOOK_URL") {
        Ok(url) if !url.trim().is_empty() => {
            let sender = WebhookSender::new(url.trim())?;
            tracing::info!("Clinic webhook delivery enabled");
            Some(sender)
        }
        _ => {
            tracing::info!(
                "WEBHOOK_URL is not set; submissions will be acknowledged without forwarding"
            );
            None
        }
    };

    let sms = match (
        std::env::var("SMS_API_ENDPOINT"),
        std::env::var("SMS_API_KEY"),
        std::env::var("SMS_FROM_NUMBER"),
    ) {
        (Ok(endpoint), Ok(key), Ok(from)) => {
            match SmsConfig::new(endpoint, key, from).and_then(SmsClient::new) {
                Ok(client) => {
                    tracing::info!("SMS delivery enabled");
                    Some(client)
                }
                Err(e) => {
                    tracing::warn!("SMS configuration rejected: {}", e);
                    None
                }
            }
        }
        _ => {
            tracing::info!("SMS delivery not configured");
            None
        }
    };

    let state = RelayState {
        codec,
        public_base_url,
        webhook,
        sms,
        standard: Arc::new(IntakeProfile::standard()?),
        pediatric: Arc::new(IntakeProfile::pediatric()?),
    };

    tracing::info!("++ Starting intake relay on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, build_router(state)).await?;

    Ok(())
}
