use std::sync::Arc;

use techvision::{
    analytics::{self, AnalyticsState, GoogleAnalyticsClient, ServiceAccountKey},
    app::{cors_layer, serve, with_http_layers},
    config::AnalyticsConfig,
    telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing("analytics=debug,techvision=debug,tower_http=info");

    let config = AnalyticsConfig::from_env()?;
    let key = ServiceAccountKey::load(&config.service_account_file)?;
    tracing::info!(client_email = %key.client_email, property_id = %config.property_id, "analytics proxy configured");

    let client = GoogleAnalyticsClient::new(key, config.property_id.clone())?;
    let app = analytics::router(AnalyticsState {
        reports: Arc::new(client),
    });

    serve(with_http_layers(app, cors_layer(&[])), &config.host, config.port).await
}
