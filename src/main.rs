use techvision::{
    app::{build_app, serve},
    auth::services::ensure_admin,
    config::AppConfig,
    state::AppState,
    telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing("techvision=debug,axum=info,tower_http=info");

    let config = AppConfig::from_env()?;
    let state = AppState::init(config).await?;

    match state.config.admin.as_ref() {
        Some(seed) => {
            if let Err(e) = ensure_admin(state.users.as_ref(), seed).await {
                tracing::error!(error = %e, "admin seeding failed; continuing");
            }
        }
        None => tracing::warn!("ADMIN_EMAIL or ADMIN_PASSWORD not set; skipping admin seeding"),
    }

    let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port = std::env::var("APP_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(5000);

    serve(build_app(state), &host, port).await
}
