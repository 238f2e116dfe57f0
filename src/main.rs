use std::net::SocketAddr;
use std::time::Duration;

use reqwest::Client;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trudify_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    middleware::cors::webapp_cors,
    routes,
    services::{scheduler, telegram_service},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let http_client = Client::builder()
        .timeout(Duration::from_secs(15))
        .build()?;
    let app_state = AppState::new(pool, http_client, config);

    {
        let telegram = app_state.telegram_service.clone();
        let webhook_url = telegram_service::webhook_url(&config.api_public_url);
        let secret = config.telegram_webhook_secret.clone();
        tokio::spawn(async move {
            info!("Checking Telegram webhook status...");
            if let Err(e) = telegram.ensure_webhook(&webhook_url, secret.as_deref()).await {
                tracing::warn!(error = ?e, "Could not register Telegram webhook");
            }
        });
    }

    let _scheduler = scheduler::start(
        app_state.review_service.clone(),
        app_state.user_service.clone(),
    )
    .await?;

    let api = routes::api_router(app_state, config).layer(webapp_cors(&config.webapp_url));
    let app = routes::with_locale(api).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
