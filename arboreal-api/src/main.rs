use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arboreal_api::{app, sweeper::start_draft_sweeper, AppState};
use arboreal_core::pms::PmsClient;
use arboreal_order::DraftRepository;
use arboreal_store::{app_config::Config, HttpPmsClient, InMemoryDraftStore, RedisDraftStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "arboreal_api=debug,arboreal_order=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!("Starting Arboreal booking API on port {}", config.server.port);

    let ttl = config.booking.draft_ttl_seconds;
    let drafts: Arc<dyn DraftRepository> = match &config.redis.url {
        Some(url) => {
            tracing::info!("Booking drafts stored in Redis");
            Arc::new(RedisDraftStore::new(url, ttl).await?)
        }
        None => {
            tracing::warn!("No Redis URL configured, booking drafts kept in memory");
            Arc::new(InMemoryDraftStore::new(ttl))
        }
    };

    let pms: Arc<dyn PmsClient> = Arc::new(HttpPmsClient::new(
        &config.pms.base_url,
        Duration::from_secs(config.pms.timeout_seconds),
    )?);
    tracing::info!("PMS at {}", config.pms.base_url);

    let state = AppState::new(drafts, pms, &config.resiliency);
    start_draft_sweeper(
        state.bookings.clone(),
        Duration::from_secs(config.booking.sweep_interval_seconds.max(1)),
    );
    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
