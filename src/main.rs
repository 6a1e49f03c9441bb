#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

use std::net::SocketAddr;
use tokio::sync::watch;
use tracing::Instrument;
use vitrinex_conversations::api::MgmtState;
use vitrinex_conversations::config::Config;
use vitrinex_conversations::services::feed_service::FeedService;
use vitrinex_conversations::services::health_service::HealthService;
use vitrinex_conversations::services::message_service::MessageService;
use vitrinex_conversations::storage::conversation_repo::ConversationRepository;
use vitrinex_conversations::storage::message_repo::MessageRepository;
use vitrinex_conversations::{api, storage, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load();
    telemetry::init_telemetry(&config.telemetry)?;

    let boot_span = tracing::info_span!("boot_server");
    let (api_listener, mgmt_listener, app_router, mgmt_app, shutdown_tx) = async {
        // Phase 1: infrastructure
        let pool = storage::init_pool(&config.database_url).await?;
        storage::run_migrations(&pool).await?;

        let (shutdown_tx, _shutdown_rx) = watch::channel(false);
        vitrinex_conversations::spawn_signal_handler(shutdown_tx.clone());

        // Phase 2: component wiring
        let conversations = ConversationRepository::new();
        let messages = MessageRepository::new();
        let message_service = MessageService::new(
            pool.clone(),
            conversations.clone(),
            messages,
            config.messaging.clone(),
        );
        let feed_service = FeedService::new(pool.clone(), conversations, config.feed.clone());
        let health_service = HealthService::new(pool, config.health.clone());

        // Phase 3: listeners and routers
        let app_router = api::app_router(config.clone(), message_service, feed_service);
        let mgmt_app = api::mgmt_router(MgmtState { health_service });

        let api_addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
        let mgmt_addr: SocketAddr = format!("{}:{}", config.server.host, config.server.mgmt_port).parse()?;

        tracing::info!(address = %api_addr, "listening");
        tracing::info!(address = %mgmt_addr, "management server listening");

        let api_listener = tokio::net::TcpListener::bind(api_addr).await?;
        let mgmt_listener = tokio::net::TcpListener::bind(mgmt_addr).await?;

        Ok::<_, anyhow::Error>((api_listener, mgmt_listener, app_router, mgmt_app, shutdown_tx))
    }
    .instrument(boot_span)
    .await?;

    // Phase 4: serve until shutdown
    let mut api_rx = shutdown_tx.subscribe();
    let api_server = axum::serve(api_listener, app_router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            let _ = api_rx.wait_for(|&s| s).await;
        });

    let mut mgmt_rx = shutdown_tx.subscribe();
    let mgmt_server = axum::serve(mgmt_listener, mgmt_app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            let _ = mgmt_rx.wait_for(|&s| s).await;
        });

    if let Err(e) = tokio::try_join!(api_server, mgmt_server) {
        tracing::error!(error = %e, "Server error");
    }

    Ok(())
}
