use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use voicebook::config::AppConfig;
use voicebook::handlers;
use voicebook::services::booking_flow::BookingFlowController;
use voicebook::services::contact::ContactExtractor;
use voicebook::services::scheduling::calcom::CalComGateway;
use voicebook::services::session_store::InMemorySessionStore;
use voicebook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let gateway = CalComGateway::new(&config)?;
    tracing::info!(base_url = %config.cal_com_base_url, "using Cal.com scheduling gateway");
    if !config.email_hints.is_empty() {
        tracing::info!(count = config.email_hints.len(), "loaded email dictation hints");
    }

    let booking = BookingFlowController::new(Arc::new(gateway), Arc::new(InMemorySessionStore::new()))
        .with_extractor(ContactExtractor::with_hints(config.email_hints.clone()))
        .with_booking_note(config.booking_note.clone());

    let state = Arc::new(AppState {
        config: config.clone(),
        booking,
    });

    spawn_session_sweeper(Arc::clone(&state));

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn spawn_session_sweeper(state: Arc<AppState>) {
    let ttl = chrono::Duration::minutes(state.config.session_ttl_minutes);
    let every = std::time::Duration::from_secs(state.config.session_sweep_seconds.max(1));

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            state.booking.evict_expired(ttl);
        }
    });
}
