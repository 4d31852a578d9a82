use std::sync::Arc;

use appointment_board::{
    config::Config,
    db,
    models::AppState,
    routes,
    source::{AppointmentSource, memory::MemorySource, postgres::PgSource},
};

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use axum::http::header;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cfg = Config::from_env()?;

    let source: Arc<dyn AppointmentSource> = match (&cfg.database_url, &cfg.seed_file) {
        (Some(url), _) => {
            let pool = db::connect_pg(url, cfg.db_max_connections).await?;
            Arc::new(PgSource::new(pool, cfg.clinic_offset))
        }
        (None, Some(seed)) => Arc::new(MemorySource::from_seed_file(seed, cfg.clinic_offset).await?),
        (None, None) => {
            tracing::warn!("DATABASE_URL and SEED_FILE unset; serving an empty in-memory board");
            Arc::new(MemorySource::new(vec![]))
        }
    };

    let state = AppState {
        source,
        clinic_offset: cfg.clinic_offset,
    };

    // The scheduling front end is served from another origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let app = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    tracing::info!(
        offset = %cfg.clinic_offset,
        "Listening on http://{}",
        cfg.bind_addr
    );
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
