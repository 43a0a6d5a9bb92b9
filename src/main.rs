use drip_backend::{
    config::{get_config, init_config},
    database::{pool::create_pool, PgCampaignStore},
    routes,
    services::{
        email_dispatcher::BrevoDispatcher, recruiter_directory::PgRecruiterDirectory,
        tick_job::start_tick_job,
    },
    AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    init_config()?;
    let config = get_config();

    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let dispatcher = BrevoDispatcher::new(config.brevo.clone())?;
    let app_state = AppState::new(
        &config.drip,
        Arc::new(PgCampaignStore::new(pool.clone())),
        Arc::new(PgRecruiterDirectory::new(pool)),
        Arc::new(dispatcher),
        config.drip_api_secret.clone(),
    );

    let _jobs = start_tick_job(app_state.scheduler.clone(), &config.tick_cron).await?;

    let app = routes::router(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
