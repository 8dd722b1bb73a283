use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use statusfeed_client::{ParserConfig, ReqwestFetcher, SelectorParser};
use statusfeed_core::{JobConfig, ObservationJob, Scheduler, TracingJobReporter};
use statusfeed_db::{Database, DatabaseConfig};
use statusfeed_server::config::{LogFormat, ServerConfig};
use statusfeed_server::routes;
use statusfeed_server::rss::Channel;
use statusfeed_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let server_config = ServerConfig::from_env()?;
    init_tracing(server_config.log_format)?;

    let job_config = JobConfig::from_env()?;
    let parser = SelectorParser::new(&ParserConfig::from_env())?;
    let fetcher = ReqwestFetcher::with_timeout(job_config.fetch_timeout)?;

    let db_config = DatabaseConfig::from_env()?;
    let db = Database::connect(&db_config).await?;
    db.migrate().await?;
    tracing::info!(backend = %db_config.backend, "Database ready");

    let catalog = db.catalog_repo().load().await?;
    tracing::info!(
        services = catalog.service_count(),
        statuses = catalog.statuses().len(),
        "Catalog loaded"
    );

    let state = Arc::new(AppState {
        db: db.clone(),
        feed_limit: server_config.feed_limit,
        channel: Channel::for_site(&job_config.site_name, &job_config.status_page_url),
    });

    let scheduler = Scheduler::new(job_config.cadence.clone());
    tracing::info!(
        url = %job_config.status_page_url,
        cadence = %job_config.cadence,
        holder = %job_config.lease.holder,
        "Status check scheduled"
    );
    let job = ObservationJob::new(
        fetcher,
        parser,
        db.status_repo(),
        db.lock(job_config.lease.clone()),
        catalog,
        job_config,
    );

    let cancel_token = CancellationToken::new();
    let scheduler_handle = {
        let cancel_token = cancel_token.clone();
        tokio::spawn(async move {
            scheduler
                .run(&job, &TracingJobReporter, cancel_token)
                .await
        })
    };

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", server_config.port);
    tracing::info!("Starting server on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stops the wait between cycles. A cycle already running finishes and
    // releases its lease before the scheduler returns.
    cancel_token.cancel();
    let cycles = scheduler_handle.await?;
    tracing::info!(%cycles, "Server stopped");

    Ok(())
}

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("statusfeed=info".parse()?);

    match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for CTRL+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("Shutdown signal received");
}
