use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use pitchboard::{config, db, intake, maint, pipeline, sanity, session, web};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| format!("sqlite://{}/pitchboard.db", cfg.app.data_dir));

    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    let store = Arc::new(sanity::SanityClient::from_config(&cfg)?);
    let sessions = session::DbSessions::new(pool.clone(), cfg.app.session_ttl_hours);
    let intake = intake::Intake::new(pool.clone(), cfg.staging_dir());
    let pipeline = pipeline::Pipeline::new(
        Arc::new(sessions.clone()),
        store.clone(),
        store.clone(),
    );

    // Spawn the maintenance sweeper (expired sessions and stagings).
    let sweep_pool = pool.clone();
    let sweep_intake = intake.clone();
    let sweep_interval = Duration::from_secs(cfg.app.sweep_interval_secs);
    let staging_ttl = cfg.app.staging_ttl_minutes;
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(sweep_interval).await;
            if let Err(err) = maint::run_sweep(&sweep_pool, &sweep_intake, staging_ttl).await {
                error!(?err, "maintenance sweep error");
            }
        }
    });

    let bind_addr = cfg.app.bind_addr.clone();
    let state = Arc::new(web::AppState::new(
        cfg,
        intake,
        pipeline,
        store,
        sessions,
    ));
    let app = web::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "starting pitchboard server");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
