use std::sync::Arc;

use clap::Parser;
use library_manager::auth::Authenticator;
use library_manager::config::{Cli, Config, default_config_dir, default_config_path};
use library_manager::db::Database;
use library_manager::handler::AppState;
use library_manager::routes;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    dotenvy::dotenv().ok();

    // With --config, the database lives next to the config file.
    // Otherwise both live in ~/.library-manager/
    let (config_path, data_dir) = match args.config_path {
        Some(path) => {
            let path = std::path::PathBuf::from(path);
            let dir = path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| std::path::PathBuf::from("."));
            (path, dir)
        }
        None => {
            let dir = default_config_dir();
            (default_config_path(), dir)
        }
    };

    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        eprintln!("failed to create data directory {:?}: {}", data_dir, e);
        std::process::exit(1);
    }

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    tracing::info!("library-manager.svc starting");

    let cfg = Config::new(&config_path.to_string_lossy()).unwrap_or_else(|e| {
        tracing::error!(error = %e, path = ?config_path, "failed to load config file");
        std::process::exit(1);
    });
    let db = Arc::new(Database::new(&cfg, &data_dir).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup database");
        std::process::exit(1);
    }));
    let auth = Arc::new(Authenticator::new(&cfg.auth));
    tracing::info!(
        replica = db.is_replica(),
        users = cfg.auth.users.len(),
        token_header = auth.header(),
        "library-manager.svc configured"
    );

    let address = format!("0.0.0.0:{}", cfg.app.get_port());
    let app = routes::app(AppState { db: db.clone(), auth });

    let listener = tokio::net::TcpListener::bind(&address).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup tcp listener");
        std::process::exit(1);
    });

    tracing::info!("library-manager.svc running on {}", &address);
    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(err) = result {
                tracing::error!(error = %err, "server exited with error");
                std::process::exit(1);
            }
        }
        _ = signal::ctrl_c() => {
            tracing::info!("ctrl+c signal received, preparing to shutdown");
        }
    }

    // Push any writes still pending to the remote primary.
    if let Err(e) = db.sync().await {
        tracing::warn!(error = %e, "final database sync failed");
    }
    tracing::info!("library-manager.svc going off, graceful shutdown complete");
}
