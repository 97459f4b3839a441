//! Userdesk - user registration, login and role-gated account management

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;

use config::{BootstrapAdmin, Config, LoggingConfig};
use userdesk_api::{AppState, Pagination, cors_layer, create_router};
use userdesk_auth::{TokenManager, hash_password};
use userdesk_db::{ADMIN_ROLE_ID, Database, DatabaseOptions, DbError, NewUser};

/// Userdesk - user accounts and authentication service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Bind address
    #[arg(long, env = "USERDESK_BIND")]
    bind: Option<String>,

    /// Port
    #[arg(short, long, env = "USERDESK_PORT")]
    port: Option<u16>,

    /// Database URL
    #[arg(long, env = "USERDESK_DATABASE_URL")]
    database_url: Option<String>,

    /// Secret used to sign tokens
    #[arg(long, env = "USERDESK_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)?;
    if let Some(url) = args.database_url {
        config.database.url = url;
    }
    if let Some(secret) = args.jwt_secret {
        config.auth.jwt_secret = secret;
    }
    config.validate()?;

    init_logging(&config.logging);

    info!("Starting Userdesk v{}", env!("CARGO_PKG_VERSION"));

    if config.auth.uses_default_secret() {
        warn!("Using the default JWT secret; set auth.jwt_secret or USERDESK_JWT_SECRET");
    }

    // SQLite creates the file but not its directory
    if let Some(path) = config.database.file_path()
        && let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let db = Database::connect(
        &config.database.url,
        DatabaseOptions {
            max_connections: config.database.max_connections,
            acquire_timeout: std::time::Duration::from_secs(config.database.acquire_timeout_secs),
        },
    )
    .await?;

    if let Some(admin) = &config.auth.bootstrap_admin {
        bootstrap_admin(&db, admin).await?;
    }

    let tokens = Arc::new(TokenManager::new(
        &config.auth.jwt_secret,
        config.auth.access_ttl()?,
        config.auth.refresh_ttl()?,
    ));

    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    let state = AppState::new(
        db.clone(),
        tokens,
        Pagination {
            default_page_size: config.pagination.default_page_size,
            max_page_size: config.pagination.max_page_size,
        },
    );

    let app = create_router(state, Some(Arc::new(metrics_handle)))
        .layer(cors_layer(&config.cors.allowed_origins))
        .layer(TraceLayer::new_for_http());

    let bind_addr = args.bind.unwrap_or(config.server.bind_address);
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", bind_addr, port).parse()?;

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server stopped");
    Ok(())
}

/// Initialize logging; `RUST_LOG` takes precedence over the configured level
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Create the configured administrator unless an active one already exists
async fn bootstrap_admin(db: &Database, admin: &BootstrapAdmin) -> Result<()> {
    if db.has_admin().await? {
        return Ok(());
    }

    info!("No active administrator found, creating {}", admin.username);

    let password_hash = hash_password(&admin.password)?;
    let result = db
        .insert_user(NewUser {
            email: admin.email.clone(),
            username: admin.username.clone(),
            password_hash,
            first_name: admin.first_name.clone(),
            middle_name: None,
            last_name: admin.last_name.clone(),
            phone_number: admin.phone_number.clone(),
            phone_number2: None,
            role_id: ADMIN_ROLE_ID,
            is_active: true,
        })
        .await;

    match result {
        Ok(user) => {
            info!("Administrator {} created", user.username);
            Ok(())
        }
        Err(DbError::Conflict(msg)) => {
            warn!("Bootstrap administrator not created: {}", msg);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
