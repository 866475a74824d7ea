use anyhow::Context;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::auth::{generate_jwt, Claims};
use crate::config::{config, StorageBackend};
use crate::database::{self, PgStore};
use crate::handlers::AppState;

#[derive(Parser)]
#[command(name = "devflow")]
#[command(about = "DevFlow API - Q&A backend server and maintenance commands")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP API (default)")]
    Serve {
        #[arg(long, help = "Port to bind (overrides DEVFLOW_API_PORT / PORT)")]
        port: Option<u16>,
    },

    #[command(about = "Apply pending database migrations (postgres backend only)")]
    Migrate,

    #[command(about = "Mint a development bearer token with the configured secret")]
    Token {
        #[arg(long, help = "User id placed in the `sub` claim")]
        user: Uuid,
        #[arg(long, default_value = "Dev User", help = "Display name")]
        name: String,
        #[arg(long, help = "Email address (defaults to <user>@devflow.local)")]
        email: Option<String>,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => serve(port).await,
        Commands::Migrate => migrate().await,
        Commands::Token { user, name, email } => token(user, name, email),
    }
}

async fn serve(port: Option<u16>) -> anyhow::Result<()> {
    let config = config();
    tracing::info!(
        "Starting DevFlow API in {:?} mode with {:?} storage",
        config.environment,
        config.database.backend
    );
    if crate::is_production!() && config.database.backend == StorageBackend::Memory {
        tracing::warn!("In-memory storage selected in production; all data is lost on restart");
    }

    let store = database::connect(&config.database)
        .await
        .context("failed to initialize storage")?;
    let app = crate::app::app(AppState::new(store));

    let bind_addr = format!("0.0.0.0:{}", port.unwrap_or(config.api.port));
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("DevFlow API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("DevFlow API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

async fn migrate() -> anyhow::Result<()> {
    let db = &config().database;
    if db.backend != StorageBackend::Postgres {
        anyhow::bail!("migrate requires DATABASE_BACKEND=postgres");
    }
    let store = PgStore::connect(db).await?;
    store.migrate().await?;
    store.close().await;
    println!("Migrations applied");
    Ok(())
}

fn token(user: Uuid, name: String, email: Option<String>) -> anyhow::Result<()> {
    let email = email.unwrap_or_else(|| format!("{}@devflow.local", user));
    let claims = Claims::new(user, name, email);
    let token = generate_jwt(&claims)?;
    println!("{}", token);
    Ok(())
}
