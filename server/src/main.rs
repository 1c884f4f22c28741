#![allow(dead_code)]
mod auth;
mod db_core;
mod email;
mod error;
mod model;
mod prompt;
mod request_tracing;
mod routes;
mod server_config;
mod testing;
mod util;

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::{anyhow, Context};
use auth::jwt::TokenVerifier;
use axum::extract::FromRef;
use email::{GmailClient, Mailbox};
use mimalloc::MiMalloc;
use model::{SummaryStore, UserSettingsStore};
use prompt::{EmailAgent, GeminiApi, ModelClient};
use routes::AppRouter;
use sea_orm::{ConnectOptions, Database};
use server_config::ServerConfig;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

pub type HttpClient = reqwest::Client;

#[derive(Clone, FromRef)]
struct ServerState {
    agent: EmailAgent,
    summaries: Arc<dyn SummaryStore>,
    settings: Arc<dyn UserSettingsStore>,
    /// Absent when no Gmail credentials are configured
    mailbox: Option<Arc<dyn Mailbox>>,
    verifier: Arc<TokenVerifier>,
    config: Arc<ServerConfig>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::Layer::default().with_ansi(false))
        .init();

    let config = ServerConfig::load().context("Invalid configuration")?;
    println!("{}", config);

    let db_url = env::var("DATABASE_URL").context("DATABASE_URL is not set in .env file")?;
    let mut db_options = ConnectOptions::new(db_url);
    db_options.sqlx_logging(false);

    let conn = Database::connect(db_options)
        .await
        .context("Database connection failed")?;
    model::ensure_schema(&conn).await?;

    let http_client = reqwest::ClientBuilder::new().use_rustls_tls().build()?;

    let verifier = TokenVerifier::from_config(&config.auth, http_client.clone())
        .map_err(|e| anyhow!("Could not set up token verification: {:?}", e))?;
    tracing::info!("Verifying tokens with {} keys", verifier.mode());

    let agent = EmailAgent::new(ModelClient::new(
        Arc::new(GeminiApi::new(http_client.clone(), &config.gemini)),
        config.gemini.models.clone(),
    ));

    let mailbox = config.gmail.clone().map(|gmail| {
        Arc::new(GmailClient::new(http_client.clone(), gmail)) as Arc<dyn Mailbox>
    });
    if mailbox.is_none() {
        tracing::warn!("Gmail credentials not configured, Gmail endpoints are disabled");
    }

    let (summaries, settings) = model::stores(conn);

    let port = config.server.port;
    let state = ServerState {
        agent,
        summaries,
        settings,
        mailbox,
        verifier: Arc::new(verifier),
        config: Arc::new(config),
    };

    let router = AppRouter::create(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("MailMind server running on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down, exiting");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
