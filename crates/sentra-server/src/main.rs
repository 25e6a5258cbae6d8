//! Sentra Server — Application entry point.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use sentra_core::SystemClock;
use sentra_session::{SessionConfig, SessionService};
use sentra_store::{
    MemoryActivityRepository, MemoryAuditSink, MemoryDeviceRepository,
    MemoryMembershipRepository, MemoryPolicyRepository, MemoryRevocationStore,
    MemorySessionRepository, StaticGeoLookup,
};
use sentra_token::TokenConfig;

mod routes;
mod seed;
mod state;

use state::AppState;

const SWEEP_INTERVAL_SECS: u64 = 60;

fn env_or_exit(key: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => {
            tracing::error!(key, "required environment variable is missing");
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("sentra=info".parse().unwrap()))
        .json()
        .init();

    tracing::info!("Starting Sentra server...");

    // A signing key pair must be provisioned explicitly. There is no
    // fallback default.
    let signing_key = env_or_exit("SENTRA_SIGNING_KEY_PEM");
    let verifying_key = env_or_exit("SENTRA_VERIFYING_KEY_PEM");
    let mut token_config = TokenConfig::new(signing_key, verifying_key);
    if let Ok(issuer) = std::env::var("SENTRA_ISSUER") {
        token_config.issuer = issuer;
    }
    if let Ok(audience) = std::env::var("SENTRA_AUDIENCE") {
        token_config.audience = audience;
    }

    let clock = Arc::new(SystemClock);
    let sessions = Arc::new(MemorySessionRepository::new(clock.clone()));
    let revocations = Arc::new(MemoryRevocationStore::new());
    let devices = Arc::new(MemoryDeviceRepository::new());
    let memberships = Arc::new(MemoryMembershipRepository::new());
    let policies = Arc::new(MemoryPolicyRepository::new());
    let activity = Arc::new(MemoryActivityRepository::new());
    let audit = Arc::new(MemoryAuditSink::new());
    let geo = Arc::new(StaticGeoLookup::new());

    if let Ok(path) = std::env::var("SENTRA_SEED_FILE") {
        if let Err(e) = seed::apply(&PathBuf::from(&path), &memberships, &policies, &geo) {
            tracing::error!(path, error = %e, "seeding failed");
            std::process::exit(1);
        }
    }

    let engine = match SessionService::new(
        sessions,
        revocations,
        devices,
        memberships,
        policies,
        activity,
        audit,
        geo,
        token_config,
        SessionConfig::default(),
        clock,
    ) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            tracing::error!(error = %e, "engine initialization failed");
            std::process::exit(1);
        }
    };

    // Background expiry sweeper.
    {
        let engine = engine.clone();
        tokio::spawn(async move {
            loop {
                match engine.sweep().await {
                    Ok((expired, pruned)) if expired > 0 || pruned > 0 => {
                        tracing::debug!(expired, pruned, "sweep");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "sweep failed"),
                }
                tokio::time::sleep(Duration::from_secs(SWEEP_INTERVAL_SECS)).await;
            }
        });
    }

    let port: u16 = std::env::var("SENTRA_HTTP_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    let app = routes::router(AppState { engine });

    tracing::info!(%addr, "listening");
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "bind failed");
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server error");
    }

    tracing::info!("Sentra server stopped.");
}
