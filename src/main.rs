//! Wicket - stateless cookie-session authentication gateway

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wicket::{
    config::Args,
    db::MongoAccountStore,
    server::{self, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("wicket={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration; a short sealing key is fatal
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Wicket - Authentication Gateway");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Protected routes: {:?}", args.protected_routes);
    info!("Callback route: {}", args.callback_route);
    info!(
        "Callback redirect: {}",
        args.callback_redirect.as_deref().unwrap_or("disabled")
    );
    info!(
        "Cookie: {} (ttl {}s, secure={})",
        args.cookie_name, args.cookie_expiration_secs, args.secure
    );
    info!(
        "MongoDB: {} (db '{}', collection '{}')",
        args.mongodb_uri, args.mongodb_db, args.mongodb_collection
    );
    info!("======================================");

    // The store connects lazily; the first request that needs it
    // establishes the shared client
    let store = Arc::new(MongoAccountStore::new(
        args.mongodb_uri.clone(),
        args.mongodb_db.clone(),
        args.mongodb_collection.clone(),
    ));

    let state = AppState::new(args, store)?;

    server::run(Arc::new(state)).await?;

    Ok(())
}
