//! QR Code Manager - an HTTP service for QR code images.
//!
//! This binary loads configuration, prepares the image directory and starts
//! the HTTP server.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qr_code_manager::{
    config::Config,
    qr::QrService,
    server::{auth::JwtAuthority, create_router, RouterConfig},
    store::QrStore,
};

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine; real environment variables still apply
    dotenvy::dotenv().ok();

    let config = Config::parse();
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    // validate() has already accepted the algorithm
    let algorithm = match config.jwt_algorithm() {
        Ok(algorithm) => algorithm,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("QR Code Manager v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  QR directory: {}", config.qr_directory.display());
    info!("  Base URL: {}", config.base_url);
    info!("  Download folder: /{}", config.download_folder.trim_matches('/'));
    info!("  Colours: {} on {}", config.fill_color, config.back_color);
    info!(
        "  Auth: {:?} tokens, {} minute lifetime",
        algorithm, config.token_expire_minutes
    );

    let store = QrStore::new(&config.qr_directory);
    if let Err(e) = store.ensure_directory().await {
        error!("Failed to prepare QR directory: {}", e);
        return ExitCode::FAILURE;
    }

    let authority = JwtAuthority::new(
        config.secret_key_or_empty(),
        config.admin_user.clone(),
        config.admin_password.clone(),
    )
    .with_algorithm(algorithm)
    .with_ttl(config.token_ttl());

    let router = match create_router(
        QrService::new(store),
        authority,
        build_router_config(&config),
    ) {
        Ok(router) => router,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Get a token:");
    info!(
        "    curl -d 'username=<user>&password=<password>' http://{}/token",
        addr
    );
    info!("  List QR codes:");
    info!(
        "    curl -H 'Authorization: Bearer <token>' http://{}/qr-codes/",
        addr
    );
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "qr_code_manager=debug,tower_http=debug"
    } else {
        "qr_code_manager=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::new(config.base_url.clone())
        .with_download_folder(config.download_folder.clone())
        .with_colors(config.fill_color.clone(), config.back_color.clone());

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!config.no_tracing)
}
