//! # Voice Detection Backend - Main Application Entry Point
//!
//! Sets up an Actix-web HTTP server around the audio detection pipeline.
//!
//! ## Application Architecture:
//! - **config**: application configuration (TOML file + environment variables)
//! - **state**: shared application state and metrics
//! - **health**: service status and metrics endpoints
//! - **middleware**: request logging and per-endpoint metrics
//! - **handlers**: the voice-detection HTTP endpoint
//! - **detection**: the core pipeline (decode, features, classify, assemble)
//! - **error**: error taxonomy and HTTP error responses
//!
//! The server is configured once at startup from an immutable configuration
//! snapshot; request handling shares no mutable state beyond the metrics
//! counters.

mod config;
mod detection;
mod error;
mod handlers;
mod health;
mod middleware;
mod state;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Result;
use config::AppConfig;
use state::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Global shutdown signal, set by the signal handler task and polled by the
/// main task to stop the server gracefully.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

/// The main application entry point.
///
/// ## What this function does:
/// 1. Loads configuration from files and environment variables
/// 2. Sets up structured logging
/// 3. Creates the shared application state
/// 4. Configures the HTTP server (CORS, middleware, routes)
/// 5. Handles graceful shutdown on SIGTERM/SIGINT
#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting voice-detection-backend v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {}:{}", config.server.host, config.server.port);
    info!(
        "Detection: formats={:?}, centroid variance threshold={}",
        config.detection.accepted_formats, config.detection.centroid_variance_threshold
    );

    let app_state = AppState::new(config.clone());
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = build_cors(&app_state.config().security.cors_origins);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            // Malformed JSON must come back in the standard error envelope.
            .app_data(web::JsonConfig::default().error_handler(error::json_error_handler))
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(middleware::MetricsMiddleware)
            .wrap(middleware::RequestLogging)
            .route("/", web::get().to(health::root))
            .route("/health", web::get().to(health::health_check))
            .route("/metrics", web::get().to(health::detailed_metrics))
            .service(
                web::scope("/api")
                    .route("/voice-detection", web::post().to(handlers::voice_detection)),
            )
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    // Race the server against the shutdown signal.
    tokio::select! {
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Build the CORS policy from the configured origin list. A single `"*"`
/// entry allows any origin, which is the default for public tester UIs.
fn build_cors(origins: &[String]) -> Cors {
    let cors = if origins.iter().any(|origin| origin == "*") {
        Cors::default().allow_any_origin()
    } else {
        origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };

    cors.allow_any_method().allow_any_header().max_age(3600)
}

/// Initialize the tracing (logging) system.
///
/// ## Environment Variables:
/// - `RUST_LOG`: controls what gets logged; defaults to
///   "voice_detection_backend=debug,actix_web=info" when unset.
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voice_detection_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

/// Listen for SIGTERM/SIGINT and flip the global shutdown flag so current
/// requests can finish before the server stops.
fn setup_signal_handlers() {
    tokio::spawn(async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("Failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

/// Poll the shutdown flag without busy-waiting.
async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
