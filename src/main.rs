// src/main.rs

use std::sync::Arc;

use hirehub::config::Config;
use hirehub::notify::{HttpNotifier, NoopNotifier, Notifier};
use hirehub::remote::RestBackend;
use hirehub::routes;
use hirehub::state::AppState;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load configuration from environment (.env included)
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {:?}", e);
            std::process::exit(1);
        }
    };

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let backend = match RestBackend::new(&config) {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            tracing::error!("Failed to build backend client: {:?}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("Using managed backend at {}", config.backend_url);

    let notifier: Arc<dyn Notifier> = match &config.notify_url {
        Some(url) => {
            tracing::info!("Notifications enabled ({})", url);
            Arc::new(HttpNotifier::new(
                reqwest::Client::new(),
                url.clone(),
                config.backend_service_key.clone(),
            ))
        }
        None => {
            tracing::info!("NOTIFY_URL not set, notifications disabled");
            Arc::new(NoopNotifier)
        }
    };

    let addr = config.listen_addr;
    let state = AppState::new(config, backend, notifier);

    // Create the Axum application router
    let app = routes::create_router(state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("Listening on {}", addr);

    // Start the server
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
