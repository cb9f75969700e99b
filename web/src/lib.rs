use axum::http::{header, HeaderValue, Method};
use log::*;
use service::config::Config;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};

mod controller;
mod error;
mod params;
pub(crate) mod router;
pub(crate) mod sse;

pub use self::error::{Error, Result};
pub use service::AppState;

/// Serves the HTTP API until `app_state.shutdown` is cancelled.
pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let interface = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_owned());
    let listen_addr = format!("{interface}:{}", app_state.config.port);

    let cors_layer = cors_layer(&app_state.config);
    let shutdown = app_state.shutdown.clone();

    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Server starting... listening for connections on http://{listen_addr}");

    axum::serve(listener, router::define_routes(app_state).layer(cors_layer))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Server stopped");
    Ok(())
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}
