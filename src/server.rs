use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    routing::{delete, get, patch, post},
};
use tokio::{net::TcpListener, signal};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use utoipa::OpenApi;

use std::sync::Arc;

use crate::{config::ServerConfig, error::StartupError, handlers::rest, service::NoteService};

pub fn build_router(service: Arc<NoteService>, config: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/note", post(rest::create_note))
        .route("/note/{id}", get(rest::get_one_note))
        .route("/notes", get(rest::get_all_notes))
        .route("/note/{id}", patch(rest::update_note))
        .route("/note/{id}", delete(rest::delete_note));

    if config.expose_openapi {
        router = router.route("/api-doc/openapi.json", get(openapi_json));
    }

    router
        .with_state(service)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
}

pub async fn bind(addr: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// Serves until Ctrl-C or SIGTERM, then lets in-flight requests finish.
pub async fn serve(listener: TcpListener, router: Router) -> Result<(), StartupError> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Note service listening on {}", addr);
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(rest::ApiDoc::openapi())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
