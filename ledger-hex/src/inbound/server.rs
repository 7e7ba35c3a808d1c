//! HTTP Server configuration and startup.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    middleware,
    response::Response,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use ledger_types::{ErrorKind, LedgerStore};

use super::handlers::{
    self, AppState, INTERNAL_MESSAGE, REQUEST_ID_HEADER, attach_request_id, error_response,
};
use crate::openapi::ApiDoc;

/// HTTP Server for the Ledger API.
pub struct HttpServer<S: LedgerStore> {
    state: Arc<AppState<S>>,
}

impl<S: LedgerStore> HttpServer<S> {
    pub fn new(state: AppState<S>) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Token cancelled once shutdown starts; in-flight transfers observe it.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.state.shutdown.clone()
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        // Build HTTP metrics layer (uses globally set MeterProvider)
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();

        Router::new()
            .route("/health", get(handlers::health))
            .route("/ready", get(handlers::ready::<S>))
            .route("/api/v1/accounts", post(handlers::create_account::<S>))
            .route("/api/v1/accounts/{id}", get(handlers::get_account::<S>))
            .route(
                "/api/v1/accounts/{id}/transactions",
                get(handlers::list_transactions::<S>),
            )
            .route(
                "/api/v1/transactions",
                post(handlers::create_transaction::<S>),
            )
            .route(
                "/api/v1/transactions/{id}",
                get(handlers::get_transaction::<S>),
            )
            .with_state(self.state.clone())
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(middleware::from_fn(attach_request_id))
            .layer(metrics)
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id,
                )
            }))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Runs the server on the given address until SIGINT/SIGTERM.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serves on an already bound listener until `signal` resolves.
    ///
    /// When the signal fires the shutdown token is cancelled, so transfers
    /// still backing off give up, then axum drains open connections.
    pub async fn serve<F>(self, listener: TcpListener, signal: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!("Server listening on {}", listener.local_addr()?);

        let token = self.shutdown_token();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                signal.await;
                token.cancel();
            })
            .await?;

        tracing::info!("server stopped");
        Ok(())
    }
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!(panic = %detail, "handler panicked");

    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::InternalError.code(),
        INTERNAL_MESSAGE,
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
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

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
