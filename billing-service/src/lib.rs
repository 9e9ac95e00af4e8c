pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::middleware::from_fn;
use axum::{
    routing::{get, post},
    Router,
};
use secrecy::ExposeSecret;
use service_core::middleware::{metrics::metrics_middleware, tracing::request_id_middleware};
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;

use config::Config;
use services::{init_metrics, Database};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
}

pub struct Application {
    port: u16,
    router: Router,
}

impl Application {
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let db = Database::new(
            config.database.url.expose_secret(),
            config.database.max_connections,
            config.database.min_connections,
        )
        .await?;

        db.run_migrations().await?;

        init_metrics();

        let state = AppState {
            db,
            config: config.clone(),
        };

        let router = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/ready", get(handlers::readiness_check))
            .route("/metrics", get(handlers::metrics_endpoint))
            // Invoice endpoints (tenant-scoped)
            .route(
                "/invoices",
                post(handlers::invoices::generate_invoice).get(handlers::invoices::list_invoices),
            )
            .route(
                "/invoices/:id",
                get(handlers::invoices::get_invoice)
                    .patch(handlers::invoices::update_invoice)
                    .delete(handlers::invoices::delete_invoice),
            )
            .route(
                "/invoices/:id/payments",
                post(handlers::payments::record_invoice_payment)
                    .get(handlers::invoices::list_invoice_payments),
            )
            // Payment endpoints (tenant-scoped)
            .route(
                "/payments",
                post(handlers::payments::create_payment).get(handlers::payments::list_payments),
            )
            .route("/payments/:id", get(handlers::payments::get_payment))
            .layer(from_fn(metrics_middleware))
            .layer(from_fn(request_id_middleware))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        version = ?request.version(),
                    )
                }),
            )
            .with_state(state);

        Ok(Self {
            port: config.server.port,
            router,
        })
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        tracing::info!("Listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router).await?;

        Ok(())
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}
