use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    extract::FromRef,
    http::{Request, Response},
    middleware,
    routing::get,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use warden_auth::{AuthService, AuthState, InMemoryUserStorage, UserStorage, auth_routes};
use warden_auth_postgres::PostgresUserStorage;
use warden_notifications::{LogNotifier, NotificationDispatcher, Notifier, SmtpNotifier};

use crate::config::{AppConfig, StorageBackend};
use crate::{handlers, middleware as app_middleware};

// =============================================================================
// Application State
// =============================================================================

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthState,
}

impl AppState {
    pub fn new(service: Arc<AuthService>) -> Self {
        Self {
            auth: AuthState::new(service),
        }
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

// =============================================================================
// Wiring
// =============================================================================

/// Opens the configured user store.
pub async fn build_storage(cfg: &AppConfig) -> anyhow::Result<Arc<dyn UserStorage>> {
    match cfg.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory user storage; accounts are lost on restart");
            Ok(Arc::new(InMemoryUserStorage::new()))
        }
        StorageBackend::Postgres => {
            let pg = cfg
                .storage
                .postgres
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("storage.postgres is not configured"))?;
            let pool = warden_auth_postgres::connect(&pg.url, pg.pool_size).await?;
            let storage = PostgresUserStorage::new(Arc::new(pool));
            if pg.ensure_schema {
                storage.ensure_schema().await?;
            }
            Ok(Arc::new(storage))
        }
    }
}

/// Picks the notifier: SMTP when configured, logging otherwise.
pub fn build_notifier(cfg: &AppConfig) -> anyhow::Result<Arc<dyn Notifier>> {
    match &cfg.notifications.smtp {
        Some(smtp) => {
            tracing::info!(host = %smtp.host, port = smtp.port, "Welcome emails sent over SMTP");
            Ok(Arc::new(SmtpNotifier::new(smtp)?))
        }
        None => {
            tracing::info!("SMTP not configured, welcome notifications are only logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}

/// Builds the account service over an already opened store.
pub fn build_auth_service(
    cfg: &AppConfig,
    storage: Arc<dyn UserStorage>,
    notifier: Arc<dyn Notifier>,
) -> anyhow::Result<Arc<AuthService>> {
    if cfg.auth.token.uses_development_secret() {
        tracing::warn!("auth.token.secret is the development default; set WARDEN__AUTH__TOKEN__SECRET");
    }

    let service = AuthService::builder(storage)
        .with_config(cfg.auth.clone())
        .with_dispatcher(NotificationDispatcher::new(cfg.notifications.max_concurrent))
        .with_notifier(notifier)
        .build()?;

    Ok(Arc::new(service))
}

pub fn build_app(cfg: &AppConfig, service: Arc<AuthService>) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .merge(auth_routes::<AppState>())
        .fallback(handlers::not_found)
        .with_state(AppState::new(service))
        // Layers run bottom-up: request id first so the trace span can see it
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .extensions()
                        .get::<app_middleware::RequestId>()
                        .and_then(|id| id.0.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                        span.record("http.status_code", tracing::field::display(res.status().as_u16()));
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(middleware::from_fn(app_middleware::request_id))
}

// =============================================================================
// Server
// =============================================================================

pub struct WardenServer {
    addr: SocketAddr,
    app: Router,
    config: AppConfig,
    service: Arc<AuthService>,
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub async fn build(self) -> anyhow::Result<WardenServer> {
        let storage = build_storage(&self.config).await?;
        let notifier = build_notifier(&self.config)?;
        let service = build_auth_service(&self.config, storage, notifier)?;
        let app = build_app(&self.config, service.clone());

        Ok(WardenServer {
            addr: self.addr,
            app,
            config: self.config,
            service,
        })
    }
}

impl WardenServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        drain_notifications(&self.service, &self.config).await;
        Ok(())
    }
}

/// Waits for queued welcome notifications before the process exits.
pub async fn drain_notifications(service: &AuthService, cfg: &AppConfig) {
    let dispatcher = service.dispatcher();
    tracing::info!(
        in_flight = dispatcher.in_flight(),
        timeout = ?cfg.notifications.drain_timeout,
        "draining notifications"
    );
    match dispatcher.shutdown(cfg.notifications.drain_timeout).await {
        Ok(()) => {
            let stats = dispatcher.stats();
            tracing::info!(
                submitted = stats.submitted,
                failed = stats.failed,
                "notifications drained"
            );
        }
        Err(e) => tracing::warn!(error = %e, "notification drain incomplete"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
