pub mod config;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod server;

pub use config::{
    AppConfig, LoggingConfig, PostgresStorageConfig, ServerConfig, StorageBackend, StorageConfig,
};
pub use observability::init_tracing;
pub use server::{
    AppState, ServerBuilder, WardenServer, build_app, build_auth_service, build_notifier,
    build_storage, drain_notifications,
};
