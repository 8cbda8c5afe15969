use pmo_tracker_server::{
    AppState,
    config::ServerConfig,
    db::{AuditRepository, NotificationRepository, ProjectRepository, UserRepository},
    oracle::build_oracle,
    router,
};
use pmo_tracker_workflow::WorkflowEngine;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!(policy = ?config.workflow.approval_policy, "Loaded configuration");

    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("failed to run migrations");

    let spicedb = config
        .authz
        .spicedb()
        .expect("invalid authorization configuration");
    let oracle = build_oracle(spicedb, UserRepository::new(db_pool.clone()))
        .await
        .expect("failed to initialize authorization");

    let audit = AuditRepository::new(db_pool.clone());
    let engine = WorkflowEngine::new(
        Arc::new(ProjectRepository::new(db_pool.clone())),
        Arc::new(UserRepository::new(db_pool.clone())),
        Arc::new(audit.clone()),
        Arc::new(NotificationRepository::new(db_pool)),
        oracle,
    )
    .with_policy(config.workflow.approval_policy);

    let app = router(AppState::new(engine, Arc::new(audit)));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
