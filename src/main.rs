use eventhub::{
    AppState, AuditEmitter, AuditTaxonomy, AuthorizationGate, EventoService, PostgresRepository,
    ReservaService,
    audit::{PersistAuditListener, TracingAuditListener, WebhookAuditListener},
    config::{AppConfig, Env},
    create_router,
    rbac::RoleResolverState,
    repository::{AuditStoreState, EventoRepositoryState, ReservaRepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Startup wiring: configuration, logging, database, the audit emitter and
/// its listeners, the authorization gate, then the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing production secrets)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "eventhub=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Database
    let pool = match PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "failed to connect to Postgres, check DATABASE_URL");
            std::process::exit(1);
        }
    };

    let repo = Arc::new(PostgresRepository::new(pool));

    // 4. Audit emitter. The listener set is fixed from here on.
    let mut builder = AuditEmitter::builder(AuditTaxonomy::standard())
        .subscribe(PersistAuditListener::new(repo.clone() as AuditStoreState))
        .subscribe(TracingAuditListener);
    if let Some(url) = config.audit_webhook_url.as_deref() {
        tracing::info!(url, "forwarding audit entries to webhook");
        builder = builder.subscribe(WebhookAuditListener::new(url));
    }
    let audit = builder.build();

    tracing::info!(
        events = audit.taxonomy().len(),
        listeners = audit.listener_count(),
        "audit emitter ready"
    );

    // 5. Services and state
    let app_state = AppState {
        eventos: EventoService::new(repo.clone() as EventoRepositoryState, audit.clone()),
        reservas: ReservaService::new(repo.clone() as ReservaRepositoryState, audit.clone()),
        gate: AuthorizationGate::new(repo as RoleResolverState),
        audit,
        config: config.clone(),
    };

    // 6. Router and server
    let app = create_router(app_state);

    let listener = match TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %config.bind_addr, error = %e, "failed to bind");
            std::process::exit(1);
        }
    };

    tracing::info!("Listening on {}", config.bind_addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server terminated");
    }
}
