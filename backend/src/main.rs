//! StageAI API server
//!
//! Wires the Postgres, Stripe, Clerk, Flux and Supabase adapters into the
//! application services and serves the HTTP API.

use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use tokio::time::{interval, Duration};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stage_ai::adapters::clerk::ClerkWebhookVerifier;
use stage_ai::adapters::flux::FluxProvider;
use stage_ai::adapters::http::{api_router, AppState};
use stage_ai::adapters::postgres::{
    PostgresGenerationRepository, PostgresJobCheckpointStore, PostgresLedgerStore,
    PostgresSubscriptionEventStore,
};
use stage_ai::adapters::stripe::StripePaymentGateway;
use stage_ai::adapters::supabase::SupabaseStorage;
use stage_ai::application::services::{CreditLedgerEngine, IdempotencyGuard, JobOrchestrator};
use stage_ai::config::AppConfig;
use stage_ai::domain::foundation::Timestamp;
use stage_ai::ports::{GenerationRepository, ObjectStorage};

const RETENTION_SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting StageAI API v{}", env!("CARGO_PKG_VERSION"));
    config.validate().context("Invalid configuration")?;

    // Database
    tracing::info!("Connecting to database...");
    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    // Adapters
    let payment_gateway = Arc::new(StripePaymentGateway::new(config.payment.stripe_config()?)?);
    let identity_secret = config
        .identity
        .webhook_secret()
        .context("IDENTITY__WEBHOOK_SECRET is not set")?;
    let identity_verifier = Arc::new(ClerkWebhookVerifier::new(identity_secret)?);
    let provider = Arc::new(FluxProvider::new(config.generation.flux_config()?)?);
    let storage: Arc<dyn ObjectStorage> =
        Arc::new(SupabaseStorage::new(config.storage.supabase_config()?)?);
    let generations: Arc<dyn GenerationRepository> =
        Arc::new(PostgresGenerationRepository::new(pool.clone()));

    let worker_id = Uuid::new_v4().to_string();
    let lease_secs = config.generation.checkpoint_lease_secs;
    tracing::info!(worker_id = %worker_id, lease_secs, "Job checkpoint lease configured");

    // Services
    let guard = Arc::new(IdempotencyGuard::new(Arc::new(
        PostgresSubscriptionEventStore::new(pool.clone()),
    )));
    let ledger = Arc::new(CreditLedgerEngine::new(
        Arc::new(PostgresLedgerStore::new(pool.clone())),
        guard.clone(),
        config.billing.clone(),
    ));
    let orchestrator = Arc::new(
        JobOrchestrator::new(
            ledger.clone(),
            provider,
            storage.clone(),
            generations.clone(),
            Arc::new(PostgresJobCheckpointStore::new(pool.clone()).with_lease(worker_id, lease_secs)),
        )
        .with_polling(config.generation.polling_policy()),
    );

    // Jobs whose worker stopped renewing its lease continue here. The first
    // tick fires immediately, which covers jobs interrupted by a restart.
    let recovery = orchestrator.clone();
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(lease_secs));
        loop {
            ticker.tick().await;
            if let Err(e) = recovery.resume_in_flight().await {
                tracing::error!(error = %e, "Failed to claim checkpointed jobs");
            }
        }
    });

    let retention_days = config.database.event_retention_days;
    let sweeper = guard.clone();
    tokio::spawn(async move {
        let mut ticker = interval(RETENTION_SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            let cutoff = Timestamp::now().minus_days(retention_days);
            if let Err(e) = sweeper.purge_before(cutoff).await {
                tracing::error!(error = %e, "Webhook event retention sweep failed");
            }
        }
    });

    let state = AppState {
        ledger,
        guard,
        orchestrator,
        payment_gateway,
        identity_verifier,
        storage,
        generations,
        session_auth: config.identity.session_auth()?,
        signed_url_ttl_secs: config.storage.signed_url_ttl_secs,
    };
    if state.session_auth.is_dev_header() {
        tracing::warn!("No session key configured; trusting the X-User-Id header");
    }

    let allowed_origins: Vec<HeaderValue> = config
        .server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    tracing::info!(allowed_origins = ?allowed_origins, "CORS configured");
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::HeaderName::from_static("x-user-id"),
        ]);

    let request_id = header::HeaderName::from_static("x-request-id");
    let app = api_router(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(request_id))
            .layer(cors)
            .layer(TimeoutLayer::new(config.server.request_timeout())),
    );

    let addr = config.server.socket_addr()?;
    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
