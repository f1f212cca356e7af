use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use match_api::analysis::processor::Processor;
use match_api::config::Config;
use match_api::dispatch::{
    run_queue_worker, ProcessingDispatcher, RedisQueueDispatcher, SpawnDispatcher,
};
use match_api::inference::select_engine;
use match_api::routes::build_app;
use match_api::state::AppState;
use match_api::storage::postgres::{connect, PgTrackingStore};
use match_api::storage::s3::{build_s3_client, S3BlobStore};
use match_api::storage::{BlobStore, TrackingStore};

/// Queue name used when `PROCESS_FUNCTION` is unset in Redis mode.
const DEFAULT_PROCESS_QUEUE: &str = "process-analysis";

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing DATABASE_URL)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting match API v{}", env!("CARGO_PKG_VERSION"));

    let missing = config.missing_required();
    if !missing.is_empty() {
        tracing::warn!(
            "Missing environment variables: {}; /health will report unhealthy",
            missing.join(", ")
        );
    }

    // Tracking store (PostgreSQL)
    let pool = connect(&config.database_url).await?;
    let pg_store = PgTrackingStore::new(pool, config.tracking_table_name())?;
    pg_store.ensure_schema().await?;
    let tracking: Arc<dyn TrackingStore> = Arc::new(pg_store);
    info!("Tracking store ready (table: {})", config.tracking_table_name());

    // Blob store (S3 / MinIO)
    let s3 = build_s3_client(&config).await;
    let blobs: Arc<dyn BlobStore> =
        Arc::new(S3BlobStore::new(s3, config.raw_inputs_bucket.clone()));
    info!("Blob store client initialized");

    let engine = select_engine(&config);
    let processor = Arc::new(Processor::new(tracking.clone(), blobs.clone(), engine));

    // Processing hand-off: Redis queue when configured, in-process tasks otherwise
    let dispatcher: Arc<dyn ProcessingDispatcher> = match &config.redis_url {
        Some(redis_url) => {
            let client = redis::Client::open(redis_url.as_str())?;
            let queue = config
                .process_function
                .clone()
                .unwrap_or_else(|| DEFAULT_PROCESS_QUEUE.to_string());
            let dispatcher = RedisQueueDispatcher::connect(&client, &queue).await?;
            tokio::spawn(run_queue_worker(client, queue, processor.clone()));
            Arc::new(dispatcher)
        }
        None => Arc::new(SpawnDispatcher::new(processor.clone())),
    };

    let state = AppState {
        tracking,
        blobs,
        dispatcher,
        config: config.clone(),
    };

    let app = build_app(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
