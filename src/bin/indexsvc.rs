//! Service entry point: loads configuration, wires the pipeline, serves the
//! RPC surface, and runs until signaled to stop.

use std::sync::Arc;

use indexsvc::{IndexJobMonitor, IndexThreadPool, RpcState, Settings};
use indexsvc_core::{GeneratorRegistry, IndexClient, IndexerCoordinator, Indexer, JobQueue, Pool, DEFAULT_AUTOFLUSH};
use indexsvc_job_postgres::PgIndexJobStore;
use indexsvc_search_es::EsClient;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = Settings::from_env()?;
    tracing::info!(
        threads = settings.indexer_threads,
        pool_size = settings.indexer_pool_size,
        poll_seconds = settings.indexer_poll_interval.as_secs(),
        es_endpoint = %settings.es_endpoint,
        "indexsvc starting"
    );

    let db_pool = PgPoolOptions::new().connect(&settings.database_url).await?;
    let job_store = Arc::new(PgIndexJobStore::new(db_pool.clone()));
    job_store.migrate().await?;

    let mut registry = GeneratorRegistry::new();
    indexsvc_generators::register_all(&mut registry, db_pool.clone());
    let registry = Arc::new(registry);

    let es_client: Arc<dyn IndexClient> = Arc::new(EsClient::new(settings.es_endpoint.clone()));
    let client_pool = Arc::new(Pool::new(settings.es_pool_size, move || es_client.clone()));
    let indexer = Arc::new(Indexer::new(client_pool, DEFAULT_AUTOFLUSH));

    let coordinator_store = job_store.clone();
    let coordinator_registry = registry.clone();
    let coordinator_indexer = indexer.clone();
    let retry_delay = settings.indexer_job_retry_delay;
    let coordinator_pool = Arc::new(Pool::new(settings.indexer_pool_size, move || {
        IndexerCoordinator::new(
            coordinator_store.clone(),
            coordinator_registry.clone(),
            coordinator_indexer.clone(),
            retry_delay,
        )
    }));

    let queue = Arc::new(JobQueue::new(job_store.clone(), settings.indexer_poll_interval, 50));
    queue.start();

    let (monitor, rx) = IndexJobMonitor::start(queue.clone(), settings.indexer_threads * 4);
    let thread_pool = IndexThreadPool::start(settings.indexer_threads, rx, coordinator_pool);

    let rpc_state = RpcState {
        store: job_store.clone(),
        max_retry_attempts: settings.indexer_job_max_retry_attempts,
    };
    let app = indexsvc::router(rpc_state);
    let listener = tokio::net::TcpListener::bind(&settings.rpc_addr).await?;
    tracing::info!(addr = %settings.rpc_addr, "rpc surface listening");

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(err) = result {
                tracing::error!(error = %err, "rpc server exited with error");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    queue.stop();
    monitor.join().await;
    thread_pool.join().await;

    Ok(())
}
