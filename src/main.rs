use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use exam_manager::{
    api,
    changes::ChangeFeed,
    config::{Config, LogFormat, StorageConfig, StorageBackend, TEST_CONTROLLER_PASSWORD},
    object_store::{GcsStore, LocalStore, ObjectStore},
    state_machine::ExamStateMachine,
    storage::Database,
    AppState,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    init_tracing(config.log_format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        node_id = %config.node.id,
        controller = %config.controller.email,
        single_node = config.is_single_node(),
        test_mode = config.test_mode,
        max_upload_size = config.max_upload_size,
        "exam-manager starting"
    );
    if config.controller.password == TEST_CONTROLLER_PASSWORD {
        tracing::warn!("Controller is using the default test password");
    }

    let db = Database::open(&config.node.data_dir)?;
    info!(data_dir = %config.node.data_dir, "Database opened");

    let object_store = open_object_store(&config.storage).await?;

    // Applied writes are announced on the change feed
    let changes = Arc::new(ChangeFeed::new(config.change_feed_capacity));
    let state_machine = ExamStateMachine::new(db.clone(), Arc::clone(&changes));

    // muster shares the redb instance with the exam tables
    let muster_storage = muster::RedbStorage::new(db.inner())?;
    let node = muster::MusterNode::new(muster_config(&config), muster_storage, state_machine)?;
    let cluster_handles = node.start();

    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        node: Arc::clone(&node),
        object_store,
        changes,
    });

    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&config.node.bind_address).await?;
    info!(address = %config.node.bind_address, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Stopping cluster tasks");
    for handle in cluster_handles {
        handle.abort();
    }

    if let Err(e) = node.persist_state().await {
        tracing::error!(error = %e, "Failed to persist cluster state during shutdown");
    }

    info!("Shutdown complete");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Gcp => registry.with(tracing_stackdriver::layer()).init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_span_list(false),
            )
            .init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn open_object_store(storage: &StorageConfig) -> anyhow::Result<Arc<dyn ObjectStore>> {
    match storage.backend {
        StorageBackend::Local => {
            let store = LocalStore::new(&storage.local_storage_path)?;
            info!(path = %storage.local_storage_path, "Using local document storage");
            Ok(Arc::new(store))
        }
        StorageBackend::Gcs => {
            let bucket = storage
                .gcs_bucket
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("GCS_BUCKET is required for the gcs backend"))?;
            let store = GcsStore::new(bucket, storage.gcs_credentials_file.as_deref()).await?;
            info!(bucket, "Using GCS document storage");
            Ok(Arc::new(store))
        }
    }
}

fn muster_config(config: &Config) -> muster::Config {
    muster::Config {
        node_id: config.node.id.clone(),
        cluster_port: config.cluster.cluster_port,
        heartbeat_interval_ms: config.cluster.heartbeat_interval_ms,
        election_timeout_ms: config.cluster.election_timeout_ms,
        discovery: muster::DiscoveryConfig {
            dns_name: config.cluster.discovery.dns_name.clone(),
            peers: config.cluster.peer_cluster_addresses(),
            poll_interval_secs: config.cluster.discovery.poll_interval_seconds,
        },
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
