// CLI Proxy API - model router and settings service

pub mod api;
pub mod config;
pub mod router;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::Subscriber;
use tracing_subscriber::{
    fmt::MakeWriter, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

use crate::config::ConfigStore;

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Subscriber at `env_filter` (or `info`), writing to `make_writer`. The handle is only
/// returned when no env filter was given, so `RUST_LOG` wins over the settings file.
fn build_subscriber<W>(
    env_filter: Option<EnvFilter>,
    make_writer: W,
) -> (impl Subscriber + Send + Sync + 'static, Option<FilterHandle>)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let pinned = env_filter.is_some();
    let (filter, handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| EnvFilter::new("info")));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer));

    (subscriber, (!pinned).then_some(handle))
}

// Installed before the settings file is read so load and migration messages are kept
fn init_tracing() -> Option<FilterHandle> {
    let (subscriber, handle) =
        build_subscriber(EnvFilter::try_from_default_env().ok(), std::io::stdout);
    subscriber.init();
    handle
}

/// Load the settings file and serve the management API until Ctrl-C.
pub async fn run(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let filter_handle = init_tracing();

    let store = match config_path {
        Some(path) => ConfigStore::open(path)?,
        None => ConfigStore::open_default()?,
    };
    let store = Arc::new(store);

    if store.snapshot().debug {
        if let Some(handle) = filter_handle {
            handle.reload(EnvFilter::new("debug"))?;
            tracing::debug!("Debug logging enabled from config");
        }
    }
    tracing::info!("Using config at {:?}", store.path());

    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
            if let Err(e) = api::stop_server().await {
                tracing::error!("Failed to stop server: {}", e);
            }
        }
    });

    api::start_server(store).await
}
