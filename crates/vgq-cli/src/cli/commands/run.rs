//! `vgq run` – run the queue: coordinator, workers and subscriber socket.

use anyhow::Result;
use std::path::PathBuf;
use vgq_core::config::VgqConfig;
use vgq_core::proxy::ProxyPool;
use vgq_core::queue::{Coordinator, CoordinatorConfig, JobStore};

use crate::cli::event_socket;

pub async fn run_queue(
    cfg: &VgqConfig,
    download_dir: PathBuf,
    workers: Option<usize>,
) -> Result<()> {
    tokio::fs::create_dir_all(&download_dir).await?;

    let store = JobStore::open_default().await?;
    let mut coord_cfg = CoordinatorConfig::from_config(cfg, download_dir);
    if let Some(n) = workers {
        coord_cfg.max_workers = n.max(1);
    }
    let proxies = ProxyPool::new(cfg.proxies.clone());
    if proxies.is_empty() {
        tracing::info!("no proxies configured, fetching directly");
    }

    let coordinator = Coordinator::start(store, coord_cfg, proxies, None, None).await?;

    let socket_path = vgq_core::protocol::default_socket_path()?;
    let listener = event_socket::spawn_event_listener(coordinator.clone(), &socket_path)?;
    println!("Queue running; socket at {}", socket_path.display());

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    listener.abort();
    let _ = tokio::fs::remove_file(&socket_path).await;
    drop(coordinator);
    Ok(())
}
