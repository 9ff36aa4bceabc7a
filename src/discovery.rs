//! Bulk population of the registry from the upstream installations.

use std::{future::Future, sync::Arc, time::{Duration, Instant}};

use log::{error, info, warn};
use thiserror::Error;
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    providers::{FetchError, Installation, RepositorySource},
    registry::Registry,
};

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("discovery cancelled")]
    Cancelled,
}

/// Upserts every repository of every installation into `registry`.
///
/// A failed listing aborts the pass, leaving whatever was already
/// registered in place. Setting `shutdown` to `true` aborts it as well.
pub async fn discover<S: RepositorySource>(
    source: &S,
    registry: &Registry,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), DiscoveryError> {
    info!("Discovering installations...");
    let start = Instant::now();

    let installations = cancellable(shutdown, source.list_installations()).await?;

    for installation in &installations {
        let Some(prefix) = registry.prefix_for(&installation.account_login) else {
            warn!("INST={:?} not configured", installation.account_login);
            continue;
        };

        info!("INST={:?} PREFIX={:?}", installation.account_login, prefix);

        let repos = cancellable(shutdown, source.list_repositories(installation.id)).await?;
        for repo in &repos {
            registry.accept(prefix, repo).await;
        }
    }

    info!(
        "Discovered {} packages across {} installations (took {} seconds)",
        registry.len().await,
        installations.len(),
        start.elapsed().as_secs_f32()
    );

    Ok(())
}

/// Upserts the repositories of a single installation.
///
/// Used when an installation is created or gains repositories after
/// startup.
pub async fn discover_installation<S: RepositorySource>(
    source: &S,
    registry: &Registry,
    installation: &Installation,
) -> Result<(), DiscoveryError> {
    let Some(prefix) = registry.prefix_for(&installation.account_login) else {
        warn!("INST={:?} not configured", installation.account_login);
        return Ok(());
    };

    let repos = source.list_repositories(installation.id).await?;
    for repo in &repos {
        registry.accept(prefix, repo).await;
    }

    info!(
        "Refreshed installation {} ({}): {} repositories",
        installation.id,
        installation.account_login,
        repos.len()
    );

    Ok(())
}

/// Re-runs [`discover`] every `interval` until `shutdown` flips.
///
/// Failed passes are logged and retried on the next tick.
pub fn spawn_refresh<S>(
    source: Arc<S>,
    registry: Arc<Registry>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    S: RepositorySource + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + interval;
        let mut ticker = tokio::time::interval_at(start, interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = wait_for_shutdown(&mut shutdown) => return,
            }

            match discover(source.as_ref(), &registry, &mut shutdown).await {
                Ok(()) => {}
                Err(DiscoveryError::Cancelled) => return,
                Err(e) => error!("Periodic discovery failed: {}", e),
            }
        }
    })
}

/* -------------------------------------------------------------------------- */
/*                                Cancellation                                */
/* -------------------------------------------------------------------------- */

async fn cancellable<T>(
    shutdown: &mut watch::Receiver<bool>,
    fut: impl Future<Output = Result<T, FetchError>>,
) -> Result<T, DiscoveryError> {
    if *shutdown.borrow() {
        return Err(DiscoveryError::Cancelled);
    }

    tokio::select! {
        res = fut => Ok(res?),
        _ = wait_for_shutdown(shutdown) => Err(DiscoveryError::Cancelled),
    }
}

/// Resolves once shutdown is requested. Never resolves if the sender is gone.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/* -------------------------------------------------------------------------- */
/*                                    Tests                                   */
/* -------------------------------------------------------------------------- */
