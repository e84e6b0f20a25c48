//! Detail-page stage: identifiers in, resolved records out.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, Semaphore, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, instrument, warn};

use super::ResolveStats;
use crate::config::HarvestConfig;
use crate::extract::{DetailPatterns, ExtractError};
use crate::illust::Illust;
use crate::session::{ConcurrencyGauge, HeaderProfile, SessionClient, TransportError};
use crate::site::Endpoints;

/// Why one identifier could not be resolved.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The detail page could not be fetched.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The detail page lacked a required field.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// The detail-fetch permit pool was closed.
    #[error("detail permit pool closed")]
    PoolClosed,
}

/// Resolves identifiers into [`Illust`] records.
#[derive(Debug)]
pub struct MetadataResolver {
    client: SessionClient,
    endpoints: Endpoints,
    patterns: DetailPatterns,
    retries: u32,
    workers: usize,
    permits: Semaphore,
    in_flight: ConcurrencyGauge,
    stats: ResolveStats,
}

impl MetadataResolver {
    /// Creates a resolver using the detail pool size and retry budget from
    /// `config`.
    #[must_use]
    pub fn new(client: SessionClient, endpoints: Endpoints, config: &HarvestConfig) -> Self {
        Self {
            client,
            endpoints,
            patterns: DetailPatterns::new(),
            retries: config.detail_retries,
            workers: config.resolve_workers.max(1),
            permits: Semaphore::new(config.resolve_workers.max(1)),
            in_flight: ConcurrencyGauge::new(),
            stats: ResolveStats::new(),
        }
    }

    /// Detail-fetch pool size.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Gauge over detail fetches currently holding a detail permit.
    #[must_use]
    pub fn in_flight(&self) -> &ConcurrencyGauge {
        &self.in_flight
    }

    /// Counters accumulated over every identifier this resolver has processed.
    #[must_use]
    pub fn stats(&self) -> &ResolveStats {
        &self.stats
    }

    /// Fetches and extracts one item.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Transport`] when the fetch fails after
    /// retries and [`ResolveError::Extract`] when the page is missing a
    /// required field.
    #[instrument(level = "debug", skip(self))]
    pub async fn resolve(&self, id: &str) -> Result<Illust, ResolveError> {
        let page = {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| ResolveError::PoolClosed)?;
            let _active = self.in_flight.enter();
            self.client
                .get(&self.endpoints.detail_url(id), &HeaderProfile::page(), self.retries)
                .await?
        };

        Ok(self.patterns.extract(id, &page.text(), &self.endpoints)?)
    }

    /// Resolves `id` and forwards the record. Failures are logged and
    /// counted. Returns false once the items queue is closed.
    async fn resolve_into(&self, id: String, items: &mpsc::Sender<Illust>) -> bool {
        match self.resolve(&id).await {
            Ok(illust) => {
                debug!(id = %id, kind = %illust.kind(), images = illust.image_urls().len(), "item resolved");
                if items.send(illust).await.is_err() {
                    debug!(id = %id, "items queue closed; stopping worker");
                    return false;
                }
                self.stats.increment_resolved();
            }
            Err(ResolveError::Extract(error)) => {
                warn!(id = %id, error = %error, "skipping item: extraction failed");
                self.stats.increment_extract_failed();
            }
            Err(error) => {
                warn!(id = %id, error = %error, "detail fetch failed; abandoning item");
                self.stats.increment_fetch_failed();
            }
        }
        true
    }

    /// Starts the worker pool draining `ids` into `items`.
    ///
    /// Workers share the receiving end; each exits when the identifier
    /// queue is closed and empty. The returned task finishes after the last
    /// worker, dropping `items` so the output queue closes.
    pub fn spawn_workers(
        self: &Arc<Self>,
        ids: mpsc::Receiver<String>,
        items: mpsc::Sender<Illust>,
    ) -> JoinHandle<()> {
        let resolver = Arc::clone(self);
        tokio::spawn(async move {
            let ids = Arc::new(Mutex::new(ids));
            let mut workers = JoinSet::new();
            for _ in 0..resolver.workers {
                let resolver = Arc::clone(&resolver);
                let ids = Arc::clone(&ids);
                let items = items.clone();
                workers.spawn(async move {
                    loop {
                        let next = ids.lock().await.recv().await;
                        let Some(id) = next else {
                            break;
                        };
                        if !resolver.resolve_into(id, &items).await {
                            break;
                        }
                    }
                });
            }
            drop(items);

            while let Some(result) = workers.join_next().await {
                if let Err(error) = result {
                    warn!(error = %error, "resolver worker terminated abnormally");
                }
            }
            info!(
                resolved = resolver.stats.resolved(),
                fetch_failed = resolver.stats.fetch_failed(),
                extract_failed = resolver.stats.extract_failed(),
                "metadata resolution finished"
            );
        })
    }
}
