//! Listing-page stage: page numbers in, item identifiers out.

use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, instrument, warn};

use super::HarvestStats;
use crate::config::HarvestConfig;
use crate::extract::ListingPatterns;
use crate::session::{ConcurrencyGauge, HeaderProfile, SessionClient};
use crate::site::{Endpoints, Scope};

/// Fetches listing pages and feeds their identifiers into a bounded queue.
///
/// All page fetches, across every range this harvester runs, share one
/// page-fetch permit pool sized by `page_workers`.
#[derive(Debug)]
pub struct IdHarvester {
    client: SessionClient,
    endpoints: Endpoints,
    patterns: ListingPatterns,
    retries: u32,
    workers: usize,
    permits: Semaphore,
    in_flight: ConcurrencyGauge,
    stats: HarvestStats,
}

impl IdHarvester {
    /// Creates a harvester using the page pool size and listing retry
    /// budget from `config`.
    #[must_use]
    pub fn new(client: SessionClient, endpoints: Endpoints, config: &HarvestConfig) -> Self {
        Self {
            client,
            endpoints,
            patterns: ListingPatterns::new(),
            retries: config.listing_retries,
            workers: config.page_workers.max(1),
            permits: Semaphore::new(config.page_workers.max(1)),
            in_flight: ConcurrencyGauge::new(),
            stats: HarvestStats::new(),
        }
    }

    /// Page-fetch pool size.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Gauge over listing fetches currently holding a page permit.
    #[must_use]
    pub fn in_flight(&self) -> &ConcurrencyGauge {
        &self.in_flight
    }

    /// Counters accumulated over every page this harvester has processed.
    #[must_use]
    pub fn stats(&self) -> &HarvestStats {
        &self.stats
    }

    /// Harvests one listing page, blocking on `ids` while it is full.
    ///
    /// A failed fetch yields zero identifiers. Returns how many identifiers
    /// the queue accepted.
    #[instrument(skip(self, ids), fields(scope = %scope))]
    pub async fn harvest_page(&self, page: u32, scope: Scope, ids: &mpsc::Sender<String>) -> usize {
        let url = self.endpoints.listing_url(scope, page);
        let fetched = {
            let Ok(_permit) = self.permits.acquire().await else {
                return 0;
            };
            let _active = self.in_flight.enter();
            self.client.get(&url, &HeaderProfile::page(), self.retries).await
        };

        let listing = match fetched {
            Ok(listing) => listing,
            Err(error) => {
                warn!(page, scope = %scope, error = %error, "listing fetch failed; skipping page");
                self.stats.increment_pages_failed();
                return 0;
            }
        };

        let found = self.patterns.extract_ids(&listing.text());
        self.stats.record_page(found.sentinels);
        debug!(
            page,
            ids = found.ids.len(),
            sentinels = found.sentinels,
            "listing page parsed"
        );

        let mut emitted = 0;
        for id in found.ids {
            if ids.send(id).await.is_err() {
                debug!(page, "identifier queue closed; dropping remaining identifiers");
                break;
            }
            self.stats.increment_emitted();
            emitted += 1;
        }
        emitted
    }

    /// Harvests pages `from..=to` of `scope` with a pool of long-lived
    /// workers pulling page numbers from a shared cursor.
    ///
    /// The returned task finishes once every page is processed; `ids` is
    /// dropped then, so the queue closes when no other sender remains. An
    /// empty range finishes immediately.
    pub fn harvest_range(
        self: &Arc<Self>,
        from: u32,
        to: u32,
        scope: Scope,
        ids: mpsc::Sender<String>,
    ) -> JoinHandle<()> {
        let harvester = Arc::clone(self);
        tokio::spawn(async move {
            if from > to {
                debug!(scope = %scope, "no pages to harvest");
                return;
            }

            let page_count = usize::try_from(to - from).map_or(usize::MAX, |n| n.saturating_add(1));
            let worker_count = harvester.workers.min(page_count);
            let cursor = Arc::new(Mutex::new(from..=to));
            info!(scope = %scope, from, to, workers = worker_count, "harvesting listing pages");

            let mut workers = JoinSet::new();
            for _ in 0..worker_count {
                let harvester = Arc::clone(&harvester);
                let cursor = Arc::clone(&cursor);
                let ids = ids.clone();
                workers.spawn(async move {
                    while let Some(page) = next_page(&cursor) {
                        harvester.harvest_page(page, scope, &ids).await;
                        if ids.is_closed() {
                            break;
                        }
                    }
                });
            }
            drop(ids);

            while let Some(result) = workers.join_next().await {
                if let Err(error) = result {
                    warn!(scope = %scope, error = %error, "page worker terminated abnormally");
                }
            }
            info!(
                scope = %scope,
                pages_fetched = harvester.stats.pages_fetched(),
                ids_emitted = harvester.stats.ids_emitted(),
                "listing harvest finished"
            );
        })
    }
}

fn next_page(cursor: &Mutex<RangeInclusive<u32>>) -> Option<u32> {
    cursor.lock().unwrap_or_else(PoisonError::into_inner).next()
}
