//! Wires page location, identifier harvesting and metadata resolution
//! into one run.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::{IdHarvester, MetadataResolver};
use crate::config::{ConfigError, HarvestConfig};
use crate::illust::Illust;
use crate::locator::{ListingProbe, PageProbe, last_existing_page};
use crate::session::SessionClient;
use crate::site::{Endpoints, Scope};

/// Last existing page of each listing scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopePages {
    /// Last page of the public listing.
    pub public: u32,
    /// Last page of the private listing.
    pub private: u32,
}

impl ScopePages {
    /// Last page of `scope`.
    #[must_use]
    pub fn get(&self, scope: Scope) -> u32 {
        match scope {
            Scope::Show => self.public,
            Scope::Hide => self.private,
        }
    }

    /// Pages across both scopes.
    #[must_use]
    pub fn total(&self) -> u64 {
        u64::from(self.public) + u64::from(self.private)
    }

    /// Returns a copy with the last page of `scope` set to `last`.
    #[must_use]
    pub fn with(self, scope: Scope, last: u32) -> Self {
        match scope {
            Scope::Show => Self {
                public: last,
                ..self
            },
            Scope::Hide => Self {
                private: last,
                ..self
            },
        }
    }
}

/// A running harvest.
///
/// Both queues are bounded. A consumer that keeps `ids` must drain it along
/// with `items`; dropping `ids` stops the copy and leaves resolution running.
#[derive(Debug)]
pub struct PipelineRun {
    /// Raw identifiers as harvested, before resolution. Closes once every
    /// listing page is done.
    pub ids: mpsc::Receiver<String>,
    /// Resolved records, in completion order. Closes when the run ends.
    pub items: mpsc::Receiver<Illust>,
    /// Finishes after every stage has finished.
    pub task: JoinHandle<()>,
}

/// Owns both pipeline stages and the page locator.
pub struct Pipeline {
    config: HarvestConfig,
    probe: Arc<dyn PageProbe>,
    harvester: Arc<IdHarvester>,
    resolver: Arc<MetadataResolver>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("harvester", &self.harvester)
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Builds both stages over one shared session.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field of `config` as a [`ConfigError`].
    pub fn new(
        client: SessionClient,
        endpoints: Endpoints,
        config: HarvestConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let probe = Arc::new(ListingProbe::new(
            client.clone(),
            endpoints.clone(),
            config.listing_retries,
        ));
        let harvester = Arc::new(IdHarvester::new(client.clone(), endpoints.clone(), &config));
        let resolver = Arc::new(MetadataResolver::new(client, endpoints, &config));
        Ok(Self {
            config,
            probe,
            harvester,
            resolver,
        })
    }

    /// Replaces the existence predicate used by [`locate`](Self::locate).
    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn PageProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Listing stage.
    #[must_use]
    pub fn harvester(&self) -> &Arc<IdHarvester> {
        &self.harvester
    }

    /// Detail stage.
    #[must_use]
    pub fn resolver(&self) -> &Arc<MetadataResolver> {
        &self.resolver
    }

    /// Locates the last page of one scope.
    pub async fn locate_scope(&self, scope: Scope) -> u32 {
        last_existing_page(self.probe.as_ref(), scope).await
    }

    /// Locates the last page of both scopes concurrently.
    #[instrument(skip(self))]
    pub async fn locate(&self) -> ScopePages {
        let (public, private) = tokio::join!(
            self.locate_scope(Scope::Show),
            self.locate_scope(Scope::Hide)
        );
        info!(public, private, "located bookmark pages");
        ScopePages { public, private }
    }

    /// Starts harvesting `pages` of both scopes into one identifier queue
    /// drained by the resolver pool.
    ///
    /// Every queue holds `queue_capacity` entries; producers wait while a
    /// queue is full. The caller must keep draining `items`, and `ids` unless
    /// it drops it, for the run to finish.
    pub fn start(&self, pages: ScopePages) -> PipelineRun {
        let capacity = self.config.queue_capacity;
        let (harvested_tx, harvested_rx) = mpsc::channel(capacity);
        let (observed_tx, observed_rx) = mpsc::channel(capacity);
        let (pending_tx, pending_rx) = mpsc::channel(capacity);
        let (item_tx, item_rx) = mpsc::channel(capacity);

        let public = self
            .harvester
            .harvest_range(1, pages.public, Scope::Show, harvested_tx.clone());
        let private = self
            .harvester
            .harvest_range(1, pages.private, Scope::Hide, harvested_tx);
        let copy = tokio::spawn(copy_ids(harvested_rx, observed_tx, pending_tx));
        let resolve = self.resolver.spawn_workers(pending_rx, item_tx);

        info!(
            public = pages.public,
            private = pages.private,
            page_workers = self.harvester.workers(),
            resolve_workers = self.resolver.workers(),
            "pipeline started"
        );

        let task = tokio::spawn(async move {
            let stages = [
                ("public", public),
                ("private", private),
                ("copy", copy),
                ("resolve", resolve),
            ];
            for (stage, handle) in stages {
                if let Err(error) = handle.await {
                    warn!(stage, error = %error, "pipeline stage terminated abnormally");
                }
            }
        });

        PipelineRun {
            ids: observed_rx,
            items: item_rx,
            task,
        }
    }
}

/// Publishes each harvested identifier to the caller, then queues it for
/// resolution.
async fn copy_ids(
    mut harvested: mpsc::Receiver<String>,
    observed: mpsc::Sender<String>,
    pending: mpsc::Sender<String>,
) {
    let mut observed = Some(observed);
    while let Some(id) = harvested.recv().await {
        let published = match &observed {
            Some(sender) => sender.send(id.clone()).await.is_ok(),
            None => true,
        };
        if !published {
            debug!("identifier stream dropped by consumer");
            observed = None;
        }
        if pending.send(id).await.is_err() {
            warn!("resolver queue closed; dropping remaining identifiers");
            return;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::auth::MemorySessionStore;

    struct Fixed {
        public: u32,
        private: u32,
    }

    #[async_trait]
    impl PageProbe for Fixed {
        async fn page_exists(&self, page: u32, scope: Scope) -> bool {
            let last = match scope {
                Scope::Show => self.public,
                Scope::Hide => self.private,
            };
            page >= 1 && page <= last
        }
    }

    fn pipeline() -> Pipeline {
        let config = HarvestConfig::default();
        let client = SessionClient::new(&config, Arc::new(MemorySessionStore::default())).unwrap();
        Pipeline::new(client, Endpoints::single_host("http://127.0.0.1:9"), config).unwrap()
    }

    #[test]
    fn test_new_rejects_zero_sized_pools() {
        for field in ["page_workers", "resolve_workers", "queue_capacity"] {
            let mut config = HarvestConfig::default();
            match field {
                "page_workers" => config.page_workers = 0,
                "resolve_workers" => config.resolve_workers = 0,
                _ => config.queue_capacity = 0,
            }
            let client =
                SessionClient::new(&HarvestConfig::default(), Arc::new(MemorySessionStore::default()))
                    .unwrap();
            let result = Pipeline::new(client, Endpoints::single_host("http://127.0.0.1:9"), config);
            assert!(
                matches!(result, Err(ConfigError::Zero { field: rejected }) if rejected == field),
                "{field} = 0 should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_locate_reports_both_scopes() {
        let pipeline = pipeline().with_probe(Arc::new(Fixed {
            public: 17,
            private: 0,
        }));
        assert_eq!(
            pipeline.locate().await,
            ScopePages {
                public: 17,
                private: 0
            }
        );
    }

    #[tokio::test]
    async fn test_start_with_no_pages_closes_both_queues() {
        let pipeline = pipeline();
        let mut run = pipeline.start(ScopePages::default());
        assert!(run.ids.recv().await.is_none());
        assert!(run.items.recv().await.is_none());
        run.task.await.unwrap();
    }

    #[tokio::test]
    async fn test_copy_ids_publishes_then_forwards_in_order() {
        let (harvested_tx, harvested_rx) = mpsc::channel(4);
        let (observed_tx, mut observed_rx) = mpsc::channel(4);
        let (pending_tx, mut pending_rx) = mpsc::channel(4);
        for id in ["11", "12", "13"] {
            harvested_tx.send(id.to_string()).await.unwrap();
        }
        drop(harvested_tx);

        copy_ids(harvested_rx, observed_tx, pending_tx).await;

        for expected in ["11", "12", "13"] {
            assert_eq!(observed_rx.recv().await.unwrap(), expected);
            assert_eq!(pending_rx.recv().await.unwrap(), expected);
        }
        assert!(observed_rx.recv().await.is_none());
        assert!(pending_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_copy_ids_keeps_forwarding_after_consumer_drops() {
        let (harvested_tx, harvested_rx) = mpsc::channel(8);
        let (observed_tx, observed_rx) = mpsc::channel(1);
        let (pending_tx, mut pending_rx) = mpsc::channel(8);
        drop(observed_rx);
        for id in 1..=5 {
            harvested_tx.send(id.to_string()).await.unwrap();
        }
        drop(harvested_tx);

        copy_ids(harvested_rx, observed_tx, pending_tx).await;

        let mut forwarded = Vec::new();
        while let Some(id) = pending_rx.recv().await {
            forwarded.push(id);
        }
        assert_eq!(forwarded, ["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn test_scope_pages_with_sets_one_scope() {
        let pages = ScopePages::default().with(Scope::Hide, 9);
        assert_eq!(pages.get(Scope::Show), 0);
        assert_eq!(pages.get(Scope::Hide), 9);
        assert_eq!(pages.with(Scope::Show, 4).total(), 13);
    }
}
