//! Progress UI (spinner) for harvest runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bookmarks_core::{IdHarvester, MetadataResolver};
use indicatif::{ProgressBar, ProgressStyle};

/// Spawns the progress UI (spinner) when requested.
/// Returns (handle, stop) so the caller can signal stop and await the handle.
/// When `use_spinner` is false, returns (None, stop) with stop already true.
pub(crate) fn spawn_progress_ui(
    use_spinner: bool,
    harvester: Arc<IdHarvester>,
    resolver: Arc<MetadataResolver>,
    total_pages: u64,
) -> (Option<tokio::task::JoinHandle<()>>, Arc<AtomicBool>) {
    if !use_spinner {
        return (None, Arc::new(AtomicBool::new(true)));
    }
    let stop = Arc::new(AtomicBool::new(false));
    let handle = spawn_spinner_inner(harvester, resolver, total_pages, Arc::clone(&stop));
    (Some(handle), stop)
}

fn spawn_spinner_inner(
    harvester: Arc<IdHarvester>,
    resolver: Arc<MetadataResolver>,
    total_pages: u64,
    stop: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));

        while !stop.load(Ordering::SeqCst) {
            spinner.set_message(status_line(&harvester, &resolver, total_pages));
            tokio::time::sleep(Duration::from_millis(120)).await;
        }

        spinner.finish_and_clear();
    })
}

fn status_line(harvester: &IdHarvester, resolver: &MetadataResolver, total_pages: u64) -> String {
    let harvest = harvester.stats();
    let resolve = resolver.stats();
    let pages_done = harvest.pages_fetched() + harvest.pages_failed();
    let skipped = resolve.fetch_failed() + resolve.extract_failed();
    format!(
        "[pages {pages_done}/{total_pages}] {} ids, {} resolved, {skipped} skipped",
        harvest.ids_emitted(),
        resolve.resolved(),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bookmarks_core::auth::MemorySessionStore;
    use bookmarks_core::{Endpoints, HarvestConfig, SessionClient};

    use super::*;

    fn stages() -> (Arc<IdHarvester>, Arc<MetadataResolver>) {
        let config = HarvestConfig::default();
        let client = SessionClient::new(&config, Arc::new(MemorySessionStore::default())).unwrap();
        let endpoints = Endpoints::single_host("http://127.0.0.1:9");
        (
            Arc::new(IdHarvester::new(client.clone(), endpoints.clone(), &config)),
            Arc::new(MetadataResolver::new(client, endpoints, &config)),
        )
    }

    #[tokio::test]
    async fn test_disabled_spinner_returns_stopped_flag() {
        let (harvester, resolver) = stages();
        let (handle, stop) = spawn_progress_ui(false, harvester, resolver, 3);
        assert!(handle.is_none());
        assert!(stop.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_enabled_spinner_stops_on_flag() {
        let (harvester, resolver) = stages();
        let (handle, stop) = spawn_progress_ui(true, harvester, resolver, 3);
        stop.store(true, Ordering::SeqCst);
        handle.unwrap().await.unwrap();
    }

    #[test]
    fn test_status_line_starts_at_zero() {
        let (harvester, resolver) = stages();
        assert_eq!(
            status_line(&harvester, &resolver, 5),
            "[pages 0/5] 0 ids, 0 resolved, 0 skipped"
        );
    }
}
