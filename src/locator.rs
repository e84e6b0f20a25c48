//! Last-page discovery for paginated listings.
//!
//! The listing gives no page count, so the locator probes it: triple the
//! candidate page while it exists, then binary-search between a cheap lower
//! estimate and the first missing candidate.

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::extract::ListingPatterns;
use crate::session::{HeaderProfile, SessionClient};
use crate::site::{Endpoints, Scope};

/// Growth factor of the exponential probe.
const PROBE_FACTOR: u32 = 3;

/// Divisor giving the lower bound once the probe overshoots.
const LOWER_BOUND_DIVISOR: u32 = 32;

/// Answers "does page N of this scope contain at least one item".
#[async_trait]
pub trait PageProbe: Send + Sync {
    /// Returns true when `page` exists in `scope`.
    async fn page_exists(&self, page: u32, scope: Scope) -> bool;
}

/// Existence predicate backed by real listing fetches.
#[derive(Debug, Clone)]
pub struct ListingProbe {
    client: SessionClient,
    endpoints: Endpoints,
    patterns: ListingPatterns,
    retries: u32,
}

impl ListingProbe {
    /// Creates a probe that fetches listing pages with `retries` resends.
    #[must_use]
    pub fn new(client: SessionClient, endpoints: Endpoints, retries: u32) -> Self {
        Self {
            client,
            endpoints,
            patterns: ListingPatterns::new(),
            retries,
        }
    }
}

#[async_trait]
impl PageProbe for ListingProbe {
    async fn page_exists(&self, page: u32, scope: Scope) -> bool {
        let url = self.endpoints.listing_url(scope, page);
        match self.client.get(&url, &HeaderProfile::page(), self.retries).await {
            Ok(fetched) => !self.patterns.is_empty_listing(&fetched.text()),
            Err(error) => {
                debug!(page, scope = %scope, error = %error, "probe fetch failed; treating page as missing");
                false
            }
        }
    }
}

/// Returns the highest existing page of `scope`, or 0 for an empty listing.
///
/// Pages are assumed contiguous from 1. The probe saturates at `u32::MAX`,
/// which is treated as a missing page.
#[instrument(skip(probe), fields(scope = %scope))]
pub async fn last_existing_page(probe: &dyn PageProbe, scope: Scope) -> u32 {
    let mut max: u32 = 1;
    while probe.page_exists(max, scope).await {
        match max.checked_mul(PROBE_FACTOR) {
            Some(next) => max = next,
            None => {
                max = u32::MAX;
                break;
            }
        }
    }

    let mut min = max / LOWER_BOUND_DIVISOR;
    debug!(min, max, "probe phase finished");

    while max - min > 1 {
        let mid = min + (max - min) / 2;
        if probe.page_exists(mid, scope).await {
            min = mid;
        } else {
            max = mid;
        }
    }

    debug!(last_page = min, "located last page");
    min
}
