//! Authenticated HTTP session with bounded in-flight concurrency.
//!
//! One `SessionClient` is shared by every stage of the harvest. It owns the
//! cookie jar (seeded from the session store at construction), a fixed pool
//! of request permits, and the retry loop for GETs.

use std::sync::Arc;

use reqwest::header::HeaderMap;
use reqwest::{Client, Method};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use super::gauge::ConcurrencyGauge;
use super::{HeaderProfile, TransportError};
use crate::auth::{SessionJar, SessionStore, StoreError};
use crate::config::HarvestConfig;
use crate::user_agent::BROWSER_USER_AGENT;

/// Response body and status of one completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl FetchedPage {
    /// Body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Failure of a single attempt, before retry policy is applied.
enum AttemptError {
    Send(reqwest::Error),
    Body(reqwest::Error),
    PoolClosed,
}

struct Inner {
    client: Client,
    jar: Arc<SessionJar>,
    store: Arc<dyn SessionStore>,
    permits: Semaphore,
    max_in_flight: usize,
    in_flight: ConcurrencyGauge,
}

/// Cookie-backed HTTP session shared by all harvest stages.
///
/// Cloning is cheap; clones share the jar, the store and the permit pool.
#[derive(Clone)]
pub struct SessionClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("max_in_flight", &self.inner.max_in_flight)
            .field("in_flight", &self.inner.in_flight.active())
            .field("cookies", &self.inner.jar.len())
            .finish_non_exhaustive()
    }
}

impl SessionClient {
    /// Builds a session, restoring cookies from `store`.
    ///
    /// A store that cannot be read is logged and treated as empty.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ClientBuild`] when the HTTP client cannot be built.
    #[instrument(level = "debug", skip(config, store), fields(max_in_flight = config.max_in_flight))]
    pub fn new(config: &HarvestConfig, store: Arc<dyn SessionStore>) -> Result<Self, TransportError> {
        let cookies = match store.load() {
            Ok(cookies) => cookies,
            Err(error) => {
                warn!(error = %error, "failed to load stored session; continuing without cookies");
                Vec::new()
            }
        };
        let jar = Arc::new(SessionJar::with_cookies(cookies));

        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.read_timeout())
            .user_agent(BROWSER_USER_AGENT)
            .gzip(true)
            .cookie_provider(Arc::clone(&jar))
            .build()
            .map_err(TransportError::ClientBuild)?;

        debug!(cookies = jar.len(), "session client ready");

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                jar,
                store,
                permits: Semaphore::new(config.max_in_flight.max(1)),
                max_in_flight: config.max_in_flight.max(1),
                in_flight: ConcurrencyGauge::new(),
            }),
        })
    }

    /// Configured permit pool size.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight
    }

    /// Gauge over network calls currently holding a transport permit.
    #[must_use]
    pub fn in_flight(&self) -> &ConcurrencyGauge {
        &self.inner.in_flight
    }

    /// Cookie jar used by the transport.
    #[must_use]
    pub fn jar(&self) -> &SessionJar {
        &self.inner.jar
    }

    /// Issues a GET, resending immediately on transport failure while
    /// `retries` remain.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn get(
        &self,
        url: &str,
        headers: &HeaderProfile,
        retries: u32,
    ) -> Result<FetchedPage, TransportError> {
        self.request(Method::GET, url, headers, None, retries).await
    }

    /// Issues a POST with `body`; failures are surfaced without retry.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn post(
        &self,
        url: &str,
        headers: &HeaderProfile,
        body: String,
    ) -> Result<FetchedPage, TransportError> {
        self.request(Method::POST, url, headers, Some(body), 0).await
    }

    /// Issues one logical request.
    ///
    /// Each attempt holds one transport permit for the duration of the network
    /// call and body read. Only GETs are retried, and only on transport-level
    /// failures (connect errors, timeouts); a non-2xx status is a successful
    /// response. There is no delay between attempts.
    ///
    /// # Errors
    ///
    /// - [`TransportError::Exhausted`] when every GET attempt failed to send
    /// - [`TransportError::Send`] when a non-GET request failed to send
    /// - [`TransportError::Body`] when the response body could not be read
    /// - [`TransportError::InvalidUrl`] / [`TransportError::InvalidHeader`] for malformed input
    #[instrument(skip(self, headers, body), fields(method = %method, url = %url))]
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        headers: &HeaderProfile,
        body: Option<String>,
        retries: u32,
    ) -> Result<FetchedPage, TransportError> {
        let header_map = headers.to_header_map()?;
        let retryable = method == Method::GET;
        let mut remaining = retries;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match self
                .attempt(method.clone(), url, &header_map, body.clone())
                .await
            {
                Ok(page) => {
                    debug!(status = page.status, bytes = page.body.len(), attempts, "request completed");
                    return Ok(page);
                }
                Err(AttemptError::Send(error)) if error.is_builder() => {
                    return Err(TransportError::InvalidUrl {
                        url: url.to_string(),
                    });
                }
                Err(AttemptError::Send(error)) if retryable && remaining > 0 => {
                    remaining -= 1;
                    warn!(
                        url = %url,
                        attempt = attempts,
                        remaining,
                        error = %error,
                        "request failed, retrying"
                    );
                }
                Err(AttemptError::Send(error)) if retryable => {
                    return Err(TransportError::exhausted(url, attempts, error));
                }
                Err(AttemptError::Send(error)) => {
                    return Err(TransportError::send(method.as_str(), url, error));
                }
                Err(AttemptError::Body(error)) => return Err(TransportError::body(url, error)),
                Err(AttemptError::PoolClosed) => return Err(TransportError::PermitPoolClosed),
            }
        }
    }

    async fn attempt(
        &self,
        method: Method,
        url: &str,
        headers: &HeaderMap,
        body: Option<String>,
    ) -> Result<FetchedPage, AttemptError> {
        // Permit and gauge guard drop together on every exit path.
        let _permit = self
            .inner
            .permits
            .acquire()
            .await
            .map_err(|_| AttemptError::PoolClosed)?;
        let _active = self.inner.in_flight.enter();

        let mut builder = self.inner.client.request(method, url).headers(headers.clone());
        if let Some(body) = body {
            builder = builder.body(body);
        }
        let response = builder.send().await.map_err(AttemptError::Send)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(AttemptError::Body)?;

        Ok(FetchedPage {
            status,
            body: body.to_vec(),
        })
    }

    /// Flushes the current cookie set to the session store.
    ///
    /// Returns the number of cookies written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store rejects the write.
    #[instrument(level = "debug", skip(self))]
    pub fn persist(&self) -> Result<usize, StoreError> {
        let cookies = self.inner.jar.snapshot();
        self.inner.store.save(&cookies)?;
        info!(cookies = cookies.len(), "persisted session cookies");
        Ok(cookies.len())
    }
}
