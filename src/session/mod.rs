//! Authenticated HTTP transport.
//!
//! # Features
//!
//! - Cookie-jar-backed session restored from a [`SessionStore`](crate::auth::SessionStore)
//! - Fixed permit pool bounding simultaneous in-flight requests
//! - Immediate-resend retry budget for GETs; POSTs are never retried
//! - Immutable [`HeaderProfile`] values merged over a browser-like baseline
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use bookmarks_core::auth::MemorySessionStore;
//! use bookmarks_core::session::{HeaderProfile, SessionClient};
//! use bookmarks_core::HarvestConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = SessionClient::new(&HarvestConfig::default(), Arc::new(MemorySessionStore::default()))?;
//! let page = client.get("https://www.pixiv.net/", &HeaderProfile::page(), 2).await?;
//! println!("status {}", page.status);
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod gauge;
mod headers;

pub use client::{FetchedPage, SessionClient};
pub use error::TransportError;
pub use gauge::{ConcurrencyGauge, GaugeGuard};
pub use headers::HeaderProfile;
