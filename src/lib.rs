//! Bookmark Harvester Core Library
//!
//! Harvests a user's paginated bookmark collection from an authenticated
//! site by scraping its HTML, and resolves every bookmarked item into a
//! structured [`Illust`] record (title, author, kind, image locations).
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`session`] - Cookie-backed HTTP session with bounded in-flight requests and GET retry
//! - [`auth`] - Cookie model and persistence, login flow
//! - [`site`] - Endpoint templates and listing scopes
//! - [`locator`] - Last-page discovery by exponential probe and binary search
//! - [`extract`] - Listing and detail page pattern extraction
//! - [`harvest`] - Page-to-identifier and identifier-to-record pipeline stages
//! - [`illust`] - Resolved record types
//! - [`config`] - Pool sizes, queue capacity, retry budgets and timeouts

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod extract;
pub mod harvest;
pub mod illust;
pub mod locator;
pub mod session;
pub mod site;
pub mod user_agent;

// Re-export commonly used types
pub use auth::{AuthError, AuthResult, Authenticator, FileSessionStore, SessionStore};
pub use config::{ConfigError, HarvestConfig};
pub use extract::ExtractError;
pub use harvest::{
    HarvestStats, IdHarvester, MetadataResolver, Pipeline, PipelineRun, ResolveError,
    ResolveStats, ScopePages,
};
pub use illust::{Illust, IllustKind};
pub use locator::{ListingProbe, PageProbe, last_existing_page};
pub use session::{SessionClient, TransportError};
pub use site::{Endpoints, Scope};
