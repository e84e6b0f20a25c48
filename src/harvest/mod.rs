//! Two-stage bookmark harvest.
//!
//! ```text
//! page numbers ─► IdHarvester ─► [harvested] ─► copy ─┬─► [ids] ─► caller
//!                                                     └─► [pending] ─► MetadataResolver ─► [items] ─► caller
//! ```
//!
//! Each stage is a fixed pool of workers with its own permit pool layered on
//! top of the session's transport permits. Queues are bounded and senders
//! wait when full; nothing is dropped for capacity. Closing cascades
//! downstream: when the last page worker exits the identifier queues close,
//! the resolver workers drain theirs and exit, and the items queue closes.

mod pages;
mod pipeline;
mod resolver;
mod stats;

pub use pages::IdHarvester;
pub use pipeline::{Pipeline, PipelineRun, ScopePages};
pub use resolver::{MetadataResolver, ResolveError};
pub use stats::{HarvestStats, ResolveStats};
