//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use bookmarks_core::Scope;
use clap::{Parser, ValueEnum};

/// Which listing scopes to harvest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScopeArg {
    /// Public bookmarks only.
    Show,
    /// Private bookmarks only.
    Hide,
    /// Both public and private bookmarks.
    Both,
}

impl ScopeArg {
    /// The single scope selected, or `None` for both.
    #[must_use]
    pub fn single(self) -> Option<Scope> {
        match self {
            Self::Show => Some(Scope::Show),
            Self::Hide => Some(Scope::Hide),
            Self::Both => None,
        }
    }
}

/// Harvest bookmarked items and print them as JSON lines.
///
/// Restores the saved session when it is still logged in; otherwise logs in
/// with `--user` and `BOOKMARKS_PASSWORD` (or prompts) and saves the new
/// session cookies.
#[derive(Parser, Debug)]
#[command(name = "bookmarks")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Account used when the saved session is not logged in
    #[arg(short, long)]
    pub user: Option<String>,

    /// Which bookmark listings to harvest
    #[arg(short, long, value_enum, default_value_t = ScopeArg::Both)]
    pub scope: ScopeArg,

    /// Maximum simultaneous in-flight requests (1-100)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub max_in_flight: Option<u8>,

    /// Concurrent listing page fetches (1-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub page_workers: Option<u8>,

    /// Concurrent detail page fetches (1-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub resolve_workers: Option<u8>,

    /// Capacity of the identifier and item queues
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100_000))]
    pub queue_capacity: Option<u32>,

    /// Immediate resends for failed listing and detail fetches (0-10)
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub retries: Option<u8>,

    /// Cookie file holding the saved session
    #[arg(long, value_name = "PATH")]
    pub cookie_file: Option<PathBuf>,

    /// Serve every endpoint from this base URL instead of the live site
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Config file to read instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
