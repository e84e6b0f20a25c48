//! CLI entry point for the bookmark harvester.

use std::env;
use std::io::{self, BufRead, BufWriter, IsTerminal, Write};
use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result, bail};
use bookmarks_core::{
    Authenticator, FileSessionStore, Pipeline, PipelineRun, ScopePages, SessionClient,
    SessionStore,
};
use clap::Parser;
use console::Term;
use tracing::{debug, info, warn};

mod app_config;
mod cli;
mod progress;

use cli::Args;

const PASSWORD_ENV: &str = "BOOKMARKS_PASSWORD";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Records go to stdout; logs stay on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let file_config = app_config::load_file_config(args.config.as_deref())?;
    let settings = app_config::resolve_settings(&args, &file_config)?;
    debug!(?settings, "effective settings");

    let file_store = FileSessionStore::new(settings.cookie_file.clone());
    debug!(path = %file_store.path().display(), "using cookie store");
    let store: Arc<dyn SessionStore> = Arc::new(file_store);
    let client = SessionClient::new(&settings.harvest, store)
        .context("Failed to build HTTP session")?;

    let authenticator = Authenticator::new(client.clone(), settings.endpoints.clone(), &settings.harvest);
    if authenticator.is_logged_in().await {
        info!(cookie_file = %settings.cookie_file.display(), "restored saved session");
    } else {
        info!("saved session is not logged in; logging in");
        let username = match args.user.clone() {
            Some(username) => username,
            None => prompt_line("Username: ")?,
        };
        let password = match env::var(PASSWORD_ENV) {
            Ok(password) if !password.is_empty() => password,
            _ => prompt_secret("Password: ")?,
        };
        authenticator
            .login(&username, &password)
            .await
            .context("Login failed")?;
        let saved = client
            .persist()
            .context("Failed to save session cookies")?;
        info!(cookies = saved, path = %settings.cookie_file.display(), "session saved");
    }

    let pipeline = Pipeline::new(client, settings.endpoints, settings.harvest)
        .context("Invalid harvest configuration")?;
    let pages = match args.scope.single() {
        Some(scope) => ScopePages::default().with(scope, pipeline.locate_scope(scope).await),
        None => pipeline.locate().await,
    };
    info!(public = pages.public, private = pages.private, "bookmark pages located");

    if pages.total() == 0 {
        info!("no bookmarks found");
        return Ok(());
    }

    let use_spinner = !args.quiet && io::stderr().is_terminal();
    let (progress_handle, progress_stop) = progress::spawn_progress_ui(
        use_spinner,
        Arc::clone(pipeline.harvester()),
        Arc::clone(pipeline.resolver()),
        pages.total(),
    );

    let PipelineRun {
        mut ids,
        mut items,
        task,
    } = pipeline.start(pages);
    let id_log = tokio::spawn(async move {
        let mut seen = 0usize;
        while let Some(id) = ids.recv().await {
            debug!(id = %id, "identifier harvested");
            seen += 1;
        }
        seen
    });

    let mut out = BufWriter::new(io::stdout());
    let mut written = 0usize;
    while let Some(illust) = items.recv().await {
        serde_json::to_writer(&mut out, &illust).context("Failed to encode item")?;
        writeln!(out).context("Failed to write item")?;
        written += 1;
    }
    out.flush().context("Failed to flush output")?;

    if let Err(error) = task.await {
        warn!(error = %error, "pipeline task terminated abnormally");
    }
    let harvested = id_log.await.unwrap_or_else(|error| {
        warn!(error = %error, "identifier log task terminated abnormally");
        0
    });
    progress_stop.store(true, Ordering::SeqCst);
    if let Some(handle) = progress_handle {
        let _ = handle.await;
    }

    let harvest = pipeline.harvester().stats();
    let resolve = pipeline.resolver().stats();
    info!(
        ids = harvested,
        items = written,
        pages_fetched = harvest.pages_fetched(),
        pages_failed = harvest.pages_failed(),
        sentinels_skipped = harvest.sentinels_skipped(),
        fetch_failed = resolve.fetch_failed(),
        extract_failed = resolve.extract_failed(),
        "harvest complete"
    );

    Ok(())
}

fn prompt_line(label: &str) -> Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "{label}")?;
    stderr.flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    require_value(label, line.trim_end_matches(['\r', '\n']).to_string())
}

/// Reads a secret without echo on an interactive terminal; piped input is
/// read as a plain line.
fn prompt_secret(label: &str) -> Result<String> {
    let term = Term::stderr();
    if !(term.is_term() && io::stdin().is_terminal()) {
        return prompt_line(label);
    }
    term.write_str(label)?;
    let value = term
        .read_secure_line()
        .context("Failed to read from terminal")?;
    require_value(label, value)
}

fn require_value(label: &str, value: String) -> Result<String> {
    if value.is_empty() {
        bail!("No value entered for '{}'", label.trim_end_matches([':', ' ']));
    }
    Ok(value)
}
