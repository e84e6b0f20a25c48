//! Application configuration: config file values layered under CLI flags.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use bookmarks_core::auth::default_cookie_path;
use bookmarks_core::{Endpoints, HarvestConfig};

use crate::cli::Args;

/// Values read from the config file. Absent keys stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    pub max_in_flight: Option<usize>,
    pub page_workers: Option<usize>,
    pub resolve_workers: Option<usize>,
    pub queue_capacity: Option<usize>,
    pub listing_retries: Option<u32>,
    pub detail_retries: Option<u32>,
    pub login_check_retries: Option<u32>,
    pub login_token_retries: Option<u32>,
    pub connect_timeout_secs: Option<u64>,
    pub read_timeout_secs: Option<u64>,
    /// Cookie file holding the saved session.
    pub cookie_file: Option<PathBuf>,
    /// Base URL serving every endpoint.
    pub base_url: Option<String>,
}

/// Effective settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub harvest: HarvestConfig,
    pub cookie_file: PathBuf,
    pub endpoints: Endpoints,
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/bookmarks/config.toml`
/// 2. `$HOME/.config/bookmarks/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("bookmarks")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("bookmarks")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file at `explicit`, or at the default path if present.
///
/// An explicit path must exist; a missing default file yields defaults.
pub fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    if let Some(path) = explicit {
        return read_file_config(path);
    }
    match resolve_default_config_path() {
        Some(path) if path.exists() => read_file_config(&path),
        _ => Ok(FileConfig::default()),
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_number = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_number}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = || format!("Invalid `{key}` value on line {line_number}");

        match key {
            "max_in_flight" => cfg.max_in_flight = Some(parse_usize(value).with_context(invalid)?),
            "page_workers" => cfg.page_workers = Some(parse_usize(value).with_context(invalid)?),
            "resolve_workers" => {
                cfg.resolve_workers = Some(parse_usize(value).with_context(invalid)?);
            }
            "queue_capacity" => {
                cfg.queue_capacity = Some(parse_usize(value).with_context(invalid)?);
            }
            "listing_retries" => {
                cfg.listing_retries = Some(parse_u32(value).with_context(invalid)?);
            }
            "detail_retries" => cfg.detail_retries = Some(parse_u32(value).with_context(invalid)?),
            "login_check_retries" => {
                cfg.login_check_retries = Some(parse_u32(value).with_context(invalid)?);
            }
            "login_token_retries" => {
                cfg.login_token_retries = Some(parse_u32(value).with_context(invalid)?);
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "cookie_file" => {
                cfg.cookie_file = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "base_url" => cfg.base_url = Some(parse_string_literal(value).with_context(invalid)?),
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_number}");
            }
        }
    }
    Ok(cfg)
}

/// Layers CLI flags over file values over library defaults.
pub fn resolve_settings(args: &Args, file: &FileConfig) -> Result<Settings> {
    let defaults = HarvestConfig::default();
    let retries = args.retries.map(u32::from);

    let harvest = HarvestConfig {
        max_in_flight: args
            .max_in_flight
            .map(usize::from)
            .or(file.max_in_flight)
            .unwrap_or(defaults.max_in_flight),
        page_workers: args
            .page_workers
            .map(usize::from)
            .or(file.page_workers)
            .unwrap_or(defaults.page_workers),
        resolve_workers: args
            .resolve_workers
            .map(usize::from)
            .or(file.resolve_workers)
            .unwrap_or(defaults.resolve_workers),
        queue_capacity: match args.queue_capacity {
            Some(capacity) => usize::try_from(capacity)?,
            None => file.queue_capacity.unwrap_or(defaults.queue_capacity),
        },
        listing_retries: retries
            .or(file.listing_retries)
            .unwrap_or(defaults.listing_retries),
        detail_retries: retries
            .or(file.detail_retries)
            .unwrap_or(defaults.detail_retries),
        login_check_retries: file
            .login_check_retries
            .unwrap_or(defaults.login_check_retries),
        login_token_retries: file
            .login_token_retries
            .unwrap_or(defaults.login_token_retries),
        connect_timeout_secs: file
            .connect_timeout_secs
            .unwrap_or(defaults.connect_timeout_secs),
        read_timeout_secs: file
            .read_timeout_secs
            .unwrap_or(defaults.read_timeout_secs),
    };
    harvest.validate().context("Invalid harvest configuration")?;

    let cookie_file = match args.cookie_file.clone().or_else(|| file.cookie_file.clone()) {
        Some(path) => path,
        None => default_cookie_path().context("No cookie file location; pass --cookie-file")?,
    };

    let endpoints = match args.base_url.as_deref().or(file.base_url.as_deref()) {
        Some(base) => {
            url::Url::parse(base).with_context(|| format!("Invalid base URL '{base}'"))?;
            Endpoints::single_host(base)
        }
        None => Endpoints::default(),
    };

    Ok(Settings {
        harvest,
        cookie_file,
        endpoints,
    })
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_u32(raw_value: &str) -> Result<u32> {
    u32::try_from(parse_integer_u64(raw_value)?)
        .map_err(|_| anyhow::anyhow!("Integer value out of range for u32"))
}

fn parse_usize(raw_value: &str) -> Result<usize> {
    usize::try_from(parse_integer_u64(raw_value)?)
        .map_err(|_| anyhow::anyhow!("Integer value out of range for usize"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["bookmarks", "--cookie-file", "/tmp/cookies.txt"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_parse_config_partial_fields() {
        let cfg = parse_config_str(
            r#"
# pool sizes
max_in_flight = 4
resolve_workers = 6   # inline comment
cookie_file = "/var/lib/bookmarks/cookies.txt"
"#,
        )
        .unwrap();
        assert_eq!(cfg.max_in_flight, Some(4));
        assert_eq!(cfg.resolve_workers, Some(6));
        assert_eq!(
            cfg.cookie_file,
            Some(PathBuf::from("/var/lib/bookmarks/cookies.txt"))
        );
        assert_eq!(cfg.page_workers, None);
    }

    #[test]
    fn test_parse_config_unknown_key_reports_line() {
        let error = parse_config_str("page_workers = 2\nconcurrency = 3\n").unwrap_err();
        assert!(error.to_string().contains("'concurrency' on line 2"), "{error}");
    }

    #[test]
    fn test_parse_config_rejects_negative_and_unquoted() {
        assert!(parse_config_str("listing_retries = -1").is_err());
        assert!(parse_config_str("base_url = http://x").is_err());
        assert!(parse_config_str("no equals sign").is_err());
    }

    #[test]
    fn test_parse_config_hash_inside_string_is_kept() {
        let cfg = parse_config_str(r#"base_url = "http://h/#frag""#).unwrap();
        assert_eq!(cfg.base_url.as_deref(), Some("http://h/#frag"));
    }

    #[test]
    fn test_resolve_settings_cli_overrides_file() {
        let file = FileConfig {
            max_in_flight: Some(4),
            page_workers: Some(3),
            detail_retries: Some(1),
            ..FileConfig::default()
        };
        let settings = resolve_settings(&args(&["-c", "8", "--retries", "2"]), &file).unwrap();
        assert_eq!(settings.harvest.max_in_flight, 8);
        assert_eq!(settings.harvest.page_workers, 3);
        assert_eq!(settings.harvest.resolve_workers, 10);
        assert_eq!(settings.harvest.listing_retries, 2);
        assert_eq!(settings.harvest.detail_retries, 2);
        assert_eq!(settings.cookie_file, PathBuf::from("/tmp/cookies.txt"));
        assert_eq!(settings.endpoints, Endpoints::default());
    }

    #[test]
    fn test_resolve_settings_rejects_zero_capacity_from_file() {
        let file = FileConfig {
            queue_capacity: Some(0),
            ..FileConfig::default()
        };
        assert!(resolve_settings(&args(&[]), &file).is_err());
    }

    #[test]
    fn test_resolve_settings_base_url() {
        let settings =
            resolve_settings(&args(&["--base-url", "http://127.0.0.1:8080/"]), &FileConfig::default())
                .unwrap();
        assert_eq!(
            settings.endpoints,
            Endpoints::single_host("http://127.0.0.1:8080")
        );

        assert!(resolve_settings(&args(&["--base-url", "not a url"]), &FileConfig::default()).is_err());
    }
}
