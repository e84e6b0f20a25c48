//! Durable session cookie storage.
//!
//! The session loads cookies once at construction and writes them back only
//! when explicitly asked to, typically right after a successful login.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, instrument, warn};

use super::cookies::{CookieError, CookieLine, parse_netscape_cookies, write_netscape_cookies};

const APP_DIR_NAME: &str = "bookmarks";
const COOKIE_FILE_NAME: &str = "cookies.txt";

/// Errors for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No suitable user config directory is available.
    #[error("unable to determine config directory (set XDG_CONFIG_HOME or HOME)")]
    ConfigDirUnavailable,
    /// Filesystem I/O failed.
    #[error("cookie store I/O failed for {path}: {source}")]
    Io {
        /// Store location.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Stored cookie file could not be parsed.
    #[error(transparent)]
    Cookie(#[from] CookieError),
    /// In-memory store lock was poisoned.
    #[error("session store lock poisoned")]
    Poisoned,
}

impl StoreError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Opaque durable store the session loads from and saves to.
pub trait SessionStore: Send + Sync {
    /// Reads stored cookies. An absent store yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store exists but cannot be read.
    fn load(&self) -> Result<Vec<CookieLine>, StoreError>;

    /// Replaces the stored cookies with `cookies`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be written.
    fn save(&self, cookies: &[CookieLine]) -> Result<(), StoreError>;
}

/// Netscape-format cookie file on disk.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Creates a store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the cookie file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    fn load(&self) -> Result<Vec<CookieLine>, StoreError> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!("no stored session cookies");
                return Ok(Vec::new());
            }
            Err(error) => return Err(StoreError::io(&self.path, error)),
        };

        let parsed = match parse_netscape_cookies(BufReader::new(file)) {
            Ok(parsed) => parsed,
            Err(CookieError::NoCookiesFound { malformed_count }) => {
                warn!(malformed_count, "stored cookie file has no usable cookies");
                return Ok(Vec::new());
            }
            Err(error) => return Err(error.into()),
        };
        for (line, reason) in &parsed.warnings {
            warn!(line, reason = %reason, "skipping malformed stored cookie");
        }
        debug!(cookies = parsed.cookies.len(), "loaded stored session cookies");
        Ok(parsed.cookies)
    }

    #[instrument(level = "debug", skip(self, cookies), fields(path = %self.path.display(), cookies = cookies.len()))]
    fn save(&self, cookies: &[CookieLine]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        // Sibling temp file, then rename over the target.
        let temp_path = self.path.with_extension("tmp");
        let file = fs::File::create(&temp_path).map_err(|e| StoreError::io(&temp_path, e))?;
        set_owner_only_permissions(&temp_path)?;
        write_netscape_cookies(BufWriter::new(file), cookies)?;
        fs::rename(&temp_path, &self.path).map_err(|e| StoreError::io(&self.path, e))?;
        debug!("saved session cookies");
        Ok(())
    }
}

#[cfg(unix)]
fn set_owner_only_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| StoreError::io(path, e))
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

/// Process-local store, for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    cookies: Mutex<Vec<CookieLine>>,
}

impl MemorySessionStore {
    /// Creates a store pre-filled with `cookies`.
    #[must_use]
    pub fn with_cookies(cookies: Vec<CookieLine>) -> Self {
        Self {
            cookies: Mutex::new(cookies),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Vec<CookieLine>, StoreError> {
        self.cookies
            .lock()
            .map(|cookies| cookies.clone())
            .map_err(|_| StoreError::Poisoned)
    }

    fn save(&self, cookies: &[CookieLine]) -> Result<(), StoreError> {
        let mut stored = self.cookies.lock().map_err(|_| StoreError::Poisoned)?;
        *stored = cookies.to_vec();
        Ok(())
    }
}

/// Returns the default cookie file path (`~/.config/bookmarks/cookies.txt`).
///
/// # Errors
///
/// Returns [`StoreError::ConfigDirUnavailable`] if no usable config dir is found.
pub fn default_cookie_path() -> Result<PathBuf, StoreError> {
    Ok(default_config_dir()?.join(COOKIE_FILE_NAME))
}

/// Returns the application config directory.
///
/// Priority: `$XDG_CONFIG_HOME/bookmarks`, `$HOME/.config/bookmarks`,
/// `%APPDATA%/bookmarks`.
///
/// # Errors
///
/// Returns [`StoreError::ConfigDirUnavailable`] if none of the variables is set.
pub fn default_config_dir() -> Result<PathBuf, StoreError> {
    resolve_config_dir(
        sanitize_env_path(env::var_os("XDG_CONFIG_HOME")),
        sanitize_env_path(env::var_os("HOME")),
        sanitize_env_path(env::var_os("APPDATA")),
    )
}

fn sanitize_env_path(value: Option<OsString>) -> Option<PathBuf> {
    let value = value?;
    if value.to_string_lossy().trim().is_empty() {
        return None;
    }

    Some(PathBuf::from(value))
}

fn resolve_config_dir(
    xdg_config_home: Option<PathBuf>,
    home: Option<PathBuf>,
    app_data: Option<PathBuf>,
) -> Result<PathBuf, StoreError> {
    if let Some(xdg) = xdg_config_home {
        return Ok(xdg.join(APP_DIR_NAME));
    }
    if let Some(home) = home {
        return Ok(home.join(".config").join(APP_DIR_NAME));
    }
    if let Some(app_data) = app_data {
        return Ok(app_data.join(APP_DIR_NAME));
    }

    Err(StoreError::ConfigDirUnavailable)
}
