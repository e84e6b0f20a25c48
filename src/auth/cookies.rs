//! Cookie model and the Netscape cookie file format.
//!
//! The session store persists cookies in the Netscape HTTP cookie file format
//! (7 TAB-separated fields per line) so the file stays interchangeable with
//! browser export tools.

use std::fmt;
use std::io::{BufRead, Write};

use tracing::{debug, instrument, warn};

/// A single cookie held by the session.
///
/// The value field is intentionally redacted in Debug output to prevent
/// accidental logging of sensitive cookie data.
#[derive(Clone, PartialEq, Eq)]
pub struct CookieLine {
    /// The domain the cookie belongs to (e.g., `.example.com`).
    pub domain: String,
    /// Whether subdomains should match.
    pub tailmatch: bool,
    /// The URL path scope for the cookie.
    pub path: String,
    /// Whether the cookie should only be sent over HTTPS.
    pub secure: bool,
    /// Unix timestamp for expiry (0 = session cookie).
    pub expires: u64,
    /// Cookie name.
    pub name: String,
    /// Cookie value (sensitive, never log).
    value: String,
}

impl CookieLine {
    /// Creates a new cookie entry.
    #[must_use]
    pub fn new(
        domain: String,
        tailmatch: bool,
        path: String,
        secure: bool,
        expires: u64,
        name: String,
        value: String,
    ) -> Self {
        Self {
            domain,
            tailmatch,
            path,
            secure,
            expires,
            name,
            value,
        }
    }

    /// Returns the cookie value.
    ///
    /// Cookie values are sensitive; avoid logging the return value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

// Custom Debug impl that redacts the cookie value.
impl fmt::Debug for CookieLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieLine")
            .field("domain", &self.domain)
            .field("tailmatch", &self.tailmatch)
            .field("path", &self.path)
            .field("secure", &self.secure)
            .field("expires", &self.expires)
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Errors that can occur while reading or writing a cookie file.
#[derive(Debug, thiserror::Error)]
pub enum CookieError {
    /// A line in the cookie file has an invalid format.
    #[error("line {line_number}: {reason} (got: {content})")]
    InvalidLine {
        /// 1-based line number in the cookie file.
        line_number: usize,
        /// The offending line content (truncated, with value redacted).
        content: String,
        /// Description of what was wrong.
        reason: String,
    },

    /// I/O error reading or writing the cookie file.
    #[error("failed to access cookie file: {0}")]
    Io(#[from] std::io::Error),

    /// No valid cookies found in a non-empty file.
    #[error("no valid cookies found in file ({malformed_count} lines failed to parse)")]
    NoCookiesFound {
        /// Number of malformed lines encountered.
        malformed_count: usize,
    },
}

/// Result of parsing a cookie file, including successfully parsed cookies
/// and any warnings about malformed lines.
#[derive(Debug)]
pub struct ParseResult {
    /// Successfully parsed cookies.
    pub cookies: Vec<CookieLine>,
    /// Warnings for malformed lines (line number and reason).
    pub warnings: Vec<(usize, String)>,
}

/// Parses a Netscape-format cookie file from a buffered reader.
///
/// Each non-comment, non-blank line must contain exactly 7 TAB-separated fields:
/// `domain`, `tailmatch`, `path`, `secure`, `expires`, `name`, `value`.
///
/// Lines starting with `#` and blank lines are skipped, except the
/// `#HttpOnly_` prefix browsers use, which marks a regular cookie line.
///
/// # Errors
///
/// Returns [`CookieError::Io`] on read failure, or
/// [`CookieError::NoCookiesFound`] when a non-empty file yields zero valid cookies.
/// Individual malformed lines are collected as warnings (partial success).
#[instrument(level = "debug", skip(reader))]
pub fn parse_netscape_cookies(reader: impl BufRead) -> Result<ParseResult, CookieError> {
    let mut cookies = Vec::new();
    let mut warnings = Vec::new();
    let mut non_blank_lines = 0;

    for (idx, line_result) in reader.lines().enumerate() {
        let line_number = idx + 1;
        let line = line_result?;
        // Handle CRLF: strip trailing \r
        let line = line.trim_end();

        if line.is_empty() {
            continue;
        }

        let line = match line.strip_prefix("#HttpOnly_") {
            Some(rest) => rest,
            None if line.starts_with('#') => continue,
            None => line,
        };

        non_blank_lines += 1;

        match parse_cookie_line(line, line_number) {
            Ok(cookie) => {
                debug!(
                    line = line_number,
                    domain = %cookie.domain,
                    name = %cookie.name,
                    "parsed cookie"
                );
                cookies.push(cookie);
            }
            Err(e) => {
                warn!(line = line_number, reason = %e, "skipping malformed cookie line");
                warnings.push((line_number, e.to_string()));
            }
        }
    }

    if cookies.is_empty() && non_blank_lines > 0 {
        return Err(CookieError::NoCookiesFound {
            malformed_count: warnings.len(),
        });
    }

    Ok(ParseResult { cookies, warnings })
}

/// Writes cookies in Netscape format, header line first.
///
/// # Errors
///
/// Returns [`CookieError::Io`] when the writer fails.
pub fn write_netscape_cookies(
    mut writer: impl Write,
    cookies: &[CookieLine],
) -> Result<(), CookieError> {
    writeln!(writer, "# Netscape HTTP Cookie File")?;
    for cookie in cookies {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            cookie.domain,
            bool_field(cookie.tailmatch),
            cookie.path,
            bool_field(cookie.secure),
            cookie.expires,
            cookie.name,
            cookie.value
        )?;
    }
    writer.flush()?;
    Ok(())
}

fn bool_field(value: bool) -> &'static str {
    if value { "TRUE" } else { "FALSE" }
}

fn parse_cookie_line(line: &str, line_number: usize) -> Result<CookieLine, CookieError> {
    let fields: Vec<&str> = line.split('\t').collect();

    if fields.len() != 7 {
        return Err(CookieError::InvalidLine {
            line_number,
            content: redact_line_for_error(line),
            reason: format!("expected 7 TAB-separated fields, found {}", fields.len()),
        });
    }

    let domain = fields[0].to_string();
    let tailmatch = parse_bool_field(fields[1], "tailmatch", line_number, line)?;
    let path = fields[2].to_string();
    let secure = parse_bool_field(fields[3], "secure", line_number, line)?;

    let expires = fields[4]
        .parse::<u64>()
        .map_err(|_| CookieError::InvalidLine {
            line_number,
            content: redact_line_for_error(line),
            reason: format!(
                "expires field must be a non-negative integer, got '{}'",
                fields[4]
            ),
        })?;

    let name = fields[5].to_string();
    let value = fields[6].to_string();

    if domain.is_empty() {
        return Err(CookieError::InvalidLine {
            line_number,
            content: redact_line_for_error(line),
            reason: "domain field is empty".to_string(),
        });
    }

    if name.is_empty() {
        return Err(CookieError::InvalidLine {
            line_number,
            content: redact_line_for_error(line),
            reason: "cookie name field is empty".to_string(),
        });
    }

    Ok(CookieLine::new(
        domain, tailmatch, path, secure, expires, name, value,
    ))
}

fn parse_bool_field(
    value: &str,
    field_name: &str,
    line_number: usize,
    line: &str,
) -> Result<bool, CookieError> {
    match value {
        "TRUE" => Ok(true),
        "FALSE" => Ok(false),
        _ => Err(CookieError::InvalidLine {
            line_number,
            content: redact_line_for_error(line),
            reason: format!("{field_name} field must be TRUE or FALSE, got '{value}'"),
        }),
    }
}

/// Redacts cookie value (7th field) from a line for safe error messages.
fn redact_line_for_error(line: &str) -> String {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() >= 7 {
        let mut redacted = fields[..6].join("\t");
        redacted.push_str("\t[REDACTED]");
        redacted
    } else {
        line.to_string()
    }
}
