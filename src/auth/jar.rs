//! Cookie jar backing the session's HTTP client.
//!
//! `SessionJar` keeps reqwest's [`CookieStore`] contract on top of the
//! `cookie_store` rules engine, and converts its contents to and from
//! [`CookieLine`]s so the session can be saved explicitly.

use std::fmt;
use std::sync::RwLock;

use cookie::time::OffsetDateTime;
use cookie_store::{CookieDomain, CookieExpiration, RawCookie};
use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use tracing::{debug, trace, warn};
use url::Url;

use super::cookies::CookieLine;

/// Thread-safe cookie jar that can be snapshotted for persistence.
#[derive(Default)]
pub struct SessionJar {
    store: RwLock<cookie_store::CookieStore>,
}

impl fmt::Debug for SessionJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionJar")
            .field("cookies", &self.len())
            .finish()
    }
}

impl SessionJar {
    /// Creates a jar pre-populated with `cookies`, dropping any already expired.
    #[must_use]
    pub fn with_cookies(cookies: Vec<CookieLine>) -> Self {
        let jar = Self::default();
        for cookie in &cookies {
            jar.insert(cookie);
        }
        debug!(cookies = jar.len(), "seeded session jar");
        jar
    }

    /// Inserts or replaces a stored cookie; an expired one removes its slot.
    pub fn insert(&self, cookie: &CookieLine) {
        let Some((raw, origin)) = raw_cookie(cookie) else {
            warn!(name = %cookie.name, domain = %cookie.domain, "skipping unusable stored cookie");
            return;
        };
        let Ok(mut store) = self.store.write() else {
            warn!("cookie jar lock poisoned; dropping cookie update");
            return;
        };
        if let Err(error) = store.insert_raw(&raw, &origin) {
            trace!(name = %cookie.name, error = %error, "stored cookie not kept");
        }
    }

    /// Returns the live cookies currently held.
    #[must_use]
    pub fn snapshot(&self) -> Vec<CookieLine> {
        self.store
            .read()
            .map(|store| store.iter_unexpired().filter_map(cookie_line).collect())
            .unwrap_or_default()
    }

    /// Number of live cookies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store
            .read()
            .map(|store| store.iter_unexpired().count())
            .unwrap_or_default()
    }

    /// Returns true when the jar holds no live cookie.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CookieStore for SessionJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let received: Vec<RawCookie<'static>> = cookie_headers
            .filter_map(|header| header.to_str().ok())
            .filter_map(|raw| RawCookie::parse(raw.to_owned()).ok())
            .filter(|cookie| {
                let rejected = cookie
                    .domain()
                    .is_some_and(|domain| is_bare_suffix(domain, url));
                if rejected {
                    debug!(name = cookie.name(), "rejecting cookie scoped to a bare suffix");
                }
                !rejected
            })
            .collect();
        if received.is_empty() {
            return;
        }

        let Ok(mut store) = self.store.write() else {
            warn!("cookie jar lock poisoned; dropping cookie update");
            return;
        };
        trace!(count = received.len(), host = url.host_str(), "storing response cookies");
        store.store_response_cookies(received.into_iter(), url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let header = self
            .store
            .read()
            .ok()?
            .get_request_values(url)
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        if header.is_empty() {
            return None;
        }
        HeaderValue::from_str(&header).ok()
    }
}

/// A `Domain` attribute naming a single label (`net`, `jp`) other than the
/// request host itself.
fn is_bare_suffix(domain: &str, url: &Url) -> bool {
    let domain = domain.trim_start_matches('.');
    !domain.is_empty()
        && !domain.contains('.')
        && url
            .host_str()
            .is_none_or(|host| !host.eq_ignore_ascii_case(domain))
}

fn cookie_line(cookie: &cookie_store::Cookie<'static>) -> Option<CookieLine> {
    let (domain, tailmatch) = match &cookie.domain {
        CookieDomain::HostOnly(host) => (host.clone(), false),
        CookieDomain::Suffix(suffix) => (format!(".{suffix}"), true),
        CookieDomain::NotPresent | CookieDomain::Empty => return None,
    };
    // 0 marks a session cookie in the file format.
    let expires = match &cookie.expires {
        CookieExpiration::AtUtc(at) => u64::try_from(at.unix_timestamp()).map_or(1, |secs| secs.max(1)),
        CookieExpiration::SessionEnd => 0,
    };
    Some(CookieLine::new(
        domain,
        tailmatch,
        String::from(&cookie.path),
        cookie.secure().unwrap_or(false),
        expires,
        cookie.name().to_string(),
        cookie.value().to_string(),
    ))
}

fn raw_cookie(line: &CookieLine) -> Option<(RawCookie<'static>, Url)> {
    let host = line.domain.trim_start_matches('.');
    let scheme = if line.secure { "https" } else { "http" };
    let origin = Url::parse(&format!("{scheme}://{host}/")).ok()?;

    let mut builder = RawCookie::build((line.name.clone(), line.value().to_string()))
        .path(line.path.clone())
        .secure(line.secure);
    if line.tailmatch {
        builder = builder.domain(host.to_string());
    }
    if line.expires != 0 {
        let at = i64::try_from(line.expires)
            .ok()
            .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())?;
        builder = builder.expires(at);
    }
    Some((builder.build(), origin))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cookie(domain: &str, name: &str, value: &str, expires: u64) -> CookieLine {
        CookieLine::new(
            domain.to_string(),
            domain.starts_with('.'),
            "/".to_string(),
            false,
            expires,
            name.to_string(),
            value.to_string(),
        )
    }

    fn receive(jar: &SessionJar, url: &str, header: &'static str) {
        let url: Url = url.parse().unwrap();
        let value = HeaderValue::from_static(header);
        jar.set_cookies(&mut std::iter::once(&value), &url);
    }

    #[test]
    fn test_seeded_jar_drops_expired_cookies() {
        let jar = SessionJar::with_cookies(vec![
            cookie(".pixiv.net", "live", "1", 0),
            cookie(".pixiv.net", "dead", "2", 1),
        ]);
        let names: Vec<String> = jar.snapshot().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["live".to_string()]);
    }

    #[test]
    fn test_snapshot_keeps_stored_fields() {
        let stored = vec![
            CookieLine::new(
                ".pixiv.net".to_string(),
                true,
                "/".to_string(),
                true,
                4_000_000_000,
                "PHPSESSID".to_string(),
                "42_abc".to_string(),
            ),
            cookie("accounts.pixiv.net", "device", "x", 0),
        ];
        let mut snapshot = SessionJar::with_cookies(stored.clone()).snapshot();
        snapshot.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(snapshot, vec![stored[1].clone(), stored[0].clone()]);
    }

    #[test]
    fn test_set_cookies_replaces_same_slot() {
        let jar = SessionJar::default();
        receive(&jar, "https://www.pixiv.net/", "PHPSESSID=one; Path=/");
        receive(&jar, "https://www.pixiv.net/", "PHPSESSID=two; Path=/");

        let snapshot = jar.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].value(), "two");
        assert_eq!(snapshot[0].domain, "www.pixiv.net");
        assert!(!snapshot[0].tailmatch);
    }

    #[test]
    fn test_set_cookies_max_age_zero_deletes() {
        let jar = SessionJar::default();
        receive(&jar, "https://www.pixiv.net/", "PHPSESSID=one; Path=/");
        receive(&jar, "https://www.pixiv.net/", "PHPSESSID=; Path=/; Max-Age=0");
        assert!(jar.is_empty());
    }

    #[test]
    fn test_set_cookies_past_dashed_expires_deletes() {
        let jar = SessionJar::default();
        receive(&jar, "https://www.pixiv.net/", "PHPSESSID=one; path=/");
        receive(
            &jar,
            "https://www.pixiv.net/",
            "PHPSESSID=deleted; expires=Thu, 01-Jan-1970 00:00:01 GMT; path=/",
        );
        assert!(jar.is_empty());
        assert!(jar.snapshot().is_empty());
    }

    #[test]
    fn test_set_cookies_future_dashed_expires_is_persistent() {
        let jar = SessionJar::default();
        receive(
            &jar,
            "https://www.pixiv.net/",
            "p_ab_id=5; expires=Fri, 01-Jan-2100 00:00:00 GMT; path=/; domain=.pixiv.net",
        );
        let snapshot = jar.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].domain, ".pixiv.net");
        assert_eq!(snapshot[0].expires, 4_102_444_800);
    }

    #[test]
    fn test_set_cookies_rejects_bare_suffix_domain() {
        let jar = SessionJar::default();
        receive(&jar, "https://www.pixiv.net/", "a=1; Domain=net");
        receive(&jar, "https://www.pixiv.net/", "b=2; Domain=.net");
        assert!(jar.is_empty());
    }

    #[test]
    fn test_set_cookies_rejects_foreign_domain() {
        let jar = SessionJar::default();
        receive(&jar, "https://www.pixiv.net/", "a=b; Domain=evil.com");
        assert!(jar.is_empty());
    }

    #[test]
    fn test_cookies_header_only_for_matching_host() {
        let jar = SessionJar::with_cookies(vec![
            cookie(".pixiv.net", "a", "1", 0),
            cookie("other.org", "b", "2", 0),
        ]);
        let header = jar
            .cookies(&"https://www.pixiv.net/bookmark.php".parse().unwrap())
            .unwrap();
        assert_eq!(header.to_str().unwrap(), "a=1");
        assert!(jar.cookies(&"https://example.com/".parse().unwrap()).is_none());
    }

    #[test]
    fn test_secure_cookie_needs_https() {
        let jar = SessionJar::default();
        receive(&jar, "https://www.pixiv.net/", "s=1; Path=/; Secure");
        assert!(jar.cookies(&"https://www.pixiv.net/".parse().unwrap()).is_some());
        assert!(jar.cookies(&"http://www.pixiv.net/".parse().unwrap()).is_none());
    }
}
