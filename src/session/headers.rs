//! Immutable per-request header profiles.
//!
//! Every profile starts from the baseline (User-Agent, Accept-Language) and
//! layers overrides on top; an override replaces a baseline entry with the
//! same (case-insensitive) name. Profiles are values, so concurrent requests
//! never observe a half-updated header set.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use super::TransportError;
use crate::site::Endpoints;
use crate::user_agent;

const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const JSON_ACCEPT: &str = "application/json, text/javascript, */*; q=0.01";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// Ordered header set sent with one logical class of request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderProfile {
    headers: Vec<(String, String)>,
}

impl Default for HeaderProfile {
    fn default() -> Self {
        Self::baseline()
    }
}

impl HeaderProfile {
    /// Baseline headers only.
    #[must_use]
    pub fn baseline() -> Self {
        Self {
            headers: user_agent::baseline_headers()
                .iter()
                .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
                .collect(),
        }
    }

    /// Returns a copy with `name` set to `value`, replacing any existing entry.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// Profile for ordinary content pages.
    #[must_use]
    pub fn page() -> Self {
        Self::baseline().with("Accept", HTML_ACCEPT)
    }

    /// Profile for fetching the login form.
    #[must_use]
    pub fn login_page(endpoints: &Endpoints) -> Self {
        Self::page().with("Referer", endpoints.root_url())
    }

    /// Profile for the XHR-style login submission.
    #[must_use]
    pub fn login_xhr(endpoints: &Endpoints) -> Self {
        Self::baseline()
            .with("Referer", endpoints.login_referer())
            .with("Accept", JSON_ACCEPT)
            .with("X-Requested-With", "XMLHttpRequest")
            .with("Content-Type", FORM_CONTENT_TYPE)
    }

    /// Looks up a header value by case-insensitive name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Number of headers in the profile.
    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Returns true when the profile carries no header.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub(crate) fn to_header_map(&self) -> Result<HeaderMap, TransportError> {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let invalid = || TransportError::InvalidHeader { name: name.clone() };
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }
}
