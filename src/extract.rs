//! Pattern extraction from listing and detail page markup.
//!
//! Each component owns its own compiled matchers, built once when the
//! component is constructed. Every lookup is presence-checked: a missing
//! capture is an [`ExtractError`], never a panic.

use regex::Regex;
use thiserror::Error;

use crate::illust::{Illust, IllustKind};
use crate::site::Endpoints;

/// Identifier the listing uses for deleted or unavailable items.
pub const DELETED_SENTINEL: &str = "0";

/// Largest page count accepted from a multi-page work.
pub const MAX_PAGE_COUNT: u32 = 1000;

const LISTING_ID_PATTERN: &str = r#"data-click-action="illust"\s*data-click-label="(\d+)""#;
const EMPTY_LISTING_MARKER: &str = r#"li class="_no-item""#;

const ANIMATED_MARKER: &str = "pixiv.context.ugokuIllustData";
const ANIMATED_SRC_PATTERN: &str = r#"ugokuIllustData\s*=\s*\{\s*"src"\s*:\s*"([^"]+)""#;
const PAGE_COUNT_PATTERN: &str =
    r#"class="page-count"[^>]*>\s*(?:<div class="icon"></div>)?\s*<span>(\d+)</span>"#;
const SINGLE_IMAGE_PATTERN: &str = r#"data-src="([^"]+)"\s+class="original-image""#;
const TITLE_PATTERN: &str = r#"<meta property="og:title" content="「(.+?)」/「(.+?)」"#;
const AUTHOR_ID_PATTERN: &str = r#"pixiv\.context\.userId\s*=\s*"(\d+)""#;

/// A required pattern did not match, or matched something unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// A required field was absent from the page.
    #[error("item {id}: `{field}` not found in detail page")]
    MissingField {
        /// Item identifier.
        id: String,
        /// Name of the missing field.
        field: &'static str,
    },

    /// The page-count marker held an unusable or implausibly large number.
    #[error("item {id}: invalid page count '{raw}'")]
    InvalidPageCount {
        /// Item identifier.
        id: String,
        /// Captured text.
        raw: String,
    },

    /// A record would have had no image location.
    #[error("item {id}: no image locations")]
    EmptyImages {
        /// Item identifier.
        id: String,
    },
}

/// Compiles a pattern that is a compile-time constant.
///
/// # Panics
///
/// Panics if `pattern` is invalid; every caller passes a literal.
#[must_use]
pub fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// Identifiers found on one listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingIds {
    /// Valid identifiers in page order.
    pub ids: Vec<String>,
    /// Number of sentinel entries dropped.
    pub sentinels: usize,
}

/// Matchers for bookmark listing pages.
#[derive(Debug, Clone)]
pub struct ListingPatterns {
    id_re: Regex,
}

impl Default for ListingPatterns {
    fn default() -> Self {
        Self::new()
    }
}

impl ListingPatterns {
    /// Compiles the listing matchers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id_re: compile_static_regex(LISTING_ID_PATTERN),
        }
    }

    /// Extracts every item identifier, dropping the deleted-item sentinel.
    #[must_use]
    pub fn extract_ids(&self, body: &str) -> ListingIds {
        let mut found = ListingIds::default();
        for id in self
            .id_re
            .captures_iter(body)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
        {
            if id == DELETED_SENTINEL {
                found.sentinels += 1;
            } else {
                found.ids.push(id.to_string());
            }
        }
        found
    }

    /// Returns true when the page shows the "no bookmarks" marker.
    #[must_use]
    pub fn is_empty_listing(&self, body: &str) -> bool {
        body.contains(EMPTY_LISTING_MARKER)
    }
}

/// Matchers for item detail pages.
#[derive(Debug, Clone)]
pub struct DetailPatterns {
    animated_src_re: Regex,
    page_count_re: Regex,
    single_image_re: Regex,
    title_re: Regex,
    author_id_re: Regex,
}

impl Default for DetailPatterns {
    fn default() -> Self {
        Self::new()
    }
}

impl DetailPatterns {
    /// Compiles the detail matchers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            animated_src_re: compile_static_regex(ANIMATED_SRC_PATTERN),
            page_count_re: compile_static_regex(PAGE_COUNT_PATTERN),
            single_image_re: compile_static_regex(SINGLE_IMAGE_PATTERN),
            title_re: compile_static_regex(TITLE_PATTERN),
            author_id_re: compile_static_regex(AUTHOR_ID_PATTERN),
        }
    }

    /// Classifies the page. Markers are tested in order (animated, then
    /// page count) so exactly one kind is ever chosen.
    #[must_use]
    pub fn classify(&self, body: &str) -> IllustKind {
        if body.contains(ANIMATED_MARKER) {
            IllustKind::Animated
        } else if self.page_count_re.is_match(body) {
            IllustKind::Multi
        } else {
            IllustKind::Single
        }
    }

    /// Extracts a complete record from a detail page.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] when any required pattern is absent.
    pub fn extract(
        &self,
        id: &str,
        body: &str,
        endpoints: &Endpoints,
    ) -> Result<Illust, ExtractError> {
        let kind = self.classify(body);
        let image_urls = match kind {
            IllustKind::Animated => {
                let src = capture(&self.animated_src_re, body, id, "animated_src")?;
                vec![src.replace("\\/", "/")]
            }
            IllustKind::Multi => {
                let raw = capture(&self.page_count_re, body, id, "page_count")?;
                let count = raw
                    .parse::<u32>()
                    .ok()
                    .filter(|count| *count <= MAX_PAGE_COUNT)
                    .ok_or_else(|| ExtractError::InvalidPageCount {
                        id: id.to_string(),
                        raw: raw.to_string(),
                    })?;
                multi_page_urls(endpoints, id, count)
            }
            IllustKind::Single => {
                vec![decode_entities(capture(&self.single_image_re, body, id, "image_url")?)]
            }
        };

        let title_caps = self
            .title_re
            .captures(body)
            .ok_or_else(|| missing(id, "title"))?;
        let title = title_caps.get(1).ok_or_else(|| missing(id, "title"))?;
        let author_name = title_caps
            .get(2)
            .ok_or_else(|| missing(id, "author_name"))?;
        let author_id = capture(&self.author_id_re, body, id, "author_id")?;

        Illust::new(
            id,
            decode_entities(title.as_str()),
            author_id,
            decode_entities(author_name.as_str()),
            kind,
            image_urls,
        )
    }
}

/// Synthesizes one image location per page, zero-based, in page order.
#[must_use]
pub fn multi_page_urls(endpoints: &Endpoints, id: &str, count: u32) -> Vec<String> {
    (0..count)
        .map(|index| endpoints.multi_page_url(id, index))
        .collect()
}

fn capture<'h>(
    re: &Regex,
    body: &'h str,
    id: &str,
    field: &'static str,
) -> Result<&'h str, ExtractError> {
    re.captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| missing(id, field))
}

fn missing(id: &str, field: &'static str) -> ExtractError {
    ExtractError::MissingField {
        id: id.to_string(),
        field,
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
