//! Endpoint templates and listing scopes.

use std::fmt;
use std::str::FromStr;

/// Default base for content pages.
pub const DEFAULT_WWW_BASE: &str = "https://www.pixiv.net";

/// Default base for the account service.
pub const DEFAULT_ACCOUNTS_BASE: &str = "https://accounts.pixiv.net";

/// Which partition of the bookmark collection is being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Publicly visible bookmarks.
    Show,
    /// Private bookmarks.
    Hide,
}

impl Scope {
    /// Returns the `rest` query value the listing endpoint expects.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Show => "show",
            Self::Hide => "hide",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "show" | "public" => Ok(Self::Show),
            "hide" | "private" => Ok(Self::Hide),
            other => Err(format!("unknown scope '{other}' (expected show or hide)")),
        }
    }
}

/// URL templates for every endpoint the harvester talks to.
///
/// Both bases are stored without a trailing slash so templates can append
/// absolute paths directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    www_base: String,
    accounts_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_WWW_BASE, DEFAULT_ACCOUNTS_BASE)
    }
}

impl Endpoints {
    /// Creates endpoints rooted at the given bases.
    #[must_use]
    pub fn new(www_base: impl Into<String>, accounts_base: impl Into<String>) -> Self {
        Self {
            www_base: trim_base(www_base.into()),
            accounts_base: trim_base(accounts_base.into()),
        }
    }

    /// Creates endpoints with both services behind one base (used against mock servers).
    #[must_use]
    pub fn single_host(base: impl Into<String>) -> Self {
        let base = base.into();
        Self::new(base.clone(), base)
    }

    /// Site root, fetched to check whether the session is authenticated.
    #[must_use]
    pub fn root_url(&self) -> String {
        format!("{}/", self.www_base)
    }

    /// Login form page carrying the one-time token.
    #[must_use]
    pub fn login_page_url(&self) -> String {
        format!("{}/login", self.accounts_base)
    }

    /// Login form submission endpoint.
    #[must_use]
    pub fn login_api_url(&self) -> String {
        format!("{}/api/login?lang=zh", self.accounts_base)
    }

    /// Referer sent with the login submission.
    #[must_use]
    pub fn login_referer(&self) -> String {
        format!(
            "{}/login?lang=zh&source=pc&view_type=page&ref=wwwtop_accounts_index",
            self.accounts_base
        )
    }

    /// One page of the bookmark listing.
    #[must_use]
    pub fn listing_url(&self, scope: Scope, page: u32) -> String {
        format!("{}/bookmark.php?rest={scope}&p={page}", self.www_base)
    }

    /// Detail page of one bookmarked item.
    #[must_use]
    pub fn detail_url(&self, id: &str) -> String {
        format!(
            "{}/member_illust.php?mode=medium&illust_id={id}",
            self.www_base
        )
    }

    /// Image location of page `index` (zero-based) of a multi-page item.
    #[must_use]
    pub fn multi_page_url(&self, id: &str, index: u32) -> String {
        format!(
            "{}/member_illust.php?mode=manga_big&illust_id={id}&page={index}",
            self.www_base
        )
    }
}

fn trim_base(mut base: String) -> String {
    while base.ends_with('/') {
        base.pop();
    }
    base
}
