//! Browser-like header baseline shared by every request profile.

/// Browser User-Agent sent with every request.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:54.0) Gecko/20100101 Firefox/54.0";

/// Accept-Language sent with every request.
pub const ACCEPT_LANGUAGE: &str = "zh-CN,zh;q=0.5";

/// Baseline header pairs merged under every [`HeaderProfile`](crate::session::HeaderProfile).
#[must_use]
pub(crate) fn baseline_headers() -> [(&'static str, &'static str); 2] {
    [
        ("User-Agent", BROWSER_USER_AGENT),
        ("Accept-Language", ACCEPT_LANGUAGE),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_contains_user_agent_and_language() {
        let baseline = baseline_headers();
        assert!(
            baseline
                .iter()
                .any(|(name, value)| *name == "User-Agent" && value.contains("Mozilla/5.0")),
            "baseline must carry a browser UA"
        );
        assert!(
            baseline
                .iter()
                .any(|(name, value)| *name == "Accept-Language" && *value == ACCEPT_LANGUAGE),
            "baseline must carry Accept-Language"
        );
    }
}
