//! Synthetic listing and detail markup.

use std::sync::Arc;

use bookmarks_core::auth::MemorySessionStore;
use bookmarks_core::{HarvestConfig, SessionClient};

pub const EMPTY_LISTING: &str = r#"<ul class="_image-items"><li class="_no-item">No bookmarks</li></ul>"#;

/// Listing page with one anchor per identifier, sentinel entries included.
#[must_use]
pub fn listing_page(ids: &[&str]) -> String {
    let items: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<li class="image-item"><a href="/i/{id}" class="work" data-click-action="illust"data-click-label="{id}">x</a></li>"#
            )
        })
        .collect();
    format!(r#"<ul class="_image-items">{items}</ul>"#)
}

fn head(id: &str) -> String {
    format!(
        r#"<html><head><meta property="og:title" content="「Work {id}」/「Artist {id}」 [pixiv]"></head>
<body><script>pixiv.context.userId = "9{id}";</script>"#
    )
}

#[must_use]
pub fn single_detail(id: &str) -> String {
    format!(
        r#"{}<img alt="Work" data-src="https://i.example.net/img-original/{id}_p0.png" class="original-image"></body></html>"#,
        head(id)
    )
}

#[must_use]
pub fn multi_detail(id: &str, pages: u32) -> String {
    format!(
        r#"{}<div class="page-count"><div class="icon"></div><span>{pages}</span></div></body></html>"#,
        head(id)
    )
}

#[must_use]
pub fn animated_detail(id: &str) -> String {
    format!(
        r#"{}<script>pixiv.context.ugokuIllustData = {{"src":"https:\/\/i.example.net\/ugoira\/{id}.zip","frames":[]}};</script></body></html>"#,
        head(id)
    )
}

/// Session with an empty in-memory store.
#[must_use]
pub fn memory_client(config: &HarvestConfig) -> SessionClient {
    match SessionClient::new(config, Arc::new(MemorySessionStore::default())) {
        Ok(client) => client,
        Err(error) => panic!("failed to build session client: {error}"),
    }
}
