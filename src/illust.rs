//! Resolved bookmark record.

use std::fmt;

use serde::Serialize;

use crate::extract::ExtractError;

/// Shape of a bookmarked item's media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IllustKind {
    /// One image.
    Single,
    /// Ordered sequence of pages.
    Multi,
    /// Animated sequence shipped as one archive.
    Animated,
}

impl fmt::Display for IllustKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Single => "single",
            Self::Multi => "multi",
            Self::Animated => "animated",
        })
    }
}

/// One bookmarked artifact, immutable once resolved.
///
/// The image-location sequence is never empty: [`Illust::new`] refuses to
/// build a record without one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Illust {
    id: String,
    title: String,
    author_id: String,
    author_name: String,
    kind: IllustKind,
    image_urls: Vec<String>,
}

impl Illust {
    /// Builds a record.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::EmptyImages`] when `image_urls` is empty.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        author_id: impl Into<String>,
        author_name: impl Into<String>,
        kind: IllustKind,
        image_urls: Vec<String>,
    ) -> Result<Self, ExtractError> {
        let id = id.into();
        if image_urls.is_empty() {
            return Err(ExtractError::EmptyImages { id });
        }
        Ok(Self {
            id,
            title: title.into(),
            author_id: author_id.into(),
            author_name: author_name.into(),
            kind,
            image_urls,
        })
    }

    /// Item identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Item title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Author identifier.
    #[must_use]
    pub fn author_id(&self) -> &str {
        &self.author_id
    }

    /// Author display name.
    #[must_use]
    pub fn author_name(&self) -> &str {
        &self.author_name
    }

    /// Media shape.
    #[must_use]
    pub fn kind(&self) -> IllustKind {
        self.kind
    }

    /// Image locations; page order for multi-page items.
    #[must_use]
    pub fn image_urls(&self) -> &[String] {
        &self.image_urls
    }
}
