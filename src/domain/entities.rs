//! Domain entities mirrored from persistent storage and the repository host.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::error::{DomainError, require_text};
use crate::store::{Identity, Indexable};

/// A tag as attached to a document or project: just the value and its colour.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagRef {
    pub value: String,
    pub color: String,
}

impl TagRef {
    pub fn new(value: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            color: color.into(),
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        require_text("tag.value", &self.value)?;
        require_text("tag.color", &self.color)
    }
}

/// Records that carry tags.
pub trait Tagged {
    fn tags(&self) -> &[TagRef];

    fn has_tag(&self, value: &str) -> bool {
        self.tags().iter().any(|tag| tag.value == value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub id: Identity,
    pub value: String,
    pub color: String,
}

impl TagRecord {
    pub fn to_tag_ref(&self) -> TagRef {
        TagRef::new(self.value.clone(), self.color.clone())
    }
}

impl Indexable for TagRecord {
    const ENTITY: &'static str = "tag";

    fn id(&self) -> Identity {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: Identity,
    pub title: String,
    pub content: String,
    pub tags: Vec<TagRef>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Tagged for DocumentRecord {
    fn tags(&self) -> &[TagRef] {
        &self.tags
    }
}

impl Indexable for DocumentRecord {
    const ENTITY: &'static str = "document";

    fn id(&self) -> Identity {
        self.id
    }
}

/// Input for creating a document; tags are linked by value and created if missing.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub title: String,
    pub content: String,
    pub tags: Vec<TagRef>,
    pub created_at: OffsetDateTime,
}

impl NewDocument {
    pub fn validate(&self) -> Result<(), DomainError> {
        require_text("document.title", &self.title)?;
        self.tags.iter().try_for_each(TagRef::validate)
    }
}

/// A repository listed by the code host, merged with its local override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: Identity,
    pub name: String,
    pub description: Option<String>,
    pub url: String,
    pub image_link: Option<String>,
    pub hidden: bool,
    pub tags: Vec<TagRef>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub pushed_at: Option<OffsetDateTime>,
}

impl Tagged for ProjectRecord {
    fn tags(&self) -> &[TagRef] {
        &self.tags
    }
}

impl ProjectOverride {
    pub fn validate(&self) -> Result<(), DomainError> {
        self.tags.iter().try_for_each(TagRef::validate)
    }
}

impl ProjectRecord {
    /// Apply the locally stored presentation data for this project.
    ///
    /// A stored description replaces the listed one; image, visibility and tags
    /// always come from the override.
    pub fn merge(mut self, local: ProjectOverride) -> Self {
        if local.description.is_some() {
            self.description = local.description;
        }
        self.image_link = local.image_link;
        self.hidden = local.hidden;
        self.tags = local.tags;
        self
    }
}

impl Indexable for ProjectRecord {
    const ENTITY: &'static str = "project";

    fn id(&self) -> Identity {
        self.id
    }
}

/// Locally stored presentation data for a listed project.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectOverride {
    pub id: Identity,
    pub description: Option<String>,
    pub image_link: Option<String>,
    pub hidden: bool,
    pub tags: Vec<TagRef>,
}

/// Stored binary asset. Listings leave `content` empty; single lookups fill it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub id: Identity,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub content: Option<Vec<u8>>,
}

impl AssetRecord {
    pub fn is_loaded(&self) -> bool {
        self.content.is_some()
    }
}

/// Input for storing a new asset under a unique name.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAsset {
    pub name: String,
    pub content: Vec<u8>,
}

impl NewAsset {
    pub fn validate(&self) -> Result<(), DomainError> {
        require_text("asset.name", &self.name)
    }
}

impl Indexable for AssetRecord {
    const ENTITY: &'static str = "asset";

    fn id(&self) -> Identity {
        self.id
    }
}
