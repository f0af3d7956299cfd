//! In-memory repositories shared by the application tests.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use time::{OffsetDateTime, macros::datetime};

use crate::application::repos::{AssetsRepo, DocumentsRepo, ProjectsRepo, RepoError, TagsRepo};
use crate::domain::entities::{
    AssetRecord, DocumentRecord, NewAsset, NewDocument, ProjectOverride, TagRecord, TagRef,
    Tagged,
};
use crate::store::Identity;

#[derive(Default)]
struct Tables {
    tags: Vec<TagRecord>,
    documents: Vec<DocumentRecord>,
    overrides: Vec<ProjectOverride>,
    assets: Vec<AssetRecord>,
}

#[derive(Clone, Default)]
pub struct MemoryRepos {
    tables: Arc<Mutex<Tables>>,
    failing: Arc<AtomicBool>,
    pub asset_reads: Arc<AtomicUsize>,
}

pub fn tag(value: &str) -> TagRef {
    let color = match value {
        "rust" => "#dea584",
        "go" => "#00add8",
        "web" => "#e34c26",
        _ => "#888888",
    };
    TagRef::new(value, color)
}

fn document(
    id: Identity,
    title: &str,
    tags: &[&str],
    created_at: OffsetDateTime,
) -> DocumentRecord {
    DocumentRecord {
        id,
        title: title.to_string(),
        content: format!("# {title}"),
        tags: tags.iter().map(|value| tag(value)).collect(),
        created_at,
    }
}

impl MemoryRepos {
    pub fn seeded() -> Self {
        let repos = Self::default();
        {
            let mut tables = repos.tables.lock().expect("tables");
            tables.tags = ["rust", "go", "web", "notes"]
                .into_iter()
                .zip(1..)
                .map(|(value, id)| {
                    let tag = tag(value);
                    TagRecord {
                        id,
                        value: tag.value,
                        color: tag.color,
                    }
                })
                .collect();
            tables.documents = vec![
                document(
                    1,
                    "Ownership notes",
                    &["rust", "notes"],
                    datetime!(2022-03-01 09:00 UTC),
                ),
                document(2, "Goroutines", &["go"], datetime!(2021-06-10 18:30 UTC)),
                document(3, "Year in review", &["notes"], datetime!(2023-01-02 08:00 UTC)),
                document(
                    4,
                    "Serving HTML",
                    &["go", "web"],
                    datetime!(2023-08-20 21:15 UTC),
                ),
            ];
            tables.overrides = vec![
                ProjectOverride {
                    id: 101,
                    description: Some("curated description".to_string()),
                    image_link: Some("/assets/by-name/vitrine.png".to_string()),
                    hidden: false,
                    tags: vec![tag("rust")],
                },
                ProjectOverride {
                    id: 102,
                    description: None,
                    image_link: None,
                    hidden: true,
                    tags: vec![tag("go"), tag("web")],
                },
            ];
            tables.assets = vec![
                AssetRecord {
                    id: 1,
                    name: "logo.png".to_string(),
                    created_at: datetime!(2022-01-01 00:00 UTC),
                    content: Some(vec![137, 80, 78, 71]),
                },
                AssetRecord {
                    id: 2,
                    name: "cv.pdf".to_string(),
                    created_at: datetime!(2023-02-01 00:00 UTC),
                    content: Some(b"%PDF-1.7".to_vec()),
                },
            ];
        }
        repos
    }

    /// Every subsequent call fails with a persistence error.
    pub fn fail_reads(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn insert_document(&self, record: DocumentRecord) {
        self.tables.lock().expect("tables").documents.push(record);
    }

    fn read(&self) -> Result<std::sync::MutexGuard<'_, Tables>, RepoError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("connection reset by peer"));
        }
        Ok(self.tables.lock().expect("tables"))
    }
}

fn next_id(ids: impl Iterator<Item = Identity>) -> Identity {
    ids.max().unwrap_or(0) + 1
}

impl Tables {
    fn upsert_tag(&mut self, tag: &TagRef) -> TagRecord {
        if let Some(known) = self.tags.iter_mut().find(|known| known.value == tag.value) {
            known.color = tag.color.clone();
            return known.clone();
        }
        let record = TagRecord {
            id: next_id(self.tags.iter().map(|known| known.id)),
            value: tag.value.clone(),
            color: tag.color.clone(),
        };
        self.tags.push(record.clone());
        record
    }

    /// Resolve tags by value, creating unknown ones. Stored colours win.
    fn link_tags(&mut self, tags: &[TagRef]) -> Vec<TagRef> {
        let mut linked: Vec<TagRef> = Vec::new();
        for tag in tags {
            if linked.iter().any(|seen| seen.value == tag.value) {
                continue;
            }
            let stored = match self.tags.iter().find(|known| known.value == tag.value) {
                Some(known) => known.to_tag_ref(),
                None => self.upsert_tag(tag).to_tag_ref(),
            };
            linked.push(stored);
        }
        linked
    }

    fn recolor_links(&mut self, tag: &TagRecord) {
        let links = self
            .documents
            .iter_mut()
            .flat_map(|document| document.tags.iter_mut())
            .chain(self.overrides.iter_mut().flat_map(|entry| entry.tags.iter_mut()));
        for link in links.filter(|link| link.value == tag.value) {
            link.color = tag.color.clone();
        }
    }
}

fn distinct<'a>(tags: impl Iterator<Item = &'a TagRef>) -> Vec<TagRef> {
    let mut seen: Vec<TagRef> = Vec::new();
    for tag in tags {
        if !seen.contains(tag) {
            seen.push(tag.clone());
        }
    }
    seen
}

fn shared<'a, R: Tagged + 'a>(records: impl Iterator<Item = &'a R>, value: &str) -> Vec<TagRef> {
    let tags: Vec<&TagRef> = records
        .filter(|record| record.has_tag(value))
        .flat_map(|record| record.tags())
        .filter(|tag| tag.value != value)
        .collect();
    distinct(tags.into_iter())
}

#[async_trait]
impl TagsRepo for MemoryRepos {
    async fn list_tags(&self) -> Result<Vec<TagRecord>, RepoError> {
        Ok(self.read()?.tags.clone())
    }

    async fn find_tag(&self, id: Identity) -> Result<Option<TagRecord>, RepoError> {
        Ok(self.read()?.tags.iter().find(|tag| tag.id == id).cloned())
    }

    async fn find_tag_by_value(&self, value: &str) -> Result<Option<TagRecord>, RepoError> {
        Ok(self
            .read()?
            .tags
            .iter()
            .find(|tag| tag.value == value)
            .cloned())
    }

    async fn save_tag(&self, tag: &TagRef) -> Result<TagRecord, RepoError> {
        let mut tables = self.read()?;
        let record = tables.upsert_tag(tag);
        tables.recolor_links(&record);
        Ok(record)
    }

    async fn update_tag_color(&self, id: Identity, color: &str) -> Result<TagRecord, RepoError> {
        let mut tables = self.read()?;
        let known = tables
            .tags
            .iter_mut()
            .find(|known| known.id == id)
            .ok_or(RepoError::NotFound)?;
        known.color = color.to_string();
        let record = known.clone();
        tables.recolor_links(&record);
        Ok(record)
    }

    async fn delete_tag(&self, id: Identity) -> Result<(), RepoError> {
        let mut tables = self.read()?;
        let index = tables
            .tags
            .iter()
            .position(|known| known.id == id)
            .ok_or(RepoError::NotFound)?;
        let removed = tables.tags.remove(index);
        for document in &mut tables.documents {
            document.tags.retain(|tag| tag.value != removed.value);
        }
        for entry in &mut tables.overrides {
            entry.tags.retain(|tag| tag.value != removed.value);
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentsRepo for MemoryRepos {
    async fn list_documents(&self) -> Result<Vec<DocumentRecord>, RepoError> {
        Ok(self.read()?.documents.clone())
    }

    async fn find_document(&self, id: Identity) -> Result<Option<DocumentRecord>, RepoError> {
        Ok(self
            .read()?
            .documents
            .iter()
            .find(|document| document.id == id)
            .cloned())
    }

    async fn create_document(&self, document: &NewDocument) -> Result<DocumentRecord, RepoError> {
        let mut tables = self.read()?;
        let tags = tables.link_tags(&document.tags);
        let record = DocumentRecord {
            id: next_id(tables.documents.iter().map(|doc| doc.id)),
            title: document.title.clone(),
            content: document.content.clone(),
            tags,
            created_at: document.created_at,
        };
        tables.documents.push(record.clone());
        Ok(record)
    }

    async fn update_document(
        &self,
        id: Identity,
        document: &NewDocument,
    ) -> Result<DocumentRecord, RepoError> {
        let mut tables = self.read()?;
        let index = tables
            .documents
            .iter()
            .position(|doc| doc.id == id)
            .ok_or(RepoError::NotFound)?;
        let tags = tables.link_tags(&document.tags);
        let record = DocumentRecord {
            id,
            title: document.title.clone(),
            content: document.content.clone(),
            tags,
            created_at: document.created_at,
        };
        tables.documents[index] = record.clone();
        Ok(record)
    }

    async fn delete_document(&self, id: Identity) -> Result<(), RepoError> {
        let mut tables = self.read()?;
        let before = tables.documents.len();
        tables.documents.retain(|doc| doc.id != id);
        if tables.documents.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn document_tags(&self) -> Result<Vec<TagRef>, RepoError> {
        let tables = self.read()?;
        Ok(distinct(tables.documents.iter().flat_map(|doc| doc.tags())))
    }

    async fn shared_document_tags(&self, value: &str) -> Result<Vec<TagRef>, RepoError> {
        Ok(shared(self.read()?.documents.iter(), value))
    }
}

#[async_trait]
impl ProjectsRepo for MemoryRepos {
    async fn list_overrides(&self) -> Result<Vec<ProjectOverride>, RepoError> {
        Ok(self.read()?.overrides.clone())
    }

    async fn find_override(&self, id: Identity) -> Result<Option<ProjectOverride>, RepoError> {
        Ok(self
            .read()?
            .overrides
            .iter()
            .find(|entry| entry.id == id)
            .cloned())
    }

    async fn save_override(&self, entry: &ProjectOverride) -> Result<ProjectOverride, RepoError> {
        let mut tables = self.read()?;
        let saved = ProjectOverride {
            tags: tables.link_tags(&entry.tags),
            ..entry.clone()
        };
        match tables.overrides.iter_mut().find(|known| known.id == entry.id) {
            Some(known) => *known = saved.clone(),
            None => tables.overrides.push(saved.clone()),
        }
        Ok(saved)
    }

    async fn project_tags(&self) -> Result<Vec<TagRef>, RepoError> {
        let tables = self.read()?;
        Ok(distinct(tables.overrides.iter().flat_map(|entry| entry.tags.iter())))
    }

    async fn shared_project_tags(&self, value: &str) -> Result<Vec<TagRef>, RepoError> {
        let tables = self.read()?;
        let tags: Vec<&TagRef> = tables
            .overrides
            .iter()
            .filter(|entry| entry.tags.iter().any(|tag| tag.value == value))
            .flat_map(|entry| entry.tags.iter())
            .filter(|tag| tag.value != value)
            .collect();
        Ok(distinct(tags.into_iter()))
    }
}

#[async_trait]
impl AssetsRepo for MemoryRepos {
    async fn list_assets(&self) -> Result<Vec<AssetRecord>, RepoError> {
        Ok(self
            .read()?
            .assets
            .iter()
            .map(|asset| AssetRecord {
                content: None,
                ..asset.clone()
            })
            .collect())
    }

    async fn find_asset(&self, id: Identity) -> Result<Option<AssetRecord>, RepoError> {
        self.asset_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .read()?
            .assets
            .iter()
            .find(|asset| asset.id == id)
            .cloned())
    }

    async fn find_asset_by_name(&self, name: &str) -> Result<Option<AssetRecord>, RepoError> {
        self.asset_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .read()?
            .assets
            .iter()
            .find(|asset| asset.name == name)
            .cloned())
    }

    async fn create_asset(&self, asset: &NewAsset) -> Result<AssetRecord, RepoError> {
        let mut tables = self.read()?;
        if tables.assets.iter().any(|known| known.name == asset.name) {
            return Err(RepoError::Duplicate {
                constraint: "assets_name_key".to_string(),
            });
        }
        let record = AssetRecord {
            id: next_id(tables.assets.iter().map(|known| known.id)),
            name: asset.name.clone(),
            created_at: OffsetDateTime::now_utc(),
            content: Some(asset.content.clone()),
        };
        tables.assets.push(record.clone());
        Ok(record)
    }

    async fn delete_asset(&self, id: Identity) -> Result<AssetRecord, RepoError> {
        let mut tables = self.read()?;
        let index = tables
            .assets
            .iter()
            .position(|known| known.id == id)
            .ok_or(RepoError::NotFound)?;
        let removed = tables.assets.remove(index);
        Ok(AssetRecord {
            content: None,
            ..removed
        })
    }
}
