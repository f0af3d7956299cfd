//! Listing use cases: filter, order and group an entity store by named views.

use crate::{
    application::{
        error::AppError,
        views::{DocumentGroup, DocumentSort, ProjectGroup, ProjectSort, tagged, visible},
    },
    domain::entities::{DocumentRecord, ProjectRecord},
    store::{Groups, Indexable, MaterializedStore, Store, StoreExt},
};

#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub sort: Option<String>,
    pub group: Option<String>,
    pub tag: Option<String>,
    pub include_hidden: bool,
}

impl ListQuery {
    fn reject_views(&self, entity: &str) -> Result<(), AppError> {
        if self.sort.is_some() || self.group.is_some() || self.tag.is_some() {
            return Err(AppError::validation(format!(
                "{entity} listings do not support sorting, grouping or tag filters"
            )));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum Listing<T> {
    Flat(MaterializedStore<T>),
    Grouped(Groups<T>),
}

impl<T> Listing<T> {
    pub fn len(&self) -> usize {
        match self {
            Listing::Flat(store) => store.len(),
            Listing::Grouped(groups) => groups.values().map(MaterializedStore::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub async fn list_projects(
    store: &dyn Store<ProjectRecord>,
    query: &ListQuery,
) -> Result<Listing<ProjectRecord>, AppError> {
    let sort = parse::<ProjectSort>(query.sort.as_deref())?;
    let group = parse::<ProjectGroup>(query.group.as_deref())?;

    let mut view = if query.include_hidden {
        MaterializedStore::from(store.get_all().await?)
    } else {
        store.filter(visible).await?
    };
    if let Some(tag) = &query.tag {
        view = view.filter(tagged(tag.as_str())).await?;
    }
    if let Some(sort) = sort {
        view = view.sort(sort.less()).await?;
    }

    Ok(match group {
        Some(group) => Listing::Grouped(view.group(group.key_fn()).await?),
        None => Listing::Flat(view),
    })
}

pub async fn list_documents(
    store: &dyn Store<DocumentRecord>,
    query: &ListQuery,
) -> Result<Listing<DocumentRecord>, AppError> {
    let sort = parse::<DocumentSort>(query.sort.as_deref())?;
    let group = parse::<DocumentGroup>(query.group.as_deref())?;

    let mut view = match &query.tag {
        Some(tag) => store.filter(tagged(tag.as_str())).await?,
        None => MaterializedStore::from(store.get_all().await?),
    };
    if let Some(sort) = sort {
        view = view.sort(sort.less()).await?;
    }

    Ok(match group {
        Some(group) => Listing::Grouped(view.group(group.key_fn()).await?),
        None => Listing::Flat(view),
    })
}

/// Plain listing for entities without named views (tags, assets).
pub async fn list_plain<T: Indexable>(
    store: &dyn Store<T>,
    query: &ListQuery,
) -> Result<Listing<T>, AppError> {
    query.reject_views(T::ENTITY)?;
    Ok(Listing::Flat(MaterializedStore::from(store.get_all().await?)))
}

fn parse<V>(key: Option<&str>) -> Result<Option<V>, AppError>
where
    V: std::str::FromStr<Err = crate::domain::error::DomainError>,
{
    key.map(str::parse::<V>).transpose().map_err(AppError::from)
}
