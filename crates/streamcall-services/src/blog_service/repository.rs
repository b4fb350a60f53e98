//! # Resource Repository
//!
//! Maps [`Resource`]s onto a [`DocumentStore`] and store failures onto
//! [`RepositoryError`]. The repository holds no state of its own; the store
//! it is given is the single owner of persisted resources.

use super::error::RepositoryError;
use crate::model::Resource;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use streamcall::store::{Document, DocumentCursor, DocumentId, DocumentStore};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How a resource is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDocument {
    pub id: Option<DocumentId>,
    pub author_id: String,
    pub title: String,
    pub content: String,
}

impl ResourceDocument {
    fn from_resource(id: Option<DocumentId>, resource: Resource) -> Self {
        Self {
            id,
            author_id: resource.author_id,
            title: resource.title,
            content: resource.content,
        }
    }
}

impl Document for ResourceDocument {
    fn id(&self) -> Option<DocumentId> {
        self.id
    }

    fn with_id(self, id: DocumentId) -> Self {
        Self {
            id: Some(id),
            ..self
        }
    }
}

impl From<ResourceDocument> for Resource {
    fn from(doc: ResourceDocument) -> Self {
        Self {
            id: doc.id.map(|id| id.to_string()).unwrap_or_default(),
            author_id: doc.author_id,
            title: doc.title,
            content: doc.content,
        }
    }
}

/// A lazy sequence of stored resources.
pub type ResourceStream = BoxStream<'static, Result<Resource, RepositoryError>>;

type Store = Arc<dyn DocumentStore<ResourceDocument>>;

enum ListState {
    Unopened(Store),
    Open(DocumentCursor<ResourceDocument>),
    Done,
}

/// CRUD over blog resources.
#[derive(Clone)]
pub struct ResourceRepository {
    store: Store,
}

impl ResourceRepository {
    pub fn new(store: Arc<dyn DocumentStore<ResourceDocument>>) -> Self {
        Self { store }
    }

    /// Stores `resource` under a fresh id. Any id it already carries is ignored.
    pub async fn create(&self, resource: Resource) -> Result<Resource, RepositoryError> {
        let doc = ResourceDocument::from_resource(None, resource);
        let id = self.store.insert(doc.clone()).await?;
        info!(%id, "Resource created");
        Ok(doc.with_id(id).into())
    }

    /// A malformed id reads as absent.
    pub async fn read(&self, id: &str) -> Result<Resource, RepositoryError> {
        let oid = Uuid::parse_str(id).map_err(|_| RepositoryError::NotFound(id.to_string()))?;
        match self.store.find_by_id(oid).await? {
            Some(doc) => Ok(doc.into()),
            None => {
                debug!(%oid, "Resource not found");
                Err(RepositoryError::NotFound(id.to_string()))
            }
        }
    }

    /// Replaces author, title and content of the resource with `resource.id`.
    pub async fn update(&self, resource: Resource) -> Result<Resource, RepositoryError> {
        let oid = parse_id(&resource.id)?;
        let id = resource.id.clone();
        let doc = ResourceDocument::from_resource(Some(oid), resource);
        if !self.store.replace(oid, doc.clone()).await? {
            warn!(%oid, "Update of missing resource");
            return Err(RepositoryError::NotFound(id));
        }
        info!(%oid, "Resource updated");
        Ok(doc.into())
    }

    /// Returns the deleted id.
    pub async fn delete(&self, id: &str) -> Result<String, RepositoryError> {
        let oid = parse_id(id)?;
        if self.store.delete_by_id(oid).await? == 0 {
            warn!(%oid, "Delete of missing resource");
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        info!(%oid, "Resource deleted");
        Ok(id.to_string())
    }

    /// Every stored resource, read lazily from a store cursor.
    ///
    /// The cursor is only opened once the stream is first polled. A failure
    /// to open or advance it is yielded once, after which the stream ends.
    pub fn list(&self) -> ResourceStream {
        futures::stream::unfold(ListState::Unopened(self.store.clone()), |state| async move {
            match state {
                ListState::Unopened(store) => match store.find_all().await {
                    Ok(cursor) => advance(cursor).await,
                    Err(e) => Some((Err(e.into()), ListState::Done)),
                },
                ListState::Open(cursor) => advance(cursor).await,
                ListState::Done => None,
            }
        })
        .boxed()
    }
}

async fn advance(
    mut cursor: DocumentCursor<ResourceDocument>,
) -> Option<(Result<Resource, RepositoryError>, ListState)> {
    match cursor.next().await {
        Some(Ok(doc)) => Some((Ok(doc.into()), ListState::Open(cursor))),
        Some(Err(e)) => {
            warn!(error = %e, "Resource cursor failed");
            Some((Err(e.into()), ListState::Done))
        }
        None => None,
    }
}

fn parse_id(id: &str) -> Result<DocumentId, RepositoryError> {
    Uuid::parse_str(id).map_err(|_| RepositoryError::InvalidId(id.to_string()))
}
