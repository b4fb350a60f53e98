//! The cloneable handle to a running [`StoreActor`](super::StoreActor).

use super::message::StoreRequest;
use super::{Document, DocumentCursor, DocumentId, DocumentStore, StoreError};
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

/// Sends requests to a [`StoreActor`](super::StoreActor) and awaits the replies.
///
/// A send fails with [`StoreError::ActorClosed`] once the actor has stopped;
/// a reply that never arrives is [`StoreError::ActorDropped`].
pub struct StoreClient<D: Document> {
    sender: mpsc::Sender<StoreRequest<D>>,
}

impl<D: Document> Clone for StoreClient<D> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<D: Document> StoreClient<D> {
    pub fn new(sender: mpsc::Sender<StoreRequest<D>>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T, StoreError>>) -> StoreRequest<D>,
    ) -> Result<T, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| StoreError::ActorClosed)?;
        response.await.map_err(|_| StoreError::ActorDropped)?
    }
}

#[async_trait]
impl<D: Document> DocumentStore<D> for StoreClient<D> {
    async fn insert(&self, doc: D) -> Result<DocumentId, StoreError> {
        self.request(|respond_to| StoreRequest::Insert { doc, respond_to })
            .await
    }

    async fn find_by_id(&self, id: DocumentId) -> Result<Option<D>, StoreError> {
        self.request(|respond_to| StoreRequest::FindById { id, respond_to })
            .await
    }

    async fn replace(&self, id: DocumentId, doc: D) -> Result<bool, StoreError> {
        self.request(|respond_to| StoreRequest::Replace {
            id,
            doc,
            respond_to,
        })
        .await
    }

    async fn delete_by_id(&self, id: DocumentId) -> Result<u64, StoreError> {
        self.request(|respond_to| StoreRequest::DeleteById { id, respond_to })
            .await
    }

    async fn find_all(&self) -> Result<DocumentCursor<D>, StoreError> {
        self.request(|respond_to| StoreRequest::FindAll { respond_to })
            .await
    }
}
