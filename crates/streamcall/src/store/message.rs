//! Messages exchanged between [`StoreClient`](super::StoreClient) and
//! [`StoreActor`](super::StoreActor).

use super::{Document, DocumentCursor, DocumentId, StoreError};
use tokio::sync::oneshot;

/// One-shot reply channel carried by every request.
pub type Response<T> = oneshot::Sender<Result<T, StoreError>>;

pub enum StoreRequest<D: Document> {
    Insert {
        doc: D,
        respond_to: Response<DocumentId>,
    },
    FindById {
        id: DocumentId,
        respond_to: Response<Option<D>>,
    },
    Replace {
        id: DocumentId,
        doc: D,
        respond_to: Response<bool>,
    },
    DeleteById {
        id: DocumentId,
        respond_to: Response<u64>,
    },
    FindAll {
        respond_to: Response<DocumentCursor<D>>,
    },
}
