//! # Document Store
//!
//! The narrow persistence interface services are written against, plus an
//! in-memory implementation built as an actor:
//!
//! 1. [`StoreActor`] owns the documents and processes [`StoreRequest`]s one
//!    at a time, so every operation is atomic per document without locks.
//! 2. [`StoreClient`] is the cloneable handle that sends requests and awaits
//!    the replies. It implements [`DocumentStore`].
//!
//! ```rust
//! use streamcall::store::{Document, DocumentId, DocumentStore, StoreActor};
//!
//! #[derive(Clone, Debug)]
//! struct Note { id: Option<DocumentId>, text: String }
//!
//! impl Document for Note {
//!     fn id(&self) -> Option<DocumentId> { self.id }
//!     fn with_id(self, id: DocumentId) -> Self { Self { id: Some(id), ..self } }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let (actor, client) = StoreActor::<Note>::new(16, 16);
//!     tokio::spawn(actor.run());
//!
//!     let id = client.insert(Note { id: None, text: "hi".into() }).await.unwrap();
//!     let note = client.find_by_id(id).await.unwrap().unwrap();
//!     assert_eq!(note.text, "hi");
//! }
//! ```

pub mod actor;
pub mod client;
pub mod message;

pub use actor::StoreActor;
pub use client::StoreClient;
pub use message::{Response, StoreRequest};

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt::Debug;
use uuid::Uuid;

/// Store-native document identifier.
pub type DocumentId = Uuid;

/// A lazy sequence of stored documents.
pub type DocumentCursor<D> = BoxStream<'static, Result<D, StoreError>>;

/// Something a [`DocumentStore`] can hold.
pub trait Document: Clone + Send + Sync + Debug + 'static {
    /// The store-assigned id, `None` before insertion.
    fn id(&self) -> Option<DocumentId>;

    fn with_id(self, id: DocumentId) -> Self;
}

/// Errors raised by a document store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store closed")]
    ActorClosed,
    #[error("Store dropped response channel")]
    ActorDropped,
    #[error("Store backend error: {0}")]
    Backend(String),
    #[error("Cursor error: {0}")]
    Cursor(String),
}

/// Persistent storage for documents of type `D`.
#[async_trait]
pub trait DocumentStore<D: Document>: Send + Sync {
    /// Stores `doc` under a fresh id and returns the id.
    async fn insert(&self, doc: D) -> Result<DocumentId, StoreError>;

    async fn find_by_id(&self, id: DocumentId) -> Result<Option<D>, StoreError>;

    /// Replaces the document stored under `id`. Returns `false` if there is none.
    async fn replace(&self, id: DocumentId, doc: D) -> Result<bool, StoreError>;

    /// Returns the number of documents deleted.
    async fn delete_by_id(&self, id: DocumentId) -> Result<u64, StoreError>;

    async fn find_all(&self) -> Result<DocumentCursor<D>, StoreError>;
}
