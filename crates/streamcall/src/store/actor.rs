//! # In-Memory Store Actor
//!
//! The server half of the in-memory store. The actor owns every document
//! and handles requests sequentially in its own task, so the map needs no
//! lock and each operation is atomic.

use super::client::StoreClient;
use super::message::StoreRequest;
use super::{Document, DocumentCursor, DocumentId, StoreError};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Holds documents of type `D` in insertion order.
///
/// # Usage Pattern
///
/// 1. **Create**: `StoreActor::new()` returns the actor and its client.
/// 2. **Run**: spawn `actor.run()` on the runtime.
/// 3. **Use**: clone the client into whatever needs storage.
///
/// The actor stops once every client has been dropped.
///
/// `find_all` takes a snapshot and hands it to a feeder task that pushes
/// documents into a channel of `cursor_buffer` slots, so a cursor is only
/// filled as fast as it is consumed.
pub struct StoreActor<D: Document> {
    receiver: mpsc::Receiver<StoreRequest<D>>,
    documents: HashMap<DocumentId, D>,
    order: Vec<DocumentId>,
    cursor_buffer: usize,
}

impl<D: Document> StoreActor<D> {
    /// Creates the actor and its client.
    ///
    /// * `buffer_size` - capacity of the request queue; clients wait while it is full.
    /// * `cursor_buffer` - documents buffered ahead of a `find_all` consumer.
    pub fn new(buffer_size: usize, cursor_buffer: usize) -> (Self, StoreClient<D>) {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        let actor = Self {
            receiver,
            documents: HashMap::new(),
            order: Vec::new(),
            cursor_buffer: cursor_buffer.max(1),
        };
        (actor, StoreClient::new(sender))
    }

    /// Runs the request loop until the channel closes.
    pub async fn run(mut self) {
        // "ResourceDocument" rather than the full module path
        let document_type = std::any::type_name::<D>()
            .split("::")
            .last()
            .unwrap_or("Unknown");
        info!(document_type, "Store started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StoreRequest::Insert { doc, respond_to } => {
                    let id = Uuid::new_v4();
                    self.documents.insert(id, doc.with_id(id));
                    self.order.push(id);
                    info!(document_type, %id, size = self.documents.len(), "Inserted");
                    let _ = respond_to.send(Ok(id));
                }
                StoreRequest::FindById { id, respond_to } => {
                    let doc = self.documents.get(&id).cloned();
                    debug!(document_type, %id, found = doc.is_some(), "FindById");
                    let _ = respond_to.send(Ok(doc));
                }
                StoreRequest::Replace {
                    id,
                    doc,
                    respond_to,
                } => {
                    let replaced = match self.documents.get_mut(&id) {
                        Some(stored) => {
                            *stored = doc.with_id(id);
                            info!(document_type, %id, "Replaced");
                            true
                        }
                        None => {
                            warn!(document_type, %id, "Not found");
                            false
                        }
                    };
                    let _ = respond_to.send(Ok(replaced));
                }
                StoreRequest::DeleteById { id, respond_to } => {
                    let deleted = match self.documents.remove(&id) {
                        Some(_) => {
                            self.order.retain(|stored| *stored != id);
                            info!(document_type, %id, size = self.documents.len(), "Deleted");
                            1
                        }
                        None => {
                            warn!(document_type, %id, "Not found");
                            0
                        }
                    };
                    let _ = respond_to.send(Ok(deleted));
                }
                StoreRequest::FindAll { respond_to } => {
                    let snapshot: Vec<D> = self
                        .order
                        .iter()
                        .filter_map(|id| self.documents.get(id).cloned())
                        .collect();
                    debug!(document_type, count = snapshot.len(), "FindAll");
                    let _ = respond_to.send(Ok(self.cursor(snapshot)));
                }
            }
        }

        info!(document_type, size = self.documents.len(), "Shutdown");
    }

    fn cursor(&self, snapshot: Vec<D>) -> DocumentCursor<D> {
        let (tx, rx) = mpsc::channel::<Result<D, StoreError>>(self.cursor_buffer);
        tokio::spawn(async move {
            for doc in snapshot {
                if tx.send(Ok(doc)).await.is_err() {
                    // Cursor dropped by its consumer.
                    break;
                }
            }
        });
        Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        }))
    }
}
