//! # Mock Store & Testing Guide
//!
//! [`MockStore<D>`] implements [`DocumentStore<D>`] without any actor behind
//! it. Each call pops the next expectation from a FIFO queue and returns the
//! canned response, which makes store failures (broken cursors, a closed
//! backend) trivial to reproduce.
//!
//! ## When to use Mocks vs the Real Store
//!
//! | Feature | MockStore | StoreActor |
//! |---------|-----------|------------|
//! | **State** | None, only expectations | Real documents |
//! | **Error Injection** | Easy (`return_err`) | Not possible |
//! | **Use Case** | Failure paths of services built on a store | Happy paths, full system |
//!
//! ## Example
//!
//! ```rust
//! use streamcall::mock::MockStore;
//! use streamcall::store::{Document, DocumentId, DocumentStore, StoreError};
//! use futures::StreamExt;
//!
//! #[derive(Clone, Debug)]
//! struct Note { id: Option<DocumentId> }
//! impl Document for Note {
//!     fn id(&self) -> Option<DocumentId> { self.id }
//!     fn with_id(self, id: DocumentId) -> Self { Self { id: Some(id) } }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mock = MockStore::<Note>::new();
//!     mock.expect_find_all().return_items(vec![
//!         Ok(Note { id: None }),
//!         Err(StoreError::Cursor("connection reset".into())),
//!     ]);
//!
//!     let items: Vec<_> = mock.find_all().await.unwrap().collect().await;
//!     assert_eq!(items.len(), 2);
//!     mock.verify();
//! }
//! ```
//!
//! A call that does not match the next expectation panics, as does
//! [`MockStore::verify`] when expectations are left over.

use crate::store::{Document, DocumentCursor, DocumentId, DocumentStore, StoreError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

enum Expectation<D> {
    Insert {
        response: Result<DocumentId, StoreError>,
    },
    FindById {
        id: DocumentId,
        response: Result<Option<D>, StoreError>,
    },
    Replace {
        id: DocumentId,
        response: Result<bool, StoreError>,
    },
    DeleteById {
        id: DocumentId,
        response: Result<u64, StoreError>,
    },
    FindAll {
        response: Result<Vec<Result<D, StoreError>>, StoreError>,
    },
}

impl<D> Expectation<D> {
    fn name(&self) -> &'static str {
        match self {
            Expectation::Insert { .. } => "insert",
            Expectation::FindById { .. } => "find_by_id",
            Expectation::Replace { .. } => "replace",
            Expectation::DeleteById { .. } => "delete_by_id",
            Expectation::FindAll { .. } => "find_all",
        }
    }
}

type Queue<D> = Arc<Mutex<VecDeque<Expectation<D>>>>;

fn push<D>(queue: &Queue<D>, expectation: Expectation<D>) {
    queue
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push_back(expectation);
}

/// An expectation-driven [`DocumentStore`]. Clones share one queue.
pub struct MockStore<D> {
    expectations: Queue<D>,
}

impl<D> Clone for MockStore<D> {
    fn clone(&self) -> Self {
        Self {
            expectations: self.expectations.clone(),
        }
    }
}

impl<D: Document> Default for MockStore<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Document> MockStore<D> {
    /// Creates a mock store with no expectations.
    pub fn new() -> Self {
        Self {
            expectations: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn expect_insert(&self) -> InsertExpectationBuilder<D> {
        InsertExpectationBuilder {
            expectations: self.expectations.clone(),
        }
    }

    pub fn expect_find_by_id(&self, id: DocumentId) -> FindByIdExpectationBuilder<D> {
        FindByIdExpectationBuilder {
            id,
            expectations: self.expectations.clone(),
        }
    }

    pub fn expect_replace(&self, id: DocumentId) -> ReplaceExpectationBuilder<D> {
        ReplaceExpectationBuilder {
            id,
            expectations: self.expectations.clone(),
        }
    }

    pub fn expect_delete(&self, id: DocumentId) -> DeleteExpectationBuilder<D> {
        DeleteExpectationBuilder {
            id,
            expectations: self.expectations.clone(),
        }
    }

    pub fn expect_find_all(&self) -> FindAllExpectationBuilder<D> {
        FindAllExpectationBuilder {
            expectations: self.expectations.clone(),
        }
    }

    /// Panics unless every expectation was consumed.
    pub fn verify(&self) {
        let remaining = self
            .expectations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !remaining.is_empty() {
            let names: Vec<_> = remaining.iter().map(Expectation::name).collect();
            panic!(
                "Not all expectations were met. {} remaining: {:?}",
                remaining.len(),
                names
            );
        }
    }

    fn next(&self, call: &str) -> Expectation<D> {
        let next = self
            .expectations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match next {
            Some(expectation) => expectation,
            None => panic!("Unexpected {} call: no expectations left", call),
        }
    }
}

fn mismatch<D>(call: &str, expectation: &Expectation<D>) -> ! {
    panic!(
        "Unexpected {} call: expected {}",
        call,
        expectation.name()
    )
}

fn check_id(call: &str, expected: DocumentId, actual: DocumentId) {
    if expected != actual {
        panic!("Unexpected {} id: expected {}, got {}", call, expected, actual);
    }
}

#[async_trait]
impl<D: Document> DocumentStore<D> for MockStore<D> {
    async fn insert(&self, _doc: D) -> Result<DocumentId, StoreError> {
        match self.next("insert") {
            Expectation::Insert { response } => response,
            other => mismatch("insert", &other),
        }
    }

    async fn find_by_id(&self, id: DocumentId) -> Result<Option<D>, StoreError> {
        match self.next("find_by_id") {
            Expectation::FindById {
                id: expected,
                response,
            } => {
                check_id("find_by_id", expected, id);
                response
            }
            other => mismatch("find_by_id", &other),
        }
    }

    async fn replace(&self, id: DocumentId, _doc: D) -> Result<bool, StoreError> {
        match self.next("replace") {
            Expectation::Replace {
                id: expected,
                response,
            } => {
                check_id("replace", expected, id);
                response
            }
            other => mismatch("replace", &other),
        }
    }

    async fn delete_by_id(&self, id: DocumentId) -> Result<u64, StoreError> {
        match self.next("delete_by_id") {
            Expectation::DeleteById {
                id: expected,
                response,
            } => {
                check_id("delete_by_id", expected, id);
                response
            }
            other => mismatch("delete_by_id", &other),
        }
    }

    async fn find_all(&self) -> Result<DocumentCursor<D>, StoreError> {
        match self.next("find_all") {
            Expectation::FindAll { response } => {
                let items = response?;
                let cursor: DocumentCursor<D> = Box::pin(futures::stream::iter(items));
                Ok(cursor)
            }
            other => mismatch("find_all", &other),
        }
    }
}

/// Builder for `insert` expectations.
pub struct InsertExpectationBuilder<D> {
    expectations: Queue<D>,
}

impl<D> InsertExpectationBuilder<D> {
    pub fn return_ok(self, id: DocumentId) {
        push(&self.expectations, Expectation::Insert { response: Ok(id) });
    }

    pub fn return_err(self, error: StoreError) {
        push(
            &self.expectations,
            Expectation::Insert {
                response: Err(error),
            },
        );
    }
}

/// Builder for `find_by_id` expectations.
pub struct FindByIdExpectationBuilder<D> {
    id: DocumentId,
    expectations: Queue<D>,
}

impl<D> FindByIdExpectationBuilder<D> {
    pub fn return_ok(self, doc: Option<D>) {
        push(
            &self.expectations,
            Expectation::FindById {
                id: self.id,
                response: Ok(doc),
            },
        );
    }

    pub fn return_err(self, error: StoreError) {
        push(
            &self.expectations,
            Expectation::FindById {
                id: self.id,
                response: Err(error),
            },
        );
    }
}

/// Builder for `replace` expectations.
pub struct ReplaceExpectationBuilder<D> {
    id: DocumentId,
    expectations: Queue<D>,
}

impl<D> ReplaceExpectationBuilder<D> {
    pub fn return_ok(self, replaced: bool) {
        push(
            &self.expectations,
            Expectation::Replace {
                id: self.id,
                response: Ok(replaced),
            },
        );
    }

    pub fn return_err(self, error: StoreError) {
        push(
            &self.expectations,
            Expectation::Replace {
                id: self.id,
                response: Err(error),
            },
        );
    }
}

/// Builder for `delete_by_id` expectations.
pub struct DeleteExpectationBuilder<D> {
    id: DocumentId,
    expectations: Queue<D>,
}

impl<D> DeleteExpectationBuilder<D> {
    pub fn return_ok(self, deleted: u64) {
        push(
            &self.expectations,
            Expectation::DeleteById {
                id: self.id,
                response: Ok(deleted),
            },
        );
    }

    pub fn return_err(self, error: StoreError) {
        push(
            &self.expectations,
            Expectation::DeleteById {
                id: self.id,
                response: Err(error),
            },
        );
    }
}

/// Builder for `find_all` expectations.
pub struct FindAllExpectationBuilder<D> {
    expectations: Queue<D>,
}

impl<D> FindAllExpectationBuilder<D> {
    /// The cursor yields `items` in order.
    pub fn return_items(self, items: Vec<Result<D, StoreError>>) {
        push(
            &self.expectations,
            Expectation::FindAll {
                response: Ok(items),
            },
        );
    }

    /// Opening the cursor fails.
    pub fn return_err(self, error: StoreError) {
        push(
            &self.expectations,
            Expectation::FindAll {
                response: Err(error),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use uuid::Uuid;

    #[derive(Clone, Debug, PartialEq)]
    struct Note {
        id: Option<DocumentId>,
    }

    impl Document for Note {
        fn id(&self) -> Option<DocumentId> {
            self.id
        }

        fn with_id(self, id: DocumentId) -> Self {
            Self { id: Some(id) }
        }
    }

    #[tokio::test]
    async fn test_mock_store_with_expectations() {
        let mock = MockStore::<Note>::new();
        let id = Uuid::new_v4();
        mock.expect_insert().return_ok(id);
        mock.expect_find_by_id(id).return_ok(Some(Note { id: Some(id) }));
        mock.expect_delete(id).return_err(StoreError::ActorClosed);

        assert_eq!(mock.insert(Note { id: None }).await.unwrap(), id);
        assert_eq!(
            mock.find_by_id(id).await.unwrap(),
            Some(Note { id: Some(id) })
        );
        assert!(matches!(
            mock.delete_by_id(id).await,
            Err(StoreError::ActorClosed)
        ));
        mock.verify();
    }

    #[tokio::test]
    async fn test_find_all_yields_items_then_error() {
        let mock = MockStore::<Note>::new();
        mock.expect_find_all().return_items(vec![
            Ok(Note { id: None }),
            Err(StoreError::Cursor("reset".into())),
        ]);

        let items: Vec<_> = mock.find_all().await.unwrap().collect().await;
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(StoreError::Cursor(_))));
    }

    #[tokio::test]
    #[should_panic(expected = "Not all expectations were met")]
    async fn test_verify_panics_on_leftovers() {
        let mock = MockStore::<Note>::new();
        mock.expect_insert().return_ok(Uuid::new_v4());
        mock.verify();
    }
}
