//! Aggregate repositories: load/save/delete behind a trait so the service
//! layer never touches storage directly.

pub mod in_memory;

use std::sync::Arc;

use thiserror::Error;

use jobledger_core::{AggregateRoot, ExpectedVersion};

pub use in_memory::InMemoryRepository;

/// Storage-layer error (as opposed to domain errors).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Optimistic concurrency check failed on save.
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    /// A record could not be serialized for storage.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The backend is unusable (e.g. a poisoned lock).
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Persistence for one aggregate type.
///
/// `save` stores the aggregate's current state; `expected` is the version the
/// caller loaded (`Exact(0)` for a new aggregate).
pub trait Repository<A: AggregateRoot>: Send + Sync {
    fn load(&self, id: &A::Id) -> Result<Option<A>, StoreError>;
    fn save(&self, aggregate: &A, expected: ExpectedVersion) -> Result<(), StoreError>;
    /// Returns whether a record was removed.
    fn delete(&self, id: &A::Id) -> Result<bool, StoreError>;
    fn list(&self) -> Result<Vec<A>, StoreError>;
}

impl<A, S> Repository<A> for Arc<S>
where
    A: AggregateRoot,
    S: Repository<A> + ?Sized,
{
    fn load(&self, id: &A::Id) -> Result<Option<A>, StoreError> {
        (**self).load(id)
    }

    fn save(&self, aggregate: &A, expected: ExpectedVersion) -> Result<(), StoreError> {
        (**self).save(aggregate, expected)
    }

    fn delete(&self, id: &A::Id) -> Result<bool, StoreError> {
        (**self).delete(id)
    }

    fn list(&self) -> Result<Vec<A>, StoreError> {
        (**self).list()
    }
}
