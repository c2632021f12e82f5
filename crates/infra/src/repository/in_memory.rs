use std::collections::BTreeMap;
use std::sync::RwLock;

use jobledger_core::{AggregateRoot, ExpectedVersion};

use super::{Repository, StoreError};

/// In-memory repository for tests/dev.
///
/// Records are kept in id order, so `list` is deterministic (UUIDv7 ids sort
/// by creation time).
#[derive(Debug)]
pub struct InMemoryRepository<A: AggregateRoot> {
    inner: RwLock<BTreeMap<A::Id, A>>,
}

impl<A: AggregateRoot> InMemoryRepository<A> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<A: AggregateRoot> Default for InMemoryRepository<A> {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

impl<A> Repository<A> for InMemoryRepository<A>
where
    A: AggregateRoot + Clone + Send + Sync + 'static,
    A::Id: Ord + Send + Sync,
{
    fn load(&self, id: &A::Id) -> Result<Option<A>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(id).cloned())
    }

    fn save(&self, aggregate: &A, expected: ExpectedVersion) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;

        let current = map.get(aggregate.id()).map(|a| a.version()).unwrap_or(0);
        expected
            .check(current)
            .map_err(|e| StoreError::Concurrency(format!("{:?}: {e}", aggregate.id())))?;

        map.insert(aggregate.id().clone(), aggregate.clone());
        Ok(())
    }

    fn delete(&self, id: &A::Id) -> Result<bool, StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        Ok(map.remove(id).is_some())
    }

    fn list(&self) -> Result<Vec<A>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.values().cloned().collect())
    }
}
