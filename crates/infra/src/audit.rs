//! Append-only audit log of emitted domain events.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use jobledger_events::Event;

use crate::repository::StoreError;

/// A domain event as recorded in the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub event_id: Uuid,
    /// Position in the log, starting at 1.
    pub sequence_number: u64,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,
    pub payload: JsonValue,
}

/// An event ready to be appended (not yet assigned a sequence number).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnrecordedEvent {
    pub event_id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,
    pub payload: JsonValue,
}

impl UnrecordedEvent {
    pub fn from_typed<E>(event: &E) -> Result<Self, StoreError>
    where
        E: Event + Serialize,
    {
        let payload = serde_json::to_value(event)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Self {
            event_id: Uuid::now_v7(),
            aggregate_type: E::AGGREGATE_TYPE.to_string(),
            aggregate_id: event.aggregate_id(),
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            occurred_at: event.occurred_at(),
            payload,
        })
    }
}

pub trait AuditLog: Send + Sync {
    fn append(&self, events: Vec<UnrecordedEvent>) -> Result<Vec<RecordedEvent>, StoreError>;
    fn events_for(&self, aggregate_id: &str) -> Result<Vec<RecordedEvent>, StoreError>;
    fn all(&self) -> Result<Vec<RecordedEvent>, StoreError>;
}

impl<S: AuditLog + ?Sized> AuditLog for std::sync::Arc<S> {
    fn append(&self, events: Vec<UnrecordedEvent>) -> Result<Vec<RecordedEvent>, StoreError> {
        (**self).append(events)
    }

    fn events_for(&self, aggregate_id: &str) -> Result<Vec<RecordedEvent>, StoreError> {
        (**self).events_for(aggregate_id)
    }

    fn all(&self) -> Result<Vec<RecordedEvent>, StoreError> {
        (**self).all()
    }
}

/// In-memory audit log for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    events: RwLock<Vec<RecordedEvent>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditLog for InMemoryAuditLog {
    fn append(&self, events: Vec<UnrecordedEvent>) -> Result<Vec<RecordedEvent>, StoreError> {
        let mut log = self
            .events
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let mut next = log.len() as u64 + 1;
        let mut recorded = Vec::with_capacity(events.len());
        for e in events {
            let stored = RecordedEvent {
                event_id: e.event_id,
                sequence_number: next,
                aggregate_type: e.aggregate_type,
                aggregate_id: e.aggregate_id,
                event_type: e.event_type,
                event_version: e.event_version,
                occurred_at: e.occurred_at,
                payload: e.payload,
            };
            next += 1;
            log.push(stored.clone());
            recorded.push(stored);
        }
        Ok(recorded)
    }

    fn events_for(&self, aggregate_id: &str) -> Result<Vec<RecordedEvent>, StoreError> {
        let log = self
            .events
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(log
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .cloned()
            .collect())
    }

    fn all(&self) -> Result<Vec<RecordedEvent>, StoreError> {
        let log = self
            .events
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(log.clone())
    }
}
