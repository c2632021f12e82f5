//! Infrastructure layer: repositories, audit log, config, and the invoicing
//! service that wires them to the domain crates.

pub mod audit;
pub mod config;
pub mod repository;
pub mod service;


pub use audit::{AuditLog, InMemoryAuditLog, RecordedEvent, UnrecordedEvent};
pub use config::InvoicingConfig;
pub use repository::{InMemoryRepository, Repository, StoreError};
pub use service::{InvoicingService, NewJob, OutstandingSummary, ServiceError, ServiceResult};
