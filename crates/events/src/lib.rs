//! Domain events emitted by the job and invoice aggregates.

pub mod event;

pub use event::Event;
