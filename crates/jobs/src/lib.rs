//! Jobs domain module.
//!
//! A job is one billable unit of service work (a rental, a delivery, a
//! service call). This crate holds the job state machine and the
//! invoicing-eligibility predicate, as deterministic domain logic with no IO.

pub mod job;
pub mod job_type;

pub use job::{
    CancelJob, CompleteJob, CreateJob, Job, JobCancelled, JobCommand, JobCompleted, JobCreated,
    JobDetailsChanges, JobDetailsUpdated, JobEvent, JobId, JobInvoiced, JobReleased, JobStarted,
    JobStatus, MarkInvoiced, ReleaseFromInvoice, StartJob, UpdateJobDetails,
};
pub use job_type::{JobType, JobTypeInfo};
