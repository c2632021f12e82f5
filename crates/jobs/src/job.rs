use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use jobledger_core::money::is_whole_cents;
use jobledger_core::{Aggregate, AggregateId, AggregateRoot, CustomerId, DomainError, InvoiceId};
use jobledger_events::Event;

use crate::job_type::JobType;

/// Job identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub AggregateId);

impl JobId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for JobId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Job status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    New,
    Active,
    Completed,
    Cancelled,
}

/// Aggregate root: Job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    id: JobId,
    customer_id: Option<CustomerId>,
    job_type: JobType,
    title: String,
    status: JobStatus,
    address: String,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    price: Decimal,
    invoice_id: Option<InvoiceId>,
    invoiced_date: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Job {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: JobId) -> Self {
        Self {
            id,
            customer_id: None,
            job_type: JobType::Service,
            title: String::new(),
            status: JobStatus::New,
            address: String::new(),
            start_date: NaiveDate::default(),
            end_date: None,
            price: Decimal::ZERO,
            invoice_id: None,
            invoiced_date: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> JobId {
        self.id
    }

    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    pub fn job_type(&self) -> JobType {
        self.job_type
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn is_invoiced(&self) -> bool {
        self.invoice_id.is_some()
    }

    pub fn invoice_id(&self) -> Option<InvoiceId> {
        self.invoice_id
    }

    pub fn invoiced_date(&self) -> Option<DateTime<Utc>> {
        self.invoiced_date
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Eligible job: Completed and not yet linked to an invoice.
    pub fn can_be_invoiced(&self) -> bool {
        self.created && self.status == JobStatus::Completed && !self.is_invoiced()
    }

    /// Details can change until the job is invoiced or cancelled.
    pub fn is_modifiable(&self) -> bool {
        !self.is_invoiced() && self.status != JobStatus::Cancelled
    }
}

impl AggregateRoot for Job {
    type Id = JobId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateJob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateJob {
    pub job_id: JobId,
    pub customer_id: CustomerId,
    pub job_type: JobType,
    pub title: String,
    pub address: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub price: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Edits to a job's details. `None` leaves a field unchanged.
///
/// The end date is the only optional detail; `clear_end_date` removes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDetailsChanges {
    pub title: Option<String>,
    pub address: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub clear_end_date: bool,
    pub price: Option<Decimal>,
}

/// Command: UpdateJobDetails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateJobDetails {
    pub job_id: JobId,
    pub changes: JobDetailsChanges,
    pub occurred_at: DateTime<Utc>,
}

/// Command: StartJob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartJob {
    pub job_id: JobId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CompleteJob.
///
/// Without an explicit `end_date` the recorded end date is kept, falling back
/// to the completion day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteJob {
    pub job_id: JobId,
    pub end_date: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelJob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelJob {
    pub job_id: JobId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkInvoiced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkInvoiced {
    pub job_id: JobId,
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReleaseFromInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseFromInvoice {
    pub job_id: JobId,
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobCommand {
    CreateJob(CreateJob),
    UpdateJobDetails(UpdateJobDetails),
    StartJob(StartJob),
    CompleteJob(CompleteJob),
    CancelJob(CancelJob),
    MarkInvoiced(MarkInvoiced),
    ReleaseFromInvoice(ReleaseFromInvoice),
}

/// Event: JobCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCreated {
    pub job_id: JobId,
    pub customer_id: CustomerId,
    pub job_type: JobType,
    pub title: String,
    pub address: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub price: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: JobDetailsUpdated. Carries the full resulting details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDetailsUpdated {
    pub job_id: JobId,
    pub title: String,
    pub address: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub price: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: JobStarted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStarted {
    pub job_id: JobId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: JobCompleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCompleted {
    pub job_id: JobId,
    pub end_date: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

/// Event: JobCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCancelled {
    pub job_id: JobId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: JobInvoiced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInvoiced {
    pub job_id: JobId,
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: JobReleased (back into the eligible pool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReleased {
    pub job_id: JobId,
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobEvent {
    JobCreated(JobCreated),
    JobDetailsUpdated(JobDetailsUpdated),
    JobStarted(JobStarted),
    JobCompleted(JobCompleted),
    JobCancelled(JobCancelled),
    JobInvoiced(JobInvoiced),
    JobReleased(JobReleased),
}

impl Event for JobEvent {
    const AGGREGATE_TYPE: &'static str = "jobs.job";

    fn event_type(&self) -> &'static str {
        match self {
            JobEvent::JobCreated(_) => "jobs.job.created",
            JobEvent::JobDetailsUpdated(_) => "jobs.job.details_updated",
            JobEvent::JobStarted(_) => "jobs.job.started",
            JobEvent::JobCompleted(_) => "jobs.job.completed",
            JobEvent::JobCancelled(_) => "jobs.job.cancelled",
            JobEvent::JobInvoiced(_) => "jobs.job.invoiced",
            JobEvent::JobReleased(_) => "jobs.job.released",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn aggregate_id(&self) -> String {
        let id = match self {
            JobEvent::JobCreated(e) => e.job_id,
            JobEvent::JobDetailsUpdated(e) => e.job_id,
            JobEvent::JobStarted(e) => e.job_id,
            JobEvent::JobCompleted(e) => e.job_id,
            JobEvent::JobCancelled(e) => e.job_id,
            JobEvent::JobInvoiced(e) => e.job_id,
            JobEvent::JobReleased(e) => e.job_id,
        };
        id.to_string()
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            JobEvent::JobCreated(e) => e.occurred_at,
            JobEvent::JobDetailsUpdated(e) => e.occurred_at,
            JobEvent::JobStarted(e) => e.occurred_at,
            JobEvent::JobCompleted(e) => e.occurred_at,
            JobEvent::JobCancelled(e) => e.occurred_at,
            JobEvent::JobInvoiced(e) => e.occurred_at,
            JobEvent::JobReleased(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Job {
    type Command = JobCommand;
    type Event = JobEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            JobEvent::JobCreated(e) => {
                self.id = e.job_id;
                self.customer_id = Some(e.customer_id);
                self.job_type = e.job_type;
                self.title = e.title.clone();
                self.address = e.address.clone();
                self.start_date = e.start_date;
                self.end_date = e.end_date;
                self.price = e.price;
                self.status = JobStatus::New;
                self.invoice_id = None;
                self.invoiced_date = None;
                self.created = true;
            }
            JobEvent::JobDetailsUpdated(e) => {
                self.title = e.title.clone();
                self.address = e.address.clone();
                self.start_date = e.start_date;
                self.end_date = e.end_date;
                self.price = e.price;
            }
            JobEvent::JobStarted(_) => {
                self.status = JobStatus::Active;
            }
            JobEvent::JobCompleted(e) => {
                self.status = JobStatus::Completed;
                self.end_date = Some(e.end_date);
            }
            JobEvent::JobCancelled(_) => {
                self.status = JobStatus::Cancelled;
            }
            JobEvent::JobInvoiced(e) => {
                self.invoice_id = Some(e.invoice_id);
                self.invoiced_date = Some(e.occurred_at);
            }
            JobEvent::JobReleased(_) => {
                self.invoice_id = None;
                self.invoiced_date = None;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            JobCommand::CreateJob(cmd) => self.handle_create(cmd),
            JobCommand::UpdateJobDetails(cmd) => self.handle_update_details(cmd),
            JobCommand::StartJob(cmd) => self.handle_start(cmd),
            JobCommand::CompleteJob(cmd) => self.handle_complete(cmd),
            JobCommand::CancelJob(cmd) => self.handle_cancel(cmd),
            JobCommand::MarkInvoiced(cmd) => self.handle_mark_invoiced(cmd),
            JobCommand::ReleaseFromInvoice(cmd) => self.handle_release(cmd),
        }
    }
}

fn validate_details(
    address: &str,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    price: Decimal,
) -> Result<(), DomainError> {
    if address.trim().is_empty() {
        return Err(DomainError::field_validation("address", "address is required"));
    }
    if price <= Decimal::ZERO {
        return Err(DomainError::field_validation("price", "price must be positive"));
    }
    if !is_whole_cents(price) {
        return Err(DomainError::field_validation(
            "price",
            format!("price {price} has fractions of a cent"),
        ));
    }
    if let Some(end) = end_date {
        if end < start_date {
            return Err(DomainError::field_validation(
                "end_date",
                "end date must not precede start date",
            ));
        }
    }
    Ok(())
}

impl Job {
    fn ensure_created(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found("job", self.id));
        }
        Ok(())
    }

    fn ensure_job_id(&self, job_id: JobId) -> Result<(), DomainError> {
        if self.id != job_id {
            return Err(DomainError::invariant("job_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateJob) -> Result<Vec<JobEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("job already exists"));
        }
        validate_details(&cmd.address, cmd.start_date, cmd.end_date, cmd.price)?;

        Ok(vec![JobEvent::JobCreated(JobCreated {
            job_id: cmd.job_id,
            customer_id: cmd.customer_id,
            job_type: cmd.job_type,
            title: cmd.title.trim().to_string(),
            address: cmd.address.trim().to_string(),
            start_date: cmd.start_date,
            end_date: cmd.end_date,
            price: cmd.price,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_details(
        &self,
        cmd: &UpdateJobDetails,
    ) -> Result<Vec<JobEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_job_id(cmd.job_id)?;

        if !self.is_modifiable() {
            return Err(DomainError::invalid_state(
                "cannot edit a job that is invoiced or cancelled",
            ));
        }

        let changes = &cmd.changes;
        if changes.clear_end_date && changes.end_date.is_some() {
            return Err(DomainError::field_validation(
                "end_date",
                "cannot set and clear the end date in one update",
            ));
        }

        let title = changes
            .title
            .as_deref()
            .map(|t| t.trim().to_string())
            .unwrap_or_else(|| self.title.clone());
        let address = changes
            .address
            .as_deref()
            .map(|a| a.trim().to_string())
            .unwrap_or_else(|| self.address.clone());
        let start_date = changes.start_date.unwrap_or(self.start_date);
        let end_date = if changes.clear_end_date {
            None
        } else {
            changes.end_date.or(self.end_date)
        };
        let price = changes.price.unwrap_or(self.price);
        validate_details(&address, start_date, end_date, price)?;

        Ok(vec![JobEvent::JobDetailsUpdated(JobDetailsUpdated {
            job_id: self.id,
            title,
            address,
            start_date,
            end_date,
            price,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_start(&self, cmd: &StartJob) -> Result<Vec<JobEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_job_id(cmd.job_id)?;

        if self.status != JobStatus::New {
            return Err(DomainError::invalid_state("only new jobs can be started"));
        }

        Ok(vec![JobEvent::JobStarted(JobStarted {
            job_id: cmd.job_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_complete(&self, cmd: &CompleteJob) -> Result<Vec<JobEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_job_id(cmd.job_id)?;

        if !matches!(self.status, JobStatus::New | JobStatus::Active) {
            return Err(DomainError::invalid_state(
                "only new or active jobs can be completed",
            ));
        }

        let end_date = cmd
            .end_date
            .or(self.end_date)
            .unwrap_or_else(|| cmd.occurred_at.date_naive());
        if end_date < self.start_date {
            return Err(DomainError::field_validation(
                "end_date",
                "end date must not precede start date",
            ));
        }

        Ok(vec![JobEvent::JobCompleted(JobCompleted {
            job_id: cmd.job_id,
            end_date,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelJob) -> Result<Vec<JobEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_job_id(cmd.job_id)?;

        if self.is_invoiced() {
            return Err(DomainError::invalid_state("cannot cancel an invoiced job"));
        }
        if !matches!(self.status, JobStatus::New | JobStatus::Active) {
            return Err(DomainError::invalid_state(
                "only new or active jobs can be cancelled",
            ));
        }

        Ok(vec![JobEvent::JobCancelled(JobCancelled {
            job_id: cmd.job_id,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_invoiced(&self, cmd: &MarkInvoiced) -> Result<Vec<JobEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_job_id(cmd.job_id)?;

        if self.status != JobStatus::Completed {
            return Err(DomainError::eligibility(format!(
                "job {} is not completed",
                self.id
            )));
        }
        if let Some(linked) = self.invoice_id {
            return Err(DomainError::eligibility(format!(
                "job {} is already invoiced on {linked}",
                self.id
            )));
        }

        Ok(vec![JobEvent::JobInvoiced(JobInvoiced {
            job_id: cmd.job_id,
            invoice_id: cmd.invoice_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_release(&self, cmd: &ReleaseFromInvoice) -> Result<Vec<JobEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_job_id(cmd.job_id)?;

        match self.invoice_id {
            None => Ok(vec![]),
            Some(linked) if linked != cmd.invoice_id => Err(DomainError::invariant(format!(
                "job {} is linked to invoice {linked}, not {}",
                self.id, cmd.invoice_id
            ))),
            Some(_) => Ok(vec![JobEvent::JobReleased(JobReleased {
                job_id: cmd.job_id,
                invoice_id: cmd.invoice_id,
                occurred_at: cmd.occurred_at,
            })]),
        }
    }
}
