//! Invoicing use cases (application-level orchestration).
//!
//! Each operation follows the same pipeline:
//!
//! ```text
//! load aggregates (repositories)
//!   ↓
//! decide events (pure `handle`, every aggregate involved)
//!   ↓
//! apply + save (optimistic version check)
//!   ↓
//! record events in the audit log
//! ```
//!
//! All decisions for an operation are taken before the first save, so a
//! batch with one ineligible job changes nothing. If a later save fails, jobs
//! already written in that operation are restored. Once the saves succeed the
//! operation has happened: an audit log failure after that point is logged,
//! not returned.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use jobledger_core::{
    Aggregate, AggregateId, AggregateRoot, CustomerId, DomainError, ErrorKind, ExpectedVersion,
    InvoiceId,
};
use jobledger_events::Event;
use jobledger_invoicing::{
    AddLineItem, CancelInvoice, ClearLineItems, CreateInvoice, Invoice, InvoiceCommand,
    InvoiceEvent, InvoiceLineItem, InvoiceNumber, InvoiceStatus, MarkSent, PaymentMethod,
    RegisterPayment, RemoveLineItem, UpdateInvoiceDetails, VatTable, ensure_all_eligible,
};
use jobledger_jobs::{
    CancelJob, CompleteJob, CreateJob, Job, JobCommand, JobEvent, JobId, JobType, MarkInvoiced,
    JobDetailsChanges, ReleaseFromInvoice, StartJob, UpdateJobDetails,
};

use crate::audit::{AuditLog, UnrecordedEvent};
use crate::config::InvoicingConfig;
use crate::repository::{Repository, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("storage failure: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Concurrency(msg) => ServiceError::Domain(DomainError::conflict(msg)),
            other => ServiceError::Store(other),
        }
    }
}

impl ServiceError {
    /// Domain classification; `None` for infrastructure failures.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ServiceError::Domain(e) => Some(e.kind()),
            ServiceError::Store(_) => None,
        }
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            ServiceError::Domain(e) => e.field(),
            ServiceError::Store(_) => None,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Input for registering a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJob {
    pub customer_id: CustomerId,
    pub job_type: JobType,
    pub title: String,
    pub address: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub price: Decimal,
}

/// Open (unpaid, uncancelled) invoices at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutstandingSummary {
    pub count: usize,
    pub total_outstanding: Decimal,
    pub overdue_count: usize,
    pub overdue_amount: Decimal,
}

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Job and invoice use cases over injected repositories.
pub struct InvoicingService<J, I, L> {
    jobs: J,
    invoices: I,
    audit: L,
    config: InvoicingConfig,
    clock: Clock,
}

impl<J, I, L> core::fmt::Debug for InvoicingService<J, I, L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InvoicingService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<J, I, L> InvoicingService<J, I, L>
where
    J: Repository<Job>,
    I: Repository<Invoice>,
    L: AuditLog,
{
    pub fn new(jobs: J, invoices: I, audit: L, config: InvoicingConfig) -> Self {
        Self {
            jobs,
            invoices,
            audit,
            config,
            clock: Box::new(Utc::now),
        }
    }

    /// Replace the wall clock (tests, backdated imports).
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &InvoicingConfig {
        &self.config
    }

    pub fn vat_table(&self) -> VatTable {
        self.config.vat_table()
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    // ---------------------------------------------------------------------
    // Jobs
    // ---------------------------------------------------------------------

    pub fn register_job(&self, new: NewJob) -> ServiceResult<Job> {
        let job_id = JobId::new(AggregateId::new());
        let cmd = JobCommand::CreateJob(CreateJob {
            job_id,
            customer_id: new.customer_id,
            job_type: new.job_type,
            title: new.title,
            address: new.address,
            start_date: new.start_date,
            end_date: new.end_date,
            price: new.price,
            occurred_at: self.now(),
        });
        let job = self.execute_job(Job::empty(job_id), &cmd)?;
        tracing::info!("registered {} job {}", job.job_type(), job_id);
        Ok(job)
    }

    pub fn update_job_details(
        &self,
        job_id: JobId,
        changes: JobDetailsChanges,
    ) -> ServiceResult<Job> {
        let job = self.load_job(job_id)?;
        let cmd = JobCommand::UpdateJobDetails(UpdateJobDetails {
            job_id,
            changes,
            occurred_at: self.now(),
        });
        self.execute_job(job, &cmd)
    }

    pub fn start_job(&self, job_id: JobId) -> ServiceResult<Job> {
        let job = self.load_job(job_id)?;
        let cmd = JobCommand::StartJob(StartJob {
            job_id,
            occurred_at: self.now(),
        });
        self.execute_job(job, &cmd)
    }

    /// Complete a job; its end date defaults to the recorded one, else today.
    pub fn complete_job(&self, job_id: JobId, end_date: Option<NaiveDate>) -> ServiceResult<Job> {
        let job = self.load_job(job_id)?;
        let cmd = JobCommand::CompleteJob(CompleteJob {
            job_id,
            end_date,
            occurred_at: self.now(),
        });
        let job = self.execute_job(job, &cmd)?;
        tracing::info!("job {} completed, now eligible for invoicing", job_id);
        Ok(job)
    }

    pub fn cancel_job(&self, job_id: JobId, reason: Option<String>) -> ServiceResult<Job> {
        let job = self.load_job(job_id)?;
        let cmd = JobCommand::CancelJob(CancelJob {
            job_id,
            reason,
            occurred_at: self.now(),
        });
        self.execute_job(job, &cmd)
    }

    pub fn load_job(&self, job_id: JobId) -> ServiceResult<Job> {
        self.jobs
            .load(&job_id)?
            .ok_or_else(|| DomainError::not_found("job", job_id).into())
    }

    /// Jobs for `ids` in the requested order; unknown ids are skipped.
    pub fn load_jobs_by_ids(&self, ids: &[JobId]) -> ServiceResult<Vec<Job>> {
        let mut jobs = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(job) = self.jobs.load(id)? {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }

    /// Completed, uninvoiced jobs of a customer.
    pub fn eligible_jobs_for_customer(&self, customer_id: CustomerId) -> ServiceResult<Vec<Job>> {
        Ok(self
            .jobs
            .list()?
            .into_iter()
            .filter(|j| j.customer_id() == Some(customer_id) && j.can_be_invoiced())
            .collect())
    }

    /// All-or-nothing gate over job ids. Empty or unknown ids → `false`.
    pub fn can_all_be_invoiced(&self, ids: &[JobId]) -> ServiceResult<bool> {
        if ids.is_empty() {
            return Ok(false);
        }
        for id in ids {
            match self.jobs.load(id)? {
                Some(job) if job.can_be_invoiced() => {}
                _ => return Ok(false),
            }
        }
        Ok(true)
    }

    /// Link every job to `invoice_id`, or none of them.
    ///
    /// Returns `false` for an empty batch.
    pub fn mark_jobs_invoiced(&self, job_ids: &[JobId], invoice_id: InvoiceId) -> ServiceResult<bool> {
        if job_ids.is_empty() {
            return Ok(false);
        }
        let at = self.now();
        let jobs = self.load_all_jobs(job_ids)?;
        let changes = decide_all(jobs, |job| {
            JobCommand::MarkInvoiced(MarkInvoiced {
                job_id: job.id_typed(),
                invoice_id,
                occurred_at: at,
            })
        })?;
        self.commit_jobs(changes)?;
        Ok(true)
    }

    /// Unlink every job from `invoice_id`. Jobs that are no longer linked, or
    /// no longer exist, are skipped.
    pub fn release_jobs_from_invoice(
        &self,
        job_ids: &[JobId],
        invoice_id: InvoiceId,
    ) -> ServiceResult<bool> {
        let at = self.now();
        let jobs = self.load_jobs_by_ids(job_ids)?;
        if jobs.len() != job_ids.len() {
            tracing::warn!(
                "releasing invoice {}: {} of {} jobs no longer exist",
                invoice_id,
                job_ids.len() - jobs.len(),
                job_ids.len()
            );
        }
        let changes = decide_all(jobs, |job| {
            JobCommand::ReleaseFromInvoice(ReleaseFromInvoice {
                job_id: job.id_typed(),
                invoice_id,
                occurred_at: at,
            })
        })?;
        self.commit_jobs(changes)?;
        Ok(true)
    }

    // ---------------------------------------------------------------------
    // Invoices
    // ---------------------------------------------------------------------

    pub fn load_invoice(&self, invoice_id: InvoiceId) -> ServiceResult<Invoice> {
        self.invoices
            .load(&invoice_id)?
            .ok_or_else(|| DomainError::not_found("invoice", invoice_id).into())
    }

    pub fn list_invoices(&self) -> ServiceResult<Vec<Invoice>> {
        Ok(self.invoices.list()?)
    }

    /// Store an invoice after checking its totals match its lines.
    pub fn persist_invoice(
        &self,
        invoice: &Invoice,
        expected: ExpectedVersion,
    ) -> ServiceResult<Invoice> {
        if !invoice.is_created() {
            return Err(
                DomainError::validation("cannot persist an invoice that was never created").into(),
            );
        }
        if invoice.totals() != invoice.recalculate() {
            return Err(DomainError::field_validation(
                "subtotal",
                "invoice totals do not match its line items",
            )
            .into());
        }
        self.invoices.save(invoice, expected)?;
        Ok(invoice.clone())
    }

    /// `INV-{year}-{max+1}` over every stored invoice.
    pub fn next_invoice_number(&self, year: i32) -> ServiceResult<InvoiceNumber> {
        let numbers: Vec<InvoiceNumber> = self
            .invoices
            .list()?
            .iter()
            .filter_map(Invoice::number)
            .collect();
        Ok(InvoiceNumber::next_for_year(year, &numbers)?)
    }

    /// Draft an invoice for `customer_id` from eligible jobs and link them.
    pub fn create_invoice_from_jobs(
        &self,
        customer_id: CustomerId,
        job_ids: &[JobId],
        notes: Option<String>,
    ) -> ServiceResult<Invoice> {
        if job_ids.is_empty() {
            return Err(DomainError::field_validation(
                "job_ids",
                "at least one eligible job is required",
            )
            .into());
        }
        let mut seen = HashSet::new();
        if let Some(dup) = job_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(DomainError::field_validation(
                "job_ids",
                format!("job {dup} selected more than once"),
            )
            .into());
        }

        let now = self.now();
        let jobs = self.load_all_jobs(job_ids)?;
        ensure_all_eligible(&jobs, customer_id)?;

        let terms = Duration::days(i64::from(self.config.payment_terms_days));
        let due_date = now.checked_add_signed(terms).ok_or_else(|| {
            DomainError::field_validation(
                "due_date",
                format!(
                    "payment terms of {} days put the due date out of range",
                    self.config.payment_terms_days
                ),
            )
        })?;

        let invoice_id = InvoiceId::new();
        let number = self.next_invoice_number(now.year())?;
        let lines: Vec<InvoiceLineItem> = jobs
            .iter()
            .map(|job| InvoiceLineItem::from_job(invoice_id, job))
            .collect();

        let mut invoice = Invoice::empty(invoice_id);
        let invoice_events = invoice.execute(&InvoiceCommand::CreateInvoice(CreateInvoice {
            invoice_id,
            customer_id,
            number,
            lines,
            vat_table: self.vat_table(),
            due_date,
            notes,
            occurred_at: now,
        }))?;

        let changes = decide_all(jobs, |job| {
            JobCommand::MarkInvoiced(MarkInvoiced {
                job_id: job.id_typed(),
                invoice_id,
                occurred_at: now,
            })
        })?;

        self.persist_invoice(&invoice, ExpectedVersion::Exact(0))?;
        if let Err(e) = self.commit_jobs(changes) {
            self.invoices.delete(&invoice_id)?;
            return Err(e);
        }
        self.record(&invoice_events);

        tracing::info!(
            "created invoice {} for customer {} with {} job(s), total {}",
            number,
            customer_id,
            invoice.lines().len(),
            invoice.total()
        );
        Ok(invoice)
    }

    pub fn add_job_to_invoice(&self, invoice_id: InvoiceId, job_id: JobId) -> ServiceResult<Invoice> {
        let invoice = self.load_invoice(invoice_id)?;
        let job = self.load_job(job_id)?;
        if invoice.is_modifiable() {
            let customer_id = invoice
                .customer_id()
                .ok_or_else(|| DomainError::invariant("invoice has no customer"))?;
            ensure_all_eligible(std::slice::from_ref(&job), customer_id)?;
        }

        let at = self.now();
        let cmd = InvoiceCommand::AddLineItem(AddLineItem {
            invoice_id,
            line: InvoiceLineItem::from_job(invoice_id, &job),
            occurred_at: at,
        });
        let link = JobCommand::MarkInvoiced(MarkInvoiced {
            job_id,
            invoice_id,
            occurred_at: at,
        });
        self.edit_invoice(invoice, &cmd, vec![(job, link)])
    }

    pub fn remove_job_from_invoice(
        &self,
        invoice_id: InvoiceId,
        job_id: JobId,
    ) -> ServiceResult<Invoice> {
        let invoice = self.load_invoice(invoice_id)?;
        let at = self.now();
        let cmd = InvoiceCommand::RemoveLineItem(RemoveLineItem {
            invoice_id,
            job_id,
            occurred_at: at,
        });
        let job_changes = self
            .jobs
            .load(&job_id)?
            .map(|job| {
                let release = release_cmd(job_id, invoice_id, at);
                vec![(job, release)]
            })
            .unwrap_or_default();
        self.edit_invoice(invoice, &cmd, job_changes)
    }

    pub fn clear_invoice_lines(&self, invoice_id: InvoiceId) -> ServiceResult<Invoice> {
        let invoice = self.load_invoice(invoice_id)?;
        let at = self.now();
        let cmd = InvoiceCommand::ClearLineItems(ClearLineItems {
            invoice_id,
            occurred_at: at,
        });
        let job_changes = self.release_pairs(&invoice.job_ids(), invoice_id, at)?;
        self.edit_invoice(invoice, &cmd, job_changes)
    }

    /// Change a draft's due date or notes; `None` keeps the current value.
    pub fn update_invoice_details(
        &self,
        invoice_id: InvoiceId,
        due_date: Option<DateTime<Utc>>,
        notes: Option<String>,
    ) -> ServiceResult<Invoice> {
        self.edit_invoice_details(invoice_id, due_date, notes, false)
    }

    pub fn clear_invoice_notes(&self, invoice_id: InvoiceId) -> ServiceResult<Invoice> {
        self.edit_invoice_details(invoice_id, None, None, true)
    }

    fn edit_invoice_details(
        &self,
        invoice_id: InvoiceId,
        due_date: Option<DateTime<Utc>>,
        notes: Option<String>,
        clear_notes: bool,
    ) -> ServiceResult<Invoice> {
        let invoice = self.load_invoice(invoice_id)?;
        let cmd = InvoiceCommand::UpdateInvoiceDetails(UpdateInvoiceDetails {
            invoice_id,
            due_date,
            notes,
            clear_notes,
            occurred_at: self.now(),
        });
        self.edit_invoice(invoice, &cmd, vec![])
    }

    pub fn send_invoice(&self, invoice_id: InvoiceId) -> ServiceResult<Invoice> {
        let invoice = self.load_invoice(invoice_id)?;
        let cmd = InvoiceCommand::MarkSent(MarkSent {
            invoice_id,
            occurred_at: self.now(),
        });
        let invoice = self.edit_invoice(invoice, &cmd, vec![])?;
        tracing::info!(
            "invoice {} sent (send #{})",
            display_number(&invoice),
            invoice.send_count()
        );
        Ok(invoice)
    }

    pub fn mark_invoice_paid(
        &self,
        invoice_id: InvoiceId,
        method: PaymentMethod,
        reference: Option<String>,
    ) -> ServiceResult<Invoice> {
        let invoice = self.load_invoice(invoice_id)?;
        let cmd = InvoiceCommand::RegisterPayment(RegisterPayment {
            invoice_id,
            method,
            reference,
            occurred_at: self.now(),
        });
        let invoice = self.edit_invoice(invoice, &cmd, vec![])?;
        tracing::info!(
            "invoice {} paid by {:?}, amount {}",
            display_number(&invoice),
            method,
            invoice.total()
        );
        Ok(invoice)
    }

    /// Cancel an invoice and hand its jobs back to the eligible pool.
    pub fn cancel_invoice(&self, invoice_id: InvoiceId, reason: Option<String>) -> ServiceResult<Invoice> {
        let invoice = self.load_invoice(invoice_id)?;
        let at = self.now();
        let cmd = InvoiceCommand::CancelInvoice(CancelInvoice {
            invoice_id,
            reason,
            occurred_at: at,
        });
        let job_changes = self.release_pairs(&invoice.job_ids(), invoice_id, at)?;
        let released = job_changes.len();
        let invoice = self.edit_invoice(invoice, &cmd, job_changes)?;
        tracing::info!(
            "invoice {} cancelled, {} job(s) released",
            display_number(&invoice),
            released
        );
        Ok(invoice)
    }

    /// Delete a draft outright, releasing its jobs.
    pub fn delete_draft_invoice(&self, invoice_id: InvoiceId) -> ServiceResult<()> {
        let invoice = self.load_invoice(invoice_id)?;
        if invoice.status() != InvoiceStatus::Draft {
            return Err(DomainError::invalid_state(format!(
                "only draft invoices can be deleted; {} is {:?}",
                display_number(&invoice),
                invoice.status()
            ))
            .into());
        }

        let at = self.now();
        let pairs = self.release_pairs(&invoice.job_ids(), invoice_id, at)?;
        let changes = decide_pairs(pairs)?;
        self.commit_jobs(changes)?;
        self.invoices.delete(&invoice_id)?;
        tracing::info!("draft invoice {} deleted", display_number(&invoice));
        Ok(())
    }

    /// Unpaid, uncancelled invoices whose due date is before `now`.
    pub fn overdue_invoices(&self, now: DateTime<Utc>) -> ServiceResult<Vec<Invoice>> {
        Ok(self
            .invoices
            .list()?
            .into_iter()
            .filter(|inv| inv.is_overdue(now))
            .collect())
    }

    pub fn outstanding_summary(&self, now: DateTime<Utc>) -> ServiceResult<OutstandingSummary> {
        let mut summary = OutstandingSummary {
            count: 0,
            total_outstanding: Decimal::ZERO,
            overdue_count: 0,
            overdue_amount: Decimal::ZERO,
        };
        for invoice in self.invoices.list()? {
            if invoice.status().is_terminal() {
                continue;
            }
            summary.count += 1;
            summary.total_outstanding += invoice.outstanding_amount();
            if invoice.is_overdue(now) {
                summary.overdue_count += 1;
                summary.overdue_amount += invoice.outstanding_amount();
            }
        }
        Ok(summary)
    }

    // ---------------------------------------------------------------------
    // Pipeline helpers
    // ---------------------------------------------------------------------

    fn load_all_jobs(&self, ids: &[JobId]) -> ServiceResult<Vec<Job>> {
        ids.iter().map(|id| self.load_job(*id)).collect()
    }

    fn release_pairs(
        &self,
        job_ids: &[JobId],
        invoice_id: InvoiceId,
        at: DateTime<Utc>,
    ) -> ServiceResult<Vec<(Job, JobCommand)>> {
        Ok(self
            .load_jobs_by_ids(job_ids)?
            .into_iter()
            .map(|job| {
                let cmd = release_cmd(job.id_typed(), invoice_id, at);
                (job, cmd)
            })
            .collect())
    }

    fn execute_job(&self, mut job: Job, cmd: &JobCommand) -> ServiceResult<Job> {
        let expected = ExpectedVersion::Exact(job.version());
        let events = job.execute(cmd)?;
        if events.is_empty() {
            return Ok(job);
        }
        self.jobs.save(&job, expected)?;
        self.record(&events);
        Ok(job)
    }

    /// Decide the invoice command and every job command, then save all.
    fn edit_invoice(
        &self,
        mut invoice: Invoice,
        cmd: &InvoiceCommand,
        job_commands: Vec<(Job, JobCommand)>,
    ) -> ServiceResult<Invoice> {
        let expected = ExpectedVersion::Exact(invoice.version());
        let before = invoice.clone();
        let events = invoice.execute(cmd)?;
        let changes = decide_pairs(job_commands)?;
        if events.is_empty() && changes.is_empty() {
            return Ok(invoice);
        }

        self.persist_invoice(&invoice, expected)?;
        if let Err(e) = self.commit_jobs(changes) {
            self.invoices.save(&before, ExpectedVersion::Any)?;
            return Err(e);
        }
        self.record(&events);
        tracing::debug!(
            "invoice {}: {} applied, v{}",
            display_number(&invoice),
            events
                .iter()
                .map(InvoiceEvent::short_name)
                .collect::<Vec<_>>()
                .join(", "),
            invoice.version()
        );
        Ok(invoice)
    }

    /// Save decided job changes; on failure restore the ones already saved.
    fn commit_jobs(&self, changes: Vec<JobChange>) -> ServiceResult<()> {
        let mut saved: Vec<&JobChange> = Vec::with_capacity(changes.len());
        for change in &changes {
            if let Err(e) = self
                .jobs
                .save(&change.after, ExpectedVersion::Exact(change.before.version()))
            {
                tracing::warn!(
                    "saving job {} failed ({}); restoring {} job(s)",
                    change.after.id_typed(),
                    e,
                    saved.len()
                );
                for done in saved {
                    self.jobs.save(&done.before, ExpectedVersion::Any)?;
                }
                return Err(e.into());
            }
            saved.push(change);
        }

        for change in &changes {
            self.record(&change.events);
        }
        Ok(())
    }

    /// Append already-committed events to the audit log.
    fn record<E>(&self, events: &[E])
    where
        E: Event + Serialize,
    {
        let Some(first) = events.first() else {
            return;
        };
        let appended = events
            .iter()
            .map(UnrecordedEvent::from_typed)
            .collect::<Result<Vec<_>, _>>()
            .and_then(|batch| self.audit.append(batch));
        if let Err(e) = appended {
            tracing::warn!(
                "{} {}: {} committed event(s) missing from audit log: {}",
                E::AGGREGATE_TYPE,
                first.aggregate_id(),
                events.len(),
                e
            );
        }
    }
}

/// A job transition decided but not yet saved.
#[derive(Debug)]
struct JobChange {
    before: Job,
    after: Job,
    events: Vec<JobEvent>,
}

fn decide_all(
    jobs: Vec<Job>,
    make_cmd: impl Fn(&Job) -> JobCommand,
) -> Result<Vec<JobChange>, DomainError> {
    let pairs = jobs
        .into_iter()
        .map(|job| {
            let cmd = make_cmd(&job);
            (job, cmd)
        })
        .collect();
    decide_pairs(pairs)
}

/// Run every command against a copy of its job; fail on the first error.
/// Commands that decide nothing are dropped.
fn decide_pairs(pairs: Vec<(Job, JobCommand)>) -> Result<Vec<JobChange>, DomainError> {
    let mut changes = Vec::with_capacity(pairs.len());
    for (before, cmd) in pairs {
        let mut after = before.clone();
        let events = after.execute(&cmd)?;
        if !events.is_empty() {
            changes.push(JobChange {
                before,
                after,
                events,
            });
        }
    }
    Ok(changes)
}

fn release_cmd(job_id: JobId, invoice_id: InvoiceId, at: DateTime<Utc>) -> JobCommand {
    JobCommand::ReleaseFromInvoice(ReleaseFromInvoice {
        job_id,
        invoice_id,
        occurred_at: at,
    })
}

fn display_number(invoice: &Invoice) -> String {
    invoice
        .number()
        .map(|n| n.to_string())
        .unwrap_or_else(|| invoice.id_typed().to_string())
}
