use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use jobledger_core::money::is_whole_cents;
use jobledger_core::{Aggregate, AggregateRoot, CustomerId, DomainError, Entity, InvoiceId};
use jobledger_events::Event;
use jobledger_jobs::JobId;

use crate::line_item::InvoiceLineItem;
use crate::number::InvoiceNumber;
use crate::vat::{InvoiceTotals, VatRate, VatTable};

/// Invoice status lifecycle.
///
/// `Overdue` is never stored: it is derived from the due date by
/// [`Invoice::effective_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    Card,
    Cash,
    Cheque,
    Other,
}

/// Aggregate root: Invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    id: InvoiceId,
    customer_id: Option<CustomerId>,
    number: Option<InvoiceNumber>,
    status: InvoiceStatus,
    lines: Vec<InvoiceLineItem>,
    vat_table: VatTable,
    totals: InvoiceTotals,
    created_date: Option<DateTime<Utc>>,
    due_date: Option<DateTime<Utc>>,
    sent_date: Option<DateTime<Utc>>,
    last_sent_date: Option<DateTime<Utc>>,
    send_count: u32,
    paid_date: Option<DateTime<Utc>>,
    payment_method: Option<PaymentMethod>,
    payment_reference: Option<String>,
    cancelled_date: Option<DateTime<Utc>>,
    notes: Option<String>,
    version: u64,
    created: bool,
}

impl Invoice {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: InvoiceId) -> Self {
        let vat_table = VatTable::default();
        Self {
            id,
            customer_id: None,
            number: None,
            status: InvoiceStatus::Draft,
            lines: Vec::new(),
            totals: InvoiceTotals::zero(&vat_table),
            vat_table,
            created_date: None,
            due_date: None,
            sent_date: None,
            last_sent_date: None,
            send_count: 0,
            paid_date: None,
            payment_method: None,
            payment_reference: None,
            cancelled_date: None,
            notes: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> InvoiceId {
        self.id
    }

    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    pub fn number(&self) -> Option<InvoiceNumber> {
        self.number
    }

    /// Stored status; see [`Invoice::effective_status`] for display.
    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn lines(&self) -> &[InvoiceLineItem] {
        &self.lines
    }

    pub fn job_ids(&self) -> Vec<JobId> {
        self.lines.iter().map(|l| l.job_id).collect()
    }

    pub fn vat_table(&self) -> &VatTable {
        &self.vat_table
    }

    pub fn totals(&self) -> InvoiceTotals {
        self.totals
    }

    pub fn subtotal(&self) -> Decimal {
        self.totals.subtotal
    }

    pub fn vat_rate(&self) -> VatRate {
        self.totals.vat_rate
    }

    pub fn vat_amount(&self) -> Decimal {
        self.totals.vat_amount
    }

    pub fn total(&self) -> Decimal {
        self.totals.total
    }

    pub fn created_date(&self) -> Option<DateTime<Utc>> {
        self.created_date
    }

    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }

    pub fn sent_date(&self) -> Option<DateTime<Utc>> {
        self.sent_date
    }

    pub fn last_sent_date(&self) -> Option<DateTime<Utc>> {
        self.last_sent_date
    }

    pub fn send_count(&self) -> u32 {
        self.send_count
    }

    pub fn paid_date(&self) -> Option<DateTime<Utc>> {
        self.paid_date
    }

    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment_method
    }

    pub fn payment_reference(&self) -> Option<&str> {
        self.payment_reference.as_deref()
    }

    pub fn cancelled_date(&self) -> Option<DateTime<Utc>> {
        self.cancelled_date
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Only drafts accept line-item and detail edits.
    pub fn is_modifiable(&self) -> bool {
        self.created && self.status == InvoiceStatus::Draft
    }

    /// Unpaid, not cancelled, and past its due date at `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.created
            && !self.status.is_terminal()
            && self.due_date.is_some_and(|due| due < now)
    }

    /// Status as shown to users: `Overdue` replaces Draft/Sent past the due date.
    pub fn effective_status(&self, now: DateTime<Utc>) -> InvoiceStatus {
        if self.is_overdue(now) {
            InvoiceStatus::Overdue
        } else {
            self.status
        }
    }

    /// Amount still owed: the total for open invoices, zero once paid or cancelled.
    pub fn outstanding_amount(&self) -> Decimal {
        if !self.created || self.status.is_terminal() {
            Decimal::ZERO
        } else {
            self.totals.total
        }
    }

    /// Totals recomputed from the current lines; equals [`Invoice::totals`].
    pub fn recalculate(&self) -> InvoiceTotals {
        InvoiceTotals::compute(&self.lines, &self.vat_table)
    }
}

impl AggregateRoot for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateInvoice (as a draft).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateInvoice {
    pub invoice_id: InvoiceId,
    pub customer_id: CustomerId,
    pub number: InvoiceNumber,
    pub lines: Vec<InvoiceLineItem>,
    pub vat_table: VatTable,
    pub due_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddLineItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLineItem {
    pub invoice_id: InvoiceId,
    pub line: InvoiceLineItem,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveLineItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLineItem {
    pub invoice_id: InvoiceId,
    pub job_id: JobId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ClearLineItems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearLineItems {
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateInvoiceDetails. `None` leaves a field unchanged;
/// `clear_notes` removes the notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateInvoiceDetails {
    pub invoice_id: InvoiceId,
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[serde(default)]
    pub clear_notes: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkSent. Re-sending a sent invoice is allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkSent {
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RegisterPayment. `occurred_at` becomes the paid date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterPayment {
    pub invoice_id: InvoiceId,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelInvoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelInvoice {
    pub invoice_id: InvoiceId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceCommand {
    CreateInvoice(CreateInvoice),
    AddLineItem(AddLineItem),
    RemoveLineItem(RemoveLineItem),
    ClearLineItems(ClearLineItems),
    UpdateInvoiceDetails(UpdateInvoiceDetails),
    MarkSent(MarkSent),
    RegisterPayment(RegisterPayment),
    CancelInvoice(CancelInvoice),
}

/// Event: InvoiceCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCreated {
    pub invoice_id: InvoiceId,
    pub customer_id: CustomerId,
    pub number: InvoiceNumber,
    pub lines: Vec<InvoiceLineItem>,
    pub vat_table: VatTable,
    pub totals: InvoiceTotals,
    pub due_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineItemAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemAdded {
    pub invoice_id: InvoiceId,
    pub line: InvoiceLineItem,
    pub totals: InvoiceTotals,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineItemRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemRemoved {
    pub invoice_id: InvoiceId,
    pub job_id: JobId,
    pub totals: InvoiceTotals,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineItemsCleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemsCleared {
    pub invoice_id: InvoiceId,
    pub job_ids: Vec<JobId>,
    pub totals: InvoiceTotals,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceDetailsUpdated. Carries the resulting values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDetailsUpdated {
    pub invoice_id: InvoiceId,
    pub due_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceSent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSent {
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoicePaid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicePaid {
    pub invoice_id: InvoiceId,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub amount: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceCancelled. Lists the jobs to hand back to the eligible pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCancelled {
    pub invoice_id: InvoiceId,
    pub reason: Option<String>,
    pub released_job_ids: Vec<JobId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceEvent {
    InvoiceCreated(InvoiceCreated),
    LineItemAdded(LineItemAdded),
    LineItemRemoved(LineItemRemoved),
    LineItemsCleared(LineItemsCleared),
    InvoiceDetailsUpdated(InvoiceDetailsUpdated),
    InvoiceSent(InvoiceSent),
    InvoicePaid(InvoicePaid),
    InvoiceCancelled(InvoiceCancelled),
}

impl Event for InvoiceEvent {
    const AGGREGATE_TYPE: &'static str = "invoicing.invoice";

    fn event_type(&self) -> &'static str {
        match self {
            InvoiceEvent::InvoiceCreated(_) => "invoicing.invoice.created",
            InvoiceEvent::LineItemAdded(_) => "invoicing.invoice.line_added",
            InvoiceEvent::LineItemRemoved(_) => "invoicing.invoice.line_removed",
            InvoiceEvent::LineItemsCleared(_) => "invoicing.invoice.lines_cleared",
            InvoiceEvent::InvoiceDetailsUpdated(_) => "invoicing.invoice.details_updated",
            InvoiceEvent::InvoiceSent(_) => "invoicing.invoice.sent",
            InvoiceEvent::InvoicePaid(_) => "invoicing.invoice.paid",
            InvoiceEvent::InvoiceCancelled(_) => "invoicing.invoice.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn aggregate_id(&self) -> String {
        let id = match self {
            InvoiceEvent::InvoiceCreated(e) => e.invoice_id,
            InvoiceEvent::LineItemAdded(e) => e.invoice_id,
            InvoiceEvent::LineItemRemoved(e) => e.invoice_id,
            InvoiceEvent::LineItemsCleared(e) => e.invoice_id,
            InvoiceEvent::InvoiceDetailsUpdated(e) => e.invoice_id,
            InvoiceEvent::InvoiceSent(e) => e.invoice_id,
            InvoiceEvent::InvoicePaid(e) => e.invoice_id,
            InvoiceEvent::InvoiceCancelled(e) => e.invoice_id,
        };
        id.to_string()
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InvoiceEvent::InvoiceCreated(e) => e.occurred_at,
            InvoiceEvent::LineItemAdded(e) => e.occurred_at,
            InvoiceEvent::LineItemRemoved(e) => e.occurred_at,
            InvoiceEvent::LineItemsCleared(e) => e.occurred_at,
            InvoiceEvent::InvoiceDetailsUpdated(e) => e.occurred_at,
            InvoiceEvent::InvoiceSent(e) => e.occurred_at,
            InvoiceEvent::InvoicePaid(e) => e.occurred_at,
            InvoiceEvent::InvoiceCancelled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Invoice {
    type Command = InvoiceCommand;
    type Event = InvoiceEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            InvoiceEvent::InvoiceCreated(e) => {
                self.id = e.invoice_id;
                self.customer_id = Some(e.customer_id);
                self.number = Some(e.number);
                self.lines = e.lines.clone();
                self.vat_table = e.vat_table.clone();
                self.totals = e.totals;
                self.created_date = Some(e.occurred_at);
                self.due_date = Some(e.due_date);
                self.notes = e.notes.clone();
                self.status = InvoiceStatus::Draft;
                self.created = true;
            }
            InvoiceEvent::LineItemAdded(e) => {
                self.lines.push(e.line.clone());
                self.totals = e.totals;
            }
            InvoiceEvent::LineItemRemoved(e) => {
                self.lines.retain(|l| l.job_id != e.job_id);
                self.totals = e.totals;
            }
            InvoiceEvent::LineItemsCleared(e) => {
                self.lines.clear();
                self.totals = e.totals;
            }
            InvoiceEvent::InvoiceDetailsUpdated(e) => {
                self.due_date = Some(e.due_date);
                self.notes = e.notes.clone();
            }
            InvoiceEvent::InvoiceSent(e) => {
                self.status = InvoiceStatus::Sent;
                self.sent_date.get_or_insert(e.occurred_at);
                self.last_sent_date = Some(e.occurred_at);
                self.send_count += 1;
            }
            InvoiceEvent::InvoicePaid(e) => {
                self.status = InvoiceStatus::Paid;
                self.paid_date = Some(e.occurred_at);
                self.payment_method = Some(e.method);
                self.payment_reference = e.reference.clone();
            }
            InvoiceEvent::InvoiceCancelled(e) => {
                self.status = InvoiceStatus::Cancelled;
                self.cancelled_date = Some(e.occurred_at);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            InvoiceCommand::CreateInvoice(cmd) => self.handle_create(cmd),
            InvoiceCommand::AddLineItem(cmd) => self.handle_add_line(cmd),
            InvoiceCommand::RemoveLineItem(cmd) => self.handle_remove_line(cmd),
            InvoiceCommand::ClearLineItems(cmd) => self.handle_clear_lines(cmd),
            InvoiceCommand::UpdateInvoiceDetails(cmd) => self.handle_update_details(cmd),
            InvoiceCommand::MarkSent(cmd) => self.handle_mark_sent(cmd),
            InvoiceCommand::RegisterPayment(cmd) => self.handle_register_payment(cmd),
            InvoiceCommand::CancelInvoice(cmd) => self.handle_cancel(cmd),
        }
    }
}

fn validate_line(invoice_id: InvoiceId, line: &InvoiceLineItem) -> Result<(), DomainError> {
    if line.invoice_id != invoice_id {
        return Err(DomainError::invariant(format!(
            "line for job {} belongs to invoice {}",
            line.job_id, line.invoice_id
        )));
    }
    if line.quantity != 1 {
        return Err(DomainError::field_validation(
            "quantity",
            "a job is billed as exactly one unit",
        ));
    }
    if line.unit_price <= Decimal::ZERO {
        return Err(DomainError::field_validation(
            "unit_price",
            "unit price must be positive",
        ));
    }
    if !is_whole_cents(line.unit_price) {
        return Err(DomainError::field_validation(
            "unit_price",
            format!("unit price {} has fractions of a cent", line.unit_price),
        ));
    }
    Ok(())
}

impl Invoice {
    fn ensure_created(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found("invoice", self.id));
        }
        Ok(())
    }

    fn ensure_invoice_id(&self, invoice_id: InvoiceId) -> Result<(), DomainError> {
        if self.id != invoice_id {
            return Err(DomainError::invariant("invoice_id mismatch"));
        }
        Ok(())
    }

    fn ensure_draft(&self) -> Result<(), DomainError> {
        if self.status != InvoiceStatus::Draft {
            return Err(DomainError::invalid_state(format!(
                "invoice {} is {:?}; only draft invoices can be edited",
                self.display_ref(),
                self.status
            )));
        }
        Ok(())
    }

    fn ensure_open(&self, action: &str) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::invalid_state(format!(
                "cannot {action} invoice {}: it is {:?}",
                self.display_ref(),
                self.status
            )));
        }
        Ok(())
    }

    fn display_ref(&self) -> String {
        match self.number {
            Some(number) => number.to_string(),
            None => self.id.to_string(),
        }
    }

    fn handle_create(&self, cmd: &CreateInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("invoice already exists"));
        }

        if cmd.lines.is_empty() {
            return Err(DomainError::field_validation(
                "lines",
                "cannot create invoice without lines",
            ));
        }

        for (idx, line) in cmd.lines.iter().enumerate() {
            validate_line(cmd.invoice_id, line)?;
            if cmd.lines[..idx].iter().any(|l| l.same_identity_as(line)) {
                return Err(DomainError::field_validation(
                    "lines",
                    format!("job {} appears more than once", line.job_id),
                ));
            }
        }

        if cmd.due_date.date_naive() < cmd.occurred_at.date_naive() {
            return Err(DomainError::field_validation(
                "due_date",
                "due date must not precede the invoice date",
            ));
        }

        let totals = InvoiceTotals::compute(&cmd.lines, &cmd.vat_table);

        Ok(vec![InvoiceEvent::InvoiceCreated(InvoiceCreated {
            invoice_id: cmd.invoice_id,
            customer_id: cmd.customer_id,
            number: cmd.number,
            lines: cmd.lines.clone(),
            vat_table: cmd.vat_table.clone(),
            totals,
            due_date: cmd.due_date,
            notes: cmd.notes.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_line(&self, cmd: &AddLineItem) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_invoice_id(cmd.invoice_id)?;
        self.ensure_draft()?;
        validate_line(self.id, &cmd.line)?;

        if self.lines.iter().any(|l| l.same_identity_as(&cmd.line)) {
            return Err(DomainError::field_validation(
                "job_id",
                format!("job {} is already on this invoice", cmd.line.job_id),
            ));
        }

        let mut lines = self.lines.clone();
        lines.push(cmd.line.clone());
        let totals = InvoiceTotals::compute(&lines, &self.vat_table);

        Ok(vec![InvoiceEvent::LineItemAdded(LineItemAdded {
            invoice_id: cmd.invoice_id,
            line: cmd.line.clone(),
            totals,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_line(&self, cmd: &RemoveLineItem) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_invoice_id(cmd.invoice_id)?;
        self.ensure_draft()?;

        if !self.lines.iter().any(|l| l.job_id == cmd.job_id) {
            return Err(DomainError::not_found("invoice line for job", cmd.job_id));
        }

        let lines: Vec<_> = self
            .lines
            .iter()
            .filter(|l| l.job_id != cmd.job_id)
            .cloned()
            .collect();
        let totals = InvoiceTotals::compute(&lines, &self.vat_table);

        Ok(vec![InvoiceEvent::LineItemRemoved(LineItemRemoved {
            invoice_id: cmd.invoice_id,
            job_id: cmd.job_id,
            totals,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_clear_lines(&self, cmd: &ClearLineItems) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_invoice_id(cmd.invoice_id)?;
        self.ensure_draft()?;

        Ok(vec![InvoiceEvent::LineItemsCleared(LineItemsCleared {
            invoice_id: cmd.invoice_id,
            job_ids: self.job_ids(),
            totals: InvoiceTotals::zero(&self.vat_table),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_details(
        &self,
        cmd: &UpdateInvoiceDetails,
    ) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_invoice_id(cmd.invoice_id)?;
        self.ensure_draft()?;

        if cmd.clear_notes && cmd.notes.is_some() {
            return Err(DomainError::field_validation(
                "notes",
                "cannot set and clear notes in one update",
            ));
        }

        let due_date = match (cmd.due_date, self.due_date) {
            (Some(due), _) | (None, Some(due)) => due,
            (None, None) => return Err(DomainError::invariant("invoice has no due date")),
        };
        if let Some(created) = self.created_date {
            if due_date.date_naive() < created.date_naive() {
                return Err(DomainError::field_validation(
                    "due_date",
                    "due date must not precede the invoice date",
                ));
            }
        }

        Ok(vec![InvoiceEvent::InvoiceDetailsUpdated(InvoiceDetailsUpdated {
            invoice_id: cmd.invoice_id,
            due_date,
            notes: if cmd.clear_notes {
                None
            } else {
                cmd.notes.clone().or_else(|| self.notes.clone())
            },
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_mark_sent(&self, cmd: &MarkSent) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_invoice_id(cmd.invoice_id)?;

        if !matches!(self.status, InvoiceStatus::Draft | InvoiceStatus::Sent) {
            return Err(DomainError::invalid_state(format!(
                "cannot send invoice {}: it is {:?}",
                self.display_ref(),
                self.status
            )));
        }
        if self.lines.is_empty() {
            return Err(DomainError::field_validation(
                "lines",
                "cannot send an invoice without lines",
            ));
        }

        Ok(vec![InvoiceEvent::InvoiceSent(InvoiceSent {
            invoice_id: cmd.invoice_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_register_payment(
        &self,
        cmd: &RegisterPayment,
    ) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_invoice_id(cmd.invoice_id)?;
        self.ensure_open("pay")?;

        Ok(vec![InvoiceEvent::InvoicePaid(InvoicePaid {
            invoice_id: cmd.invoice_id,
            method: cmd.method,
            reference: cmd
                .reference
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
            amount: self.totals.total,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelInvoice) -> Result<Vec<InvoiceEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_invoice_id(cmd.invoice_id)?;
        self.ensure_open("cancel")?;

        Ok(vec![InvoiceEvent::InvoiceCancelled(InvoiceCancelled {
            invoice_id: cmd.invoice_id,
            reason: cmd.reason.clone(),
            released_job_ids: self.job_ids(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
