//! Invoicing domain module.
//!
//! Line items are derived from completed jobs, totals and the VAT rate are
//! recomputed on every change to the line set, and the invoice moves through
//! Draft → Sent → Paid/Cancelled. Everything here is deterministic domain
//! logic (no IO, no storage).

pub mod eligibility;
pub mod invoice;
pub mod line_item;
pub mod number;
pub mod vat;

pub use eligibility::{can_all_be_invoiced, can_be_invoiced, ensure_all_eligible};
pub use invoice::{
    AddLineItem, CancelInvoice, ClearLineItems, CreateInvoice, Invoice, InvoiceCancelled,
    InvoiceCommand, InvoiceCreated, InvoiceDetailsUpdated, InvoiceEvent, InvoicePaid, InvoiceSent,
    InvoiceStatus, LineItemAdded, LineItemRemoved, LineItemsCleared, MarkSent, PaymentMethod,
    RegisterPayment, RemoveLineItem, UpdateInvoiceDetails,
};
pub use line_item::{DateRange, InvoiceLineItem, describe_job};
pub use number::InvoiceNumber;
pub use vat::{InvoiceTotals, VatRate, VatTable};
