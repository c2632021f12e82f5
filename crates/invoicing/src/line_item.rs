//! Line-item builder: one completed job becomes one billable line.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use jobledger_core::{Entity, InvoiceId, ValueObject};
use jobledger_jobs::{Job, JobId, JobType};

const DATE_FORMAT: &str = "%d/%m/%Y";

/// Service period of a job, rendered `dd/mm/yyyy` or `dd/mm/yyyy - dd/mm/yyyy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

impl ValueObject for DateRange {}

impl core::fmt::Display for DateRange {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.end {
            Some(end) if end != self.start => write!(
                f,
                "{} - {}",
                self.start.format(DATE_FORMAT),
                end.format(DATE_FORMAT)
            ),
            _ => write!(f, "{}", self.start.format(DATE_FORMAT)),
        }
    }
}

/// Billing representation of one job on an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLineItem {
    pub invoice_id: InvoiceId,
    pub job_id: JobId,
    pub job_type: JobType,
    pub description: String,
    pub unit_price: Decimal,
    /// Always 1: one job, one line.
    pub quantity: u32,
}

impl InvoiceLineItem {
    /// Build the line for `job` on `invoice_id`.
    ///
    /// Eligibility is the caller's concern (see [`crate::eligibility`]).
    pub fn from_job(invoice_id: InvoiceId, job: &Job) -> Self {
        Self {
            invoice_id,
            job_id: job.id_typed(),
            job_type: job.job_type(),
            description: describe_job(job),
            unit_price: job.price(),
            quantity: 1,
        }
    }

    pub fn line_total(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }
}

impl Entity for InvoiceLineItem {
    type Id = JobId;

    fn id(&self) -> &Self::Id {
        &self.job_id
    }
}

/// `"[{title} - ]{type} - {address} ({date range})"`.
///
/// The title prefix is only added when it says something the type name does not.
pub fn describe_job(job: &Job) -> String {
    let type_name = job.job_type().display_name();
    let range = DateRange {
        start: job.start_date(),
        end: job.end_date(),
    };
    let body = format!("{type_name} - {} ({range})", job.address());

    let title = job.title().trim();
    if title.is_empty() || title == type_name {
        body
    } else {
        format!("{title} - {body}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jobledger_core::{Aggregate, AggregateId, CustomerId};
    use jobledger_jobs::{CompleteJob, CreateJob, JobCommand};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn completed_job(
        job_type: JobType,
        title: &str,
        start: NaiveDate,
        end: NaiveDate,
        price: Decimal,
    ) -> Job {
        let job_id = JobId::new(AggregateId::new());
        let mut job = Job::empty(job_id);
        job.execute(&JobCommand::CreateJob(CreateJob {
            job_id,
            customer_id: CustomerId::new(),
            job_type,
            title: title.to_string(),
            address: "5 Mill Lane".to_string(),
            start_date: start,
            end_date: None,
            price,
            occurred_at: Utc::now(),
        }))
        .unwrap();
        job.execute(&JobCommand::CompleteJob(CompleteJob {
            job_id,
            end_date: Some(end),
            occurred_at: Utc::now(),
        }))
        .unwrap();
        job
    }

    #[test]
    fn single_day_job_renders_one_date() {
        let job = completed_job(
            JobType::Delivery,
            "Delivery",
            date(2025, 1, 7),
            date(2025, 1, 7),
            dec!(50),
        );
        assert_eq!(describe_job(&job), "Delivery - 5 Mill Lane (07/01/2025)");
    }

    #[test]
    fn multi_day_job_renders_range() {
        let job = completed_job(
            JobType::Rental,
            "",
            date(2025, 1, 7),
            date(2025, 1, 21),
            dec!(100),
        );
        assert_eq!(
            describe_job(&job),
            "Rental - 5 Mill Lane (07/01/2025 - 21/01/2025)"
        );
    }

    #[test]
    fn distinct_title_is_prefixed() {
        let job = completed_job(
            JobType::Service,
            "Boiler repair",
            date(2025, 2, 3),
            date(2025, 2, 3),
            dec!(75),
        );
        assert_eq!(
            describe_job(&job),
            "Boiler repair - Service - 5 Mill Lane (03/02/2025)"
        );
    }

    #[test]
    fn line_uses_job_price_and_quantity_one() {
        let job = completed_job(
            JobType::Rental,
            "",
            date(2025, 1, 1),
            date(2025, 1, 3),
            dec!(42.50),
        );
        let invoice_id = InvoiceId::new();
        let line = InvoiceLineItem::from_job(invoice_id, &job);
        assert_eq!(line.invoice_id, invoice_id);
        assert_eq!(line.job_id, job.id_typed());
        assert_eq!(line.quantity, 1);
        assert_eq!(line.unit_price, dec!(42.50));
        assert_eq!(line.line_total(), dec!(42.50));
        assert_eq!(*Entity::id(&line), job.id_typed());
    }
}
