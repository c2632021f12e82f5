//! Invoicing-eligibility gate.
//!
//! A batch of jobs is all-or-nothing: one ineligible job rejects the batch.

use jobledger_core::{CustomerId, DomainError, DomainResult};
use jobledger_jobs::{Job, JobStatus};

/// Completed and not yet invoiced.
pub fn can_be_invoiced(job: &Job) -> bool {
    job.can_be_invoiced()
}

/// True only for a non-empty batch in which every job is eligible.
pub fn can_all_be_invoiced<'a>(jobs: impl IntoIterator<Item = &'a Job>) -> bool {
    let mut any = false;
    for job in jobs {
        if !can_be_invoiced(job) {
            return false;
        }
        any = true;
    }
    any
}

/// Explain why `job` cannot be invoiced, if it cannot.
pub fn ineligibility_reason(job: &Job) -> Option<String> {
    if !job.is_created() {
        return Some(format!("job {} does not exist", job.id_typed()));
    }
    if let Some(invoice_id) = job.invoice_id() {
        return Some(format!(
            "job {} is already invoiced on {invoice_id}",
            job.id_typed()
        ));
    }
    if job.status() != JobStatus::Completed {
        return Some(format!(
            "job {} is {:?}, not completed",
            job.id_typed(),
            job.status()
        ));
    }
    None
}

/// Batch gate for attaching `jobs` to an invoice of `customer_id`.
///
/// An empty batch is a validation failure; an ineligible job or one billed to
/// another customer is an eligibility failure naming the first offender.
pub fn ensure_all_eligible(jobs: &[Job], customer_id: CustomerId) -> DomainResult<()> {
    if jobs.is_empty() {
        return Err(DomainError::field_validation(
            "job_ids",
            "at least one eligible job is required",
        ));
    }

    for job in jobs {
        if let Some(reason) = ineligibility_reason(job) {
            return Err(DomainError::eligibility(reason));
        }
        if job.customer_id() != Some(customer_id) {
            return Err(DomainError::eligibility(format!(
                "job {} belongs to another customer",
                job.id_typed()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use jobledger_core::{Aggregate, AggregateId, ErrorKind, InvoiceId};
    use jobledger_jobs::{
        CompleteJob, CreateJob, JobCommand, JobId, JobType, MarkInvoiced,
    };
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn new_job(customer_id: CustomerId) -> Job {
        let job_id = JobId::new(AggregateId::new());
        let mut job = Job::empty(job_id);
        job.execute(&JobCommand::CreateJob(CreateJob {
            job_id,
            customer_id,
            job_type: JobType::Delivery,
            title: String::new(),
            address: "1 Quay Street".to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            end_date: None,
            price: dec!(30),
            occurred_at: Utc::now(),
        }))
        .unwrap();
        job
    }

    fn complete(job: &mut Job) {
        let job_id = job.id_typed();
        job.execute(&JobCommand::CompleteJob(CompleteJob {
            job_id,
            end_date: None,
            occurred_at: Utc::now(),
        }))
        .unwrap();
    }

    fn invoice(job: &mut Job) {
        let job_id = job.id_typed();
        job.execute(&JobCommand::MarkInvoiced(MarkInvoiced {
            job_id,
            invoice_id: InvoiceId::new(),
            occurred_at: Utc::now(),
        }))
        .unwrap();
    }

    #[test]
    fn empty_batch_is_never_eligible() {
        assert!(!can_all_be_invoiced(&Vec::<Job>::new()));
        let err = ensure_all_eligible(&[], CustomerId::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn one_ineligible_job_fails_the_batch() {
        let customer = CustomerId::new();
        let mut done = new_job(customer);
        complete(&mut done);
        let pending = new_job(customer);

        assert!(can_all_be_invoiced([&done]));
        assert!(!can_all_be_invoiced([&done, &pending]));

        let err = ensure_all_eligible(&[done, pending.clone()], customer).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Eligibility);
        assert!(err.to_string().contains(&pending.id_typed().to_string()));
    }

    #[test]
    fn jobs_of_another_customer_are_rejected() {
        let mut job = new_job(CustomerId::new());
        complete(&mut job);
        let err = ensure_all_eligible(&[job], CustomerId::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Eligibility);
    }

    #[derive(Debug, Clone, Copy)]
    enum Stage {
        New,
        Completed,
        Invoiced,
    }

    fn arb_stage() -> impl Strategy<Value = Stage> {
        prop_oneof![Just(Stage::New), Just(Stage::Completed), Just(Stage::Invoiced)]
    }

    proptest! {
        /// Property: a single job passes iff it is Completed and not invoiced,
        /// and a batch passes iff it is non-empty and every job passes.
        #[test]
        fn gate_is_conjunction_of_individual_checks(
            stages in prop::collection::vec(arb_stage(), 0..6)
        ) {
            let customer = CustomerId::new();
            let jobs: Vec<Job> = stages
                .iter()
                .map(|stage| {
                    let mut job = new_job(customer);
                    match stage {
                        Stage::New => {}
                        Stage::Completed => complete(&mut job),
                        Stage::Invoiced => {
                            complete(&mut job);
                            invoice(&mut job);
                        }
                    }
                    job
                })
                .collect();

            for (job, stage) in jobs.iter().zip(&stages) {
                prop_assert_eq!(can_be_invoiced(job), matches!(stage, Stage::Completed));
            }

            let expected = !stages.is_empty() && stages.iter().all(|s| matches!(s, Stage::Completed));
            prop_assert_eq!(can_all_be_invoiced(&jobs), expected);
            prop_assert_eq!(ensure_all_eligible(&jobs, customer).is_ok(), expected);
        }
    }
}
