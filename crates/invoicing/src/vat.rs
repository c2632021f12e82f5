//! VAT rates, the job-type rate table, and invoice totals.
//!
//! An invoice carries a single VAT rate. It is picked from the line items'
//! job types: the type with the most lines wins, ties going to the type that
//! appears first. An invoice without lines uses the lowest configured rate.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use jobledger_core::money::percent_of;
use jobledger_core::{DomainError, DomainResult, ValueObject};
use jobledger_jobs::JobType;

use crate::line_item::InvoiceLineItem;

/// VAT percentage in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct VatRate(Decimal);

impl VatRate {
    pub fn new(percent: Decimal) -> DomainResult<Self> {
        if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            return Err(DomainError::field_validation(
                "vat_rate",
                format!("VAT rate must be between 0 and 100, got {percent}"),
            ));
        }
        Ok(Self(percent.normalize()))
    }

    pub fn percent(self) -> Decimal {
        self.0
    }

    /// VAT due on `amount`, rounded to cents.
    pub fn apply_to(self, amount: Decimal) -> Decimal {
        percent_of(amount, self.0)
    }
}

impl ValueObject for VatRate {}

impl TryFrom<Decimal> for VatRate {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VatRate> for Decimal {
    fn from(value: VatRate) -> Self {
        value.0
    }
}

impl core::fmt::Display for VatRate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Job type → VAT rate configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatTable {
    rates: BTreeMap<JobType, VatRate>,
}

impl VatTable {
    /// Rentals at `low`, everything else at `standard`.
    pub fn new(low: VatRate, standard: VatRate) -> Self {
        let rates = JobType::ALL
            .into_iter()
            .map(|job_type| {
                let rate = match job_type {
                    JobType::Rental => low,
                    JobType::Delivery | JobType::Service => standard,
                };
                (job_type, rate)
            })
            .collect();
        Self { rates }
    }

    pub fn with_rate(mut self, job_type: JobType, rate: VatRate) -> Self {
        self.rates.insert(job_type, rate);
        self
    }

    pub fn rate_for(&self, job_type: JobType) -> VatRate {
        self.rates
            .get(&job_type)
            .copied()
            .unwrap_or_else(|| self.lowest())
    }

    pub fn lowest(&self) -> VatRate {
        self.rates
            .values()
            .copied()
            .min()
            .unwrap_or(VatRate(Decimal::ZERO))
    }

    /// The single rate for an invoice with these lines.
    pub fn resolve(&self, lines: &[InvoiceLineItem]) -> VatRate {
        match dominant_job_type(lines) {
            Some(job_type) => self.rate_for(job_type),
            None => self.lowest(),
        }
    }
}

impl Default for VatTable {
    /// 7% for rentals, 19% otherwise.
    fn default() -> Self {
        Self::new(VatRate(Decimal::from(7)), VatRate(Decimal::from(19)))
    }
}

/// Most frequent job type among `lines`; ties go to the first one seen.
pub fn dominant_job_type(lines: &[InvoiceLineItem]) -> Option<JobType> {
    // (type, count) in first-seen order
    let mut counts: Vec<(JobType, usize)> = Vec::new();
    for line in lines {
        match counts.iter_mut().find(|(t, _)| *t == line.job_type) {
            Some((_, n)) => *n += 1,
            None => counts.push((line.job_type, 1)),
        }
    }

    let mut best: Option<(JobType, usize)> = None;
    for (job_type, count) in counts {
        if best.is_none_or(|(_, n)| count > n) {
            best = Some((job_type, count));
        }
    }
    best.map(|(job_type, _)| job_type)
}

/// Subtotal, VAT and total of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub vat_rate: VatRate,
    pub vat_amount: Decimal,
    pub total: Decimal,
}

impl InvoiceTotals {
    pub fn compute(lines: &[InvoiceLineItem], table: &VatTable) -> Self {
        if lines.is_empty() {
            return Self::zero(table);
        }

        // Lines hold whole cents, so the sum needs no rounding.
        let subtotal: Decimal = lines.iter().map(InvoiceLineItem::line_total).sum();
        let vat_rate = table.resolve(lines);
        let vat_amount = vat_rate.apply_to(subtotal);
        Self {
            subtotal,
            vat_rate,
            vat_amount,
            total: subtotal + vat_amount,
        }
    }

    pub fn zero(table: &VatTable) -> Self {
        Self {
            subtotal: Decimal::ZERO,
            vat_rate: table.lowest(),
            vat_amount: Decimal::ZERO,
            total: Decimal::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobledger_core::money::round_money;
    use jobledger_core::{AggregateId, ErrorKind, InvoiceId};
    use jobledger_jobs::JobId;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn line(job_type: JobType, price: Decimal) -> InvoiceLineItem {
        InvoiceLineItem {
            invoice_id: InvoiceId::new(),
            job_id: JobId::new(AggregateId::new()),
            job_type,
            description: String::new(),
            unit_price: price,
            quantity: 1,
        }
    }

    fn rate(percent: Decimal) -> VatRate {
        VatRate::new(percent).unwrap()
    }

    #[test]
    fn rate_outside_range_is_rejected() {
        for bad in [dec!(-1), dec!(100.01)] {
            let err = VatRate::new(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
            assert_eq!(err.field(), Some("vat_rate"));
        }
        assert!(VatRate::new(dec!(0)).is_ok());
        assert!(VatRate::new(dec!(100)).is_ok());
    }

    #[test]
    fn rate_deserialization_is_validated() {
        assert!(serde_json::from_str::<VatRate>("\"19\"").is_ok());
        assert!(serde_json::from_str::<VatRate>("\"150\"").is_err());
    }

    #[test]
    fn standard_rate_example() {
        let lines = vec![
            line(JobType::Service, dec!(100.00)),
            line(JobType::Delivery, dec!(50.00)),
            line(JobType::Service, dec!(25.00)),
        ];
        let totals = InvoiceTotals::compute(&lines, &VatTable::default());
        assert_eq!(totals.subtotal, dec!(175.00));
        assert_eq!(totals.vat_rate, rate(dec!(19)));
        assert_eq!(totals.vat_amount, dec!(33.25));
        assert_eq!(totals.total, dec!(208.25));
    }

    #[test]
    fn empty_invoice_uses_lowest_rate_and_zero_subtotal() {
        let table = VatTable::new(rate(dec!(5)), rate(dec!(20)));
        let totals = InvoiceTotals::compute(&[], &table);
        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::ZERO);
        assert_eq!(totals.vat_rate, rate(dec!(5)));
    }

    #[test]
    fn majority_type_decides_the_rate() {
        let lines = vec![
            line(JobType::Service, dec!(10)),
            line(JobType::Rental, dec!(10)),
            line(JobType::Rental, dec!(10)),
        ];
        assert_eq!(dominant_job_type(&lines), Some(JobType::Rental));
        assert_eq!(VatTable::default().resolve(&lines), rate(dec!(7)));
    }

    #[test]
    fn ties_go_to_first_seen_type() {
        let lines = vec![
            line(JobType::Delivery, dec!(10)),
            line(JobType::Rental, dec!(10)),
        ];
        assert_eq!(dominant_job_type(&lines), Some(JobType::Delivery));

        let reversed: Vec<_> = lines.into_iter().rev().collect();
        assert_eq!(dominant_job_type(&reversed), Some(JobType::Rental));
    }

    #[test]
    fn table_overrides_apply_per_type() {
        let table = VatTable::default().with_rate(JobType::Service, rate(dec!(0)));
        assert_eq!(table.rate_for(JobType::Service), rate(dec!(0)));
        assert_eq!(table.rate_for(JobType::Delivery), rate(dec!(19)));
        assert_eq!(table.lowest(), rate(dec!(0)));
    }

    #[test]
    fn subtotal_is_the_exact_sum_of_lines() {
        let lines = vec![
            line(JobType::Service, dec!(10.01)),
            line(JobType::Service, dec!(10.09)),
            line(JobType::Delivery, dec!(0.5)),
        ];
        let totals = InvoiceTotals::compute(&lines, &VatTable::default());
        let sum: Decimal = lines.iter().map(InvoiceLineItem::line_total).sum();
        assert_eq!(totals.subtotal, sum);
        assert_eq!(totals.subtotal, dec!(20.60));
        assert_eq!(totals.vat_amount, dec!(3.91));
        assert_eq!(totals.total, dec!(24.51));
    }

    fn arb_job_type() -> impl Strategy<Value = JobType> {
        prop_oneof![
            Just(JobType::Rental),
            Just(JobType::Delivery),
            Just(JobType::Service),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: subtotal is the sum of prices and total = subtotal + rounded VAT.
        #[test]
        fn totals_follow_the_formula(
            items in prop::collection::vec((arb_job_type(), 1i64..10_000_000i64), 1..12)
        ) {
            let lines: Vec<_> = items
                .iter()
                .map(|(t, cents)| line(*t, Decimal::new(*cents, 2)))
                .collect();
            let table = VatTable::default();
            let totals = InvoiceTotals::compute(&lines, &table);

            let expected_subtotal: Decimal = items.iter().map(|(_, c)| Decimal::new(*c, 2)).sum();
            prop_assert_eq!(totals.subtotal, expected_subtotal);
            prop_assert_eq!(
                totals.vat_amount,
                round_money(expected_subtotal * totals.vat_rate.percent() / Decimal::ONE_HUNDRED)
            );
            prop_assert_eq!(totals.total, totals.subtotal + totals.vat_amount);
        }
    }
}
