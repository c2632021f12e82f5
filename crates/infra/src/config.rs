//! Configuration loading and representation.

use core::str::FromStr;
use std::collections::BTreeMap;

use rust_decimal::Decimal;

use jobledger_invoicing::{VatRate, VatTable};
use jobledger_jobs::JobType;

pub const ENV_VAT_LOW_RATE: &str = "JOBLEDGER_VAT_LOW_RATE";
pub const ENV_VAT_STANDARD_RATE: &str = "JOBLEDGER_VAT_STANDARD_RATE";
/// Per-type override prefix, followed by the upper-cased job type code
/// (`JOBLEDGER_VAT_RATE_DELIVERY`). Takes `low`, `standard` or a percentage.
pub const ENV_VAT_RATE_PREFIX: &str = "JOBLEDGER_VAT_RATE_";
pub const ENV_PAYMENT_TERMS_DAYS: &str = "JOBLEDGER_PAYMENT_TERMS_DAYS";
pub const ENV_LOG: &str = "JOBLEDGER_LOG";

/// Longest accepted payment term, about ten years.
pub const MAX_PAYMENT_TERMS_DAYS: u32 = 3650;

/// Invoicing settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoicingConfig {
    /// Rate for rentals.
    pub vat_low_rate: VatRate,
    /// Rate for deliveries and services.
    pub vat_standard_rate: VatRate,
    /// Job types billed at something other than their low/standard default.
    pub vat_type_rates: BTreeMap<JobType, VatRate>,
    /// Days between invoice date and due date.
    pub payment_terms_days: u32,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for InvoicingConfig {
    fn default() -> Self {
        let table = VatTable::default();
        Self {
            vat_low_rate: table.lowest(),
            vat_standard_rate: table.rate_for(JobType::Service),
            vat_type_rates: BTreeMap::new(),
            payment_terms_days: 14,
            log_filter: "info".to_string(),
        }
    }
}

impl InvoicingConfig {
    /// Read settings from the process environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`; invalid values are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let vat_low_rate = parse_or(&lookup, ENV_VAT_LOW_RATE, defaults.vat_low_rate, parse_rate);
        let vat_standard_rate = parse_or(
            &lookup,
            ENV_VAT_STANDARD_RATE,
            defaults.vat_standard_rate,
            parse_rate,
        );
        let vat_type_rates = JobType::ALL
            .into_iter()
            .filter_map(|job_type| {
                let key = format!("{ENV_VAT_RATE_PREFIX}{}", job_type.code().to_uppercase());
                let rate = parse_or(&lookup, &key, None, |s| match s {
                    "low" => Ok(Some(vat_low_rate)),
                    "standard" => Ok(Some(vat_standard_rate)),
                    _ => parse_rate(s).map(Some),
                })?;
                Some((job_type, rate))
            })
            .collect();
        let payment_terms_days = parse_or(
            &lookup,
            ENV_PAYMENT_TERMS_DAYS,
            defaults.payment_terms_days,
            |s| {
                let days = s.parse::<u32>().map_err(|e| e.to_string())?;
                if (1..=MAX_PAYMENT_TERMS_DAYS).contains(&days) {
                    Ok(days)
                } else {
                    Err(format!("must be between 1 and {MAX_PAYMENT_TERMS_DAYS} days"))
                }
            },
        );
        let log_filter = lookup(ENV_LOG)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.log_filter);

        Self {
            vat_low_rate,
            vat_standard_rate,
            vat_type_rates,
            payment_terms_days,
            log_filter,
        }
    }

    pub fn vat_table(&self) -> VatTable {
        self.vat_type_rates.iter().fold(
            VatTable::new(self.vat_low_rate, self.vat_standard_rate),
            |table, (&job_type, &rate)| table.with_rate(job_type, rate),
        )
    }
}

fn parse_rate(s: &str) -> Result<VatRate, String> {
    let percent = Decimal::from_str(s).map_err(|e| e.to_string())?;
    VatRate::new(percent).map_err(|e| e.to_string())
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    parse: impl FnOnce(&str) -> Result<T, String>,
) -> T {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match parse(raw.trim()) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("ignoring invalid {key}={raw:?}: {e}");
            default
        }
    }
}
