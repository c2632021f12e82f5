//! Job type enumeration and its configuration table.
//!
//! Display names and codes are looked up here and nowhere else; the VAT
//! table in the invoicing crate is keyed by the same enum.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use jobledger_core::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Rental,
    Delivery,
    Service,
}

/// Static per-type attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobTypeInfo {
    pub job_type: JobType,
    /// Stable machine code (matches the serde representation).
    pub code: &'static str,
    /// Human-readable name used in descriptions and listings.
    pub display_name: &'static str,
}

const JOB_TYPE_TABLE: [JobTypeInfo; 3] = [
    JobTypeInfo {
        job_type: JobType::Rental,
        code: "rental",
        display_name: "Rental",
    },
    JobTypeInfo {
        job_type: JobType::Delivery,
        code: "delivery",
        display_name: "Delivery",
    },
    JobTypeInfo {
        job_type: JobType::Service,
        code: "service",
        display_name: "Service",
    },
];

impl JobType {
    pub const ALL: [JobType; 3] = [JobType::Rental, JobType::Delivery, JobType::Service];

    pub fn info(self) -> &'static JobTypeInfo {
        match self {
            JobType::Rental => &JOB_TYPE_TABLE[0],
            JobType::Delivery => &JOB_TYPE_TABLE[1],
            JobType::Service => &JOB_TYPE_TABLE[2],
        }
    }

    pub fn code(self) -> &'static str {
        self.info().code
    }

    pub fn display_name(self) -> &'static str {
        self.info().display_name
    }
}

impl core::fmt::Display for JobType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for JobType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JOB_TYPE_TABLE
            .iter()
            .find(|info| info.code.eq_ignore_ascii_case(s.trim()))
            .map(|info| info.job_type)
            .ok_or_else(|| DomainError::field_validation("job_type", format!("unknown job type '{s}'")))
    }
}
