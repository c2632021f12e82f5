//! Invoice numbers: `INV-{yyyy}-{nnnn}`.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use jobledger_core::{DomainError, DomainResult, ValueObject};

const PREFIX: &str = "INV";
const MAX_SEQUENCE: u32 = 9999;

/// Invoice number, unique per year and monotonically increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InvoiceNumber {
    year: i32,
    sequence: u32,
}

impl InvoiceNumber {
    pub fn new(year: i32, sequence: u32) -> DomainResult<Self> {
        if !(1000..=9999).contains(&year) {
            return Err(DomainError::field_validation(
                "number",
                format!("invoice year must have four digits, got {year}"),
            ));
        }
        if sequence == 0 || sequence > MAX_SEQUENCE {
            return Err(DomainError::field_validation(
                "number",
                format!("invoice sequence must be between 1 and {MAX_SEQUENCE}, got {sequence}"),
            ));
        }
        Ok(Self { year, sequence })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Next number for `year` given every number already issued.
    ///
    /// Numbers from other years are ignored; the first number of a year is
    /// sequence 1.
    pub fn next_for_year<'a>(
        year: i32,
        existing: impl IntoIterator<Item = &'a InvoiceNumber>,
    ) -> DomainResult<Self> {
        let last = existing
            .into_iter()
            .filter(|n| n.year == year)
            .map(|n| n.sequence)
            .max()
            .unwrap_or(0);
        Self::new(year, last + 1)
    }
}

impl ValueObject for InvoiceNumber {}

impl core::fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{PREFIX}-{:04}-{:04}", self.year, self.sequence)
    }
}

impl FromStr for InvoiceNumber {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || DomainError::field_validation("number", format!("malformed invoice number '{s}'"));

        let mut parts = s.split('-');
        let (Some(prefix), Some(year), Some(sequence), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };
        let all_digits = |p: &str, len: usize| p.len() == len && p.bytes().all(|b| b.is_ascii_digit());
        if prefix != PREFIX || !all_digits(year, 4) || !all_digits(sequence, 4) {
            return Err(malformed());
        }

        let year = year.parse().map_err(|_| malformed())?;
        let sequence = sequence.parse().map_err(|_| malformed())?;
        Self::new(year, sequence)
    }
}

impl TryFrom<String> for InvoiceNumber {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InvoiceNumber> for String {
    fn from(value: InvoiceNumber) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(s: &str) -> InvoiceNumber {
        s.parse().unwrap()
    }

    #[test]
    fn formats_with_zero_padding() {
        assert_eq!(InvoiceNumber::new(2025, 7).unwrap().to_string(), "INV-2025-0007");
    }

    #[test]
    fn next_number_is_max_plus_one() {
        let existing = [number("INV-2025-0001"), number("INV-2025-0004")];
        let next = InvoiceNumber::next_for_year(2025, &existing).unwrap();
        assert_eq!(next.to_string(), "INV-2025-0005");
    }

    #[test]
    fn other_years_do_not_count() {
        let existing = [number("INV-2024-0042"), number("INV-2026-0003")];
        let next = InvoiceNumber::next_for_year(2025, &existing).unwrap();
        assert_eq!(next.to_string(), "INV-2025-0001");
    }

    #[test]
    fn sequence_overflow_is_rejected() {
        let existing = [number("INV-2025-9999")];
        assert!(InvoiceNumber::next_for_year(2025, &existing).is_err());
    }

    #[test]
    fn malformed_numbers_do_not_parse() {
        for bad in ["INV-25-0001", "INV-2025-1", "BILL-2025-0001", "INV-2025-0001-2", "INV-2025-0000", ""] {
            let err = bad.parse::<InvoiceNumber>().unwrap_err();
            assert_eq!(err.field(), Some("number"), "{bad}");
        }
    }

    #[test]
    fn serializes_as_formatted_string() {
        let n = number("INV-2025-0012");
        assert_eq!(serde_json::to_string(&n).unwrap(), "\"INV-2025-0012\"");
        assert_eq!(serde_json::from_str::<InvoiceNumber>("\"INV-2025-0012\"").unwrap(), n);
    }
}
