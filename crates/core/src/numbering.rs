//! Human-facing document numbers (`ENT-20261019-004`, `PO-202610-012`).
//!
//! A number is `<prefix>-<period>-<sequence>`. The period is the calendar day
//! or month of issue; the sequence restarts at 1 for every `(prefix, period)`
//! pair and is zero-padded to three digits (it keeps growing past 999).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Granularity of the period segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    Monthly,
}

/// How numbers are minted for one kind of document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberingScheme {
    prefix: String,
    period: Period,
}

impl NumberingScheme {
    pub fn new(prefix: impl Into<String>, period: Period) -> DomainResult<Self> {
        let prefix = prefix.into();
        if prefix.trim().is_empty() || prefix.contains('-') {
            return Err(DomainError::validation(
                "numbering prefix must be non-empty and must not contain '-'",
            ));
        }
        Ok(Self { prefix, period })
    }

    pub fn daily(prefix: impl Into<String>) -> DomainResult<Self> {
        Self::new(prefix, Period::Daily)
    }

    pub fn monthly(prefix: impl Into<String>) -> DomainResult<Self> {
        Self::new(prefix, Period::Monthly)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Key of the sequence counter for the period containing `at`.
    pub fn counter_key(&self, at: DateTime<Utc>) -> String {
        let period = match self.period {
            Period::Daily => at.format("%Y%m%d"),
            Period::Monthly => at.format("%Y%m"),
        };
        format!("{}-{}", self.prefix, period)
    }

    /// Number for the `sequence`-th document issued in the period containing `at`.
    pub fn number(&self, at: DateTime<Utc>, sequence: u64) -> DocumentNumber {
        DocumentNumber(format!("{}-{:03}", self.counter_key(at), sequence))
    }
}

/// A minted document number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentNumber(String);

impl DocumentNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
