//! Optimistic concurrency expectations for stored documents.

use crate::error::{DomainError, DomainResult};

/// Optimistic concurrency expectation for a document write.
///
/// Document versions start at 1 on first write and grow by one on every
/// overwrite. Version 0 means "no such document", so `Exact(0)` is the
/// precondition for creating a document that must not exist yet.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (single-writer flows, migrations, etc.).
    Any,
    /// Require the document to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    /// Precondition for creating a brand new document.
    pub const ABSENT: ExpectedVersion = ExpectedVersion::Exact(0);

    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}
