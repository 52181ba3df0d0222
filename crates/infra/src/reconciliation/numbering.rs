use chrono::{DateTime, Utc};

use stockwise_core::{DocumentNumber, ExpectedVersion, NumberingScheme};

use crate::collections::{COUNTERS, Counter};
use crate::document_store::{DocumentStore, WriteBatch};
use crate::error::ReconcileResult;

/// Reserve the next number of `scheme`'s current period.
///
/// The counter bump is staged into `batch`, guarded by the counter version
/// that was read, so two creations racing for the same number cannot both
/// commit.
pub(crate) async fn reserve_number<S>(
    store: &S,
    scheme: &NumberingScheme,
    at: DateTime<Utc>,
    batch: &mut WriteBatch,
) -> ReconcileResult<DocumentNumber>
where
    S: DocumentStore + ?Sized,
{
    let key = scheme.counter_key(at);
    let (next, expected) = match COUNTERS.get(store, &key).await? {
        Some(counter) => (counter.value.last + 1, counter.expected()),
        None => (1, ExpectedVersion::ABSENT),
    };
    COUNTERS.put(batch, &key, &Counter { last: next }, expected)?;
    Ok(scheme.number(at, next))
}
