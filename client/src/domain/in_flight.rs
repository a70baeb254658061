//! Admission and ordering helpers for overlapping operations.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::domain::Error;

/// Holds an in-flight flag for the lifetime of one operation.
///
/// A second [`InFlightGuard::acquire`] on the same flag fails with
/// `Conflict` until the first guard is dropped.
pub(crate) struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    pub(crate) fn acquire(flag: &'a AtomicBool, busy_message: &str) -> Result<Self, Error> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| Error::conflict(busy_message))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Tickets for overlapping refreshes of one list.
///
/// Each refresh takes a ticket before it fetches. Only the holder of the
/// newest ticket may apply its result; older results are discarded.
#[derive(Debug, Default)]
pub(crate) struct RequestSequence(AtomicU64);

impl RequestSequence {
    pub(crate) fn issue(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
    }

    pub(crate) fn is_latest(&self, ticket: u64) -> bool {
        self.0.load(Ordering::Acquire) == ticket
    }
}
