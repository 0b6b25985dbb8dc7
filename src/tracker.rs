// ABOUTME: Per-session correlation of client sequence numbers with in-flight backend calls
// ABOUTME: Rejects duplicates, exposes the earliest deadline and expires overdue requests

use crate::datatypes::CommandId;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// A request that is waiting on the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub sequence_number: u32,
    pub command_id: CommandId,
    pub issued_at: Instant,
    pub deadline: Instant,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    #[error("sequence_number {0} is already pending")]
    Duplicate(u32),
}

/// Outstanding requests of one session, keyed by the client's sequence_number.
#[derive(Debug)]
pub struct CorrelationTracker {
    pending: HashMap<u32, PendingRequest>,
    timeout: Duration,
}

impl CorrelationTracker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            timeout,
        }
    }

    /// Record a request issued at `now`. Fails if the sequence number is
    /// already outstanding; the existing entry is left untouched.
    pub fn track(
        &mut self,
        sequence_number: u32,
        command_id: CommandId,
        now: Instant,
    ) -> Result<&PendingRequest, TrackerError> {
        use std::collections::hash_map::Entry;

        match self.pending.entry(sequence_number) {
            Entry::Occupied(_) => Err(TrackerError::Duplicate(sequence_number)),
            Entry::Vacant(slot) => Ok(slot.insert(PendingRequest {
                sequence_number,
                command_id,
                issued_at: now,
                deadline: now + self.timeout,
            })),
        }
    }

    /// Remove and return the entry for a finished call. `None` means the
    /// request already expired (or never existed) and the result is stale.
    pub fn complete(&mut self, sequence_number: u32) -> Option<PendingRequest> {
        self.pending.remove(&sequence_number)
    }

    /// Remove and return every request whose deadline is at or before `now`,
    /// oldest first.
    pub fn expire(&mut self, now: Instant) -> Vec<PendingRequest> {
        let overdue: Vec<u32> = self
            .pending
            .values()
            .filter(|request| request.deadline <= now)
            .map(|request| request.sequence_number)
            .collect();

        let mut expired: Vec<PendingRequest> = overdue
            .into_iter()
            .filter_map(|sequence_number| self.pending.remove(&sequence_number))
            .collect();
        expired.sort_by_key(|request| request.issued_at);
        expired
    }

    /// Earliest deadline among outstanding requests
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|request| request.deadline).min()
    }

    pub fn is_pending(&self, sequence_number: u32) -> bool {
        self.pending.contains_key(&sequence_number)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Forget everything; results still in flight will be discarded.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_sequence_is_rejected_while_pending() {
        let now = Instant::now();
        let mut tracker = CorrelationTracker::new(Duration::from_secs(5));

        tracker.track(7, CommandId::SubmitSm, now).unwrap();
        assert_eq!(
            tracker.track(7, CommandId::SubmitSm, now),
            Err(TrackerError::Duplicate(7))
        );
        assert_eq!(tracker.len(), 1);

        // Reusable once completed
        assert!(tracker.complete(7).is_some());
        assert!(tracker.track(7, CommandId::SubmitSm, now).is_ok());
    }

    #[test]
    fn expire_removes_only_overdue_entries() {
        let start = Instant::now();
        let mut tracker = CorrelationTracker::new(Duration::from_secs(5));

        tracker.track(1, CommandId::SubmitSm, start).unwrap();
        tracker
            .track(2, CommandId::SubmitSm, start + Duration::from_secs(3))
            .unwrap();

        assert!(tracker.expire(start + Duration::from_secs(4)).is_empty());
        assert_eq!(
            tracker.next_deadline(),
            Some(start + Duration::from_secs(5))
        );

        let expired = tracker.expire(start + Duration::from_secs(5));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].sequence_number, 1);
        assert!(!tracker.is_pending(1));
        assert!(tracker.is_pending(2));

        // A completion arriving after expiry is stale
        assert!(tracker.complete(1).is_none());
    }

    #[test]
    fn empty_tracker_has_no_deadline() {
        let mut tracker = CorrelationTracker::new(Duration::from_secs(1));
        assert!(tracker.next_deadline().is_none());

        tracker.track(3, CommandId::SubmitSm, Instant::now()).unwrap();
        tracker.clear();
        assert!(tracker.is_empty());
    }
}
