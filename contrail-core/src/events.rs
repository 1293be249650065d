use chrono::{DateTime, Utc};
use contrail_shared::{EventRecord, LedgerEvent};

/// Append-only record of ledger notifications.
///
/// Records are appended only when a call commits. [`EventLog::rewind`] drops
/// the records of a call whose token callout failed afterwards.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, recorded_at: DateTime<Utc>, event: LedgerEvent) {
        let sequence = self.records.len() as u64;
        self.records.push(EventRecord {
            sequence,
            recorded_at,
            event,
        });
    }

    /// Records with `sequence >= from`, oldest first.
    pub fn since(&self, from: u64) -> &[EventRecord] {
        let start = usize::try_from(from).unwrap_or(usize::MAX).min(self.records.len());
        &self.records[start..]
    }

    /// Drop every record with `sequence >= len`.
    pub fn rewind(&mut self, len: usize) {
        self.records.truncate(len);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&LedgerEvent> {
        self.records.last().map(|r| &r.event)
    }
}
