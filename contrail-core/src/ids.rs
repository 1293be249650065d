use crate::{LedgerError, LedgerResult};

/// Hands out monotonically increasing numeric ids for one kind of record.
///
/// Ids are never reused: a record that is later cleared or erased keeps its
/// id slot, and [`IdAllocator::ensure_issued`] still accepts it.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    kind: &'static str,
    next: u64,
}

impl IdAllocator {
    pub fn new(kind: &'static str) -> Self {
        Self { kind, next: 0 }
    }

    /// Returns the id to use and advances the counter.
    pub fn allocate(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Number of ids issued so far.
    pub fn count(&self) -> u64 {
        self.next
    }

    pub fn is_issued(&self, id: u64) -> bool {
        id < self.next
    }

    pub fn ensure_issued(&self, id: u64) -> LedgerResult<()> {
        if self.is_issued(id) {
            Ok(())
        } else {
            Err(LedgerError::NotFound(format!("{} {} (issued: {})", self.kind, id, self.next)))
        }
    }
}
