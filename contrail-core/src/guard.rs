use crate::{LedgerError, LedgerResult};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex;

tokio::task_local! {
    /// Guards whose operation the current task is running.
    static ADMITTED: Vec<u64>;
}

static NEXT_GUARD_ID: AtomicU64 = AtomicU64::new(0);

/// Runs ledger operations one at a time and rejects nested entry into the
/// operations that call out to the token ledger.
///
/// Independent callers queue on [`ReentrancyGuard::serialize`] and never see
/// each other's in-flight state. A call made from inside a running operation
/// on the same task (a token callback) is nested: it runs on the outer
/// call's turn, and [`ReentrancyGuard::enter`] refuses it if the outer call
/// is a guarded one. Callbacks must stay on the calling task; a callback
/// spawned onto another task waits for a turn that never comes.
#[derive(Debug)]
pub struct ReentrancyGuard {
    id: u64,
    turn: Mutex<()>,
    entered: AtomicBool,
}

/// Proof that the guard is held.
#[must_use = "the guard is released as soon as this value is dropped"]
#[derive(Debug)]
pub struct Entered<'a> {
    flag: &'a AtomicBool,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self {
            id: NEXT_GUARD_ID.fetch_add(1, Ordering::Relaxed),
            turn: Mutex::new(()),
            entered: AtomicBool::new(false),
        }
    }

    /// Whether the current task is already inside an operation of this guard.
    pub fn is_nested(&self) -> bool {
        ADMITTED
            .try_with(|admitted| admitted.contains(&self.id))
            .unwrap_or(false)
    }

    /// Run `operation` once every earlier operation has finished.
    pub async fn serialize<F: Future>(&self, operation: F) -> F::Output {
        if self.is_nested() {
            return operation.await;
        }

        let _turn = self.turn.lock().await;
        let mut admitted = ADMITTED.try_with(Vec::clone).unwrap_or_default();
        admitted.push(self.id);
        ADMITTED.scope(admitted, operation).await
    }

    pub fn enter(&self, operation: &str) -> LedgerResult<Entered<'_>> {
        self.entered
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| {
                tracing::warn!("Rejected re-entrant call into {}", operation);
                LedgerError::Reentrancy(format!(
                    "{} called while a guarded operation is in progress",
                    operation
                ))
            })?;

        Ok(Entered { flag: &self.entered })
    }

    pub fn is_entered(&self) -> bool {
        self.entered.load(Ordering::SeqCst)
    }
}

impl Default for ReentrancyGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
