use crate::storage::{NonceStore, StorageError};
use crate::utils::TimeSource;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::debug;
use std::sync::Arc;

/// Outcome of [`NonceLedger::check_and_record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerDecision {
    /// 首次出现，已记录
    Accepted,
    /// 窗口内已出现过
    Rejected,
}

/// Replay ledger over recently seen nonces.
///
/// Entries older than the expiry window are dropped lazily at the start of
/// each check. The check-then-insert runs inside a single
/// [`NonceStore::transact`] call, so two callers sharing a backing store
/// can never both accept the same nonce.
#[derive(Clone)]
pub struct NonceLedger {
    store: Arc<dyn NonceStore>,
    window_secs: u64,
    clock: Arc<dyn TimeSource>,
}

impl NonceLedger {
    pub fn new(store: Arc<dyn NonceStore>, window_secs: u64, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            store,
            window_secs,
            clock,
        }
    }

    /// 原子地检查并记录 nonce
    pub fn check_and_record(&self, nonce: &[u8]) -> Result<LedgerDecision, StorageError> {
        let key = STANDARD.encode(nonce);
        let now = self.clock.now();
        let window = self.window_secs;

        let accepted = self.store.transact(&mut |entries| {
            let before = entries.len();
            entries.retain(|_, seen_at| now.saturating_sub(*seen_at) <= window);

            if entries.len() != before {
                debug!("Pruned {} expired nonces", before - entries.len());
            }

            if entries.contains_key(&key) {
                return false;
            }

            entries.insert(key.clone(), now);
            true
        })?;

        Ok(if accepted {
            LedgerDecision::Accepted
        } else {
            LedgerDecision::Rejected
        })
    }
}

impl std::fmt::Debug for NonceLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonceLedger")
            .field("window_secs", &self.window_secs)
            .finish_non_exhaustive()
    }
}
