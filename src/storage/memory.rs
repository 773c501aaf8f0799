use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::LedgerError;

use super::{LedgerStore, PersistedState, Result};

#[derive(Debug, Default)]
struct MemoryInner {
    state: Option<PersistedState>,
    unreachable: bool,
    saves: usize,
}

/// In-process store. Clones share the same backing state, so a test can keep a
/// handle after moving another into a ledger.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: PersistedState) -> Self {
        let store = Self::new();
        store.lock().state = Some(state);
        store
    }

    /// Makes every subsequent load/save/clear fail until reset.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    pub fn stored_state(&self) -> Option<PersistedState> {
        self.lock().state.clone()
    }

    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_reachable(inner: &MemoryInner) -> Result<()> {
        if inner.unreachable {
            return Err(LedgerError::Persistence("memory store unreachable".into()));
        }
        Ok(())
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self) -> Result<Option<PersistedState>> {
        let inner = self.lock();
        Self::check_reachable(&inner)?;
        Ok(inner.state.clone())
    }

    fn save(&mut self, state: &PersistedState) -> Result<()> {
        let mut inner = self.lock();
        Self::check_reachable(&inner)?;
        inner.state = Some(state.clone());
        inner.saves += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        let mut inner = self.lock();
        Self::check_reachable(&inner)?;
        inner.state = None;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory store".into()
    }
}
