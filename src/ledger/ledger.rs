use std::{
    collections::HashSet,
    fmt,
    sync::{mpsc, Arc, Mutex, MutexGuard, RwLock},
};

use serde::{Deserialize, Serialize};

use crate::{
    errors::LedgerError,
    storage::{ensure_schema_support, LedgerStore, PersistedState},
};

use super::{
    seed::{seed_snapshot, seed_snapshot_from},
    snapshot::{LedgerSnapshot, BALANCE_EPSILON},
    subscription::{SubscriberRegistry, Subscription},
    transaction::{Transaction, TransactionId, TransactionInput},
    writer::{Commit, PersistTicket, PersistenceWriter},
};

/// How a persisted balance that disagrees with its transactions is handled on load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalancePolicy {
    /// Keep the stored figure and report the drift.
    #[default]
    TrustStored,
    /// Replace the stored figure with the sum of the transactions.
    Recompute,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerOptions {
    pub balance_policy: BalancePolicy,
}

/// Where the state adopted by [`Ledger::initialize`] came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOrigin {
    Restored,
    Seeded,
    /// The store could not be read; seed data lives in memory only.
    Degraded { reason: String },
    AlreadyInitialized,
}

impl fmt::Display for LoadOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadOrigin::Restored => f.write_str("restored from store"),
            LoadOrigin::Seeded => f.write_str("seeded with example data"),
            LoadOrigin::Degraded { reason } => write!(f, "running without store ({reason})"),
            LoadOrigin::AlreadyInitialized => f.write_str("already initialized"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitReport {
    pub origin: LoadOrigin,
    pub warnings: Vec<String>,
}

#[derive(Debug, Default)]
struct WriteState {
    initialized: bool,
}

/// Authoritative set of transactions and the balance derived from them.
///
/// Mutations are serialised and become visible atomically; persistence happens
/// afterwards on a background writer and is reported through [`Commit`].
pub struct Ledger {
    current: RwLock<Arc<LedgerSnapshot>>,
    writes: Mutex<WriteState>,
    subscribers: Arc<SubscriberRegistry>,
    writer: PersistenceWriter,
    options: LedgerOptions,
}

impl Ledger {
    pub fn new(store: Box<dyn LedgerStore>, options: LedgerOptions) -> Result<Self, LedgerError> {
        let writer = PersistenceWriter::spawn(store)?;
        Ok(Self {
            current: RwLock::new(Arc::new(LedgerSnapshot::empty())),
            writes: Mutex::new(WriteState::default()),
            subscribers: Arc::new(SubscriberRegistry::default()),
            writer,
            options,
        })
    }

    pub fn options(&self) -> LedgerOptions {
        self.options
    }

    pub fn store_description(&self) -> &str {
        self.writer.description()
    }

    /// Restores persisted state, or seeds example data when there is none.
    ///
    /// Mutations issued before this call initialize the ledger implicitly.
    pub fn initialize(&self) -> InitReport {
        let mut writes = self.lock_writes();
        self.initialize_locked(&mut writes)
    }

    pub fn add(&self, input: TransactionInput) -> Result<Commit<TransactionId>, LedgerError> {
        input.validate()?;
        let mut writes = self.lock_writes();
        self.ensure_initialized(&mut writes);

        let (next, id) = self.snapshot().with_added(input)?;
        tracing::debug!(id = id.0, balance = next.balance, "transaction added");
        let ticket = self.publish(next);
        Ok(Commit::new(id, ticket))
    }

    pub fn update(
        &self,
        id: TransactionId,
        input: TransactionInput,
    ) -> Result<Commit<()>, LedgerError> {
        input.validate()?;
        let mut writes = self.lock_writes();
        self.ensure_initialized(&mut writes);

        let (next, previous) = self
            .snapshot()
            .with_replaced(id, input)
            .ok_or(LedgerError::NotFound(id))?;
        tracing::debug!(
            id = id.0,
            previous_amount = previous.amount,
            balance = next.balance,
            "transaction updated"
        );
        let ticket = self.publish(next);
        Ok(Commit::new((), ticket))
    }

    /// Removes `id`. A missing id is a no-op: nothing is published or written.
    pub fn delete(&self, id: TransactionId) -> Commit<Option<Transaction>> {
        let mut writes = self.lock_writes();
        self.ensure_initialized(&mut writes);

        match self.snapshot().with_removed(id) {
            Some((next, removed)) => {
                tracing::debug!(id = id.0, balance = next.balance, "transaction deleted");
                let ticket = self.publish(next);
                Commit::new(Some(removed), ticket)
            }
            None => {
                tracing::debug!(id = id.0, "delete ignored for unknown transaction");
                Commit::new(None, PersistTicket::resolved(Ok(())))
            }
        }
    }

    pub fn get_by_id(&self, id: TransactionId) -> Option<Transaction> {
        self.snapshot().get(id).cloned()
    }

    /// Current state. The returned value never changes; take a new snapshot to observe later commits.
    pub fn snapshot(&self) -> Arc<LedgerSnapshot> {
        let current = self
            .current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&current)
    }

    /// Registers `callback` for every committed change.
    ///
    /// Callbacks run on the mutating thread and must not mutate the ledger.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&LedgerSnapshot) + Send + Sync + 'static,
    {
        self.subscribers
            .register(Arc::new(move |snapshot: &Arc<LedgerSnapshot>| {
                callback(snapshot.as_ref())
            }))
    }

    pub fn subscribe_channel(&self) -> (Subscription, mpsc::Receiver<Arc<LedgerSnapshot>>) {
        let (tx, rx) = mpsc::channel();
        (self.subscribers.register_channel(tx), rx)
    }

    /// Writes the current state and waits for the store.
    pub fn flush(&self) -> Result<(), LedgerError> {
        let mut writes = self.lock_writes();
        self.ensure_initialized(&mut writes);
        let ticket = self
            .writer
            .save(PersistedState::from_snapshot(&self.snapshot()));
        ticket.wait()
    }

    /// `true` while the latest write failed, or nothing reached the store since a degraded start.
    pub fn is_dirty(&self) -> bool {
        self.writer.is_dirty()
    }

    pub fn last_persistence_error(&self) -> Option<String> {
        self.writer.last_error()
    }

    /// Clears the store and starts over from the example data.
    pub fn reset(&self) -> Result<Commit<()>, LedgerError> {
        let mut writes = self.lock_writes();
        self.writer.clear()?;
        writes.initialized = true;

        let seeded = seed_snapshot();
        tracing::info!(
            transactions = seeded.len(),
            balance = seeded.balance,
            "ledger reset to example data"
        );
        let ticket = self.publish(seeded);
        Ok(Commit::new((), ticket))
    }

    /// Replaces the current state with a previously persisted document, such as a backup.
    ///
    /// The document goes through the same checks as a restore at startup; their warnings are
    /// the commit value.
    pub fn restore(&self, state: PersistedState) -> Result<Commit<Vec<String>>, LedgerError> {
        ensure_schema_support(state.schema_version)?;
        let mut writes = self.lock_writes();
        writes.initialized = true;

        let mut snapshot = state.into_snapshot();
        let warnings = reconcile_loaded(&mut snapshot, self.options.balance_policy);
        // Ids handed out since the document was written stay retired.
        snapshot.next_id = snapshot.next_id.max(self.snapshot().next_id);
        for warning in &warnings {
            tracing::warn!(%warning, "restored document warning");
        }
        tracing::info!(
            transactions = snapshot.len(),
            balance = snapshot.balance,
            "ledger restored from document"
        );
        let ticket = self.publish(snapshot);
        Ok(Commit::new(warnings, ticket))
    }

    fn initialize_locked(&self, writes: &mut WriteState) -> InitReport {
        if writes.initialized {
            return InitReport {
                origin: LoadOrigin::AlreadyInitialized,
                warnings: Vec::new(),
            };
        }

        let mut warnings = Vec::new();
        let (snapshot, origin) = match self.writer.load() {
            Ok(Some(persisted)) if !persisted.transactions.is_empty() => {
                let mut snapshot = persisted.into_snapshot();
                warnings.extend(reconcile_loaded(&mut snapshot, self.options.balance_policy));
                (snapshot, LoadOrigin::Restored)
            }
            Ok(persisted) => {
                let start = persisted
                    .map(|state| state.next_id)
                    .filter(|next_id| next_id.0 > 1)
                    .unwrap_or(TransactionId(1));
                match seed_snapshot_from(start) {
                    Ok(snapshot) => {
                        let ticket = self.writer.save(PersistedState::from_snapshot(&snapshot));
                        if let Err(err) = ticket.wait() {
                            warnings.push(format!("example data could not be persisted: {err}"));
                        }
                        (snapshot, LoadOrigin::Seeded)
                    }
                    Err(err) => self.degraded(
                        format!("stored next id {start} leaves no room: {err}"),
                        &mut warnings,
                    ),
                }
            }
            Err(err) => self.degraded(err.to_string(), &mut warnings),
        };

        for warning in &warnings {
            tracing::warn!(%warning, "ledger load warning");
        }

        let snapshot = Arc::new(snapshot);
        self.swap(Arc::clone(&snapshot));
        writes.initialized = true;
        tracing::info!(
            store = %self.writer.description(),
            transactions = snapshot.len(),
            balance = snapshot.balance,
            %origin,
            "ledger initialized"
        );
        self.subscribers.notify(&snapshot);

        InitReport { origin, warnings }
    }

    fn degraded(
        &self,
        reason: String,
        warnings: &mut Vec<String>,
    ) -> (LedgerSnapshot, LoadOrigin) {
        self.writer.mark_dirty(&reason);
        warnings.push(format!("store not used, changes are kept in memory: {reason}"));
        (seed_snapshot(), LoadOrigin::Degraded { reason })
    }

    fn ensure_initialized(&self, writes: &mut WriteState) {
        if !writes.initialized {
            let report = self.initialize_locked(writes);
            tracing::debug!(origin = %report.origin, "ledger initialized on first mutation");
        }
    }

    fn publish(&self, next: LedgerSnapshot) -> PersistTicket {
        let next = Arc::new(next);
        self.swap(Arc::clone(&next));
        self.subscribers.notify(&next);
        self.writer.save(PersistedState::from_snapshot(&next))
    }

    fn swap(&self, next: Arc<LedgerSnapshot>) {
        let mut current = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = next;
    }

    fn lock_writes(&self) -> MutexGuard<'_, WriteState> {
        self.writes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("Ledger")
            .field("store", &self.writer.description())
            .field("transactions", &snapshot.len())
            .field("balance", &snapshot.balance)
            .field("next_id", &snapshot.next_id)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// Checks a restored snapshot and repairs what can be repaired without losing records.
fn reconcile_loaded(snapshot: &mut LedgerSnapshot, policy: BalancePolicy) -> Vec<String> {
    let mut warnings = Vec::new();

    let folded = snapshot.folded_balance();
    if (snapshot.balance - folded).abs() > BALANCE_EPSILON {
        match policy {
            BalancePolicy::TrustStored => warnings.push(format!(
                "stored balance {:.2} differs from transaction total {:.2}; keeping stored balance",
                snapshot.balance, folded
            )),
            BalancePolicy::Recompute => {
                warnings.push(format!(
                    "stored balance {:.2} differs from transaction total {:.2}; balance recomputed",
                    snapshot.balance, folded
                ));
                snapshot.balance = folded;
            }
        }
    }

    let mut seen = HashSet::new();
    for txn in &snapshot.transactions {
        if !seen.insert(txn.id) {
            warnings.push(format!("duplicate transaction id {}", txn.id));
        }
        if let Err(err) = TransactionInput::from(txn).validate() {
            warnings.push(format!("transaction {} is malformed: {}", txn.id, err));
        }
    }

    if let Some(max_id) = snapshot.transactions.iter().map(|txn| txn.id).max() {
        if snapshot.next_id <= max_id {
            warnings.push(format!(
                "stored next id {} is not above highest id {}; counter advanced",
                snapshot.next_id, max_id
            ));
            match max_id.checked_next() {
                Some(next_id) => snapshot.next_id = next_id,
                None => {
                    warnings.push(
                        "identifier counter exhausted; new transactions will be refused".into(),
                    );
                    snapshot.next_id = max_id;
                }
            }
        }
    }

    warnings
}
