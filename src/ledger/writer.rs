//! Background persistence: a dedicated thread owns the store and applies jobs in order.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, Sender},
        Arc, Mutex, MutexGuard,
    },
    thread::{self, JoinHandle},
};

use crate::{
    errors::LedgerError,
    storage::{LedgerStore, PersistedState},
};

const WRITER_THREAD_NAME: &str = "nucleo-ledger-writer";

type Reply<T> = Sender<Result<T, LedgerError>>;

enum StoreJob {
    Load(Reply<Option<PersistedState>>),
    Save(PersistedState, Reply<()>),
    Clear(Reply<()>),
}

/// Outcome of the most recent write, shared with the ledger.
#[derive(Debug, Default)]
struct WriterHealth {
    dirty: AtomicBool,
    last_error: Mutex<Option<String>>,
}

impl WriterHealth {
    fn record(&self, result: &Result<(), LedgerError>) {
        let mut last_error = lock(&self.last_error);
        match result {
            Ok(()) => {
                self.dirty.store(false, Ordering::SeqCst);
                *last_error = None;
            }
            Err(err) => {
                self.dirty.store(true, Ordering::SeqCst);
                *last_error = Some(err.to_string());
            }
        }
    }
}

pub(crate) struct PersistenceWriter {
    jobs: Mutex<Option<Sender<StoreJob>>>,
    handle: Option<JoinHandle<()>>,
    health: Arc<WriterHealth>,
    description: String,
}

impl PersistenceWriter {
    pub(crate) fn spawn(store: Box<dyn LedgerStore>) -> Result<Self, LedgerError> {
        let description = store.describe();
        let health = Arc::new(WriterHealth::default());
        let (tx, rx) = mpsc::channel();
        let thread_health = Arc::clone(&health);
        let handle = thread::Builder::new()
            .name(WRITER_THREAD_NAME.into())
            .spawn(move || run_writer(store, rx, thread_health))?;
        Ok(Self {
            jobs: Mutex::new(Some(tx)),
            handle: Some(handle),
            health,
            description,
        })
    }

    pub(crate) fn description(&self) -> &str {
        &self.description
    }

    pub(crate) fn load(&self) -> Result<Option<PersistedState>, LedgerError> {
        let (reply, rx) = mpsc::channel();
        self.submit(StoreJob::Load(reply))?;
        receive(rx)
    }

    pub(crate) fn save(&self, state: PersistedState) -> PersistTicket {
        let (reply, rx) = mpsc::channel();
        match self.submit(StoreJob::Save(state, reply)) {
            Ok(()) => PersistTicket::pending(rx),
            Err(err) => {
                self.health.record(&Err(err.clone()));
                PersistTicket::resolved(Err(err))
            }
        }
    }

    pub(crate) fn clear(&self) -> Result<(), LedgerError> {
        let (reply, rx) = mpsc::channel();
        self.submit(StoreJob::Clear(reply))?;
        receive(rx)
    }

    pub(crate) fn mark_dirty(&self, reason: &str) {
        self.health
            .record(&Err(LedgerError::Persistence(reason.to_string())));
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.health.dirty.load(Ordering::SeqCst)
    }

    pub(crate) fn last_error(&self) -> Option<String> {
        lock(&self.health.last_error).clone()
    }

    fn submit(&self, job: StoreJob) -> Result<(), LedgerError> {
        let guard = lock(&self.jobs);
        let sender = guard
            .as_ref()
            .ok_or_else(|| LedgerError::Persistence("persistence writer stopped".into()))?;
        sender
            .send(job)
            .map_err(|_| LedgerError::Persistence("persistence writer stopped".into()))
    }
}

impl Drop for PersistenceWriter {
    fn drop(&mut self) {
        let sender = self
            .jobs
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        drop(sender);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("persistence writer thread panicked");
            }
        }
    }
}

fn run_writer(mut store: Box<dyn LedgerStore>, jobs: Receiver<StoreJob>, health: Arc<WriterHealth>) {
    tracing::debug!(store = %store.describe(), "persistence writer started");
    for job in jobs {
        match job {
            StoreJob::Load(reply) => {
                let _ = reply.send(store.load());
            }
            StoreJob::Save(state, reply) => {
                let result = store.save(&state);
                match &result {
                    Ok(()) => tracing::debug!(
                        transactions = state.transactions.len(),
                        next_id = state.next_id.0,
                        "ledger persisted"
                    ),
                    Err(err) => tracing::warn!(%err, "failed to persist ledger"),
                }
                health.record(&result);
                let _ = reply.send(result);
            }
            StoreJob::Clear(reply) => {
                let result = store.clear();
                if let Err(err) = &result {
                    tracing::warn!(%err, "failed to clear ledger store");
                }
                let _ = reply.send(result);
            }
        }
    }
    tracing::debug!("persistence writer stopped");
}

fn receive<T>(rx: Receiver<Result<T, LedgerError>>) -> Result<T, LedgerError> {
    rx.recv()
        .map_err(|_| LedgerError::Persistence("persistence writer stopped".into()))?
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handle to the pending write that follows a committed mutation.
#[derive(Debug)]
pub struct PersistTicket {
    state: TicketState,
}

#[derive(Debug)]
enum TicketState {
    Resolved(Result<(), LedgerError>),
    Pending(Receiver<Result<(), LedgerError>>),
}

impl PersistTicket {
    pub(crate) fn resolved(result: Result<(), LedgerError>) -> Self {
        Self {
            state: TicketState::Resolved(result),
        }
    }

    fn pending(rx: Receiver<Result<(), LedgerError>>) -> Self {
        Self {
            state: TicketState::Pending(rx),
        }
    }

    /// Blocks until the store has answered.
    pub fn wait(self) -> Result<(), LedgerError> {
        match self.state {
            TicketState::Resolved(result) => result,
            TicketState::Pending(rx) => receive(rx),
        }
    }

    /// Non-blocking check; `None` while the write is still queued.
    pub fn try_result(&mut self) -> Option<Result<(), LedgerError>> {
        if let TicketState::Pending(rx) = &self.state {
            let result = match rx.try_recv() {
                Ok(result) => result,
                Err(mpsc::TryRecvError::Empty) => return None,
                Err(mpsc::TryRecvError::Disconnected) => Err(LedgerError::Persistence(
                    "persistence writer stopped".into(),
                )),
            };
            self.state = TicketState::Resolved(result);
        }
        match &self.state {
            TicketState::Resolved(result) => Some(result.clone()),
            TicketState::Pending(_) => None,
        }
    }
}

/// Result of a mutation that is already visible in memory, paired with its pending write.
#[derive(Debug)]
#[must_use = "the persistence outcome is only observable through the commit"]
pub struct Commit<T> {
    value: T,
    ticket: PersistTicket,
}

impl<T> Commit<T> {
    pub(crate) fn new(value: T, ticket: PersistTicket) -> Self {
        Self { value, ticket }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// Drops the ticket; the write still happens in the background.
    pub fn into_value(self) -> T {
        self.value
    }

    pub fn into_parts(self) -> (T, PersistTicket) {
        (self.value, self.ticket)
    }

    /// Waits for durability and returns the value, or the persistence failure.
    pub fn wait(self) -> Result<T, LedgerError> {
        self.ticket.wait()?;
        Ok(self.value)
    }
}
