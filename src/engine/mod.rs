mod availability;
mod error;
mod mutations;
mod queries;

pub use availability::{validate_capacity, Availability, BookingPlan, CategoryState};
pub use error::{EngineError, Rejection};

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{info, warn};

use crate::ledger::BookingLedger;
use crate::limits::WAL_CHANNEL_CAPACITY;
use crate::model::*;
use crate::notify::NotifyHub;
use crate::observability::{WAL_FLUSH_BATCH_SIZE, WAL_FLUSH_DURATION_SECONDS};
use crate::wal::Wal;

pub type SharedCategoryState = Arc<RwLock<CategoryState>>;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

type PendingAppend = (Event, oneshot::Sender<io::Result<()>>);

/// Owns the WAL. Each wake-up takes the first append plus every append already
/// queued behind it, writes them all, and pays for a single fsync.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        let (event, response) = match cmd {
            WalCommand::Append { event, response } => (event, response),
            other => {
                handle_non_append(&mut wal, other);
                continue;
            }
        };

        let mut batch = vec![(event, response)];
        let mut deferred = None;
        while let Ok(next) = rx.try_recv() {
            match next {
                WalCommand::Append { event, response } => batch.push((event, response)),
                other => {
                    deferred = Some(other);
                    break;
                }
            }
        }

        commit_batch(&mut wal, batch);
        if let Some(cmd) = deferred {
            handle_non_append(&mut wal, cmd);
        }
    }
}

fn commit_batch(wal: &mut Wal, batch: Vec<PendingAppend>) {
    metrics::histogram!(WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let started = Instant::now();

    // A failed batch leaves nothing behind: staged entries are discarded and
    // a failed flush cuts the file back to its last durable length.
    let result = match batch
        .iter()
        .try_for_each(|(event, _)| wal.append_buffered(event))
    {
        Ok(()) => wal.flush_sync(),
        Err(e) => {
            wal.discard_pending();
            Err(e)
        }
    };

    metrics::histogram!(WAL_FLUSH_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
    if let Err(e) = &result {
        warn!("WAL batch of {} events failed: {e}", batch.len());
    }

    for (_, tx) in batch {
        let reply = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(reply);
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!("appends are batched by the writer loop"),
    }
}

/// Booking service: per-category state behind its own lock, the booking
/// report, and the WAL writer task.
///
/// Lock order is category first, then ledger.
pub struct Engine {
    categories: CategoryTable<SharedCategoryState>,
    pub(super) ledger: RwLock<BookingLedger>,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    pub notify: Arc<NotifyHub>,
}

impl Engine {
    /// Replay the WAL at `wal_path` and start the writer task. Needs a tokio runtime.
    pub fn new(wal_path: PathBuf, notify: Arc<NotifyHub>) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;

        let mut availability = Availability::new();
        let mut records = Vec::new();
        for event in &events {
            match availability.apply(event) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => warn!("replay: skipping {event:?}: {e}"),
            }
        }
        let mut ledger = BookingLedger::new();
        ledger.restore(records);
        info!(
            "replayed {} events from {} ({} report records)",
            events.len(),
            wal_path.display(),
            ledger.len()
        );

        let mut wal = Wal::open(&wal_path)?;
        wal.carry_appends(Wal::appends_after_snapshot(&events));
        let (wal_tx, wal_rx) = mpsc::channel(WAL_CHANNEL_CAPACITY);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        Ok(Self {
            categories: availability
                .into_parts()
                .map(|state| Arc::new(RwLock::new(state))),
            ledger: RwLock::new(ledger),
            wal_tx,
            notify,
        })
    }

    pub fn category(&self, category: Category) -> SharedCategoryState {
        self.categories[category].clone()
    }

    pub(super) fn categories(&self) -> &CategoryTable<SharedCategoryState> {
        &self.categories
    }

    /// Round-trip one command through the writer task.
    pub(super) async fn send_wal_command<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> WalCommand,
    ) -> Result<T, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(make(tx))
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))
    }

    /// Durably append one event. Returns once the batch holding it is fsynced.
    pub(super) async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        self.send_wal_command(|response| WalCommand::Append {
            event: event.clone(),
            response,
        })
        .await?
        .map_err(|e| EngineError::WalError(e.to_string()))
    }
}
