mod availability;
mod error;
mod mutations;
mod policy;
mod queries;

pub use error::BookingError;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, RwLock};

use crate::catalog::Catalog;
use crate::model::*;
use crate::notify::NotifyHub;
use crate::wal::Wal;

pub type SharedSlot = Arc<RwLock<SlotLedger>>;

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

/// Background task that owns the WAL and batches appends for group commit.
/// 1. Block until the first Append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available Appends (the batch window).
/// 4. Single flush_sync for the whole batch.
/// 5. Respond Ok to all senders.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];

                // Drain all immediately available appends
                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            // Flush current batch first, then handle the non-append command
                            flush_and_respond(&mut wal, &mut batch);
                            handle_non_append(&mut wal, other);
                            break;
                        }
                        Err(_) => break, // channel empty — flush batch
                    }
                }

                if !batch.is_empty() {
                    flush_and_respond(&mut wal, &mut batch);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
}

fn flush_and_respond(wal: &mut Wal, batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>) {
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let flush_start = std::time::Instant::now();
    let result = flush_batch(wal, batch);
    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());
    respond_batch(batch, &result);
}

fn flush_batch(
    wal: &mut Wal,
    batch: &mut [(Event, oneshot::Sender<io::Result<()>>)],
) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch.iter() {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Always flush — even on append error — so partially buffered bytes
    // don't leak into the next batch (callers were told this batch failed).
    let flush_err = wal.flush_sync().err();
    if let Some(e) = append_err {
        return Err(e);
    }
    if let Some(e) = flush_err {
        return Err(e);
    }
    Ok(())
}

fn respond_batch(batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>, result: &io::Result<()>) {
    for (_, tx) in batch.drain(..) {
        let r = match result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
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
        WalCommand::Append { .. } => unreachable!(),
    }
}

/// The booking engine: slot allocator, cancellation engine, and the
/// ledger they mutate. One instance owns one WAL; tests inject an
/// isolated engine (with its own catalog and WAL path) per test.
pub struct Engine {
    pub catalog: Arc<Catalog>,
    pub hours: WorkingHours,
    pub notify: Arc<NotifyHub>,
    /// Per-slot ledgers. The write lock on one ledger is the critical
    /// section for every allocation/cancellation touching that slot;
    /// unrelated slots never contend.
    pub(super) slots: DashMap<Ms, SharedSlot>,
    /// Reverse lookup: booking code → slot_start.
    pub(super) codes: DashMap<String, Ms>,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
}

/// Apply an event directly to a slot ledger (no locking — caller holds
/// the lock). Also the replay path, so the collapse rule for emptied
/// bookings lives here and nowhere else.
fn apply_to_slot(ledger: &mut SlotLedger, event: &Event, codes: &DashMap<String, Ms>) {
    match event {
        Event::BookingCreated {
            id,
            room_id,
            slot_start,
            code,
            created_at,
            team,
            attendees,
        } => {
            ledger.insert_booking(Booking {
                id: *id,
                room_id: *room_id,
                slot_start: *slot_start,
                code: code.clone(),
                created_at: *created_at,
                team: team.clone(),
                attendees: attendees.clone(),
            });
            codes.insert(code.clone(), *slot_start);
        }
        Event::AttendeeJoined { booking_id, user, .. } => {
            if let Some(booking) = ledger.booking_by_id_mut(*booking_id)
                && !booking.has_attendee(user.id)
            {
                booking.attendees.push(user.clone());
            }
        }
        Event::AttendeeLeft { booking_id, user_id, .. } => {
            if let Some(booking) = ledger.booking_by_id_mut(*booking_id) {
                booking.attendees.retain(|u| u.id != *user_id);
                if booking.attendees.is_empty() {
                    // Last attendee gone — the booking goes with them.
                    let code = booking.code.clone();
                    ledger.remove_booking(*booking_id);
                    codes.remove(&code);
                }
            }
        }
        Event::BookingCancelled { booking_id, .. } => {
            if let Some(booking) = ledger.remove_booking(*booking_id) {
                codes.remove(&booking.code);
            }
        }
    }
}

impl Engine {
    pub fn new(
        catalog: Arc<Catalog>,
        wal_path: PathBuf,
        notify: Arc<NotifyHub>,
        hours: WorkingHours,
    ) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            catalog,
            hours,
            notify,
            slots: DashMap::new(),
            codes: DashMap::new(),
            wal_tx,
        };

        // Replay events — we're the sole owner of these Arcs, so try_write
        // always succeeds instantly (no contention). Never use blocking_write
        // here because this may run inside an async context.
        for event in &events {
            let slot_arc = engine.slot(event.slot_start());
            let mut guard = slot_arc.try_write().expect("replay: uncontended write");
            apply_to_slot(&mut guard, event, &engine.codes);
        }

        Ok(engine)
    }

    /// Write event to WAL via the background group-commit writer.
    async fn wal_append(&self, event: &Event) -> Result<(), BookingError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| BookingError::Wal("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| BookingError::Wal("WAL writer dropped response".into()))?
            .map_err(|e| BookingError::Wal(e.to_string()))
    }

    /// The ledger for a slot, created on first touch.
    pub(super) fn slot(&self, slot_start: Ms) -> SharedSlot {
        self.slots
            .entry(slot_start)
            .or_insert_with(|| Arc::new(RwLock::new(SlotLedger::new(slot_start))))
            .value()
            .clone()
    }

    /// The ledger for a slot, if any operation has touched it. Read
    /// paths use this so queries never allocate ledger entries.
    pub(super) fn slot_if_touched(&self, slot_start: Ms) -> Option<SharedSlot> {
        self.slots.get(&slot_start).map(|e| e.value().clone())
    }

    pub fn slot_for_code(&self, code: &str) -> Option<Ms> {
        self.codes.get(code).map(|e| *e.value())
    }

    /// WAL-append + apply + notify in one call. Eliminates the repeated 3-line pattern.
    pub(super) async fn persist_and_apply(
        &self,
        ledger: &mut SlotLedger,
        event: &Event,
    ) -> Result<(), BookingError> {
        self.wal_append(event).await?;
        apply_to_slot(ledger, event, &self.codes);
        self.notify.send(event.slot_start(), event);
        Ok(())
    }
}
