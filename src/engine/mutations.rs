use std::collections::HashSet;

use tokio::sync::oneshot;
use ulid::Ulid;

use crate::model::*;
use crate::observability;

use super::policy::{
    check_party_size, check_requesters_free, no_rooms_available, now_ms, random_code,
    validate_party, validate_slot,
};
use super::{BookingError, Engine, WalCommand};

impl Engine {
    /// Allocate a room of `room_type` at `slot_start` for the given
    /// requesters. If `users` is empty, the resolved team's members are
    /// seated instead; the team labels conference bookings only.
    ///
    /// The whole check-then-write sequence runs under the slot's write
    /// lock; on any failure nothing has been written.
    pub async fn allocate(
        &self,
        slot_start: Ms,
        room_type: RoomType,
        users: Vec<User>,
        team: Option<&Team>,
    ) -> Result<BookingInfo, BookingError> {
        let result = self.allocate_inner(slot_start, room_type, users, team).await;
        let label = observability::room_type_label(room_type);
        match &result {
            Ok(info) => {
                tracing::debug!(
                    "allocated {} room {} at {slot_start} (code {})",
                    label,
                    info.room_number,
                    info.code
                );
                metrics::counter!(observability::ALLOCATIONS_TOTAL, "room_type" => label)
                    .increment(1);
            }
            Err(BookingError::Wal(e)) => tracing::warn!("allocation lost to WAL failure: {e}"),
            Err(e) => {
                tracing::debug!("allocation rejected at {slot_start}: {e}");
                metrics::counter!(observability::ALLOCATIONS_REJECTED_TOTAL, "room_type" => label)
                    .increment(1);
            }
        }
        result
    }

    async fn allocate_inner(
        &self,
        slot_start: Ms,
        room_type: RoomType,
        users: Vec<User>,
        team: Option<&Team>,
    ) -> Result<BookingInfo, BookingError> {
        validate_slot(slot_start, &self.hours)?;

        let requesters = if users.is_empty() {
            team.map(|t| t.members.clone()).unwrap_or_default()
        } else {
            users
        };
        validate_party(&requesters)?;
        check_party_size(room_type, requesters.len())?;

        let slot_arc = self.slot(slot_start);
        let mut ledger = slot_arc.write().await;

        // Inside the lock: no requester may hold an attendance anywhere
        // in this slot, whatever the room type.
        check_requesters_free(&ledger, &requesters)?;

        match room_type {
            RoomType::Private | RoomType::Conference => {
                let occupied: HashSet<Ulid> = ledger.occupied_room_ids().collect();
                let room = self
                    .catalog
                    .rooms_of_type_excluding(room_type, &occupied)
                    .into_iter()
                    .next()
                    .ok_or_else(|| no_rooms_available(room_type))?;
                let team_label = match room_type {
                    RoomType::Conference => team.map(Team::label),
                    _ => None,
                };
                self.create_booking(&mut ledger, room.id, requesters, team_label)
                    .await
            }
            RoomType::Shared => {
                // Ledger order is ascending room id, so the scan hits
                // desks lowest-identity first. Occupancy is re-read here,
                // under the lock, never from a cached snapshot.
                let join_target = ledger.bookings.iter().find_map(|b| {
                    let room = self.catalog.get(&b.room_id)?;
                    (room.room_type == RoomType::Shared && b.seat_count() < room.capacity)
                        .then_some(b.id)
                });

                let user = requesters.into_iter().next().expect("party size checked");

                if let Some(booking_id) = join_target {
                    let event = Event::AttendeeJoined {
                        booking_id,
                        slot_start,
                        user,
                    };
                    self.persist_and_apply(&mut ledger, &event).await?;
                    let booking = ledger
                        .booking_by_id(booking_id)
                        .expect("joined booking present");
                    return Ok(self.booking_info(booking));
                }

                let occupied: HashSet<Ulid> = ledger.occupied_room_ids().collect();
                let room = self
                    .catalog
                    .rooms_of_type_excluding(RoomType::Shared, &occupied)
                    .into_iter()
                    .next()
                    .ok_or_else(|| no_rooms_available(RoomType::Shared))?;
                self.create_booking(&mut ledger, room.id, vec![user], None)
                    .await
            }
        }
    }

    /// Commit a fresh booking as a single WAL event. Runs with the
    /// slot's write lock held by the caller.
    async fn create_booking(
        &self,
        ledger: &mut SlotLedger,
        room_id: Ulid,
        attendees: Vec<User>,
        team: Option<TeamLabel>,
    ) -> Result<BookingInfo, BookingError> {
        let code = self.fresh_code();
        let event = Event::BookingCreated {
            id: Ulid::new(),
            room_id,
            slot_start: ledger.slot_start,
            code: code.clone(),
            created_at: now_ms(),
            team,
            attendees,
        };
        let newly_active = ledger.is_empty();
        self.persist_and_apply(ledger, &event).await?;
        if newly_active {
            metrics::gauge!(observability::SLOTS_ACTIVE).increment(1.0);
        }
        let booking = ledger.booking_by_code(&code).expect("booking just applied");
        Ok(self.booking_info(booking))
    }

    /// A code no live booking uses. 48 random bits collide rarely; the
    /// index check makes the guarantee absolute.
    fn fresh_code(&self) -> String {
        loop {
            let code = random_code();
            if !self.codes.contains_key(&code) {
                return code;
            }
        }
    }

    /// Cancel a whole booking (`user_id = None`) or remove one attendee.
    /// Removing the last attendee deletes the booking itself.
    pub async fn cancel(&self, code: &str, user_id: Option<Ulid>) -> Result<(), BookingError> {
        let slot_start = self
            .slot_for_code(code)
            .ok_or(BookingError::NotFound("booking code not found"))?;
        let slot_arc = self.slot(slot_start);
        let mut ledger = slot_arc.write().await;

        // Re-resolve under the lock: a racing cancel may have won.
        let booking = ledger
            .booking_by_code(code)
            .ok_or(BookingError::NotFound("booking code not found"))?;
        let booking_id = booking.id;

        match user_id {
            None => {
                let event = Event::BookingCancelled { booking_id, slot_start };
                self.persist_and_apply(&mut ledger, &event).await?;
            }
            Some(uid) => {
                if !booking.has_attendee(uid) {
                    return Err(BookingError::NotFound("user not found in this booking"));
                }
                let event = Event::AttendeeLeft {
                    booking_id,
                    slot_start,
                    user_id: uid,
                };
                self.persist_and_apply(&mut ledger, &event).await?;
            }
        }

        metrics::counter!(observability::CANCELLATIONS_TOTAL).increment(1);
        if ledger.is_empty() {
            metrics::gauge!(observability::SLOTS_ACTIVE).decrement(1.0);
        }
        tracing::debug!("cancelled {code} (user: {user_id:?})");
        Ok(())
    }

    /// Compact the WAL by rewriting it with one BookingCreated per live
    /// booking — the minimal event set that recreates current state.
    pub async fn compact_wal(&self) -> Result<(), BookingError> {
        let mut events = Vec::new();
        let slot_arcs: Vec<super::SharedSlot> =
            self.slots.iter().map(|e| e.value().clone()).collect();

        for slot_arc in slot_arcs {
            let ledger = slot_arc.read().await;
            for booking in &ledger.bookings {
                events.push(Event::BookingCreated {
                    id: booking.id,
                    room_id: booking.room_id,
                    slot_start: booking.slot_start,
                    code: booking.code.clone(),
                    created_at: booking.created_at,
                    team: booking.team.clone(),
                    attendees: booking.attendees.clone(),
                });
            }
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| BookingError::Wal("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| BookingError::Wal("WAL writer dropped response".into()))?
            .map_err(|e| BookingError::Wal(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
