use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::limits::{ADULT_AGE, SLOT_DURATION_MS};

/// Unix milliseconds — the only time type.
pub type Ms = i64;

/// Hour of day (UTC) for a slot timestamp. Only meaningful for
/// on-the-hour timestamps, which is all the engine accepts.
pub fn slot_hour(slot_start: Ms) -> u8 {
    (slot_start.div_euclid(SLOT_DURATION_MS) % 24) as u8
}

pub fn slot_end(slot_start: Ms) -> Ms {
    slot_start + SLOT_DURATION_MS
}

/// Daily bookable window, end exclusive. Hours are UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingHours {
    pub open_hour: u8,
    pub close_hour: u8,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self { open_hour: 9, close_hour: 18 }
    }
}

impl WorkingHours {
    pub fn contains(&self, hour: u8) -> bool {
        self.open_hour <= hour && hour < self.close_hour
    }
}

/// The closed set of room categories. Each variant owns its occupancy
/// policy (see `engine::policy`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomType {
    Private,
    Conference,
    Shared,
}

impl RoomType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomType::Private => "private",
            RoomType::Conference => "conference",
            RoomType::Shared => "shared",
        }
    }
}

/// Unknown strings are a validation failure, reported with the same
/// message callers surface to users.
pub struct InvalidRoomType;

impl FromStr for RoomType {
    type Err = InvalidRoomType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(RoomType::Private),
            "conference" => Ok(RoomType::Conference),
            "shared" => Ok(RoomType::Shared),
            _ => Err(InvalidRoomType),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// A requesting user. Attributes are read-only inputs to the allocator;
/// `age` decides whether the user counts against shared-desk capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Ulid,
    pub name: String,
    pub age: u32,
    pub gender: Gender,
}

impl User {
    pub fn counts_for_seat(&self) -> bool {
        self.age >= ADULT_AGE
    }
}

/// A resolved team: the caller flattens membership before allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub id: Ulid,
    pub name: String,
    pub members: Vec<User>,
}

impl Team {
    pub fn label(&self) -> TeamLabel {
        TeamLabel { id: self.id, name: self.name.clone() }
    }
}

/// Label stored on a conference booking. Not a capacity input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamLabel {
    pub id: Ulid,
    pub name: String,
}

/// A room in the catalog. Immutable after seeding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: Ulid,
    pub room_number: String,
    pub room_type: RoomType,
    pub capacity: u32,
}

/// One confirmed booking: a room held for one slot, with its attendee
/// list. `(room_id, slot_start)` is unique across the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub room_id: Ulid,
    pub slot_start: Ms,
    pub code: String,
    pub created_at: Ms,
    pub team: Option<TeamLabel>,
    pub attendees: Vec<User>,
}

impl Booking {
    pub fn slot_end(&self) -> Ms {
        slot_end(self.slot_start)
    }

    /// Attendees counted against shared-desk capacity (age >= 10).
    pub fn seat_count(&self) -> u32 {
        self.attendees.iter().filter(|u| u.counts_for_seat()).count() as u32
    }

    pub fn has_attendee(&self, user_id: Ulid) -> bool {
        self.attendees.iter().any(|u| u.id == user_id)
    }
}

/// All bookings for one slot, sorted by `room_id`. The per-slot write
/// lock around this struct is the allocation critical section.
#[derive(Debug, Clone)]
pub struct SlotLedger {
    pub slot_start: Ms,
    pub bookings: Vec<Booking>,
}

impl SlotLedger {
    pub fn new(slot_start: Ms) -> Self {
        Self { slot_start, bookings: Vec::new() }
    }

    /// Insert maintaining sort order by room_id. The allocator never
    /// inserts a second booking for an occupied room; replay of a valid
    /// WAL can't either.
    pub fn insert_booking(&mut self, booking: Booking) {
        let pos = self
            .bookings
            .binary_search_by_key(&booking.room_id, |b| b.room_id)
            .unwrap_or_else(|e| e);
        self.bookings.insert(pos, booking);
    }

    pub fn remove_booking(&mut self, id: Ulid) -> Option<Booking> {
        let pos = self.bookings.iter().position(|b| b.id == id)?;
        Some(self.bookings.remove(pos))
    }

    pub fn booking_by_id(&self, id: Ulid) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }

    pub fn booking_by_id_mut(&mut self, id: Ulid) -> Option<&mut Booking> {
        self.bookings.iter_mut().find(|b| b.id == id)
    }

    pub fn booking_by_code(&self, code: &str) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.code == code)
    }

    pub fn booking_on_room(&self, room_id: Ulid) -> Option<&Booking> {
        self.bookings
            .binary_search_by_key(&room_id, |b| b.room_id)
            .ok()
            .map(|pos| &self.bookings[pos])
    }

    /// True if the user already holds an attendance anywhere in this slot.
    pub fn user_is_booked(&self, user_id: Ulid) -> bool {
        self.bookings.iter().any(|b| b.has_attendee(user_id))
    }

    pub fn occupied_room_ids(&self) -> impl Iterator<Item = Ulid> + '_ {
        self.bookings.iter().map(|b| b.room_id)
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }
}

/// The event types — flat, no nesting. This is the WAL record format.
/// Every variant carries `slot_start` so replay can route it to the
/// right ledger without an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    BookingCreated {
        id: Ulid,
        room_id: Ulid,
        slot_start: Ms,
        code: String,
        created_at: Ms,
        team: Option<TeamLabel>,
        attendees: Vec<User>,
    },
    AttendeeJoined {
        booking_id: Ulid,
        slot_start: Ms,
        user: User,
    },
    AttendeeLeft {
        booking_id: Ulid,
        slot_start: Ms,
        user_id: Ulid,
    },
    BookingCancelled {
        booking_id: Ulid,
        slot_start: Ms,
    },
}

impl Event {
    pub fn slot_start(&self) -> Ms {
        match self {
            Event::BookingCreated { slot_start, .. }
            | Event::AttendeeJoined { slot_start, .. }
            | Event::AttendeeLeft { slot_start, .. }
            | Event::BookingCancelled { slot_start, .. } => *slot_start,
        }
    }
}

// ── Query result types ───────────────────────────────────────────

/// The reported result shape for a booking, as rendered by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingInfo {
    pub id: Ulid,
    pub room_id: Ulid,
    pub room_number: String,
    pub slot_start: Ms,
    pub slot_end: Ms,
    pub code: String,
    pub team: Option<TeamLabel>,
    pub attendees: Vec<User>,
}

/// A free private or conference room at a given slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeRoom {
    pub room_id: Ulid,
    pub room_number: String,
    pub capacity: u32,
}

/// A shared desk with its remaining adult seats at a given slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedSeats {
    pub room_id: Ulid,
    pub room_number: String,
    pub remaining_seats: u32,
}

/// Availability report for one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotAvailability {
    pub slot_start: Ms,
    pub private_rooms: Vec<FreeRoom>,
    pub conference_rooms: Vec<FreeRoom>,
    pub shared_rooms: Vec<SharedSeats>,
}
