use std::collections::HashSet;

use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::BookingError;

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as Ms
}

/// Slot-shape validation. Runs before the allocator takes any lock.
pub(crate) fn validate_slot(slot_start: Ms, hours: &WorkingHours) -> Result<(), BookingError> {
    if !(MIN_VALID_TIMESTAMP_MS..MAX_VALID_TIMESTAMP_MS).contains(&slot_start) {
        return Err(BookingError::Validation("slot timestamp out of range"));
    }
    if slot_start % SLOT_DURATION_MS != 0 {
        return Err(BookingError::Validation("slot must start on the hour"));
    }
    if !hours.contains(slot_hour(slot_start)) {
        return Err(BookingError::Validation("slot outside working hours"));
    }
    Ok(())
}

/// Requester-set validation: bounded size, no user listed twice.
pub(crate) fn validate_party(requesters: &[User]) -> Result<(), BookingError> {
    if requesters.len() > MAX_PARTY_SIZE {
        return Err(BookingError::Validation("too many requesters"));
    }
    let mut seen = HashSet::with_capacity(requesters.len());
    for user in requesters {
        if !seen.insert(user.id) {
            return Err(BookingError::Validation("duplicate requester in party"));
        }
    }
    Ok(())
}

/// Per-type attendee-count policy. Each room type owns its own message.
pub(crate) fn check_party_size(room_type: RoomType, n: usize) -> Result<(), BookingError> {
    match room_type {
        RoomType::Private if n != 1 => Err(BookingError::Policy(
            "private room bookings are for single users only",
        )),
        RoomType::Conference if n < MIN_CONFERENCE_PARTY => Err(BookingError::Policy(
            "conference room bookings require at least 3 attendees",
        )),
        RoomType::Shared if n != 1 => Err(BookingError::Policy(
            "shared desk bookings accept exactly one user per request",
        )),
        _ => Ok(()),
    }
}

pub(crate) fn no_rooms_available(room_type: RoomType) -> BookingError {
    BookingError::Conflict(match room_type {
        RoomType::Private => "no private rooms available for this slot",
        RoomType::Conference => "no conference rooms available for this slot",
        RoomType::Shared => "no shared rooms available for this slot",
    })
}

/// The cross-cutting check: no requester may already hold an attendance
/// anywhere in this slot. Must run under the slot's write lock — the
/// lock, not this check, is what closes the check-then-act window.
pub(crate) fn check_requesters_free(
    ledger: &SlotLedger,
    requesters: &[User],
) -> Result<(), BookingError> {
    if requesters.iter().any(|u| ledger.user_is_booked(u.id)) {
        return Err(BookingError::Conflict(
            "one or more users already have a booking in this slot",
        ));
    }
    Ok(())
}

/// Generate a fresh 12-hex-char booking code from ULID randomness.
/// Uniqueness is re-checked by the caller against the live code index.
pub(crate) fn random_code() -> String {
    let bits = Ulid::new().random() & 0xFFFF_FFFF_FFFF;
    debug_assert_eq!(BOOKING_CODE_LEN, 12);
    format!("{bits:012x}")
}
