use crate::model::*;

use super::Engine;

impl Engine {
    /// Shape a ledger booking for the caller to render.
    pub(super) fn booking_info(&self, booking: &Booking) -> BookingInfo {
        let room_number = self
            .catalog
            .get(&booking.room_id)
            .map(|r| r.room_number)
            .unwrap_or_default();
        BookingInfo {
            id: booking.id,
            room_id: booking.room_id,
            room_number,
            slot_start: booking.slot_start,
            slot_end: booking.slot_end(),
            code: booking.code.clone(),
            team: booking.team.clone(),
            attendees: booking.attendees.clone(),
        }
    }

    /// Resolve a booking by its external code.
    pub async fn booking_by_code(&self, code: &str) -> Option<BookingInfo> {
        let slot_start = self.slot_for_code(code)?;
        let slot_arc = self.slot_if_touched(slot_start)?;
        let ledger = slot_arc.read().await;
        ledger.booking_by_code(code).map(|b| self.booking_info(b))
    }

    /// All bookings for one slot, ascending by room id.
    pub async fn bookings_for_slot(&self, slot_start: Ms) -> Vec<BookingInfo> {
        let Some(slot_arc) = self.slot_if_touched(slot_start) else {
            return Vec::new();
        };
        let ledger = slot_arc.read().await;
        ledger
            .bookings
            .iter()
            .map(|b| self.booking_info(b))
            .collect()
    }
}
