use std::collections::{HashMap, HashSet};

use ulid::Ulid;

use crate::model::*;

use super::Engine;

impl Engine {
    /// What's free at a slot: private/conference rooms with no booking,
    /// shared desks with their remaining adult seats (floored at zero).
    /// Pure read over one ledger snapshot.
    pub async fn available_rooms(&self, slot_start: Ms) -> SlotAvailability {
        let mut occupied: HashSet<Ulid> = HashSet::new();
        let mut used_seats: HashMap<Ulid, u32> = HashMap::new();

        if let Some(slot_arc) = self.slot_if_touched(slot_start) {
            let ledger = slot_arc.read().await;
            for booking in &ledger.bookings {
                occupied.insert(booking.room_id);
                used_seats.insert(booking.room_id, booking.seat_count());
            }
        }

        let free = |rooms: Vec<Room>| -> Vec<FreeRoom> {
            rooms
                .into_iter()
                .map(|r| FreeRoom {
                    room_id: r.id,
                    room_number: r.room_number,
                    capacity: r.capacity,
                })
                .collect()
        };

        let private_rooms = free(
            self.catalog
                .rooms_of_type_excluding(RoomType::Private, &occupied),
        );
        let conference_rooms = free(
            self.catalog
                .rooms_of_type_excluding(RoomType::Conference, &occupied),
        );

        let shared_rooms = self
            .catalog
            .rooms_of_type(RoomType::Shared)
            .into_iter()
            .map(|r| {
                let used = used_seats.get(&r.id).copied().unwrap_or(0);
                SharedSeats {
                    room_id: r.id,
                    room_number: r.room_number,
                    remaining_seats: r.capacity.saturating_sub(used),
                }
            })
            .collect();

        SlotAvailability {
            slot_start,
            private_rooms,
            conference_rooms,
            shared_rooms,
        }
    }
}
