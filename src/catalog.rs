use std::collections::HashSet;

use dashmap::DashMap;
use ulid::Ulid;

use crate::engine::BookingError;
use crate::limits::{MAX_NAME_LEN, MAX_ROOMS};
use crate::model::{Room, RoomType};

/// Read-mostly room inventory. Rooms are immutable after seeding; the
/// allocator only ever reads from here.
pub struct Catalog {
    rooms: DashMap<Ulid, Room>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self { rooms: DashMap::new() }
    }

    pub fn insert(&self, room: Room) -> Result<(), BookingError> {
        if self.rooms.len() >= MAX_ROOMS {
            return Err(BookingError::Validation("too many rooms"));
        }
        if room.room_number.is_empty() || room.room_number.len() > MAX_NAME_LEN {
            return Err(BookingError::Validation("bad room number"));
        }
        if room.capacity == 0 {
            return Err(BookingError::Validation("room capacity must be positive"));
        }
        if self.rooms.contains_key(&room.id)
            || self.rooms.iter().any(|r| r.room_number == room.room_number)
        {
            return Err(BookingError::Validation("duplicate room"));
        }
        self.rooms.insert(room.id, room);
        Ok(())
    }

    pub fn get(&self, id: &Ulid) -> Option<Room> {
        self.rooms.get(id).map(|e| e.value().clone())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Rooms of the given type, minus an excluded-id set, ascending by id.
    /// This ordering is what makes room selection deterministic.
    pub fn rooms_of_type_excluding(
        &self,
        room_type: RoomType,
        excluded: &HashSet<Ulid>,
    ) -> Vec<Room> {
        let mut rooms: Vec<Room> = self
            .rooms
            .iter()
            .filter(|r| r.room_type == room_type && !excluded.contains(&r.id))
            .map(|r| r.value().clone())
            .collect();
        rooms.sort_by_key(|r| r.id);
        rooms
    }

    pub fn rooms_of_type(&self, room_type: RoomType) -> Vec<Room> {
        self.rooms_of_type_excluding(room_type, &HashSet::new())
    }

    /// Seed the standard floor plan: 8 private rooms, 4 conference rooms
    /// (capacity 10), 3 shared desks (capacity 4).
    pub fn seed_default(&self) -> Result<(), BookingError> {
        for i in 1..=8 {
            self.insert(Room {
                id: Ulid::new(),
                room_number: format!("P{i}"),
                room_type: RoomType::Private,
                capacity: 1,
            })?;
        }
        for i in 1..=4 {
            self.insert(Room {
                id: Ulid::new(),
                room_number: format!("C{i}"),
                room_type: RoomType::Conference,
                capacity: 10,
            })?;
        }
        for i in 1..=3 {
            self.insert(Room {
                id: Ulid::new(),
                room_number: format!("S{i}"),
                room_type: RoomType::Shared,
                capacity: 4,
            })?;
        }
        Ok(())
    }
}
