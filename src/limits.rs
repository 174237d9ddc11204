use crate::model::Ms;

/// One bookable slot is exactly one hour.
pub const SLOT_DURATION_MS: Ms = 3_600_000;

/// Attendees at or above this age count against shared-desk capacity.
pub const ADULT_AGE: u32 = 10;

/// Conference rooms require at least this many attendees.
pub const MIN_CONFERENCE_PARTY: usize = 3;

/// Length of the opaque booking code handed to callers.
pub const BOOKING_CODE_LEN: usize = 12;

/// Upper bound on requesters in a single allocation request.
pub const MAX_PARTY_SIZE: usize = 64;

pub const MAX_NAME_LEN: usize = 120;
pub const MAX_ROOMS: usize = 10_000;

/// Sanity window for slot timestamps: [1970-01-01, year ~2100).
pub const MIN_VALID_TIMESTAMP_MS: Ms = 0;
pub const MAX_VALID_TIMESTAMP_MS: Ms = 4_102_444_800_000;
