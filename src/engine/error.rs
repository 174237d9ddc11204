/// The single error taxonomy for allocation and cancellation. All
/// variants are user-correctable and reported synchronously; none are
/// retried by the engine.
#[derive(Debug)]
pub enum BookingError {
    /// Malformed request: slot off the hour, outside working hours,
    /// duplicate requesters. Raised before the allocator touches state.
    Validation(&'static str),
    /// Wrong attendee count for the requested room type.
    Policy(&'static str),
    /// Requester already booked this slot, or no eligible room left.
    Conflict(&'static str),
    /// Unknown booking code, or user absent from a booking.
    NotFound(&'static str),
    /// Durability failure while committing an accepted operation.
    Wal(String),
}

impl std::fmt::Display for BookingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingError::Validation(msg) => write!(f, "invalid request: {msg}"),
            BookingError::Policy(msg) => write!(f, "policy violation: {msg}"),
            BookingError::Conflict(msg) => write!(f, "conflict: {msg}"),
            BookingError::NotFound(msg) => write!(f, "not found: {msg}"),
            BookingError::Wal(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for BookingError {}

impl From<crate::model::InvalidRoomType> for BookingError {
    fn from(_: crate::model::InvalidRoomType) -> Self {
        BookingError::Validation("invalid room type")
    }
}
