pub mod catalog;
pub mod compactor;
pub mod engine;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod wal;

pub use catalog::Catalog;
pub use engine::{BookingError, Engine};
