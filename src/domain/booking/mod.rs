pub mod model;
pub mod repository;

pub use model::{AccessCodes, Booking, BookingStatus};
pub use repository::{BookingRepository, TransitionPatch};
