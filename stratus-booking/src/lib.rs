pub mod checkin;
pub mod fulfillment;
pub mod manager;
pub mod pnr;
pub mod quote;

pub use checkin::CheckInService;
pub use manager::{BookingManager, NewBooking};
