pub mod pricing;
pub mod seatmap;
pub mod seats;

pub use pricing::ConfiguredPromotions;
pub use seatmap::generate_seat_map;
pub use seats::SeatService;
