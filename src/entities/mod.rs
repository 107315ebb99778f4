mod booking;
mod location;
mod trip;
mod vehicle;

pub use booking::{Booking, BookingCost, Status as BookingStatus};
pub use location::{Coordinates, Location};
pub use trip::{Status as TripStatus, Trip, TripCost};
pub use vehicle::VehicleKind;
