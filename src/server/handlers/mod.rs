pub mod bookings;
pub mod locations;
pub mod pricing;
pub mod quotes;
pub mod trips;
