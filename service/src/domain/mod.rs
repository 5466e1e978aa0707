//! Domain definitions.

pub mod property;
pub mod reservation;
pub mod user;

pub use self::{property::Property, reservation::Reservation};
