//! [`Command`] definition.

pub mod cancel_reservation;
pub mod create_property;
pub mod create_reservation;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    cancel_reservation::CancelReservation, create_property::CreateProperty,
    create_reservation::CreateReservation,
};
