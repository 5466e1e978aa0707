//! [`Reservation`] read model definitions.

use common::DateRange;

use crate::domain::{property, reservation};
#[cfg(doc)]
use crate::domain::{Property, Reservation};

/// Wrapper around [`Reservation`] indicating that it [`is_active()`].
///
/// [`is_active()`]: Reservation::is_active
#[derive(Clone, Copy, Debug)]
pub struct Active<T>(pub T);

/// Selector of active [`Reservation`]s of a [`Property`] overlapping the
/// provided dates.
#[derive(Clone, Copy, Debug)]
pub struct Overlapping {
    /// ID of the [`Property`] to select [`Reservation`]s of.
    pub property_id: property::Id,

    /// Dates the selected [`Reservation`]s overlap.
    pub dates: DateRange,
}

/// Registered [`reservation::Status`] entry.
#[derive(Clone, Debug)]
pub struct StatusEntry {
    /// Registered [`reservation::Status`].
    pub status: reservation::Status,

    /// Human-readable name of the [`reservation::Status`].
    pub name: String,
}

/// Number of [`Reservation`]s marked as completed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Completed(pub u64);
