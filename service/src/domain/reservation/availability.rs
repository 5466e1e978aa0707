//! Rules deciding whether a stay can be booked.

use common::{Date, DateRange};
use derive_more::{Display, Error};

use crate::domain::{
    property::{Capacity, Nights},
    Property,
};

use super::Guests;

/// Service-wide defaults for a [`Policy`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Number of calendar months ahead of today a stay may start in.
    pub booking_horizon_months: u16,

    /// Minimum nights of a stay for [`Property`]s not restricting it.
    pub default_min_nights: Nights,

    /// Maximum nights of a stay for [`Property`]s not restricting it, if
    /// any.
    pub default_max_nights: Option<Nights>,
}

/// Effective limits applied to a stay at a specific [`Property`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Policy {
    /// Minimum number of nights.
    pub min_nights: Nights,

    /// Maximum number of nights, if restricted.
    pub max_nights: Option<Nights>,

    /// Maximum number of adults and children.
    pub max_guests: Capacity,

    /// Number of calendar months ahead of today a check-in may be.
    pub booking_horizon_months: u16,
}

impl Policy {
    /// Builds the [`Policy`] of the provided [`Property`], falling back to
    /// the [`Config`] defaults where the [`Property`] sets no limit.
    #[must_use]
    pub fn for_property(config: &Config, property: &Property) -> Self {
        Self {
            min_nights: property
                .stay_limits
                .min()
                .unwrap_or(config.default_min_nights),
            max_nights: property
                .stay_limits
                .max()
                .or(config.default_max_nights),
            max_guests: property.max_guests,
            booking_horizon_months: config.booking_horizon_months,
        }
    }

    /// Checks whether a stay of the provided `guests` between `check_in` and
    /// `check_out` satisfies this [`Policy`], as seen on the `today` date.
    ///
    /// Rules are checked in order, failing at the first broken one: dates
    /// sanity, booking horizon, stay length, then capacity. Conflicts with
    /// existing reservations are not considered here, see
    /// [`ensure_no_conflict()`].
    ///
    /// # Errors
    ///
    /// With the first [`Violation`] of this [`Policy`].
    pub fn check(
        &self,
        today: Date,
        check_in: Date,
        check_out: Date,
        guests: Guests,
    ) -> Result<DateRange, Violation> {
        use Violation as V;

        let dates = check_dates(today, check_in, check_out)?;

        // No limit if the horizon falls off the calendar.
        if let Some(latest) = self.latest_check_in(today) {
            if check_in > latest {
                return Err(V::CheckInTooFarInFuture { check_in, latest });
            }
        }

        let nights = dates.nights();
        if nights < self.min_nights.get() {
            return Err(V::StayTooShort {
                nights,
                min: self.min_nights,
            });
        }
        if let Some(max) = self.max_nights {
            if nights > max.get() {
                return Err(V::StayTooLong { nights, max });
            }
        }

        if guests.adults < 1 {
            return Err(V::NoAdults);
        }
        if guests.counted() > self.max_guests.get() {
            return Err(V::TooManyGuests {
                guests: guests.counted(),
                max: self.max_guests,
            });
        }

        Ok(dates)
    }

    /// Returns the latest check-in [`Date`] allowed on the `today` date.
    #[must_use]
    pub fn latest_check_in(&self, today: Date) -> Option<Date> {
        today.checked_add_months(self.booking_horizon_months.into())
    }
}

/// Checks whether a stay between `check_in` and `check_out` makes sense as
/// seen on the `today` date: it starts not in the past and lasts at least one
/// night.
///
/// # Errors
///
/// With [`Violation::PastCheckIn`] or [`Violation::CheckOutNotAfterCheckIn`].
pub fn check_dates(
    today: Date,
    check_in: Date,
    check_out: Date,
) -> Result<DateRange, Violation> {
    if check_in < today {
        return Err(Violation::PastCheckIn { check_in, today });
    }
    DateRange::new(check_in, check_out).ok_or(
        Violation::CheckOutNotAfterCheckIn {
            check_in,
            check_out,
        },
    )
}

/// Ensures the requested `dates` overlap none of the `booked` ones.
///
/// # Errors
///
/// With [`Violation::DateConflict`] naming the first overlapping range.
pub fn ensure_no_conflict<'a>(
    dates: DateRange,
    booked: impl IntoIterator<Item = &'a DateRange>,
) -> Result<(), Violation> {
    match booked.into_iter().find(|b| b.overlaps(&dates)) {
        Some(existing) => Err(Violation::DateConflict {
            requested: dates,
            existing: *existing,
        }),
        None => Ok(()),
    }
}

/// Business rule rejecting a stay.
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
pub enum Violation {
    /// Check-in is before today.
    #[display("check-in date {check_in} is in the past (today is {today})")]
    PastCheckIn {
        /// Requested check-in.
        check_in: Date,

        /// Current date.
        today: Date,
    },

    /// Check-out is not after check-in.
    #[display("check-out date {check_out} must be after check-in {check_in}")]
    CheckOutNotAfterCheckIn {
        /// Requested check-in.
        check_in: Date,

        /// Requested check-out.
        check_out: Date,
    },

    /// Check-in is further away than the booking horizon.
    #[display("check-in date {check_in} is after the latest allowed {latest}")]
    CheckInTooFarInFuture {
        /// Requested check-in.
        check_in: Date,

        /// Latest allowed check-in.
        latest: Date,
    },

    /// Stay is shorter than allowed.
    #[display("stay of {nights} night(s) is shorter than minimum of {min}")]
    StayTooShort {
        /// Requested number of nights.
        nights: u32,

        /// Minimum allowed.
        min: Nights,
    },

    /// Stay is longer than allowed.
    #[display("stay of {nights} night(s) is longer than maximum of {max}")]
    StayTooLong {
        /// Requested number of nights.
        nights: u32,

        /// Maximum allowed.
        max: Nights,
    },

    /// No adult is staying.
    #[display("at least one adult must stay")]
    NoAdults,

    /// More guests than the [`Property`] accommodates.
    #[display("{guests} guest(s) exceed capacity of {max}")]
    TooManyGuests {
        /// Requested adults and children.
        guests: u32,

        /// Capacity of the [`Property`].
        max: Capacity,
    },

    /// Dates overlap an active reservation.
    #[display("dates {requested} overlap an existing reservation {existing}")]
    DateConflict {
        /// Requested dates.
        requested: DateRange,

        /// Dates of the conflicting reservation.
        existing: DateRange,
    },
}

impl Violation {
    /// Returns the [`ViolationKind`] of this [`Violation`].
    #[must_use]
    pub fn kind(&self) -> ViolationKind {
        use ViolationKind as K;

        match self {
            Self::PastCheckIn { .. } | Self::CheckOutNotAfterCheckIn { .. } => {
                K::InvalidDateRange
            }
            Self::CheckInTooFarInFuture { .. } => K::CheckInTooFarInFuture,
            Self::StayTooShort { .. } | Self::StayTooLong { .. } => {
                K::StayLength
            }
            Self::NoAdults | Self::TooManyGuests { .. } => K::Capacity,
            Self::DateConflict { .. } => K::DateConflict,
        }
    }
}

/// Kind of a [`Violation`], as reported to callers.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ViolationKind {
    /// Dates are in the past or not ordered.
    InvalidDateRange,

    /// Check-in is too far ahead.
    CheckInTooFarInFuture,

    /// Stay is too short or too long.
    StayLength,

    /// Guests don't fit the [`Property`].
    Capacity,

    /// Dates are already booked.
    DateConflict,
}
