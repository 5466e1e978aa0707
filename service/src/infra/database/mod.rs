//! [`Database`]-related implementations.

#[cfg(any(test, feature = "memory"))]
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use derive_more::{Display, Error as StdError, From};

#[cfg(feature = "postgres")]
pub use self::postgres::Postgres;
#[cfg(any(test, feature = "memory"))]
pub use self::memory::Memory;

/// Database operation.
pub use common::Handler as Database;

pub mod constraint {
    //! Names of the constraints guarding stored data.

    /// Primary key of properties.
    pub const PROPERTY_PKEY: &str = "properties_pkey";

    /// Primary key of reservations.
    pub const RESERVATION_PKEY: &str = "reservations_pkey";

    /// Uniqueness of reservation codes.
    pub const RESERVATION_CODE: &str = "reservations_code_key";

    /// Reference of a reservation to its status.
    pub const RESERVATION_STATUS: &str = "reservations_status_id_fkey";

    /// Absence of overlapping active reservations of the same property.
    pub const RESERVATION_OVERLAP: &str = "reservations_no_overlap";
}

/// [`Database`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    #[cfg(any(test, feature = "memory"))]
    /// [`Memory`] error.
    Memory(memory::Error),

    #[cfg(feature = "postgres")]
    /// [`Postgres`] error.
    Postgres(postgres::Error),
}

impl Error {
    /// Checks if the error is an exclusion violation of the specified
    /// constraint.
    #[must_use]
    pub fn is_exclusion_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            #[cfg(any(test, feature = "memory"))]
            Self::Memory(memory::Error::ExclusionViolation(c)) => {
                constraint.map_or(true, |expected| expected == *c)
            }
            #[cfg(any(test, feature = "memory"))]
            Self::Memory(_) => false,
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.is_exclusion_violation(constraint),
        }
    }
}
