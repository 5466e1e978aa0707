//! GraphQL [`Query`]s definitions.

use common::Date;
use juniper::graphql_object;
use service::{
    domain::reservation::Guests,
    query::{self, calculate_pricing, check_availability},
    Query as _,
};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the `Property` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `PROPERTY_NOT_FOUND` - the `Property` with the specified ID does not
    ///                          exist.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "property",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn property(
        id: api::property::Id,
        ctx: &Context,
    ) -> Result<api::Property, Error> {
        ctx.service()
            .execute(query::property::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| PropertyError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `Reservation` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `RESERVATION_NOT_FOUND` - the `Reservation` with the specified ID
    ///                             does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "reservation",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn reservation(
        id: api::reservation::Id,
        ctx: &Context,
    ) -> Result<api::Reservation, Error> {
        ctx.service()
            .execute(query::reservation::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| ReservationError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `Reservation` with the specified code.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `RESERVATION_NOT_FOUND` - the `Reservation` with the specified code
    ///                             does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            code = %code,
            gql.name = "reservationByCode",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn reservation_by_code(
        code: api::reservation::Code,
        ctx: &Context,
    ) -> Result<api::Reservation, Error> {
        ctx.service()
            .execute(query::reservation::ByCode::by(code.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| ReservationError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Checks whether the `Property` can be booked for the provided dates
    /// and guests.
    ///
    /// Nothing is reserved by this query.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `VALIDATION` - guest counts are negative or too large;
    /// - `PROPERTY_NOT_FOUND` - the `Property` does not exist or accepts no
    ///                          reservations;
    /// - `INVALID_DATE_RANGE` - check-in is in the past or check-out is not
    ///                          after it;
    /// - `CHECK_IN_TOO_FAR_IN_FUTURE` - check-in is beyond the booking
    ///                                  horizon;
    /// - `STAY_LENGTH_VIOLATION` - the stay is too short or too long;
    /// - `CAPACITY_VIOLATION` - no adults or too many guests;
    /// - `DATE_CONFLICT` - the dates overlap an active `Reservation`.
    #[tracing::instrument(
        skip_all,
        fields(
            adults = adults,
            check_in = %check_in,
            check_out = %check_out,
            children = ?children,
            gql.name = "availability",
            infants = ?infants,
            otel.name = Self::SPAN_NAME,
            property_id = %property_id,
        ),
    )]
    pub async fn availability(
        property_id: api::property::Id,
        check_in: Date,
        check_out: Date,
        adults: i32,
        children: Option<i32>,
        infants: Option<i32>,
        ctx: &Context,
    ) -> Result<api::reservation::Availability, Error> {
        let guests = guests(adults, children, infants).map_err(ctx.error())?;

        ctx.service()
            .execute(check_availability::CheckAvailability {
                property_id: property_id.into(),
                check_in,
                check_out,
                guests,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Calculates the price breakdown of staying at the `Property` for the
    /// provided dates.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `PROPERTY_NOT_FOUND` - the `Property` does not exist or accepts no
    ///                          reservations;
    /// - `INVALID_DATE_RANGE` - check-in is in the past or check-out is not
    ///                          after it.
    #[tracing::instrument(
        skip_all,
        fields(
            check_in = %check_in,
            check_out = %check_out,
            gql.name = "pricing",
            otel.name = Self::SPAN_NAME,
            property_id = %property_id,
        ),
    )]
    pub async fn pricing(
        property_id: api::property::Id,
        check_in: Date,
        check_out: Date,
        ctx: &Context,
    ) -> Result<api::reservation::Pricing, Error> {
        ctx.service()
            .execute(calculate_pricing::CalculatePricing {
                property_id: property_id.into(),
                check_in,
                check_out,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

/// Builds [`Guests`] out of the provided GraphQL counts.
///
/// Omitted counts are zero.
///
/// # Errors
///
/// Errors with a `VALIDATION` [`Error`] if any count is negative or doesn't
/// fit into [`u16`].
pub(crate) fn guests(
    adults: i32,
    children: Option<i32>,
    infants: Option<i32>,
) -> Result<Guests, Error> {
    let count = |name, n: i32| {
        u16::try_from(n).map_err(|_| {
            Error::validation(&format!(
                "`{name}` must be within 0..={}, got {n}",
                u16::MAX,
            ))
        })
    };
    Ok(Guests {
        adults: count("adults", adults)?,
        children: count("children", children.unwrap_or_default())?,
        infants: count("infants", infants.unwrap_or_default())?,
    })
}

impl AsError for check_availability::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::PropertyNotExists(_) => Some(PropertyError::NotExists.into()),
            Self::Rejected(v) => v.try_as_error(),
        }
    }
}

impl AsError for calculate_pricing::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::PropertyNotExists(_) => Some(PropertyError::NotExists.into()),
            Self::InvalidDates(v) => v.try_as_error(),
        }
    }
}

define_error! {
    enum PropertyError {
        #[code = "PROPERTY_NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "`Property` with the specified ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum ReservationError {
        #[code = "RESERVATION_NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "`Reservation` with the specified ID or code does not \
                     exist"]
        NotExists,
    }
}

#[cfg(test)]
mod spec {
    use service::{
        domain::{property, reservation::Violation},
        query::{calculate_pricing, check_availability},
    };

    use crate::AsError as _;

    use super::guests;

    #[test]
    fn omitted_guest_counts_are_zero() {
        let g = guests(2, None, Some(1)).unwrap();

        assert_eq!((g.adults, g.children, g.infants), (2, 0, 1));
    }

    #[test]
    fn rejects_negative_guest_counts() {
        let err = guests(1, Some(-1), None).unwrap_err();

        assert_eq!(err.code, "VALIDATION");
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        assert!(err.message.contains("children"), "{}", err.message);
    }

    #[test]
    fn unknown_property_is_not_found() {
        let err = check_availability::ExecutionError::PropertyNotExists(
            property::Id::new(),
        )
        .as_error();

        assert_eq!(err.code, "PROPERTY_NOT_FOUND");
        assert_eq!(err.status_code, http::StatusCode::NOT_FOUND);
    }

    #[test]
    fn rule_violation_keeps_its_code() {
        let err = calculate_pricing::ExecutionError::InvalidDates(
            Violation::NoAdults,
        )
        .as_error();

        assert_eq!(err.code, "CAPACITY_VIOLATION");
        assert_eq!(err.status_code, http::StatusCode::UNPROCESSABLE_ENTITY);
    }
}
