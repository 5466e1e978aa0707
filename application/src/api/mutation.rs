//! GraphQL [`Mutation`]s definitions.

use common::{Currency, Date, Money};
use juniper::graphql_object;
use service::{
    command::{self, cancel_reservation, create_reservation},
    domain::{
        property::{Capacity, Fee, Nights, Price, StayLimits},
        reservation::availability::ViolationKind,
    },
    Command as _,
};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Creates a new `Property` hosted by the `User` with the provided ID.
    ///
    /// Every fee is charged in the currency of the `pricePerNight`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `VALIDATION` - amounts are negative, currencies differ, or stay
    ///                  limits are inconsistent.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createProperty",
            host_id = %host_id,
            otel.name = Self::SPAN_NAME,
            title = %title,
        ),
    )]
    pub async fn create_property(
        host_id: api::user::Id,
        title: api::property::Title,
        price_per_night: Money,
        cleaning_fee: Option<Money>,
        service_fee: Option<Money>,
        security_deposit: Option<Money>,
        max_guests: i32,
        min_nights: Option<i32>,
        max_nights: Option<i32>,
        is_published: Option<bool>,
        ctx: &Context,
    ) -> Result<api::Property, Error> {
        let currency = price_per_night.currency;
        let price_per_night = Price::new(price_per_night.amount)
            .ok_or_else(|| {
                Error::validation(&"`pricePerNight` must be positive")
            })
            .map_err(ctx.error())?;
        let cleaning_fee =
            fee("cleaningFee", currency, cleaning_fee).map_err(ctx.error())?;
        let service_fee =
            fee("serviceFee", currency, service_fee).map_err(ctx.error())?;
        let security_deposit =
            fee("securityDeposit", currency, security_deposit)
                .map_err(ctx.error())?;

        let max_guests = u16::try_from(max_guests)
            .ok()
            .and_then(Capacity::new)
            .ok_or_else(|| {
                Error::validation(&"`maxGuests` must be a positive number")
            })
            .map_err(ctx.error())?;
        let min_nights = nights("minNights", min_nights).map_err(ctx.error())?;
        let max_nights = nights("maxNights", max_nights).map_err(ctx.error())?;
        let stay_limits = StayLimits::new(min_nights, max_nights)
            .ok_or_else(|| {
                Error::validation(&"`minNights` must not exceed `maxNights`")
            })
            .map_err(ctx.error())?;

        ctx.service()
            .execute(command::CreateProperty {
                host_id: host_id.into(),
                title: title.into(),
                currency,
                price_per_night,
                cleaning_fee,
                service_fee,
                security_deposit,
                max_guests,
                stay_limits,
                is_published: is_published.unwrap_or(true),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Creates a new pending `Reservation` of the `Property` by the `User`
    /// with the provided ID.
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
    /// - `DATE_CONFLICT` - the dates overlap an active `Reservation`;
    /// - `STATUS_NOT_FOUND` - the storage is missing reservation statuses.
    #[tracing::instrument(
        skip_all,
        fields(
            check_in = %check_in,
            check_out = %check_out,
            gql.name = "createReservation",
            guest_id = %guest_id,
            otel.name = Self::SPAN_NAME,
            property_id = %property_id,
        ),
    )]
    pub async fn create_reservation(
        property_id: api::property::Id,
        guest_id: api::user::Id,
        check_in: Date,
        check_out: Date,
        adults: i32,
        children: Option<i32>,
        infants: Option<i32>,
        special_requests: Option<api::reservation::SpecialRequests>,
        ctx: &Context,
    ) -> Result<api::Reservation, Error> {
        Self::reserve(
            create_reservation::Payment::Deferred,
            property_id,
            guest_id,
            (check_in, check_out),
            (adults, children, infants),
            special_requests,
            ctx,
        )
        .await
    }

    /// Creates a new `Reservation` paid in full at once, so it's confirmed
    /// right away.
    ///
    /// # Errors
    ///
    /// Possible error codes are the same as of the `createReservation`
    /// mutation.
    #[tracing::instrument(
        skip_all,
        fields(
            check_in = %check_in,
            check_out = %check_out,
            gql.name = "createPaidReservation",
            guest_id = %guest_id,
            otel.name = Self::SPAN_NAME,
            property_id = %property_id,
        ),
    )]
    pub async fn create_paid_reservation(
        property_id: api::property::Id,
        guest_id: api::user::Id,
        check_in: Date,
        check_out: Date,
        adults: i32,
        children: Option<i32>,
        infants: Option<i32>,
        special_requests: Option<api::reservation::SpecialRequests>,
        ctx: &Context,
    ) -> Result<api::Reservation, Error> {
        Self::reserve(
            create_reservation::Payment::Full,
            property_id,
            guest_id,
            (check_in, check_out),
            (adults, children, infants),
            special_requests,
            ctx,
        )
        .await
    }

    /// Cancels the `Reservation` on behalf of its guest, releasing its
    /// dates.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `RESERVATION_NOT_FOUND` - the `Reservation` does not exist;
    /// - `NOT_GUEST` - the `User` is not the guest of the `Reservation`;
    /// - `RESERVATION_NOT_ACTIVE` - the `Reservation` is already cancelled
    ///                              or completed.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "cancelReservation",
            guest_id = %guest_id,
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn cancel_reservation(
        id: api::reservation::Id,
        guest_id: api::user::Id,
        reason: Option<api::reservation::CancellationReason>,
        ctx: &Context,
    ) -> Result<api::Reservation, Error> {
        ctx.service()
            .execute(command::CancelReservation {
                reservation_id: id.into(),
                initiator_id: guest_id.into(),
                reason: reason.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

impl Mutation {
    /// Executes [`command::CreateReservation`] with the provided
    /// [`create_reservation::Payment`].
    async fn reserve(
        payment: create_reservation::Payment,
        property_id: api::property::Id,
        guest_id: api::user::Id,
        (check_in, check_out): (Date, Date),
        (adults, children, infants): (i32, Option<i32>, Option<i32>),
        special_requests: Option<api::reservation::SpecialRequests>,
        ctx: &Context,
    ) -> Result<api::Reservation, Error> {
        let guests = api::query::guests(adults, children, infants)
            .map_err(ctx.error())?;

        ctx.service()
            .execute(command::CreateReservation {
                property_id: property_id.into(),
                guest_id: guest_id.into(),
                check_in,
                check_out,
                guests,
                special_requests: special_requests.map(Into::into),
                payment,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

/// Converts the optional `money` into a [`Fee`] charged in the provided
/// [`Currency`].
///
/// Omitted `money` is a zero [`Fee`].
fn fee(
    name: &str,
    currency: Currency,
    money: Option<Money>,
) -> Result<Fee, Error> {
    let Some(money) = money else {
        return Ok(Fee::ZERO);
    };
    if money.currency != currency {
        return Err(Error::validation(&format!(
            "`{name}` must be in {currency}, got {}",
            money.currency,
        )));
    }
    Fee::new(money.amount).ok_or_else(|| {
        Error::validation(&format!("`{name}` must not be negative"))
    })
}

/// Converts the optional `count` into [`Nights`].
fn nights(name: &str, count: Option<i32>) -> Result<Option<Nights>, Error> {
    count
        .map(|n| {
            u16::try_from(n).ok().and_then(Nights::new).ok_or_else(|| {
                Error::validation(&format!(
                    "`{name}` must be a positive number, got {n}",
                ))
            })
        })
        .transpose()
}

impl AsError for create_reservation::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "DATE_CONFLICT"]
                #[status = CONFLICT]
                #[message = "Dates overlap an existing `Reservation`"]
                DateConflict,

                #[code = "STATUS_NOT_FOUND"]
                #[status = NOT_FOUND]
                #[message = "`Reservation` status is not registered"]
                StatusNotExists,
            }
        }

        match self {
            Self::Db(e) => {
                if self.violation() == Some(ViolationKind::DateConflict) {
                    Some(Error::DateConflict.into())
                } else {
                    e.try_as_error()
                }
            }
            Self::PropertyNotExists(_) => {
                Some(api::query::PropertyError::NotExists.into())
            }
            Self::Rejected(v) => v.try_as_error(),
            Self::StatusNotExists(_) => Some(Error::StatusNotExists.into()),
            Self::CodeExhausted => None,
        }
    }
}

impl AsError for cancel_reservation::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "NOT_GUEST"]
                #[status = FORBIDDEN]
                #[message = "Only the guest may cancel the `Reservation`"]
                NotGuest,

                #[code = "RESERVATION_NOT_ACTIVE"]
                #[status = CONFLICT]
                #[message = "`Reservation` is already cancelled or completed"]
                NotActive,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::ReservationNotExists(_) => {
                api::query::ReservationError::NotExists.into()
            }
            Self::NotGuest { .. } => Error::NotGuest.into(),
            Self::NotActive { .. } => Error::NotActive.into(),
        })
    }
}

#[cfg(test)]
mod spec {
    use common::{Currency, Money};
    use service::{
        command::{cancel_reservation, create_reservation},
        domain::{reservation, user},
    };

    use crate::AsError as _;

    use super::{fee, nights};

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    #[test]
    fn omitted_fee_is_zero() {
        let fee = fee("cleaningFee", Currency::Usd, None).unwrap();

        assert!(fee.amount().is_zero());
    }

    #[test]
    fn rejects_fee_in_other_currency() {
        let err = fee("serviceFee", Currency::Usd, Some(money("10EUR")))
            .unwrap_err();

        assert_eq!(err.code, "VALIDATION");
        assert!(err.message.contains("serviceFee"), "{}", err.message);
    }

    #[test]
    fn rejects_non_positive_nights() {
        assert!(nights("minNights", None).unwrap().is_none());
        assert!(nights("minNights", Some(2)).unwrap().is_some());
        assert!(nights("minNights", Some(0)).is_err());
        assert!(nights("maxNights", Some(-3)).is_err());
    }

    #[test]
    fn maps_cancellation_errors() {
        let forbidden = cancel_reservation::ExecutionError::NotGuest {
            reservation_id: reservation::Id::new(),
            initiator_id: user::Id::new(),
        }
        .as_error();
        assert_eq!(forbidden.code, "NOT_GUEST");
        assert_eq!(forbidden.status_code, http::StatusCode::FORBIDDEN);

        let missing = cancel_reservation::ExecutionError::ReservationNotExists(
            reservation::Id::new(),
        )
        .as_error();
        assert_eq!(missing.code, "RESERVATION_NOT_FOUND");
        assert_eq!(missing.status_code, http::StatusCode::NOT_FOUND);
    }

    #[test]
    fn exhausted_codes_are_internal() {
        let err = create_reservation::ExecutionError::CodeExhausted.as_error();

        assert_eq!(err.code, "INTERNAL_SERVER_ERROR");
        assert_eq!(err.status_code, http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn unregistered_status_is_not_found() {
        let err = create_reservation::ExecutionError::StatusNotExists(
            reservation::Status::Pending,
        )
        .as_error();

        assert_eq!(err.code, "STATUS_NOT_FOUND");
        assert_eq!(err.status_code, http::StatusCode::NOT_FOUND);
    }
}
