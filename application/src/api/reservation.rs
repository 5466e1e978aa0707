//! [`Reservation`]-related definitions.

use common::{Date, DateTime, Money};
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::{
    domain::{
        self,
        reservation::{availability::ViolationKind, payment, Violation},
    },
    query::check_availability,
};
use uuid::Uuid;

use crate::{api, api::scalar, AsError, Context, Error};

/// A booked stay of a guest at a `Property`.
#[derive(Clone, Debug, From)]
pub struct Reservation(domain::Reservation);

impl Reservation {
    /// Returns the [`api::Property`] reserved by this [`Reservation`].
    #[expect(unsafe_code, reason = "`Property` is referenced by `Reservation`")]
    fn reserved_property(&self) -> api::Property {
        unsafe { api::Property::new_unchecked(self.0.property_id) }
    }
}

/// A booked stay of a guest at a `Property`.
#[graphql_object(context = Context)]
impl Reservation {
    /// Unique identifier of this `Reservation`.
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// Human-shareable unique code of this `Reservation`.
    pub fn code(&self) -> Code {
        self.0.code.clone().into()
    }

    /// Reserved `Property`.
    pub fn property(&self) -> api::Property {
        self.reserved_property()
    }

    /// ID of the `User` who made this `Reservation`.
    pub fn guest_id(&self) -> api::user::Id {
        self.0.guest_id.into()
    }

    /// Date of the first night.
    pub fn check_in(&self) -> Date {
        self.0.dates.start()
    }

    /// Date of leaving.
    pub fn check_out(&self) -> Date {
        self.0.dates.end()
    }

    /// Number of adults.
    pub fn adults(&self) -> i32 {
        self.0.guests.adults.into()
    }

    /// Number of children.
    pub fn children(&self) -> i32 {
        self.0.guests.children.into()
    }

    /// Number of infants.
    pub fn infants(&self) -> i32 {
        self.0.guests.infants.into()
    }

    /// Requests of the guest to the host, if any.
    pub fn special_requests(&self) -> Option<&str> {
        self.0.special_requests.as_ref().map(AsRef::as_ref)
    }

    /// Price breakdown snapshotted at the moment of booking.
    pub fn pricing(&self) -> Pricing {
        self.0.pricing.into()
    }

    /// Status of paying for this `Reservation`.
    pub fn payment_status(&self) -> PaymentStatus {
        self.0.payment.status().into()
    }

    /// Amount paid so far.
    pub fn amount_paid(&self) -> Money {
        Money::new(self.0.payment.amount_paid(), self.0.pricing.currency)
    }

    /// Amount still to be paid, never negative.
    pub fn balance_due(&self) -> Money {
        Money::new(
            self.0.payment.balance_due(self.0.pricing.total),
            self.0.pricing.currency,
        )
    }

    /// `DateTime` when the last payment was received, if any.
    pub fn paid_at(&self) -> Option<DateTime> {
        self.0.payment.paid_at().map(|at| at.coerce())
    }

    /// Status of this `Reservation`.
    pub fn status(&self) -> Status {
        self.0.status.into()
    }

    /// `DateTime` when this `Reservation` was created.
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }

    /// `DateTime` when this `Reservation` was confirmed, if it was.
    pub fn confirmed_at(&self) -> Option<DateTime> {
        self.0.confirmed_at.map(|at| at.coerce())
    }

    /// `DateTime` when this `Reservation` was cancelled, if it was.
    pub fn cancelled_at(&self) -> Option<DateTime> {
        self.0.cancelled_at.map(|at| at.coerce())
    }

    /// Reason of cancelling this `Reservation`, if given.
    pub fn cancellation_reason(&self) -> Option<&str> {
        self.0.cancellation_reason.as_ref().map(AsRef::as_ref)
    }
}

/// Price breakdown of a stay.
///
/// Amounts are formatted with exactly two decimal places.
#[derive(Clone, Copy, Debug, From)]
pub struct Pricing(domain::reservation::Pricing);

/// Price breakdown of a stay.
///
/// Amounts are formatted with exactly two decimal places.
#[graphql_object(context = Context)]
impl Pricing {
    /// Number of nights of the stay.
    pub fn nights(&self) -> i32 {
        i32::try_from(self.0.nights).unwrap_or(i32::MAX)
    }

    /// Currency of all the amounts.
    pub fn currency(&self) -> api::property::Currency {
        self.0.currency.into()
    }

    /// Price of a single night.
    pub fn price_per_night(&self) -> String {
        self.0.formatted().price_per_night
    }

    /// One-off cleaning fee.
    pub fn cleaning_fee(&self) -> String {
        self.0.formatted().cleaning_fee
    }

    /// One-off service fee.
    pub fn service_fee(&self) -> String {
        self.0.formatted().service_fee
    }

    /// Refundable security deposit, not included into the `totalAmount`.
    pub fn security_deposit(&self) -> String {
        self.0.formatted().security_deposit
    }

    /// Price of all the nights.
    pub fn subtotal(&self) -> String {
        self.0.formatted().subtotal
    }

    /// Amount to be paid for the stay.
    pub fn total_amount(&self) -> String {
        self.0.formatted().total
    }
}

/// Positive answer on whether a stay can be booked.
#[derive(Clone, Debug, From)]
pub struct Availability(check_availability::Availability);

/// Positive answer on whether a stay can be booked.
#[graphql_object(context = Context)]
impl Availability {
    /// Always `true`, unavailable stays are reported as errors.
    pub fn available(&self) -> bool {
        true
    }

    /// Checked `Property`.
    pub fn property(&self) -> api::Property {
        self.0.property.clone().into()
    }

    /// Number of nights of the stay.
    pub fn nights(&self) -> i32 {
        i32::try_from(self.0.nights).unwrap_or(i32::MAX)
    }

    /// Date of the first night.
    pub fn check_in(&self) -> Date {
        self.0.dates.start()
    }

    /// Date of leaving.
    pub fn check_out(&self) -> Date {
        self.0.dates.end()
    }
}

/// Unique identifier of a `Reservation`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::reservation::Id)]
#[into(domain::reservation::Id)]
#[graphql(name = "ReservationId", transparent)]
pub struct Id(Uuid);

/// Human-shareable code of a `Reservation`, like `RSV-7Q2M9XKD`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ReservationCode",
    with = scalar::Via::<domain::reservation::Code>,
)]
pub struct Code(domain::reservation::Code);

/// Requests of a guest to the host.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "SpecialRequests",
    with = scalar::Via::<domain::reservation::SpecialRequests>,
)]
pub struct SpecialRequests(domain::reservation::SpecialRequests);

/// Reason of cancelling a `Reservation`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "CancellationReason",
    with = scalar::Via::<domain::reservation::CancellationReason>,
)]
pub struct CancellationReason(domain::reservation::CancellationReason);

/// Status of a `Reservation`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
pub enum Status {
    /// Awaiting payment or host confirmation.
    Pending,

    /// Confirmed and holding its dates.
    Confirmed,

    /// Cancelled, dates released.
    Cancelled,

    /// Stay is over.
    Completed,
}

impl From<domain::reservation::Status> for Status {
    fn from(status: domain::reservation::Status) -> Self {
        use domain::reservation::Status as S;

        match status {
            S::Pending => Self::Pending,
            S::Confirmed => Self::Confirmed,
            S::Cancelled => Self::Cancelled,
            S::Completed => Self::Completed,
        }
    }
}

/// Status of paying for a `Reservation`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
pub enum PaymentStatus {
    /// Nothing is paid yet.
    Pending,

    /// Paid in full.
    Paid,

    /// Payment attempt failed.
    Failed,

    /// Paid amount is returned to the guest.
    Refunded,
}

impl From<payment::Status> for PaymentStatus {
    fn from(status: payment::Status) -> Self {
        match status {
            payment::Status::Pending => Self::Pending,
            payment::Status::Paid => Self::Paid,
            payment::Status::Failed => Self::Failed,
            payment::Status::Refunded => Self::Refunded,
        }
    }
}

impl AsError for Violation {
    fn try_as_error(&self) -> Option<Error> {
        let (code, status_code) = match self.kind() {
            ViolationKind::InvalidDateRange => {
                ("INVALID_DATE_RANGE", http::StatusCode::UNPROCESSABLE_ENTITY)
            }
            ViolationKind::CheckInTooFarInFuture => (
                "CHECK_IN_TOO_FAR_IN_FUTURE",
                http::StatusCode::UNPROCESSABLE_ENTITY,
            ),
            ViolationKind::StayLength => (
                "STAY_LENGTH_VIOLATION",
                http::StatusCode::UNPROCESSABLE_ENTITY,
            ),
            ViolationKind::Capacity => {
                ("CAPACITY_VIOLATION", http::StatusCode::UNPROCESSABLE_ENTITY)
            }
            ViolationKind::DateConflict => {
                ("DATE_CONFLICT", http::StatusCode::CONFLICT)
            }
        };
        Some(Error {
            code,
            status_code,
            message: self.to_string(),
            backtrace: None,
        })
    }
}

#[cfg(test)]
mod spec {
    use common::{Date, DateRange};
    use service::domain::{
        property::Nights,
        reservation::Violation,
    };

    use crate::AsError as _;

    fn date(s: &str) -> Date {
        s.parse().unwrap()
    }

    #[test]
    fn maps_conflict_to_409() {
        let err = Violation::DateConflict {
            requested: DateRange::new(date("2025-07-04"), date("2025-07-08"))
                .unwrap(),
            existing: DateRange::new(date("2025-07-01"), date("2025-07-05"))
                .unwrap(),
        }
        .as_error();

        assert_eq!(err.code, "DATE_CONFLICT");
        assert_eq!(err.status_code, http::StatusCode::CONFLICT);
        assert!(err.message.contains("2025-07-01"), "{}", err.message);
    }

    #[test]
    fn maps_rule_violations_to_422() {
        for (violation, code) in [
            (Violation::NoAdults, "CAPACITY_VIOLATION"),
            (
                Violation::StayTooShort {
                    nights: 1,
                    min: Nights::new(2).unwrap(),
                },
                "STAY_LENGTH_VIOLATION",
            ),
            (
                Violation::PastCheckIn {
                    check_in: date("2025-01-01"),
                    today: date("2025-01-02"),
                },
                "INVALID_DATE_RANGE",
            ),
        ] {
            let err = violation.as_error();

            assert_eq!(err.code, code);
            assert_eq!(
                err.status_code,
                http::StatusCode::UNPROCESSABLE_ENTITY,
            );
        }
    }
}
