//! [`Query`] checking whether a stay at a [`Property`] can be booked.

use common::{
    operations::{By, Select},
    Date, DateRange,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        property,
        reservation::{availability, Guests, Policy, Violation},
        Property, Reservation,
    },
    infra::{database, Database},
    read::reservation::{Active, Overlapping},
    Service,
};

use super::Query;

/// [`Query`] checking whether a stay at a [`Property`] can be booked.
///
/// Nothing is reserved, so a positive answer may be outdated by the time of
/// booking.
#[derive(Clone, Copy, Debug)]
pub struct CheckAvailability {
    /// ID of the [`Property`] to check.
    pub property_id: property::Id,

    /// Date of the first night.
    pub check_in: Date,

    /// Date of leaving.
    pub check_out: Date,

    /// [`Guests`] going to stay.
    pub guests: Guests,
}

/// Positive answer of a [`CheckAvailability`] [`Query`].
#[derive(Clone, Debug)]
pub struct Availability {
    /// Checked [`Property`].
    pub property: Property,

    /// Requested dates.
    pub dates: DateRange,

    /// Number of nights of the stay.
    pub nights: u32,
}

impl<Db> Query<CheckAvailability> for Service<Db>
where
    Db: Database<
            Select<By<Option<Property>, property::Id>>,
            Ok = Option<Property>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Active<Reservation>>, Overlapping>>,
            Ok = Vec<Active<Reservation>>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Availability;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        query: CheckAvailability,
    ) -> Result<Self::Ok, Self::Err> {
        evaluate(
            self.database(),
            &self.config().availability,
            Date::today(),
            query,
        )
        .await
    }
}

/// Evaluates the provided [`CheckAvailability`] against the data visible to
/// the provided `db`, as seen on the `today` date.
///
/// Inside a transaction holding the [`Property`] lock the answer stays valid
/// until the transaction ends.
///
/// # Errors
///
/// See [`ExecutionError`] for details.
pub(crate) async fn evaluate<Db>(
    db: &Db,
    config: &availability::Config,
    today: Date,
    query: CheckAvailability,
) -> Result<Availability, Traced<ExecutionError>>
where
    Db: Database<
            Select<By<Option<Property>, property::Id>>,
            Ok = Option<Property>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Active<Reservation>>, Overlapping>>,
            Ok = Vec<Active<Reservation>>,
            Err = Traced<database::Error>,
        >,
{
    use ExecutionError as E;

    let CheckAvailability {
        property_id,
        check_in,
        check_out,
        guests,
    } = query;

    let property = db
        .execute(Select(By::<Option<Property>, _>::new(property_id)))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?
        .filter(Property::is_bookable)
        .ok_or(E::PropertyNotExists(property_id))
        .map_err(tracerr::wrap!())?;

    let dates = Policy::for_property(config, &property)
        .check(today, check_in, check_out, guests)
        .map_err(tracerr::from_and_wrap!(=> E))?;

    let booked = db
        .execute(Select(By::<Vec<Active<Reservation>>, _>::new(Overlapping {
            property_id,
            dates,
        })))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?;
    availability::ensure_no_conflict(
        dates,
        booked.iter().map(|Active(r)| &r.dates),
    )
    .map_err(|e| {
        log::debug!("`Property(id: {property_id})` is booked: {e}");
        tracerr::new!(E::from(e))
    })?;

    Ok(Availability {
        property,
        dates,
        nights: dates.nights(),
    })
}

/// Error of [`CheckAvailability`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Property`] with the provided ID doesn't exist or accepts no
    /// reservations.
    #[display("`Property(id: {_0})` does not exist")]
    PropertyNotExists(#[error(not(source))] property::Id),

    /// Requested stay breaks a reservation rule.
    #[display("{_0}")]
    #[from]
    Rejected(Violation),
}

impl ExecutionError {
    /// Returns the [`availability::ViolationKind`] of a reservation rule, if
    /// it's the one.
    #[must_use]
    pub fn violation(&self) -> Option<availability::ViolationKind> {
        match self {
            Self::Rejected(v) => Some(v.kind()),
            Self::Db(_) | Self::PropertyNotExists(_) => None,
        }
    }
}

#[cfg(test)]
mod spec {
    use common::{operations::Insert, Date};

    use crate::{
        domain::{
            property,
            reservation::{self, availability::ViolationKind, Guests},
            Property,
        },
        infra::{Database as _, Memory},
        test_support::{in_days, property, reservation, service},
        Query as _, Service,
    };

    use super::{CheckAvailability, ExecutionError};

    fn check(
        property_id: property::Id,
        check_in: Date,
        check_out: Date,
    ) -> CheckAvailability {
        CheckAvailability {
            property_id,
            check_in,
            check_out,
            guests: Guests {
                adults: 2,
                children: 0,
                infants: 0,
            },
        }
    }

    /// Stores a [`Property`] with a confirmed stay between 30 and 34 days
    /// from now.
    async fn booked() -> (Service<Memory>, Property) {
        let svc = service();
        let p = property().build();
        let existing = reservation(
            &in_days(30).to_string(),
            &in_days(34).to_string(),
        )
        .of(&p)
        .status(reservation::Status::Confirmed)
        .build();
        svc.database().execute(Insert(p.clone())).await.unwrap();
        svc.database().execute(Insert(existing)).await.unwrap();
        (svc, p)
    }

    #[tokio::test]
    async fn reports_nights_of_free_stay() {
        let svc = service();
        let p = property().build();
        svc.database().execute(Insert(p.clone())).await.unwrap();

        let available = svc
            .execute(check(p.id, in_days(10), in_days(13)))
            .await
            .unwrap();

        assert_eq!(available.nights, 3);
        assert_eq!(available.property.id, p.id);
    }

    #[tokio::test]
    async fn rejects_overlap() {
        let (svc, p) = booked().await;

        let err = svc
            .execute(check(p.id, in_days(33), in_days(37)))
            .await
            .unwrap_err();

        assert_eq!(
            err.as_ref().violation(),
            Some(ViolationKind::DateConflict),
            "{err}",
        );
    }

    #[tokio::test]
    async fn accepts_check_in_on_existing_check_out() {
        let (svc, p) = booked().await;

        let available = svc
            .execute(check(p.id, in_days(34), in_days(37)))
            .await
            .unwrap();

        assert_eq!(available.nights, 3);
    }

    #[tokio::test]
    async fn rejects_conflict_on_every_repetition() {
        let (svc, p) = booked().await;

        for _ in 0..10 {
            let err = svc
                .execute(check(p.id, in_days(31), in_days(33)))
                .await
                .unwrap_err();

            assert_eq!(
                err.as_ref().violation(),
                Some(ViolationKind::DateConflict),
                "{err}",
            );
        }
    }

    #[tokio::test]
    async fn ignores_cancelled_reservations() {
        let svc = service();
        let p = property().build();
        let cancelled = reservation(
            &in_days(30).to_string(),
            &in_days(34).to_string(),
        )
        .of(&p)
        .status(reservation::Status::Cancelled)
        .build();
        svc.database().execute(Insert(p.clone())).await.unwrap();
        svc.database().execute(Insert(cancelled)).await.unwrap();

        assert!(svc
            .execute(check(p.id, in_days(30), in_days(34)))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn rejects_unpublished_property() {
        let svc = service();
        let p = property().unpublished().build();
        svc.database().execute(Insert(p.clone())).await.unwrap();

        let err = svc
            .execute(check(p.id, in_days(10), in_days(13)))
            .await
            .unwrap_err();

        assert!(
            matches!(err.as_ref(), ExecutionError::PropertyNotExists(_)),
            "{err}",
        );
    }

    #[tokio::test]
    async fn checks_rules_before_conflicts() {
        let (svc, p) = booked().await;

        let err = svc
            .execute(CheckAvailability {
                guests: Guests {
                    adults: 3,
                    children: 2,
                    infants: 0,
                },
                ..check(p.id, in_days(31), in_days(33))
            })
            .await
            .unwrap_err();

        assert_eq!(
            err.as_ref().violation(),
            Some(ViolationKind::Capacity),
            "{err}",
        );
    }
}
