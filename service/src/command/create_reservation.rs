//! [`Command`] for creating a new [`Reservation`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted, Update},
    Date, DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        property,
        reservation::{
            self, availability, Code, Guests, Payment as PaymentState,
            Pricing, SpecialRequests, Violation,
        },
        user, Property, Reservation,
    },
    infra::{database, Database},
    query::check_availability::{self, Availability, CheckAvailability},
    read::reservation::{Active, Overlapping, StatusEntry},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Reservation`].
#[derive(Clone, Debug)]
pub struct CreateReservation {
    /// ID of the [`Property`] to reserve.
    pub property_id: property::Id,

    /// ID of the guest making the [`Reservation`].
    pub guest_id: user::Id,

    /// Date of the first night.
    pub check_in: Date,

    /// Date of leaving, the night before it is the last one.
    pub check_out: Date,

    /// [`Guests`] staying.
    pub guests: Guests,

    /// [`SpecialRequests`] of the guest, if any.
    pub special_requests: Option<SpecialRequests>,

    /// How a new [`Reservation`] is paid.
    pub payment: Payment,
}

/// Way of paying for a new [`Reservation`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Payment {
    /// Nothing is paid upon creation, the [`Reservation`] stays pending.
    #[default]
    Deferred,

    /// Whole total is paid upon creation, confirming the [`Reservation`].
    Full,
}

impl<Db> Command<CreateReservation> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Property, property::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Property>, property::Id>>,
            Ok = Option<Property>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Active<Reservation>>, Overlapping>>,
            Ok = Vec<Active<Reservation>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<StatusEntry>, reservation::Status>>,
            Ok = Option<StatusEntry>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Reservation>, Code>>,
            Ok = Option<Reservation>,
            Err = Traced<database::Error>,
        > + Database<Insert<Reservation>, Ok = (), Err = Traced<database::Error>>
        + Database<Update<Reservation>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Reservation;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateReservation,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateReservation {
            property_id,
            guest_id,
            check_in,
            check_out,
            guests,
            special_requests,
            payment,
        } = cmd;

        let created = async {
            let tx = self
                .database()
                .execute(Transact)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;

            // Serialize concurrent bookings of the same `Property`, so the
            // conflict check below and the insert are atomic.
            tx.execute(Lock(By::new(property_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;

            let Availability {
                property, dates, ..
            } = check_availability::evaluate(
                &tx,
                &self.config().availability,
                Date::today(),
                CheckAvailability {
                    property_id,
                    check_in,
                    check_out,
                    guests,
                },
            )
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

            let pricing = Pricing::calculate(&property, dates);

            tx.execute(Select(By::<Option<StatusEntry>, _>::new(
                reservation::Status::Pending,
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::StatusNotExists(reservation::Status::Pending))
            .map_err(tracerr::wrap!())?;

            let code = self.generate_code(&tx).await.map_err(tracerr::wrap!())?;

            let mut reservation = Reservation {
                id: reservation::Id::new(),
                code,
                property_id,
                guest_id,
                dates,
                guests,
                special_requests,
                pricing,
                payment: PaymentState::pending(),
                status: reservation::Status::Pending,
                created_at: DateTime::now().coerce(),
                confirmed_at: None,
                cancelled_at: None,
                cancellation_reason: None,
            };
            tx.execute(Insert(reservation.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;

            if payment == Payment::Full {
                reservation.confirm_with_full_payment(DateTime::now());
                tx.execute(Update(reservation.clone()))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
            }

            tx.execute(Commit)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;

            Ok::<_, Traced<E>>(reservation)
        }
        .await
        .inspect_err(|e| {
            if matches!(e.as_ref(), E::Db(_)) && e.as_ref().violation().is_none()
            {
                log::error!(
                    "failed to reserve `Property(id: {property_id})`, \
                     rolled back: {e}\n{}",
                    e.trace(),
                );
            }
        })?;

        log::info!(
            "`Reservation(id: {}, code: {})` created for \
             `Property(id: {property_id})` on {}",
            created.id,
            created.code,
            created.dates,
        );

        Ok(created)
    }
}

impl<Db> Service<Db> {
    /// Generates a new [`Code`] not used by any [`Reservation`] yet.
    async fn generate_code<Tx>(
        &self,
        tx: &Tx,
    ) -> Result<Code, Traced<ExecutionError>>
    where
        Tx: Database<
            Select<By<Option<Reservation>, Code>>,
            Ok = Option<Reservation>,
            Err = Traced<database::Error>,
        >,
    {
        use ExecutionError as E;

        for _ in 0..self.config().code_attempts.max(1) {
            let code = Code::generate();
            let taken = tx
                .execute(Select(By::<Option<Reservation>, _>::new(
                    code.clone(),
                )))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .is_some();
            if !taken {
                return Ok(code);
            }
            log::warn!("`reservation::Code({code})` collision, regenerating");
        }
        Err(tracerr::new!(E::CodeExhausted))
    }
}

/// Error of [`CreateReservation`] [`Command`] execution.
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

    /// [`reservation::Status`] is not registered.
    #[display("`reservation::Status({_0})` is not registered")]
    StatusNotExists(#[error(not(source))] reservation::Status),

    /// Requested stay breaks a reservation rule.
    #[display("{_0}")]
    #[from]
    Rejected(Violation),

    /// No unused [`Code`] was generated in the configured number of attempts.
    #[display("failed to generate an unused `reservation::Code`")]
    CodeExhausted,
}

impl From<check_availability::ExecutionError> for ExecutionError {
    fn from(err: check_availability::ExecutionError) -> Self {
        use check_availability::ExecutionError as E;

        match err {
            E::Db(e) => Self::Db(e),
            E::PropertyNotExists(id) => Self::PropertyNotExists(id),
            E::Rejected(v) => Self::Rejected(v),
        }
    }
}

impl ExecutionError {
    /// Returns the [`Violation`] of a reservation rule, if it's the one.
    ///
    /// Overlaps caught by the storage constraint are reported as
    /// [`Violation::DateConflict`]-like too.
    #[must_use]
    pub fn violation(&self) -> Option<availability::ViolationKind> {
        match self {
            Self::Rejected(v) => Some(v.kind()),
            Self::Db(e) if e.is_exclusion_violation(None) => {
                Some(availability::ViolationKind::DateConflict)
            }
            Self::Db(_)
            | Self::PropertyNotExists(_)
            | Self::StatusNotExists(_)
            | Self::CodeExhausted => None,
        }
    }
}

#[cfg(test)]
mod spec {
    use common::{
        operations::{By, Insert, Select, Update},
        Date, DateRange,
    };
    use futures::future;
    use rust_decimal::Decimal;

    use crate::{
        domain::{
            reservation::{self, availability::ViolationKind, payment, Guests},
            user, Property, Reservation,
        },
        infra::{Database as _, Memory},
        read::reservation::{Active, Overlapping},
        test_support::{config, decimal, in_days, property, service},
        Command as _, Service,
    };

    use super::{CreateReservation, ExecutionError, Payment};

    fn request(
        property: &Property,
        check_in: Date,
        check_out: Date,
    ) -> CreateReservation {
        CreateReservation {
            property_id: property.id,
            guest_id: user::Id::new(),
            check_in,
            check_out,
            guests: Guests {
                adults: 2,
                children: 0,
                infants: 0,
            },
            special_requests: None,
            payment: Payment::Deferred,
        }
    }

    async fn stored(svc: &Service<Memory>, p: Property) -> Property {
        svc.database().execute(Insert(p.clone())).await.unwrap();
        p
    }

    async fn active(
        svc: &Service<Memory>,
        property: &Property,
        dates: DateRange,
    ) -> Vec<Active<Reservation>> {
        svc.database()
            .execute(Select(By::<Vec<Active<Reservation>>, _>::new(
                Overlapping {
                    property_id: property.id,
                    dates,
                },
            )))
            .await
            .unwrap()
    }

    fn violation(err: &tracerr::Traced<ExecutionError>) -> Option<ViolationKind> {
        err.as_ref().violation()
    }

    #[tokio::test]
    async fn creates_pending_reservation() {
        let svc = service();
        let property = stored(&svc, property().min_nights(2).build()).await;

        let created = svc
            .execute(request(&property, in_days(10), in_days(13)))
            .await
            .unwrap();

        assert_eq!(created.status, reservation::Status::Pending);
        assert_eq!(created.payment.status(), payment::Status::Pending);
        assert_eq!(created.payment.amount_paid(), Decimal::ZERO);
        assert!(created.confirmed_at.is_none());
        assert_eq!(created.pricing.nights, 3);
        assert_eq!(created.pricing.subtotal, decimal("300"));
        assert_eq!(created.pricing.total, decimal("330"));
        assert!(reservation::Code::new(AsRef::<str>::as_ref(&created.code)).is_some());

        let found = svc
            .database()
            .execute(Select(By::<Option<Reservation>, _>::new(created.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.code, created.code);
    }

    #[tokio::test]
    async fn full_payment_confirms_reservation() {
        let svc = service();
        let property = stored(&svc, property().build()).await;

        let created = svc
            .execute(CreateReservation {
                payment: Payment::Full,
                ..request(&property, in_days(10), in_days(13))
            })
            .await
            .unwrap();

        assert_eq!(created.status, reservation::Status::Confirmed);
        assert_eq!(created.payment.status(), payment::Status::Paid);
        assert_eq!(created.payment.amount_paid(), created.pricing.total);
        assert!(created.payment.paid_at().is_some());
        assert!(created.confirmed_at.is_some());

        let found = svc
            .database()
            .execute(Select(By::<Option<Reservation>, _>::new(created.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.status, reservation::Status::Confirmed);
        assert_eq!(found.payment.amount_paid(), created.pricing.total);
    }

    #[tokio::test]
    async fn rejects_missing_or_unbookable_property() {
        let svc = service();
        let hidden = stored(&svc, property().unpublished().build()).await;
        let missing = property().build();

        for p in [&hidden, &missing] {
            let err = svc
                .execute(request(p, in_days(10), in_days(12)))
                .await
                .unwrap_err();

            assert!(
                matches!(err.as_ref(), ExecutionError::PropertyNotExists(id) if *id == p.id),
                "{err}",
            );
        }
    }

    #[tokio::test]
    async fn rejects_rule_violations() {
        let svc = service();
        let property =
            stored(&svc, property().min_nights(2).max_guests(4).build()).await;

        let short = svc
            .execute(request(&property, in_days(10), in_days(11)))
            .await
            .unwrap_err();
        assert_eq!(violation(&short), Some(ViolationKind::StayLength));

        let crowded = svc
            .execute(CreateReservation {
                guests: Guests {
                    adults: 3,
                    children: 2,
                    infants: 0,
                },
                ..request(&property, in_days(10), in_days(13))
            })
            .await
            .unwrap_err();
        assert_eq!(violation(&crowded), Some(ViolationKind::Capacity));

        let past = svc
            .execute(request(&property, in_days(-3), in_days(1)))
            .await
            .unwrap_err();
        assert_eq!(violation(&past), Some(ViolationKind::InvalidDateRange));

        let far = svc
            .execute(request(&property, in_days(400), in_days(403)))
            .await
            .unwrap_err();
        assert_eq!(violation(&far), Some(ViolationKind::CheckInTooFarInFuture));
    }

    #[tokio::test]
    async fn rejects_overlap_and_allows_back_to_back() {
        let svc = service();
        let property = stored(&svc, property().build()).await;
        _ = svc
            .execute(CreateReservation {
                payment: Payment::Full,
                ..request(&property, in_days(30), in_days(34))
            })
            .await
            .unwrap();

        for _ in 0..3 {
            let err = svc
                .execute(request(&property, in_days(33), in_days(37)))
                .await
                .unwrap_err();
            assert_eq!(violation(&err), Some(ViolationKind::DateConflict));
        }

        assert!(svc
            .execute(request(&property, in_days(34), in_days(37)))
            .await
            .is_ok());
        assert!(svc
            .execute(request(&property, in_days(27), in_days(30)))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn cancelled_reservation_releases_dates() {
        let svc = service();
        let property = stored(&svc, property().build()).await;
        let mut first = svc
            .execute(request(&property, in_days(30), in_days(34)))
            .await
            .unwrap();

        first.status = reservation::Status::Cancelled;
        svc.database()
            .execute(Update(first))
            .await
            .unwrap();

        assert!(svc
            .execute(request(&property, in_days(30), in_days(34)))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn requires_pending_status_registered() {
        let svc = Service {
            config: config(),
            database: Memory::unseeded(),
        };
        let property = stored(&svc, property().build()).await;

        let err = svc
            .execute(request(&property, in_days(10), in_days(12)))
            .await
            .unwrap_err();

        assert!(
            matches!(err.as_ref(), ExecutionError::StatusNotExists(_)),
            "{err}",
        );
    }

    #[tokio::test]
    async fn rolls_back_on_storage_failure() {
        let svc = service();
        let property = stored(&svc, property().build()).await;
        let req = request(&property, in_days(10), in_days(12));

        svc.database().fail_writes(true);
        let err = svc.execute(req.clone()).await.unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::Db(_)), "{err}");

        svc.database().fail_writes(false);
        let created = svc.execute(req).await.unwrap();
        assert_eq!(created.status, reservation::Status::Pending);
    }

    #[tokio::test]
    async fn rolls_back_paid_reservation_failing_after_insert() {
        let svc = service();
        let property = stored(&svc, property().build()).await;
        let req = CreateReservation {
            payment: Payment::Full,
            ..request(&property, in_days(10), in_days(12))
        };
        let dates = DateRange::new(req.check_in, req.check_out).unwrap();

        // `Insert` succeeds, confirming `Update` fails.
        svc.database().fail_writes_after(1);
        let err = svc.execute(req.clone()).await.unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::Db(_)), "{err}");
        svc.database().fail_writes(false);
        assert!(active(&svc, &property, dates).await.is_empty());

        // Every write succeeds, `Commit` fails.
        svc.database().fail_commits(true);
        let err = svc.execute(req.clone()).await.unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::Db(_)), "{err}");
        svc.database().fail_commits(false);
        assert!(active(&svc, &property, dates).await.is_empty());

        let created = svc.execute(req).await.unwrap();
        assert_eq!(created.status, reservation::Status::Confirmed);
        assert!(svc
            .database()
            .execute(Select(By::<Option<Reservation>, _>::new(
                created.code.clone(),
            )))
            .await
            .unwrap()
            .is_some());
        assert_eq!(active(&svc, &property, dates).await.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_book_exactly_once() {
        const N: usize = 16;

        let svc = service();
        let property = stored(&svc, property().build()).await;
        let req = request(&property, in_days(60), in_days(64));

        let results = future::join_all((0..N).map(|_| {
            let (svc, req) = (svc.clone(), req.clone());
            tokio::spawn(async move { svc.execute(req).await })
        }))
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect::<Vec<_>>();

        let created = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .filter(|e| violation(e) == Some(ViolationKind::DateConflict))
            .count();
        assert_eq!(created, 1);
        assert_eq!(conflicts, N - 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_overlapping_requests_never_double_book() {
        let svc = service();
        let property = stored(&svc, property().build()).await;
        let stays = [(60, 64), (62, 66), (63, 65), (59, 61), (64, 68)];

        let results = future::join_all(stays.iter().map(|(from, to)| {
            let svc = svc.clone();
            let req = request(&property, in_days(*from), in_days(*to));
            tokio::spawn(async move { svc.execute(req).await })
        }))
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect::<Vec<_>>();

        let booked = results
            .into_iter()
            .filter_map(Result::ok)
            .map(|r| r.dates)
            .collect::<Vec<_>>();
        assert!(!booked.is_empty());
        for (i, a) in booked.iter().enumerate() {
            for b in &booked[i + 1..] {
                assert!(!a.overlaps(b), "{a} overlaps {b}");
            }
        }
    }
}
