//! [`Command`] for cancelling a [`Reservation`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        property,
        reservation::{self, CancellationReason},
        user, Property, Reservation,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for cancelling a [`Reservation`].
#[derive(Clone, Debug)]
pub struct CancelReservation {
    /// ID of the [`Reservation`] to be cancelled.
    pub reservation_id: reservation::Id,

    /// ID of the user who cancels the [`Reservation`].
    pub initiator_id: user::Id,

    /// [`CancellationReason`], if given.
    pub reason: Option<CancellationReason>,
}

impl<Db> Command<CancelReservation> for Service<Db>
where
    Db: Database<
            Select<By<Option<Reservation>, reservation::Id>>,
            Ok = Option<Reservation>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Property, property::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Reservation>, reservation::Id>>,
            Ok = Option<Reservation>,
            Err = Traced<database::Error>,
        > + Database<Update<Reservation>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Reservation;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CancelReservation,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CancelReservation {
            reservation_id,
            initiator_id,
            reason,
        } = cmd;

        let cancelled = async {
            let property_id = self
                .database()
                .execute(Select(By::<Option<Reservation>, _>::new(
                    reservation_id,
                )))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::ReservationNotExists(reservation_id))
                .map_err(tracerr::wrap!())?
                .property_id;

            let tx = self
                .database()
                .execute(Transact)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;

            // Avoid racing with bookings of the same `Property`.
            tx.execute(Lock(By::new(property_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;

            let mut reservation = tx
                .execute(Select(By::<Option<Reservation>, _>::new(
                    reservation_id,
                )))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::ReservationNotExists(reservation_id))
                .map_err(tracerr::wrap!())?;

            if reservation.guest_id != initiator_id {
                return Err(tracerr::new!(E::NotGuest {
                    reservation_id,
                    initiator_id,
                }));
            }
            if !reservation.is_active() {
                return Err(tracerr::new!(E::NotActive {
                    reservation_id,
                    status: reservation.status,
                }));
            }

            reservation.cancel(reason, DateTime::now());

            tx.execute(Update(reservation.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;

            tx.execute(Commit)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;

            Ok::<_, Traced<E>>(reservation)
        }
        .await
        .inspect_err(|e| {
            if matches!(e.as_ref(), E::Db(_)) {
                log::error!(
                    "failed to cancel `Reservation(id: {reservation_id})`, \
                     rolled back: {e}\n{}",
                    e.trace(),
                );
            }
        })?;

        log::info!(
            "`Reservation(id: {reservation_id})` cancelled by its guest, \
             released {} of `Property(id: {})`",
            cancelled.dates,
            cancelled.property_id,
        );

        Ok(cancelled)
    }
}

/// Error of [`CancelReservation`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Reservation`] with the provided ID doesn't exist.
    #[display("`Reservation(id: {_0})` does not exist")]
    ReservationNotExists(#[error(not(source))] reservation::Id),

    /// Initiator is not the guest who made the [`Reservation`].
    #[display(
        "`User(id: {initiator_id})` is not the guest of \
         `Reservation(id: {reservation_id})`"
    )]
    NotGuest {
        /// ID of the [`Reservation`].
        reservation_id: reservation::Id,

        /// ID of the initiator.
        initiator_id: user::Id,
    },

    /// [`Reservation`] doesn't hold its dates anymore.
    #[display("`Reservation(id: {reservation_id})` is already {status}")]
    NotActive {
        /// ID of the [`Reservation`].
        reservation_id: reservation::Id,

        /// Current [`reservation::Status`] of the [`Reservation`].
        status: reservation::Status,
    },
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Insert, Select};

    use crate::{
        domain::{
            reservation::{self, CancellationReason},
            user, Reservation,
        },
        infra::Database as _,
        test_support::{property, reservation, service},
        Command as _,
    };

    use super::{CancelReservation, ExecutionError};

    #[tokio::test]
    async fn cancels_by_guest() {
        let svc = service();
        let p = property().build();
        let r = reservation("2030-03-01", "2030-03-04").of(&p).build();
        svc.database().execute(Insert(p)).await.unwrap();
        svc.database().execute(Insert(r.clone())).await.unwrap();

        let cancelled = svc
            .execute(CancelReservation {
                reservation_id: r.id,
                initiator_id: r.guest_id,
                reason: CancellationReason::new("Plans changed"),
            })
            .await
            .unwrap();

        assert_eq!(cancelled.status, reservation::Status::Cancelled);
        assert!(cancelled.cancelled_at.is_some());
        let stored = svc
            .database()
            .execute(Select(By::<Option<Reservation>, _>::new(r.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, reservation::Status::Cancelled);
        assert_eq!(
            stored.cancellation_reason.as_ref().map(ToString::to_string),
            Some("Plans changed".to_owned()),
        );
    }

    #[tokio::test]
    async fn rejects_other_user() {
        let svc = service();
        let p = property().build();
        let r = reservation("2030-03-01", "2030-03-04").of(&p).build();
        svc.database().execute(Insert(p)).await.unwrap();
        svc.database().execute(Insert(r.clone())).await.unwrap();

        let err = svc
            .execute(CancelReservation {
                reservation_id: r.id,
                initiator_id: user::Id::new(),
                reason: None,
            })
            .await
            .unwrap_err();

        assert!(
            matches!(err.as_ref(), ExecutionError::NotGuest { .. }),
            "{err}",
        );
    }

    #[tokio::test]
    async fn rejects_inactive() {
        let svc = service();
        let p = property().build();
        let r = reservation("2020-03-01", "2020-03-04")
            .of(&p)
            .status(reservation::Status::Completed)
            .build();
        svc.database().execute(Insert(p)).await.unwrap();
        svc.database().execute(Insert(r.clone())).await.unwrap();

        let err = svc
            .execute(CancelReservation {
                reservation_id: r.id,
                initiator_id: r.guest_id,
                reason: None,
            })
            .await
            .unwrap_err();

        assert!(
            matches!(
                err.as_ref(),
                ExecutionError::NotActive {
                    status: reservation::Status::Completed,
                    ..
                },
            ),
            "{err}",
        );
    }

    #[tokio::test]
    async fn rejects_unknown() {
        let svc = service();

        let err = svc
            .execute(CancelReservation {
                reservation_id: reservation::Id::new(),
                initiator_id: user::Id::new(),
                reason: None,
            })
            .await
            .unwrap_err();

        assert!(
            matches!(err.as_ref(), ExecutionError::ReservationNotExists(_)),
            "{err}",
        );
    }
}
