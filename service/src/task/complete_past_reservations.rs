//! [`CompletePastReservations`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::{
    operations::{By, Perform, Start, Update},
    Date,
};
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    infra::{database, Database},
    read::reservation::Completed,
    Service,
};
#[cfg(doc)]
use crate::domain::{reservation, Reservation};

use super::Task;

/// Configuration for [`CompletePastReservations`] [`Task`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Interval between runs.
    pub interval: time::Duration,
}

/// [`Task`] marking [`reservation::Status::Confirmed`] [`Reservation`]s
/// checked out before today as [`reservation::Status::Completed`].
#[derive(Clone, Copy, Debug)]
pub struct CompletePastReservations<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<Db> Task<Start<By<CompletePastReservations<Self>, Config>>>
    for Service<Db>
where
    CompletePastReservations<Service<Db>>:
        Task<Perform<()>, Ok = Completed, Err: Error> + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<CompletePastReservations<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = CompletePastReservations {
            config,
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            _ = interval.tick().await;
            match task.execute(Perform(())).await {
                Ok(Completed(0)) => {}
                Ok(Completed(n)) => {
                    log::info!("{n} `Reservation`(s) completed");
                }
                Err(e) => {
                    log::error!("`task::CompletePastReservations` failed: {e}");
                }
            }
        }
    }
}

impl<Db> Task<Perform<()>> for CompletePastReservations<Service<Db>>
where
    Db: Database<
        Update<By<Completed, Date>>,
        Ok = Completed,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Completed;
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        self.service
            .database()
            .execute(Update(By::new(Date::today())))
            .await
            .map_err(tracerr::wrap!())
    }
}

/// Error of [`CompletePastReservations`] execution.
pub type ExecutionError = Traced<database::Error>;
