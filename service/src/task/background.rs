//! Background environment for running [`Task`]s.

use std::{
    error::Error,
    future::{Future, IntoFuture},
    iter,
};

use derive_more::Display;
use futures::{
    future::{self, LocalBoxFuture},
    FutureExt as _, TryFutureExt as _,
};
use tokio::task;

#[cfg(doc)]
use crate::Task;

/// Background environment for running [`Task`]s.
#[derive(Debug, Default)]
pub struct Background {
    /// Local set of tasks.
    set: task::LocalSet,

    /// Handles of spawned tasks.
    handles: Vec<task::JoinHandle<Result<(), Failure>>>,
}

impl Background {
    /// Spawns a new [`Task`] with the provided `name` inside the
    /// [`Background`] environment.
    pub fn spawn<F, E>(&mut self, name: &'static str, future: F)
    where
        F: Future<Output = Result<(), E>> + 'static,
        E: Error + 'static,
    {
        self.handles.push(self.set.spawn_local(future.map_err(move |e| {
            Failure {
                task: name,
                cause: Box::new(e),
            }
        })));
    }
}

impl IntoFuture for Background {
    type Output = Result<(), Failure>;
    type IntoFuture = LocalBoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        let Self { set, handles } = self;
        future::try_join_all(iter::once(set.map(Ok).boxed_local()).chain(
            handles.into_iter().map(|h| {
                h.map(|r| {
                    r.unwrap_or_else(|e| {
                        Err(Failure {
                            task: "<unknown>",
                            cause: Box::new(e),
                        })
                    })
                })
                .boxed_local()
            }),
        ))
        .map_ok(drop)
        .boxed_local()
    }
}

/// Failure of a [`Task`] running in a [`Background`].
#[derive(Debug, Display)]
#[display("`{task}` task failed: {cause}")]
pub struct Failure {
    /// Name of the failed [`Task`].
    task: &'static str,

    /// Cause of the failure.
    cause: Box<dyn Error + 'static>,
}

impl Failure {
    /// Returns the name of the failed [`Task`].
    #[must_use]
    pub fn task(&self) -> &'static str {
        self.task
    }
}

impl Error for Failure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.cause)
    }
}

#[cfg(test)]
mod spec {
    use derive_more::{Display, Error};

    use super::Background;

    #[derive(Debug, Display, Error)]
    #[display("storage is gone")]
    struct Gone;

    #[tokio::test]
    async fn reports_name_of_failed_task() {
        let mut bg = Background::default();
        bg.spawn("Ticking", async { Ok::<_, Gone>(()) });
        bg.spawn("Failing", async { Err(Gone) });

        let err = bg.await.unwrap_err();

        assert_eq!(err.task(), "Failing");
        assert_eq!(err.to_string(), "`Failing` task failed: storage is gone");
    }
}
