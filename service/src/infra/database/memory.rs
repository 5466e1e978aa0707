//! In-memory [`Database`] implementation.
//!
//! Mirrors the transactional contract of the [`Postgres`] one: writes of a
//! transaction are visible only to it until committed, and locking a
//! [`Property`] blocks other transactions locking it until the holder commits
//! or is dropped.
//!
//! [`Postgres`]: super::Postgres

use std::{
    collections::HashMap,
    mem,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Update},
    Date,
};
use derive_more::{Display, Error as StdError};
use tokio::{sync::OwnedMutexGuard, task};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        property,
        reservation::{self, Code},
        Property, Reservation,
    },
    infra::{database, Database},
    read::reservation::{Active, Completed, Overlapping, StatusEntry},
};

use super::constraint;

/// In-memory [`Database`].
///
/// Cloning shares the same storage.
#[derive(Clone, Debug)]
pub struct Memory {
    /// Storage shared by all the clones of this [`Memory`].
    shared: Arc<Shared>,

    /// Writes and locks of the current transaction, if any.
    tx: Option<Arc<Mutex<Staged>>>,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    /// Creates a new empty [`Memory`] with all the [`reservation::Status`]es
    /// registered.
    #[must_use]
    pub fn new() -> Self {
        let this = Self::unseeded();
        this.shared.state().statuses = reservation::Status::ALL
            .iter()
            .map(|s| (*s, s.to_string()))
            .collect();
        this
    }

    /// Creates a new completely empty [`Memory`], without any
    /// [`reservation::Status`] registered.
    #[must_use]
    pub fn unseeded() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            tx: None,
        }
    }

    /// Makes every following write fail with [`Error::Unavailable`] until
    /// switched back.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes_after(if fail { 0 } else { usize::MAX });
    }

    /// Lets the provided number of following writes succeed, failing every
    /// write after them with [`Error::Unavailable`].
    ///
    /// [`usize::MAX`] means no failures.
    pub fn fail_writes_after(&self, writes: usize) {
        self.shared.writes_left.store(writes, Ordering::SeqCst);
    }

    /// Makes every following [`Commit`] fail with [`Error::Unavailable`]
    /// until switched back.
    ///
    /// Writes of a failed transaction are discarded.
    pub fn fail_commits(&self, fail: bool) {
        self.shared.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Runs the provided function over the data visible to this [`Memory`]
    /// client.
    fn view<R>(&self, f: impl FnOnce(&State) -> R) -> R {
        let committed = self.shared.state();
        let Some(tx) = &self.tx else {
            return f(&committed);
        };

        let mut view = committed.clone();
        drop(committed);
        for w in &lock(tx).writes {
            // Staged writes are validated when staged.
            _ = view.apply(w.clone());
        }
        f(&view)
    }

    /// Writes the provided [`Write`], either directly or into the current
    /// transaction.
    fn write(&self, write: Write) -> Result<(), Traced<database::Error>> {
        let budget = self.shared.writes_left.fetch_update(
            Ordering::SeqCst,
            Ordering::SeqCst,
            |left| (left != 0 && left != usize::MAX).then(|| left - 1),
        );
        if budget == Err(0) {
            return Err(tracerr::new!(database::Error::from(Error::Unavailable)));
        }

        let Some(tx) = &self.tx else {
            return self
                .shared
                .state()
                .apply(write)
                .map_err(tracerr::from_and_wrap!(=> database::Error));
        };

        // Constraints are checked upon a statement, as Postgres does.
        self.view(|state| state.clone().apply(write.clone()))
            .map_err(tracerr::from_and_wrap!(=> database::Error))?;
        lock(tx).writes.push(write);
        Ok(())
    }
}

/// Storage shared by [`Memory`] clients.
#[derive(Debug)]
struct Shared {
    /// Committed data.
    state: Mutex<State>,

    /// Per-[`Property`] locks held by transactions.
    locks: Mutex<HashMap<property::Id, Arc<tokio::sync::Mutex<()>>>>,

    /// Number of writes left to succeed, [`usize::MAX`] for unlimited.
    writes_left: AtomicUsize,

    /// Indicator whether commits must fail.
    fail_commits: AtomicBool,
}

impl Default for Shared {
    fn default() -> Self {
        Self {
            state: Mutex::default(),
            locks: Mutex::default(),
            writes_left: AtomicUsize::new(usize::MAX),
            fail_commits: AtomicBool::new(false),
        }
    }
}

impl Shared {
    /// Returns the committed [`State`].
    fn state(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }

    /// Returns the lock of the [`Property`] with the provided ID.
    fn property_lock(&self, id: property::Id) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(lock(&self.locks).entry(id).or_default())
    }
}

/// Locks the provided [`Mutex`], ignoring its poisoning.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Writes and locks of a transaction.
#[derive(Debug, Default)]
struct Staged {
    /// Writes to be applied on commit.
    writes: Vec<Write>,

    /// Locks held until commit or drop.
    locks: Vec<(property::Id, OwnedMutexGuard<()>)>,
}

/// Single write operation.
#[derive(Clone, Debug)]
enum Write {
    /// Insert or replace of a [`Property`].
    Property(Box<Property>),

    /// Insert or replace of a [`Reservation`].
    Reservation(Box<Reservation>),
}

/// Stored data.
#[derive(Clone, Debug, Default)]
struct State {
    /// Stored [`Property`]s.
    properties: HashMap<property::Id, Property>,

    /// Stored [`Reservation`]s.
    reservations: HashMap<reservation::Id, Reservation>,

    /// Registered [`reservation::Status`]es with their names.
    statuses: HashMap<reservation::Status, String>,
}

impl State {
    /// Applies the provided [`Write`] if it violates no constraint.
    fn apply(&mut self, write: Write) -> Result<(), Error> {
        match write {
            Write::Property(p) => {
                _ = self.properties.insert(p.id, *p);
            }
            Write::Reservation(r) => {
                if !self.statuses.contains_key(&r.status) {
                    return Err(Error::ForeignKeyViolation(
                        constraint::RESERVATION_STATUS,
                    ));
                }
                let others = self.reservations.values().filter(|o| o.id != r.id);
                for other in others {
                    if other.code == r.code {
                        return Err(Error::UniqueViolation(
                            constraint::RESERVATION_CODE,
                        ));
                    }
                    if r.is_active()
                        && other.is_active()
                        && other.property_id == r.property_id
                        && other.dates.overlaps(&r.dates)
                    {
                        return Err(Error::ExclusionViolation(
                            constraint::RESERVATION_OVERLAP,
                        ));
                    }
                }
                _ = self.reservations.insert(r.id, *r);
            }
        }
        Ok(())
    }
}

/// [`Memory`] database error.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Write violates a unique constraint.
    #[display("unique constraint `{_0}` is violated")]
    UniqueViolation(#[error(not(source))] &'static str),

    /// Write violates an exclusion constraint.
    #[display("exclusion constraint `{_0}` is violated")]
    ExclusionViolation(#[error(not(source))] &'static str),

    /// Write references a missing row.
    #[display("foreign key constraint `{_0}` is violated")]
    ForeignKeyViolation(#[error(not(source))] &'static str),

    /// Writes are switched off.
    #[display("storage is unavailable")]
    Unavailable,
}

impl Database<Transact> for Memory {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        task::yield_now().await;

        Ok(Self {
            shared: Arc::clone(&self.shared),
            tx: Some(
                self.tx
                    .clone()
                    .unwrap_or_else(|| Arc::new(Mutex::new(Staged::default()))),
            ),
        })
    }
}

impl Database<Commit> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        task::yield_now().await;

        let Some(tx) = &self.tx else {
            return Ok(());
        };
        if self.shared.fail_commits.load(Ordering::SeqCst) {
            return Err(tracerr::new!(database::Error::from(Error::Unavailable)));
        }
        let Staged { writes, locks } = mem::take(&mut *lock(tx));

        let mut committed = self.shared.state();
        let mut next = committed.clone();
        for w in writes {
            next.apply(w)
                .map_err(tracerr::from_and_wrap!(=> database::Error))?;
        }
        *committed = next;
        drop(committed);

        log::trace!("released {} lock(s) on commit", locks.len());
        drop(locks);
        Ok(())
    }
}

impl Database<Lock<By<Property, property::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Property, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        task::yield_now().await;

        // Outside a transaction a lock is released immediately.
        let Some(tx) = &self.tx else {
            return Ok(());
        };
        let id = by.into_inner();
        if lock(tx).locks.iter().any(|(locked, _)| *locked == id) {
            return Ok(());
        }

        let guard = self.shared.property_lock(id).lock_owned().await;
        lock(tx).locks.push((id, guard));
        Ok(())
    }
}

impl Database<Select<By<Option<Property>, property::Id>>> for Memory {
    type Ok = Option<Property>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Property>, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        task::yield_now().await;

        let id = by.into_inner();
        Ok(self.view(|s| s.properties.get(&id).cloned()))
    }
}

impl Database<Insert<Property>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(property): Insert<Property>,
    ) -> Result<Self::Ok, Self::Err> {
        task::yield_now().await;

        if self.view(|s| s.properties.contains_key(&property.id)) {
            return Err(tracerr::new!(database::Error::from(
                Error::UniqueViolation(constraint::PROPERTY_PKEY)
            )));
        }
        self.write(Write::Property(Box::new(property)))
    }
}

impl Database<Select<By<Option<Reservation>, reservation::Id>>> for Memory {
    type Ok = Option<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Reservation>, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        task::yield_now().await;

        let id = by.into_inner();
        Ok(self.view(|s| s.reservations.get(&id).cloned()))
    }
}

impl Database<Select<By<Option<Reservation>, Code>>> for Memory {
    type Ok = Option<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Reservation>, Code>>,
    ) -> Result<Self::Ok, Self::Err> {
        task::yield_now().await;

        let code = by.into_inner();
        Ok(self.view(|s| {
            s.reservations.values().find(|r| r.code == code).cloned()
        }))
    }
}

impl Database<Select<By<Vec<Active<Reservation>>, Overlapping>>> for Memory {
    type Ok = Vec<Active<Reservation>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Active<Reservation>>, Overlapping>>,
    ) -> Result<Self::Ok, Self::Err> {
        task::yield_now().await;

        let Overlapping { property_id, dates } = by.into_inner();
        let mut found = self.view(|s| {
            s.reservations
                .values()
                .filter(|r| {
                    r.property_id == property_id
                        && r.is_active()
                        && r.dates.overlaps(&dates)
                })
                .cloned()
                .collect::<Vec<_>>()
        });
        found.sort_by_key(|r| r.dates.start());
        Ok(found.into_iter().map(Active).collect())
    }
}

impl Database<Select<By<Option<StatusEntry>, reservation::Status>>>
    for Memory
{
    type Ok = Option<StatusEntry>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<StatusEntry>, reservation::Status>>,
    ) -> Result<Self::Ok, Self::Err> {
        task::yield_now().await;

        let status = by.into_inner();
        Ok(self.view(|s| {
            s.statuses.get(&status).map(|name| StatusEntry {
                status,
                name: name.clone(),
            })
        }))
    }
}

impl Database<Insert<Reservation>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(reservation): Insert<Reservation>,
    ) -> Result<Self::Ok, Self::Err> {
        task::yield_now().await;

        if self.view(|s| s.reservations.contains_key(&reservation.id)) {
            return Err(tracerr::new!(database::Error::from(
                Error::UniqueViolation(constraint::RESERVATION_PKEY)
            )));
        }
        self.write(Write::Reservation(Box::new(reservation)))
    }
}

impl Database<Update<Reservation>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(reservation): Update<Reservation>,
    ) -> Result<Self::Ok, Self::Err> {
        task::yield_now().await;

        self.write(Write::Reservation(Box::new(reservation)))
    }
}

impl Database<Update<By<Completed, Date>>> for Memory {
    type Ok = Completed;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(by): Update<By<Completed, Date>>,
    ) -> Result<Self::Ok, Self::Err> {
        task::yield_now().await;

        let today = by.into_inner();
        let finished = self.view(|s| {
            s.reservations
                .values()
                .filter(|r| {
                    r.status == reservation::Status::Confirmed
                        && r.dates.end() < today
                })
                .cloned()
                .collect::<Vec<_>>()
        });

        let count = finished.len();
        for mut r in finished {
            r.status = reservation::Status::Completed;
            self.write(Write::Reservation(Box::new(r)))?;
        }
        Ok(Completed(u64::try_from(count).unwrap_or(u64::MAX)))
    }
}
