//! [`Reservation`] definitions.

pub mod availability;
pub mod code;
pub mod payment;
pub mod pricing;

use common::{define_kind, unit, DateRange, DateTime, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use uuid::Uuid;

use super::{property, user};
#[cfg(doc)]
use super::Property;

pub use self::{
    availability::{Policy, Violation},
    code::Code,
    payment::Payment,
    pricing::Pricing,
};

/// Booked stay of a guest at a [`Property`].
///
/// Never deleted, only cancelled.
#[derive(Clone, Debug)]
pub struct Reservation {
    /// ID of this [`Reservation`].
    pub id: Id,

    /// Unique human-shareable [`Code`] of this [`Reservation`].
    pub code: Code,

    /// ID of the reserved [`Property`].
    pub property_id: property::Id,

    /// ID of the guest who made this [`Reservation`].
    pub guest_id: user::Id,

    /// Reserved half-open range of dates: from check-in until check-out.
    pub dates: DateRange,

    /// [`Guests`] staying.
    pub guests: Guests,

    /// [`SpecialRequests`] of the guest, if any.
    pub special_requests: Option<SpecialRequests>,

    /// [`Pricing`] snapshot at the moment of booking.
    pub pricing: Pricing,

    /// [`Payment`] state of this [`Reservation`].
    pub payment: Payment,

    /// [`Status`] of this [`Reservation`].
    pub status: Status,

    /// [`DateTime`] when this [`Reservation`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Reservation`] was confirmed, if it was.
    pub confirmed_at: Option<ConfirmationDateTime>,

    /// [`DateTime`] when this [`Reservation`] was cancelled, if it was.
    pub cancelled_at: Option<CancellationDateTime>,

    /// [`CancellationReason`] given by the guest, if any.
    pub cancellation_reason: Option<CancellationReason>,
}

impl Reservation {
    /// Checks whether this [`Reservation`] still holds its dates.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Marks this [`Reservation`] as paid in full and confirmed.
    pub fn confirm_with_full_payment(&mut self, now: DateTime) {
        self.payment = Payment::full(self.pricing.total, now.coerce());
        self.status = Status::Confirmed;
        self.confirmed_at = Some(now.coerce());
    }

    /// Cancels this [`Reservation`] releasing its dates.
    pub fn cancel(
        &mut self,
        reason: Option<CancellationReason>,
        now: DateTime,
    ) {
        self.status = Status::Cancelled;
        self.cancelled_at = Some(now.coerce());
        self.cancellation_reason = reason;
    }
}

/// ID of a [`Reservation`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Guests of a [`Reservation`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Guests {
    /// Number of adults.
    pub adults: u16,

    /// Number of children.
    pub children: u16,

    /// Number of infants, not taking a place.
    pub infants: u16,
}

impl Guests {
    /// Returns the number of guests counted against a [`Property`] capacity.
    ///
    /// Infants are not counted.
    #[must_use]
    pub fn counted(&self) -> u32 {
        u32::from(self.adults) + u32::from(self.children)
    }
}

/// Free-form requests of a guest to the host.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct SpecialRequests(String);

impl SpecialRequests {
    /// Maximum length of [`SpecialRequests`] in characters.
    pub const MAX_LEN: usize = 2000;

    /// Creates new [`SpecialRequests`] if the given `text` is valid.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        Self::check(&text).then_some(Self(text))
    }

    /// Checks whether the given `text` is valid [`SpecialRequests`].
    fn check(text: impl AsRef<str>) -> bool {
        let text = text.as_ref();
        text.trim() == text
            && !text.is_empty()
            && text.chars().count() <= Self::MAX_LEN
    }
}

impl FromStr for SpecialRequests {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `SpecialRequests`")
    }
}

/// Reason of a [`Reservation`] cancellation.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct CancellationReason(String);

impl CancellationReason {
    /// Creates a new [`CancellationReason`] if the given `reason` is valid.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Option<Self> {
        let reason = reason.into();
        Self::check(&reason).then_some(Self(reason))
    }

    /// Checks whether the given `reason` is a valid [`CancellationReason`].
    fn check(reason: impl AsRef<str>) -> bool {
        let reason = reason.as_ref();
        reason.trim() == reason
            && !reason.is_empty()
            && reason.chars().count() <= 1000
    }
}

impl FromStr for CancellationReason {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `CancellationReason`")
    }
}

define_kind! {
    #[doc = "Status of a [`Reservation`]."]
    enum Status {
        #[doc = "Awaiting payment or host confirmation."]
        Pending = 1,

        #[doc = "Confirmed and holding its dates."]
        Confirmed = 2,

        #[doc = "Cancelled, dates released."]
        Cancelled = 3,

        #[doc = "Stay is over."]
        Completed = 4,
    }
}

impl Status {
    /// [`Status`]es of [`Reservation`]s holding their dates.
    pub const ACTIVE: [Self; 2] = [Self::Pending, Self::Confirmed];

    /// Checks whether this [`Status`] holds the dates of a [`Reservation`].
    #[must_use]
    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }
}

/// [`DateTime`] when a [`Reservation`] was created.
pub type CreationDateTime = DateTimeOf<(Reservation, unit::Creation)>;

/// [`DateTime`] when a [`Reservation`] was confirmed.
pub type ConfirmationDateTime = DateTimeOf<(Reservation, unit::Confirmation)>;

/// [`DateTime`] when a [`Reservation`] was cancelled.
pub type CancellationDateTime = DateTimeOf<(Reservation, unit::Cancellation)>;
