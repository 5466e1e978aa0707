//! [`Property`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, Currency, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::user;

/// Vacation rental listed by a host.
#[derive(Clone, Debug)]
pub struct Property {
    /// ID of this [`Property`].
    pub id: Id,

    /// ID of the user hosting this [`Property`].
    pub host_id: user::Id,

    /// [`Title`] of this [`Property`].
    pub title: Title,

    /// [`Currency`] of every amount charged for this [`Property`].
    pub currency: Currency,

    /// [`Price`] of a single night.
    pub price_per_night: Price,

    /// One-off cleaning [`Fee`] charged per stay.
    pub cleaning_fee: Fee,

    /// One-off service [`Fee`] charged per stay.
    pub service_fee: Fee,

    /// Refundable security deposit.
    ///
    /// Tracked alongside the other amounts, but never added to a total.
    pub security_deposit: Fee,

    /// Maximum number of adults and children staying at once.
    pub max_guests: Capacity,

    /// [`StayLimits`] of this [`Property`].
    pub stay_limits: StayLimits,

    /// Indicator whether this [`Property`] is operated by its host.
    pub is_active: bool,

    /// Indicator whether this [`Property`] is visible to guests.
    pub is_published: bool,

    /// [`DateTime`] when this [`Property`] was created.
    pub created_at: CreationDateTime,
}

impl Property {
    /// Checks whether this [`Property`] accepts reservations.
    #[must_use]
    pub fn is_bookable(&self) -> bool {
        self.is_active && self.is_published
    }
}

/// ID of a [`Property`].
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

/// Title of a [`Property`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Title(String);

impl Title {
    /// Creates a new [`Title`] if the given `title` is valid.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Option<Self> {
        let title = title.into();
        Self::check(&title).then_some(Self(title))
    }

    /// Checks whether the given `title` is a valid [`Title`].
    fn check(title: impl AsRef<str>) -> bool {
        let title = title.as_ref();
        title.trim() == title
            && !title.is_empty()
            && title.chars().count() <= 255
    }
}

impl FromStr for Title {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Title`")
    }
}

/// Checks whether the provided `amount` has no more than two decimal places.
fn is_cents_precise(amount: Decimal) -> bool {
    amount.normalize().scale() <= 2
}

/// Positive amount charged for a single night at a [`Property`].
#[derive(Clone, Copy, Debug, Display, Eq, Into, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Price(Decimal);

impl Price {
    /// Creates a new [`Price`] if the given `amount` is positive and
    /// expressed in whole cents.
    #[must_use]
    pub fn new(amount: Decimal) -> Option<Self> {
        (amount > Decimal::ZERO && is_cents_precise(amount))
            .then_some(Self(amount))
    }

    /// Returns the amount of this [`Price`].
    #[must_use]
    pub fn amount(self) -> Decimal {
        self.0
    }
}

/// Non-negative amount charged once per stay at a [`Property`].
#[derive(
    Clone, Copy, Debug, Default, Display, Eq, Into, Ord, PartialEq, PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Fee(Decimal);

impl Fee {
    /// Zero [`Fee`].
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Creates a new [`Fee`] if the given `amount` is non-negative and
    /// expressed in whole cents.
    #[must_use]
    pub fn new(amount: Decimal) -> Option<Self> {
        (amount >= Decimal::ZERO && is_cents_precise(amount))
            .then_some(Self(amount))
    }

    /// Returns the amount of this [`Fee`].
    #[must_use]
    pub fn amount(self) -> Decimal {
        self.0
    }
}

/// Number of nights of a stay, `1` or more.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Into, Ord, PartialEq, PartialOrd)]
pub struct Nights(u16);

impl Nights {
    /// Creates new [`Nights`] if the given `count` is `1` or more.
    #[must_use]
    pub fn new(count: u16) -> Option<Self> {
        (count >= 1).then_some(Self(count))
    }

    /// Returns the number of nights as [`u32`].
    #[must_use]
    pub fn get(self) -> u32 {
        self.0.into()
    }
}

/// Guest capacity of a [`Property`], `1` or more.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Into, Ord, PartialEq, PartialOrd)]
pub struct Capacity(u16);

impl Capacity {
    /// Creates a new [`Capacity`] if the given `guests` number is `1` or more.
    #[must_use]
    pub fn new(guests: u16) -> Option<Self> {
        (guests >= 1).then_some(Self(guests))
    }

    /// Returns the number of guests as [`u32`].
    #[must_use]
    pub fn get(self) -> u32 {
        self.0.into()
    }
}

/// Per-[`Property`] bounds on the number of nights of a stay.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StayLimits {
    /// Minimum number of nights, if restricted.
    min: Option<Nights>,

    /// Maximum number of nights, if restricted.
    max: Option<Nights>,
}

impl StayLimits {
    /// Creates new [`StayLimits`] if the `min` doesn't exceed the `max`.
    #[must_use]
    pub fn new(min: Option<Nights>, max: Option<Nights>) -> Option<Self> {
        match (min, max) {
            (Some(min), Some(max)) if min > max => None,
            _ => Some(Self { min, max }),
        }
    }

    /// Returns the minimum number of nights, if restricted.
    #[must_use]
    pub fn min(&self) -> Option<Nights> {
        self.min
    }

    /// Returns the maximum number of nights, if restricted.
    #[must_use]
    pub fn max(&self) -> Option<Nights> {
        self.max
    }
}

/// [`DateTime`] when a [`Property`] was created.
pub type CreationDateTime = DateTimeOf<(Property, unit::Creation)>;

#[cfg(test)]
mod spec {
    use rust_decimal::Decimal;

    use super::{Capacity, Fee, Nights, Price, StayLimits, Title};

    fn decimal(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn price_must_be_positive_cents() {
        assert!(Price::new(decimal("100")).is_some());
        assert!(Price::new(decimal("0.01")).is_some());
        assert!(Price::new(decimal("99.90")).is_some());
        assert!(Price::new(decimal("99.900")).is_some());

        assert!(Price::new(Decimal::ZERO).is_none());
        assert!(Price::new(decimal("-1")).is_none());
        assert!(Price::new(decimal("10.001")).is_none());
    }

    #[test]
    fn fee_may_be_zero() {
        assert_eq!(Fee::new(Decimal::ZERO), Some(Fee::ZERO));
        assert!(Fee::new(decimal("20")).is_some());

        assert!(Fee::new(decimal("-0.01")).is_none());
        assert!(Fee::new(decimal("0.125")).is_none());
    }

    #[test]
    fn nights_and_capacity_start_from_one() {
        assert!(Nights::new(0).is_none());
        assert_eq!(Nights::new(1).map(Nights::get), Some(1));

        assert!(Capacity::new(0).is_none());
        assert_eq!(Capacity::new(4).map(Capacity::get), Some(4));
    }

    #[test]
    fn stay_limits_reject_inverted_bounds() {
        let n = |c| Nights::new(c).unwrap();

        assert!(StayLimits::new(Some(n(2)), Some(n(7))).is_some());
        assert!(StayLimits::new(Some(n(3)), Some(n(3))).is_some());
        assert!(StayLimits::new(None, Some(n(1))).is_some());
        assert!(StayLimits::new(Some(n(30)), None).is_some());

        assert!(StayLimits::new(Some(n(8)), Some(n(7))).is_none());
    }

    #[test]
    fn title_is_trimmed_and_bounded() {
        assert!(Title::new("Cozy cabin by the lake").is_some());

        assert!(Title::new("").is_none());
        assert!(Title::new(" Cabin").is_none());
        assert!(Title::new("Cabin\n").is_none());
        assert!(Title::new("x".repeat(255)).is_some());
        assert!(Title::new("x".repeat(256)).is_none());
    }
}
