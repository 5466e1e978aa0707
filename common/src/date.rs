//! Calendar date utilities.

#[cfg(feature = "postgres")]
use std::error::Error as StdError;
use std::{fmt, str::FromStr};

use derive_more::{Display, Error};
#[cfg(feature = "postgres")]
use postgres_types::{
    accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql, Type,
};
use time::{format_description::well_known::Iso8601, Duration};

/// Calendar date in UTC, without a time of day.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Date(time::Date);

impl Date {
    /// Returns the current [`Date`] in UTC.
    #[must_use]
    pub fn today() -> Self {
        Self(time::OffsetDateTime::now_utc().date())
    }

    /// Creates a new [`Date`] from the provided calendar components.
    ///
    /// [`None`] is returned if the components don't form a valid date.
    #[must_use]
    pub fn from_ymd(year: i32, month: u8, day: u8) -> Option<Self> {
        let month = time::Month::try_from(month).ok()?;
        time::Date::from_calendar_date(year, month, day).ok().map(Self)
    }

    /// Returns the number of days from this [`Date`] until the `other` one.
    ///
    /// Negative if the `other` [`Date`] is before this one.
    #[must_use]
    pub fn days_until(self, other: Self) -> i64 {
        (other.0 - self.0).whole_days()
    }

    /// Returns the [`Date`] the provided number of `days` after this one.
    ///
    /// [`None`] is returned on calendar overflow.
    #[must_use]
    pub fn checked_add_days(self, days: i64) -> Option<Self> {
        self.0.checked_add(Duration::days(days)).map(Self)
    }

    /// Returns the [`Date`] the provided number of calendar `months` after
    /// this one.
    ///
    /// The day is clamped to the last day of the resulting month, so
    /// `2024-02-29` plus 12 months is `2025-02-28`.
    ///
    /// [`None`] is returned on calendar overflow.
    #[must_use]
    pub fn checked_add_months(self, months: u32) -> Option<Self> {
        let (year, month, day) = self.0.to_calendar_date();
        let index = i64::from(u8::from(month)) - 1 + i64::from(months);
        let year = i32::try_from(i64::from(year) + index / 12).ok()?;
        let month = u8::try_from(index % 12 + 1)
            .ok()
            .and_then(|m| time::Month::try_from(m).ok())?;
        (1..=day)
            .rev()
            .find_map(|d| time::Date::from_calendar_date(year, month, d).ok())
            .map(Self)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (year, month, day) = self.0.to_calendar_date();
        write!(f, "{year:04}-{:02}-{day:02}", u8::from(month))
    }
}

impl FromStr for Date {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        time::Date::parse(s, &Iso8601::DATE)
            .map(Self)
            .map_err(ParseError)
    }
}

impl From<time::Date> for Date {
    fn from(date: time::Date) -> Self {
        Self(date)
    }
}

impl From<Date> for time::Date {
    fn from(date: Date) -> Self {
        date.0
    }
}

/// Error of parsing a [`Date`] from a string.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("invalid `YYYY-MM-DD` date: {_0}")]
pub struct ParseError(time::error::Parse);

#[cfg(feature = "postgres")]
impl FromSql<'_> for Date {
    accepts!(DATE);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        time::Date::from_sql(ty, raw).map(Self)
    }
}

#[cfg(feature = "postgres")]
impl ToSql for Date {
    accepts!(DATE);
    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        w: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.0.to_sql(ty, w)
    }
}

/// Half-open `[start, end)` range of [`Date`]s.
///
/// The `end` day itself is not occupied, so back-to-back ranges don't
/// overlap. The range always covers at least one night.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[display("[{start}, {end})")]
pub struct DateRange {
    /// First occupied [`Date`].
    start: Date,

    /// First [`Date`] after the range.
    end: Date,
}

impl DateRange {
    /// Creates a new [`DateRange`] if the `end` is strictly after the `start`.
    #[must_use]
    pub fn new(start: Date, end: Date) -> Option<Self> {
        (end > start).then_some(Self { start, end })
    }

    /// Returns the first occupied [`Date`] of this [`DateRange`].
    #[must_use]
    pub fn start(&self) -> Date {
        self.start
    }

    /// Returns the first [`Date`] after this [`DateRange`].
    #[must_use]
    pub fn end(&self) -> Date {
        self.end
    }

    /// Returns the number of nights covered by this [`DateRange`].
    ///
    /// Always `1` or more.
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn nights(&self) -> u32 {
        u32::try_from(self.start.days_until(self.end))
            .expect("positive and bounded by `time::Date` range")
    }

    /// Checks whether this [`DateRange`] shares at least one night with the
    /// `other` one.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && self.end > other.start
    }
}

#[cfg(feature = "juniper")]
mod juniper {
    //! Module providing integration with [`juniper`] crate.

    use std::str::FromStr as _;

    use juniper::{graphql_scalar, InputValue, ScalarValue, Value};

    /// Calendar date in `YYYY-MM-DD` format.
    #[graphql_scalar(with = Self, parse_token(String))]
    type Date = super::Date;

    impl Date {
        fn to_output<S: ScalarValue>(d: &Date) -> Value<S> {
            Value::scalar(d.to_string())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            input
                .as_string_value()
                .ok_or_else(|| {
                    format!(
                        "Cannot parse `Date` input scalar from \
                         non-string value: {input}",
                    )
                })
                .and_then(|s| {
                    Self::from_str(s).map_err(|e| {
                        format!("Cannot parse `Date` input scalar: {e}")
                    })
                })
        }
    }
}

#[cfg(test)]
mod spec {
    use time::macros::date;

    use super::{Date, DateRange};

    fn range(start: time::Date, end: time::Date) -> DateRange {
        DateRange::new(start.into(), end.into()).unwrap()
    }

    #[test]
    fn parses_and_displays_iso_dates() {
        let d: Date = "2025-06-01".parse().unwrap();
        assert_eq!(d, Date::from(date!(2025 - 06 - 01)));
        assert_eq!(d.to_string(), "2025-06-01");

        assert!("2025-13-01".parse::<Date>().is_err());
        assert!("01.06.2025".parse::<Date>().is_err());
        assert!("".parse::<Date>().is_err());
    }

    #[test]
    fn builds_from_calendar_components() {
        assert_eq!(
            Date::from_ymd(2025, 7, 5),
            Some(Date::from(date!(2025 - 07 - 05))),
        );
        assert_eq!(Date::from_ymd(2025, 2, 30), None);
        assert_eq!(Date::from_ymd(2025, 0, 1), None);
    }

    #[test]
    fn counts_days_between_dates() {
        let a = Date::from(date!(2025 - 06 - 01));
        let b = Date::from(date!(2025 - 06 - 04));

        assert_eq!(a.days_until(b), 3);
        assert_eq!(b.days_until(a), -3);
        assert_eq!(a.checked_add_days(3), Some(b));
        assert_eq!(b.checked_add_days(-3), Some(a));
    }

    #[test]
    fn adds_calendar_months() {
        let add = |d: time::Date, m| {
            Date::from(d).checked_add_months(m).map(time::Date::from)
        };

        assert_eq!(add(date!(2025 - 06 - 15), 0), Some(date!(2025 - 06 - 15)));
        assert_eq!(add(date!(2025 - 11 - 30), 3), Some(date!(2026 - 02 - 28)));
        assert_eq!(add(date!(2027 - 03 - 01), 12), Some(date!(2028 - 03 - 01)));
        assert_eq!(add(date!(2024 - 02 - 29), 12), Some(date!(2025 - 02 - 28)));
        assert_eq!(add(date!(2023 - 02 - 28), 12), Some(date!(2024 - 02 - 28)));
        assert_eq!(add(date!(2025 - 01 - 31), 25), Some(date!(2027 - 02 - 28)));
    }

    #[test]
    fn rejects_empty_and_inverted_ranges() {
        let a = Date::from(date!(2025 - 06 - 01));
        let b = Date::from(date!(2025 - 06 - 02));

        assert!(DateRange::new(a, a).is_none());
        assert!(DateRange::new(b, a).is_none());
        assert_eq!(DateRange::new(a, b).unwrap().nights(), 1);
    }

    #[test]
    fn counts_nights_across_month_boundary() {
        let r = range(date!(2025 - 01 - 30), date!(2025 - 02 - 02));

        assert_eq!(r.nights(), 3);
        assert_eq!(r.to_string(), "[2025-01-30, 2025-02-02)");
    }

    #[test]
    fn back_to_back_ranges_do_not_overlap() {
        let existing = range(date!(2025 - 07 - 01), date!(2025 - 07 - 05));
        let next = range(date!(2025 - 07 - 05), date!(2025 - 07 - 08));
        let crossing = range(date!(2025 - 07 - 04), date!(2025 - 07 - 08));

        assert!(!existing.overlaps(&next));
        assert!(!next.overlaps(&existing));
        assert!(existing.overlaps(&crossing));
        assert!(crossing.overlaps(&existing));
    }

    #[test]
    fn overlap_law_holds_on_small_grid() {
        let base = date!(2025 - 01 - 01);
        let day = |n: i64| Date::from(base).checked_add_days(n).unwrap();

        for a1 in 0..6 {
            for a2 in (a1 + 1)..7 {
                for b1 in 0..6 {
                    for b2 in (b1 + 1)..7 {
                        let a = DateRange::new(day(a1), day(a2)).unwrap();
                        let b = DateRange::new(day(b1), day(b2)).unwrap();

                        assert_eq!(
                            a.overlaps(&b),
                            a1 < b2 && a2 > b1,
                            "{a} vs {b}",
                        );
                        assert_eq!(a.overlaps(&b), b.overlaps(&a), "{a} vs {b}");
                    }
                }
            }
        }
    }
}
