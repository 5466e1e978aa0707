//! Fixtures shared by tests.

use std::time::Duration;

use common::{Currency, Date, DateRange, DateTime};
use rust_decimal::Decimal;

use crate::{
    domain::{
        property::{self, Capacity, Fee, Nights, Price, StayLimits, Title},
        reservation::{self, availability, Code, Guests, Payment, Pricing},
        user, Property, Reservation,
    },
    infra::Memory,
    task, Config, Service,
};

/// Parses the provided [`Decimal`].
pub(crate) fn decimal(s: &str) -> Decimal {
    s.parse().unwrap()
}

/// Parses the provided `YYYY-MM-DD` [`Date`].
pub(crate) fn date(s: &str) -> Date {
    s.parse().unwrap()
}

/// Returns the [`Date`] the provided number of `days` after today.
pub(crate) fn in_days(days: i64) -> Date {
    Date::today().checked_add_days(days).unwrap()
}

/// Returns a [`Config`] with the default reservation rules.
pub(crate) fn config() -> Config {
    Config {
        availability: availability::Config {
            booking_horizon_months: 12,
            default_min_nights: Nights::new(1).unwrap(),
            default_max_nights: None,
        },
        code_attempts: 5,
        complete_past_reservations: task::complete_past_reservations::Config {
            interval: Duration::from_secs(60 * 60),
        },
    }
}

/// Returns a [`Service`] over a fresh [`Memory`] database.
pub(crate) fn service() -> Service<Memory> {
    Service {
        config: config(),
        database: Memory::new(),
    }
}

/// Starts building a bookable [`Property`] priced at `100` per night with a
/// `20` cleaning fee and a `10` service fee, hosting up to 4 guests.
pub(crate) fn property() -> PropertyBuilder {
    PropertyBuilder(Property {
        id: property::Id::new(),
        host_id: user::Id::new(),
        title: Title::new("Cabin by the lake").unwrap(),
        currency: Currency::Usd,
        price_per_night: Price::new(decimal("100")).unwrap(),
        cleaning_fee: Fee::new(decimal("20")).unwrap(),
        service_fee: Fee::new(decimal("10")).unwrap(),
        security_deposit: Fee::ZERO,
        max_guests: Capacity::new(4).unwrap(),
        stay_limits: StayLimits::default(),
        is_active: true,
        is_published: true,
        created_at: DateTime::now().coerce(),
    })
}

/// Builder of a test [`Property`].
#[derive(Debug)]
pub(crate) struct PropertyBuilder(Property);

impl PropertyBuilder {
    pub(crate) fn price(mut self, amount: &str) -> Self {
        self.0.price_per_night = Price::new(decimal(amount)).unwrap();
        self
    }

    pub(crate) fn cleaning_fee(mut self, amount: &str) -> Self {
        self.0.cleaning_fee = Fee::new(decimal(amount)).unwrap();
        self
    }

    pub(crate) fn service_fee(mut self, amount: &str) -> Self {
        self.0.service_fee = Fee::new(decimal(amount)).unwrap();
        self
    }

    pub(crate) fn security_deposit(mut self, amount: &str) -> Self {
        self.0.security_deposit = Fee::new(decimal(amount)).unwrap();
        self
    }

    pub(crate) fn max_guests(mut self, guests: u16) -> Self {
        self.0.max_guests = Capacity::new(guests).unwrap();
        self
    }

    pub(crate) fn min_nights(mut self, nights: u16) -> Self {
        self.0.stay_limits =
            StayLimits::new(Nights::new(nights), self.0.stay_limits.max())
                .unwrap();
        self
    }

    pub(crate) fn max_nights(mut self, nights: u16) -> Self {
        self.0.stay_limits =
            StayLimits::new(self.0.stay_limits.min(), Nights::new(nights))
                .unwrap();
        self
    }

    pub(crate) fn unpublished(mut self) -> Self {
        self.0.is_published = false;
        self
    }

    pub(crate) fn build(self) -> Property {
        self.0
    }
}

/// Starts building a pending [`Reservation`] of a fresh [`property()`] for
/// two adults.
pub(crate) fn reservation(check_in: &str, check_out: &str) -> ReservationBuilder {
    let property = property().build();
    let dates = DateRange::new(date(check_in), date(check_out)).unwrap();
    ReservationBuilder(Reservation {
        id: reservation::Id::new(),
        code: Code::generate(),
        property_id: property.id,
        guest_id: user::Id::new(),
        dates,
        guests: Guests {
            adults: 2,
            children: 0,
            infants: 0,
        },
        special_requests: None,
        pricing: Pricing::calculate(&property, dates),
        payment: Payment::pending(),
        status: reservation::Status::Pending,
        created_at: DateTime::now().coerce(),
        confirmed_at: None,
        cancelled_at: None,
        cancellation_reason: None,
    })
}

/// Builder of a test [`Reservation`].
#[derive(Debug)]
pub(crate) struct ReservationBuilder(Reservation);

impl ReservationBuilder {
    pub(crate) fn of(mut self, property: &Property) -> Self {
        self.0.property_id = property.id;
        self.0.pricing = Pricing::calculate(property, self.0.dates);
        self
    }

    pub(crate) fn status(mut self, status: reservation::Status) -> Self {
        self.0.status = status;
        self
    }

    pub(crate) fn build(self) -> Reservation {
        self.0
    }
}
