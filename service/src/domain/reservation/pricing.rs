//! [`Pricing`] of a stay.

use common::{Currency, DateRange, Money};
use rust_decimal::Decimal;

use crate::domain::Property;

/// Price breakdown of a stay at a [`Property`].
///
/// Snapshotted into a [`Reservation`] once booked, so later changes of the
/// [`Property`] prices don't affect it.
///
/// [`Reservation`]: super::Reservation
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Pricing {
    /// Number of nights of the stay.
    pub nights: u32,

    /// Price of a single night.
    pub price_per_night: Decimal,

    /// One-off cleaning fee.
    pub cleaning_fee: Decimal,

    /// One-off service fee.
    pub service_fee: Decimal,

    /// Refundable security deposit, not included into the
    /// [`Pricing::total`].
    pub security_deposit: Decimal,

    /// Price of all the nights.
    pub subtotal: Decimal,

    /// Amount to be paid for the stay.
    pub total: Decimal,

    /// [`Currency`] of all the amounts.
    pub currency: Currency,
}

impl Pricing {
    /// Calculates the [`Pricing`] of staying at the provided [`Property`]
    /// for the provided `dates`.
    #[must_use]
    pub fn calculate(property: &Property, dates: DateRange) -> Self {
        let nights = dates.nights();
        let price_per_night = property.price_per_night.amount();
        let cleaning_fee = property.cleaning_fee.amount();
        let service_fee = property.service_fee.amount();

        let subtotal = price_per_night * Decimal::from(nights);
        let total = subtotal + cleaning_fee + service_fee;

        Self {
            nights,
            price_per_night,
            cleaning_fee,
            service_fee,
            security_deposit: property.security_deposit.amount(),
            subtotal,
            total,
            currency: property.currency,
        }
    }

    /// Returns the amounts of this [`Pricing`] formatted for display.
    #[must_use]
    pub fn formatted(&self) -> Formatted {
        let fixed = |amount| Money::new(amount, self.currency).to_fixed();
        Formatted {
            price_per_night: fixed(self.price_per_night),
            cleaning_fee: fixed(self.cleaning_fee),
            service_fee: fixed(self.service_fee),
            security_deposit: fixed(self.security_deposit),
            subtotal: fixed(self.subtotal),
            total: fixed(self.total),
        }
    }
}

/// [`Pricing`] amounts formatted with exactly two decimal places.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Formatted {
    /// Formatted [`Pricing::price_per_night`].
    pub price_per_night: String,

    /// Formatted [`Pricing::cleaning_fee`].
    pub cleaning_fee: String,

    /// Formatted [`Pricing::service_fee`].
    pub service_fee: String,

    /// Formatted [`Pricing::security_deposit`].
    pub security_deposit: String,

    /// Formatted [`Pricing::subtotal`].
    pub subtotal: String,

    /// Formatted [`Pricing::total`].
    pub total: String,
}

#[cfg(test)]
mod spec {
    use common::{Currency, Date, DateRange};
    use rust_decimal::Decimal;

    use crate::test_support::{decimal, property};

    use super::Pricing;

    fn stay(from: (i32, u8, u8), to: (i32, u8, u8)) -> DateRange {
        DateRange::new(
            Date::from_ymd(from.0, from.1, from.2).unwrap(),
            Date::from_ymd(to.0, to.1, to.2).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn prices_three_night_stay() {
        let property = property().min_nights(2).build();

        let pricing =
            Pricing::calculate(&property, stay((2025, 6, 1), (2025, 6, 4)));

        assert_eq!(pricing.nights, 3);
        assert_eq!(pricing.subtotal, decimal("300"));
        assert_eq!(pricing.total, decimal("330"));
        assert_eq!(pricing.currency, Currency::Usd);

        let formatted = pricing.formatted();
        assert_eq!(formatted.price_per_night, "100.00");
        assert_eq!(formatted.subtotal, "300.00");
        assert_eq!(formatted.total, "330.00");
    }

    #[test]
    fn keeps_security_deposit_out_of_total() {
        let property = property().security_deposit("250").build();

        let pricing =
            Pricing::calculate(&property, stay((2025, 6, 1), (2025, 6, 3)));

        assert_eq!(pricing.security_deposit, decimal("250"));
        assert_eq!(pricing.total, decimal("230"));
        assert_eq!(pricing.formatted().security_deposit, "250.00");
    }

    #[test]
    fn is_deterministic() {
        let property = property().price("89.99").cleaning_fee("15.50").build();
        let dates = stay((2025, 12, 28), (2026, 1, 3));

        assert_eq!(
            Pricing::calculate(&property, dates),
            Pricing::calculate(&property, dates),
        );
        assert_eq!(
            Pricing::calculate(&property, dates).formatted(),
            Pricing::calculate(&property, dates).formatted(),
        );
    }

    #[test]
    fn total_adds_up_to_the_cent() {
        let prices = ["0.01", "1", "33.33", "89.99", "100", "1234.56"];
        let fees = ["0", "0.99", "10", "20.05"];

        for price in prices {
            for cleaning in fees {
                for service in fees {
                    let property = property()
                        .price(price)
                        .cleaning_fee(cleaning)
                        .service_fee(service)
                        .build();
                    for nights in 1..=30_u8 {
                        let dates = stay((2025, 8, 1), (2025, 8, 1 + nights));
                        let p = Pricing::calculate(&property, dates);

                        assert_eq!(p.nights, u32::from(nights));
                        assert_eq!(
                            p.total,
                            decimal(price) * Decimal::from(nights)
                                + decimal(cleaning)
                                + decimal(service),
                        );
                        assert!(p.total.normalize().scale() <= 2);
                    }
                }
            }
        }
    }
}
