//! [`Payment`] of a [`Reservation`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use rust_decimal::Decimal;

#[cfg(doc)]
use super::Reservation;

define_kind! {
    #[doc = "Status of a [`Payment`]."]
    enum Status {
        #[doc = "Nothing is paid yet."]
        Pending = 1,

        #[doc = "[`Reservation`] is paid."]
        Paid = 2,

        #[doc = "Payment attempt failed."]
        Failed = 3,

        #[doc = "Paid amount is returned to the guest."]
        Refunded = 4,
    }
}

/// State of paying for a [`Reservation`].
///
/// The paid amount never exceeds the total it's paid against.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Payment {
    /// [`Status`] of this [`Payment`].
    status: Status,

    /// Amount paid so far.
    amount_paid: Decimal,

    /// [`DateTime`] when the last payment was received, if any.
    paid_at: Option<PaymentDateTime>,
}

impl Payment {
    /// Creates a new [`Payment`] with nothing paid yet.
    #[must_use]
    pub fn pending() -> Self {
        Self {
            status: Status::Pending,
            amount_paid: Decimal::ZERO,
            paid_at: None,
        }
    }

    /// Creates a new [`Payment`] settling the whole `total` at once.
    #[must_use]
    pub fn full(total: Decimal, paid_at: PaymentDateTime) -> Self {
        Self {
            status: Status::Paid,
            amount_paid: total.max(Decimal::ZERO),
            paid_at: Some(paid_at),
        }
    }

    /// Creates a new [`Payment`] if the `amount_paid` is within
    /// `0..=total`.
    #[must_use]
    pub fn new(
        status: Status,
        amount_paid: Decimal,
        paid_at: Option<PaymentDateTime>,
        total: Decimal,
    ) -> Option<Self> {
        (amount_paid >= Decimal::ZERO && amount_paid <= total).then_some(
            Self {
                status,
                amount_paid,
                paid_at,
            },
        )
    }

    /// Returns the [`Status`] of this [`Payment`].
    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    /// Returns the amount paid so far.
    #[must_use]
    pub fn amount_paid(&self) -> Decimal {
        self.amount_paid
    }

    /// Returns the [`DateTime`] when the last payment was received, if any.
    #[must_use]
    pub fn paid_at(&self) -> Option<PaymentDateTime> {
        self.paid_at
    }

    /// Returns the amount still to be paid against the provided `total`.
    #[must_use]
    pub fn balance_due(&self, total: Decimal) -> Decimal {
        balance_due(total, self.amount_paid)
    }
}

/// Returns the amount still to be paid against the `total` once the `paid`
/// amount is received.
///
/// Never negative: overpayment yields zero.
#[must_use]
pub fn balance_due(total: Decimal, paid: Decimal) -> Decimal {
    (total - paid).max(Decimal::ZERO)
}

/// [`DateTime`] when a [`Payment`] was received.
pub type PaymentDateTime = DateTimeOf<(Payment, unit::Payment)>;

#[cfg(test)]
mod spec {
    use common::DateTime;
    use rust_decimal::Decimal;

    use super::{balance_due, Payment, Status};

    fn decimal(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn balance_due_is_never_negative() {
        assert_eq!(balance_due(decimal("330"), Decimal::ZERO), decimal("330"));
        assert_eq!(balance_due(decimal("330"), decimal("100")), decimal("230"));
        assert_eq!(balance_due(decimal("330"), decimal("330")), Decimal::ZERO);
        assert_eq!(balance_due(decimal("330"), decimal("330.01")), Decimal::ZERO);
        assert_eq!(balance_due(decimal("330"), decimal("10000")), Decimal::ZERO);
        assert_eq!(balance_due(Decimal::ZERO, decimal("5")), Decimal::ZERO);
    }

    #[test]
    fn balance_due_is_non_negative_on_grid() {
        for total in 0..50 {
            for paid in 0..50 {
                let due = balance_due(Decimal::from(total), Decimal::from(paid));

                assert!(due >= Decimal::ZERO, "{total} - {paid}");
                assert_eq!(
                    due,
                    Decimal::from((total - paid).max(0)),
                    "{total} - {paid}",
                );
            }
        }
    }

    #[test]
    fn pending_payment_owes_everything() {
        let p = Payment::pending();

        assert_eq!(p.status(), Status::Pending);
        assert_eq!(p.amount_paid(), Decimal::ZERO);
        assert_eq!(p.paid_at(), None);
        assert_eq!(p.balance_due(decimal("330")), decimal("330"));
    }

    #[test]
    fn full_payment_settles_total() {
        let now = DateTime::now().coerce();
        let p = Payment::full(decimal("330"), now);

        assert_eq!(p.status(), Status::Paid);
        assert_eq!(p.amount_paid(), decimal("330"));
        assert_eq!(p.paid_at(), Some(now));
        assert_eq!(p.balance_due(decimal("330")), Decimal::ZERO);
    }

    #[test]
    fn paid_amount_is_bounded_by_total() {
        let total = decimal("330");

        assert!(Payment::new(Status::Paid, total, None, total).is_some());
        assert!(Payment::new(Status::Pending, Decimal::ZERO, None, total)
            .is_some());

        assert!(Payment::new(Status::Paid, decimal("330.01"), None, total)
            .is_none());
        assert!(Payment::new(Status::Failed, decimal("-1"), None, total)
            .is_none());
    }
}
