//! [`Reservation`]-related [`Database`] implementations.

use common::{
    operations::{By, Insert, Select, Update},
    Date, DateRange,
};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        reservation::{self, Code, Guests, Payment, Pricing},
        Reservation,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read::reservation::{Active, Completed, Overlapping, StatusEntry},
};

/// Columns of a [`Reservation`] row, in the order [`from_row()`] expects
/// them.
macro_rules! columns {
    () => {
        "id, code, property_id, guest_id, \
         check_in, check_out, nights, \
         adults, children, infants, special_requests, \
         price_per_night, cleaning_fee, service_fee, security_deposit, \
         subtotal, total_amount, currency, \
         payment_status, amount_paid, payment_date, \
         status_id, \
         created_at, confirmed_at, cancelled_at, cancellation_reason"
    };
}

/// Builds a [`Reservation`] out of the provided [`Row`].
fn from_row(row: &Row) -> Reservation {
    let count = |column| {
        u16::try_from(row.get::<_, i32>(column))
            .unwrap_or_else(|_| panic!("`{column}` overflow"))
    };

    let dates = DateRange::new(row.get("check_in"), row.get("check_out"))
        .expect("`check_out` is not after `check_in`");
    let pricing = Pricing {
        nights: u32::try_from(row.get::<_, i32>("nights"))
            .expect("`nights` overflow"),
        price_per_night: row.get("price_per_night"),
        cleaning_fee: row.get("cleaning_fee"),
        service_fee: row.get("service_fee"),
        security_deposit: row.get("security_deposit"),
        subtotal: row.get("subtotal"),
        total: row.get("total_amount"),
        currency: row.get("currency"),
    };
    let payment = Payment::new(
        row.get("payment_status"),
        row.get("amount_paid"),
        row.get("payment_date"),
        pricing.total,
    )
    .expect("`amount_paid` exceeds `total_amount`");

    Reservation {
        id: row.get("id"),
        code: row.get("code"),
        property_id: row.get("property_id"),
        guest_id: row.get("guest_id"),
        dates,
        guests: Guests {
            adults: count("adults"),
            children: count("children"),
            infants: count("infants"),
        },
        special_requests: row.get("special_requests"),
        pricing,
        payment,
        status: row.get("status_id"),
        created_at: row.get("created_at"),
        confirmed_at: row.get("confirmed_at"),
        cancelled_at: row.get("cancelled_at"),
        cancellation_reason: row.get("cancellation_reason"),
    }
}

impl<C> Database<Select<By<Option<Reservation>, reservation::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Reservation>, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: reservation::Id = by.into_inner();

        const SQL: &str = concat!(
            "SELECT ",
            columns!(),
            " FROM reservations \
              WHERE id = $1::UUID \
              LIMIT 1",
        );
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Option<Reservation>, Code>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<Option<Reservation>, reservation::Id>>,
        Ok = Option<Reservation>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Reservation>, Code>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let code: Code = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM reservations \
            WHERE code = $1::VARCHAR \
            LIMIT 1";
        let Some(row) = self
            .query_opt(SQL, &[&code])
            .await
            .map_err(tracerr::wrap!())?
        else {
            return Ok(None);
        };

        self.execute(Select(By::<Option<Reservation>, reservation::Id>::new(
            row.get("id"),
        )))
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Select<By<Vec<Active<Reservation>>, Overlapping>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Active<Reservation>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Active<Reservation>>, Overlapping>>,
    ) -> Result<Self::Ok, Self::Err> {
        let Overlapping { property_id, dates } = by.into_inner();
        let (from, to) = (dates.start(), dates.end());
        let active: &[reservation::Status] = &reservation::Status::ACTIVE;

        // Half-open ranges: touching check-out and check-in don't overlap.
        const SQL: &str = concat!(
            "SELECT ",
            columns!(),
            " FROM reservations \
              WHERE property_id = $1::UUID \
                AND status_id = ANY($2::INT2[]) \
                AND check_in < $4::DATE \
                AND check_out > $3::DATE \
              ORDER BY check_in",
        );
        Ok(self
            .query(SQL, &[&property_id, &active, &from, &to])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| Active(from_row(row)))
            .collect())
    }
}

impl<C> Database<Select<By<Option<StatusEntry>, reservation::Status>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<StatusEntry>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<StatusEntry>, reservation::Status>>,
    ) -> Result<Self::Ok, Self::Err> {
        let status = by.into_inner();

        const SQL: &str = "\
            SELECT name \
            FROM reservation_statuses \
            WHERE id = $1::INT2 \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[&status])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| StatusEntry {
                status,
                name: row.get("name"),
            }))
    }
}

impl<C> Database<Insert<Reservation>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(r): Insert<Reservation>,
    ) -> Result<Self::Ok, Self::Err> {
        let nights =
            i32::try_from(r.pricing.nights).expect("`nights` overflow");
        let (adults, children, infants) = (
            i32::from(r.guests.adults),
            i32::from(r.guests.children),
            i32::from(r.guests.infants),
        );
        let payment_status = r.payment.status();
        let (check_in, check_out) = (r.dates.start(), r.dates.end());
        let (amount_paid, paid_at) =
            (r.payment.amount_paid(), r.payment.paid_at());

        const SQL: &str = concat!(
            "INSERT INTO reservations (",
            columns!(),
            ") VALUES (\
                $1::UUID, $2::VARCHAR, $3::UUID, $4::UUID, \
                $5::DATE, $6::DATE, $7::INT4, \
                $8::INT4, $9::INT4, $10::INT4, $11::TEXT, \
                $12::NUMERIC, $13::NUMERIC, $14::NUMERIC, $15::NUMERIC, \
                $16::NUMERIC, $17::NUMERIC, $18::INT2, \
                $19::INT2, $20::NUMERIC, $21::TIMESTAMPTZ, \
                $22::INT2, \
                $23::TIMESTAMPTZ, $24::TIMESTAMPTZ, $25::TIMESTAMPTZ, \
                $26::TEXT\
            )",
        );
        self.exec(
            SQL,
            &[
                &r.id,
                &r.code,
                &r.property_id,
                &r.guest_id,
                &check_in,
                &check_out,
                &nights,
                &adults,
                &children,
                &infants,
                &r.special_requests,
                &r.pricing.price_per_night,
                &r.pricing.cleaning_fee,
                &r.pricing.service_fee,
                &r.pricing.security_deposit,
                &r.pricing.subtotal,
                &r.pricing.total,
                &r.pricing.currency,
                &payment_status,
                &amount_paid,
                &paid_at,
                &r.status,
                &r.created_at,
                &r.confirmed_at,
                &r.cancelled_at,
                &r.cancellation_reason,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<Reservation>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(r): Update<Reservation>,
    ) -> Result<Self::Ok, Self::Err> {
        let payment_status = r.payment.status();
        let (amount_paid, paid_at) =
            (r.payment.amount_paid(), r.payment.paid_at());

        // Only the lifecycle of a `Reservation` is mutable.
        const SQL: &str = "\
            UPDATE reservations \
            SET payment_status = $2::INT2, \
                amount_paid = $3::NUMERIC, \
                payment_date = $4::TIMESTAMPTZ, \
                status_id = $5::INT2, \
                confirmed_at = $6::TIMESTAMPTZ, \
                cancelled_at = $7::TIMESTAMPTZ, \
                cancellation_reason = $8::TEXT \
            WHERE id = $1::UUID";
        self.exec(
            SQL,
            &[
                &r.id,
                &payment_status,
                &amount_paid,
                &paid_at,
                &r.status,
                &r.confirmed_at,
                &r.cancelled_at,
                &r.cancellation_reason,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<By<Completed, Date>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Completed;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(by): Update<By<Completed, Date>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let today: Date = by.into_inner();

        const SQL: &str = "\
            UPDATE reservations \
            SET status_id = $1::INT2 \
            WHERE status_id = $2::INT2 \
              AND check_out < $3::DATE";
        self.exec(
            SQL,
            &[
                &reservation::Status::Completed,
                &reservation::Status::Confirmed,
                &today,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(Completed)
    }
}
