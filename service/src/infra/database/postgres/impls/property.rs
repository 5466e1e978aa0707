//! [`Property`]-related [`Database`] implementations.

use common::operations::{By, Insert, Lock, Select};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        property::{self, Capacity, Nights, StayLimits},
        Property,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

/// Builds a [`Property`] out of the provided [`Row`].
fn from_row(row: &Row) -> Property {
    let nights = |column| {
        row.get::<_, Option<i32>>(column).map(|n| {
            u16::try_from(n)
                .ok()
                .and_then(Nights::new)
                .expect("`Nights` overflow")
        })
    };

    Property {
        id: row.get("id"),
        host_id: row.get("host_id"),
        title: row.get("title"),
        currency: row.get("currency"),
        price_per_night: row.get("price_per_night"),
        cleaning_fee: row.get("cleaning_fee"),
        service_fee: row.get("service_fee"),
        security_deposit: row.get("security_deposit"),
        max_guests: u16::try_from(row.get::<_, i32>("max_guests"))
            .ok()
            .and_then(Capacity::new)
            .expect("`max_guests` overflow"),
        stay_limits: StayLimits::new(nights("min_nights"), nights("max_nights"))
            .expect("`min_nights` exceeds `max_nights`"),
        is_active: row.get("is_active"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    }
}

impl<C> Database<Select<By<Option<Property>, property::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Property>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Property>, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: property::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, host_id, title, currency, \
                   price_per_night, cleaning_fee, service_fee, \
                   security_deposit, \
                   max_guests, min_nights, max_nights, \
                   is_active, is_published, \
                   created_at \
            FROM properties \
            WHERE id = $1::UUID \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Insert<Property>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(property): Insert<Property>,
    ) -> Result<Self::Ok, Self::Err> {
        let Property {
            id,
            host_id,
            title,
            currency,
            price_per_night,
            cleaning_fee,
            service_fee,
            security_deposit,
            max_guests,
            stay_limits,
            is_active,
            is_published,
            created_at,
        } = property;

        let max_guests = i32::from(u16::from(max_guests));
        let min_nights = stay_limits.min().map(|n| i32::from(u16::from(n)));
        let max_nights = stay_limits.max().map(|n| i32::from(u16::from(n)));

        const SQL: &str = "\
            INSERT INTO properties (\
                id, host_id, title, currency, \
                price_per_night, cleaning_fee, service_fee, \
                security_deposit, \
                max_guests, min_nights, max_nights, \
                is_active, is_published, \
                created_at \
            ) VALUES (\
                $1::UUID, $2::UUID, $3::VARCHAR, $4::INT2, \
                $5::NUMERIC, $6::NUMERIC, $7::NUMERIC, \
                $8::NUMERIC, \
                $9::INT4, $10::INT4, $11::INT4, \
                $12::BOOL, $13::BOOL, \
                $14::TIMESTAMPTZ \
            )";
        self.exec(
            SQL,
            &[
                &id,
                &host_id,
                &title,
                &currency,
                &price_per_night,
                &cleaning_fee,
                &service_fee,
                &security_deposit,
                &max_guests,
                &min_nights,
                &max_nights,
                &is_active,
                &is_published,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Property, property::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Property, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: property::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM properties \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
