//! [`Query`] pricing a stay at a [`Property`].

use common::{
    operations::{By, Select},
    Date,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        property,
        reservation::{availability, Pricing, Violation},
        Property,
    },
    infra::{database, Database},
    Service,
};

use super::Query;

/// [`Query`] pricing a stay at a [`Property`] without checking whether it
/// can be booked.
#[derive(Clone, Copy, Debug)]
pub struct CalculatePricing {
    /// ID of the [`Property`] to price a stay at.
    pub property_id: property::Id,

    /// Date of the first night.
    pub check_in: Date,

    /// Date of leaving.
    pub check_out: Date,
}

impl<Db> Query<CalculatePricing> for Service<Db>
where
    Db: Database<
        Select<By<Option<Property>, property::Id>>,
        Ok = Option<Property>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Pricing;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        query: CalculatePricing,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CalculatePricing {
            property_id,
            check_in,
            check_out,
        } = query;

        let property = self
            .database()
            .execute(Select(By::<Option<Property>, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(Property::is_bookable)
            .ok_or(E::PropertyNotExists(property_id))
            .map_err(tracerr::wrap!())?;

        let dates = availability::check_dates(Date::today(), check_in, check_out)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        Ok(Pricing::calculate(&property, dates))
    }
}

/// Error of [`CalculatePricing`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Property`] with the provided ID doesn't exist or accepts no
    /// reservations.
    #[display("`Property(id: {_0})` does not exist")]
    PropertyNotExists(#[error(not(source))] property::Id),

    /// Requested dates make no sense.
    #[display("{_0}")]
    #[from]
    InvalidDates(Violation),
}
