//! [`Command`] for creating a new [`Property`].

use common::{operations::Insert, Currency, DateTime};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        property::{self, Capacity, Fee, Price, StayLimits, Title},
        user, Property,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Property`].
#[derive(Clone, Debug)]
pub struct CreateProperty {
    /// ID of the user hosting a new [`Property`].
    pub host_id: user::Id,

    /// [`Title`] of a new [`Property`].
    pub title: Title,

    /// [`Currency`] of a new [`Property`] amounts.
    pub currency: Currency,

    /// [`Price`] of a single night.
    pub price_per_night: Price,

    /// Cleaning [`Fee`] charged per stay.
    pub cleaning_fee: Fee,

    /// Service [`Fee`] charged per stay.
    pub service_fee: Fee,

    /// Refundable security deposit.
    pub security_deposit: Fee,

    /// Maximum number of adults and children.
    pub max_guests: Capacity,

    /// [`StayLimits`] of a new [`Property`].
    pub stay_limits: StayLimits,

    /// Indicator whether a new [`Property`] is visible to guests right away.
    pub is_published: bool,
}

impl<Db> Command<CreateProperty> for Service<Db>
where
    Db: Database<Insert<Property>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Property;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateProperty,
    ) -> Result<Self::Ok, Self::Err> {
        let CreateProperty {
            host_id,
            title,
            currency,
            price_per_night,
            cleaning_fee,
            service_fee,
            security_deposit,
            max_guests,
            stay_limits,
            is_published,
        } = cmd;

        let property = Property {
            id: property::Id::new(),
            host_id,
            title,
            currency,
            price_per_night,
            cleaning_fee,
            service_fee,
            security_deposit,
            max_guests,
            stay_limits,
            is_active: true,
            is_published,
            created_at: DateTime::now().coerce(),
        };

        self.database()
            .execute(Insert(property.clone()))
            .await
            .map_err(tracerr::wrap!())?;

        log::info!("`Property(id: {})` created", property.id);

        Ok(property)
    }
}

/// Error of [`CreateProperty`] [`Command`] execution.
pub type ExecutionError = database::Error;

#[cfg(test)]
mod spec {
    use common::{
        operations::{By, Select},
        Currency,
    };

    use crate::{
        domain::{
            property::{Capacity, Fee, Nights, Price, StayLimits, Title},
            user, Property,
        },
        infra::Database as _,
        test_support::{decimal, service},
        Command as _,
    };

    use super::CreateProperty;

    fn cmd() -> CreateProperty {
        CreateProperty {
            host_id: user::Id::new(),
            title: Title::new("Loft downtown").unwrap(),
            currency: Currency::Eur,
            price_per_night: Price::new(decimal("85.50")).unwrap(),
            cleaning_fee: Fee::new(decimal("25")).unwrap(),
            service_fee: Fee::ZERO,
            security_deposit: Fee::new(decimal("200")).unwrap(),
            max_guests: Capacity::new(3).unwrap(),
            stay_limits: StayLimits::new(Nights::new(2), Nights::new(14))
                .unwrap(),
            is_published: true,
        }
    }

    #[tokio::test]
    async fn stores_bookable_property() {
        let svc = service();

        let created = svc.execute(cmd()).await.unwrap();

        assert!(created.is_bookable());
        let stored = svc
            .database()
            .execute(Select(By::<Option<Property>, _>::new(created.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.title, created.title);
        assert_eq!(stored.currency, Currency::Eur);
        assert_eq!(stored.price_per_night.amount(), decimal("85.50"));
        assert_eq!(stored.stay_limits.min().map(Nights::get), Some(2));
    }

    #[tokio::test]
    async fn unpublished_property_is_not_bookable() {
        let svc = service();

        let created = svc
            .execute(CreateProperty {
                is_published: false,
                ..cmd()
            })
            .await
            .unwrap();

        assert!(!created.is_bookable());
    }

    #[tokio::test]
    async fn surfaces_storage_failure() {
        let svc = service();
        svc.database().fail_writes(true);

        let err = svc.execute(cmd()).await.unwrap_err();

        assert!(err.to_string().contains("unavailable"), "{err}");
    }
}
