//! [`Property`]-related definitions.

use std::future;

use common::{DateTime, Handler as _, Money};
use derive_more::{AsRef, Display, From, Into};
use futures::TryFutureExt as _;
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::{domain, query};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{api, api::scalar, AsError, Context, Error};

/// A vacation rental.
#[derive(Clone, Debug)]
pub struct Property {
    /// ID of this [`Property`].
    id: Id,

    /// Underlying [`domain::Property`].
    property: OnceCell<domain::Property>,
}

impl From<domain::Property> for Property {
    fn from(property: domain::Property) -> Self {
        Self {
            id: property.id.into(),
            property: OnceCell::new_with(Some(property)),
        }
    }
}

impl Property {
    /// Creates a new [`Property`] with the provided ID.
    ///
    /// # Safety
    ///
    /// Caller must ensure that [`Property`] with the provided ID exists,
    /// otherwise accessing this [`Property`] will result with an error.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            property: OnceCell::new(),
        }
    }

    /// Returns the underlying [`domain::Property`].
    ///
    /// # Errors
    ///
    /// Errors if the [`domain::Property`] doesn't exist.
    async fn property(
        &self,
        ctx: &Context,
    ) -> Result<&domain::Property, Error> {
        let id = self.id.into();
        self.property
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::property::ById::by(id))
                    .map_err(AsError::into_error)
                    .map_err(ctx.error())
                    .and_then(|p| {
                        future::ready(p.ok_or_else(|| {
                            api::query::PropertyError::NotExists.into()
                        }))
                    })
            })
            .await
    }

    /// Returns [`Money`] of the provided `amount` in the [`Currency`] of
    /// this [`Property`].
    async fn money(
        &self,
        ctx: &Context,
        amount: impl FnOnce(&domain::Property) -> rust_decimal::Decimal,
    ) -> Result<Money, Error> {
        let property = self.property(ctx).await?;
        Ok(Money::new(amount(property), property.currency))
    }
}

/// A vacation rental.
#[graphql_object(context = Context)]
impl Property {
    /// Unique identifier of this `Property`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Property.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.id
    }

    /// ID of the `User` hosting this `Property`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Property.hostId",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn host_id(&self, ctx: &Context) -> Result<api::user::Id, Error> {
        Ok(self.property(ctx).await?.host_id.into())
    }

    /// Title of this `Property`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Property.title",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn title(&self, ctx: &Context) -> Result<Title, Error> {
        Ok(self.property(ctx).await?.title.clone().into())
    }

    /// Currency of every amount charged for this `Property`.
    pub async fn currency(&self, ctx: &Context) -> Result<Currency, Error> {
        Ok(self.property(ctx).await?.currency.into())
    }

    /// Price of a single night.
    pub async fn price_per_night(&self, ctx: &Context) -> Result<Money, Error> {
        self.money(ctx, |p| p.price_per_night.amount()).await
    }

    /// Cleaning fee charged once per stay.
    pub async fn cleaning_fee(&self, ctx: &Context) -> Result<Money, Error> {
        self.money(ctx, |p| p.cleaning_fee.amount()).await
    }

    /// Service fee charged once per stay.
    pub async fn service_fee(&self, ctx: &Context) -> Result<Money, Error> {
        self.money(ctx, |p| p.service_fee.amount()).await
    }

    /// Refundable security deposit, never included into a total.
    pub async fn security_deposit(
        &self,
        ctx: &Context,
    ) -> Result<Money, Error> {
        self.money(ctx, |p| p.security_deposit.amount()).await
    }

    /// Maximum number of adults and children staying at once.
    pub async fn max_guests(&self, ctx: &Context) -> Result<i32, Error> {
        Ok(i32::from(u16::from(self.property(ctx).await?.max_guests)))
    }

    /// Minimum number of nights of a stay, if restricted.
    pub async fn min_nights(&self, ctx: &Context) -> Result<Option<i32>, Error> {
        Ok(self
            .property(ctx)
            .await?
            .stay_limits
            .min()
            .map(|n| i32::from(u16::from(n))))
    }

    /// Maximum number of nights of a stay, if restricted.
    pub async fn max_nights(&self, ctx: &Context) -> Result<Option<i32>, Error> {
        Ok(self
            .property(ctx)
            .await?
            .stay_limits
            .max()
            .map(|n| i32::from(u16::from(n))))
    }

    /// Indicator whether this `Property` accepts reservations.
    pub async fn is_bookable(&self, ctx: &Context) -> Result<bool, Error> {
        Ok(self.property(ctx).await?.is_bookable())
    }

    /// `DateTime` when this `Property` was created.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Property.createdAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn created_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.property(ctx).await?.created_at.coerce())
    }
}

/// Unique identifier of a `Property`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::property::Id)]
#[into(domain::property::Id)]
#[graphql(name = "PropertyId", transparent)]
pub struct Id(Uuid);

/// Title of a `Property`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "PropertyTitle",
    with = scalar::Via::<domain::property::Title>,
)]
pub struct Title(domain::property::Title);

/// Currency of amounts charged for a `Property`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
pub enum Currency {
    /// US Dollar.
    Usd,

    /// Euro.
    Eur,

    /// Russian Ruble.
    Rub,
}

impl From<common::Currency> for Currency {
    fn from(currency: common::Currency) -> Self {
        match currency {
            common::Currency::Usd => Self::Usd,
            common::Currency::Eur => Self::Eur,
            common::Currency::Rub => Self::Rub,
        }
    }
}
