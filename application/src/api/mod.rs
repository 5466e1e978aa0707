//! GraphQL API definitions.

mod mutation;
pub mod property;
mod query;
pub mod reservation;
pub mod scalar;
pub mod user;

use juniper::EmptySubscription;

use crate::Context;

pub use self::{
    mutation::Mutation, property::Property, query::Query,
    reservation::Reservation,
};

/// GraphQL schema.
pub type Schema =
    juniper::RootNode<'static, Query, Mutation, EmptySubscription<Context>>;
