//! [`Query`] collection related to a single [`Reservation`].

use common::operations::By;

use crate::domain::{
    reservation::{self, Code},
    Reservation,
};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`Reservation`] by its [`reservation::Id`].
pub type ById = DatabaseQuery<By<Option<Reservation>, reservation::Id>>;

/// Queries a [`Reservation`] by its [`Code`].
pub type ByCode = DatabaseQuery<By<Option<Reservation>, Code>>;

#[cfg(test)]
mod spec {
    use common::operations::Insert;

    use crate::{
        domain::reservation::Code,
        infra::Database as _,
        test_support::{property, reservation, service},
        Query as _,
    };

    use super::{ByCode, ById};

    #[tokio::test]
    async fn finds_by_id_and_code() {
        let svc = service();
        let p = property().build();
        let r = reservation("2030-01-10", "2030-01-12").of(&p).build();
        svc.database().execute(Insert(p)).await.unwrap();
        svc.database().execute(Insert(r.clone())).await.unwrap();

        let by_id = svc.execute(ById::by(r.id)).await.unwrap().unwrap();
        let by_code =
            svc.execute(ByCode::by(r.code.clone())).await.unwrap().unwrap();

        assert_eq!(by_id.id, r.id);
        assert_eq!(by_code.id, r.id);
        assert!(svc
            .execute(ByCode::by(Code::generate()))
            .await
            .unwrap()
            .is_none());
    }
}
