//! [`Authenticator`]-related [`Database`] implementations.

use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    domain::{user, Authenticator},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Select<By<Vec<Authenticator>, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Authenticator>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Authenticator>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let user_id: user::Id = by.into_inner();

        const SQL: &str = "\
            SELECT credential_id, user_id, provider_account_id, \
                   public_key, counter, \
                   device_type, backed_up, transports \
            FROM authenticators \
            WHERE user_id = $1::UUID \
            ORDER BY credential_id";
        Ok(self
            .query(SQL, &[&user_id])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| Authenticator {
                credential_id: row.get("credential_id"),
                user_id: row.get("user_id"),
                provider_account_id: row.get("provider_account_id"),
                public_key: row.get("public_key"),
                counter: row.get("counter"),
                device_type: row.get("device_type"),
                backed_up: row.get("backed_up"),
                transports: row.get("transports"),
            })
            .collect())
    }
}
