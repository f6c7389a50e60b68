//! [`VerificationToken`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Select};
use tracerr::Traced;

use crate::{
    domain::{verification, VerificationToken},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<'k, C>
    Database<Select<By<Option<VerificationToken>, &'k verification::Key>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<VerificationToken>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Option<VerificationToken>, &'k verification::Key>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let verification::Key { identifier, token } = by.into_inner();

        const SQL: &str = "\
            SELECT identifier, token, expires_at \
            FROM verification_tokens \
            WHERE identifier = $1::VARCHAR \
              AND token = $2::VARCHAR \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[identifier, token])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| VerificationToken {
                identifier: row.get("identifier"),
                token: row.get("token"),
                expires_at: row.get("expires_at"),
            }))
    }
}

impl<C> Database<Insert<VerificationToken>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(vt): Insert<VerificationToken>,
    ) -> Result<Self::Ok, Self::Err> {
        let VerificationToken {
            identifier,
            token,
            expires_at,
        } = vt;

        const SQL: &str = "\
            INSERT INTO verification_tokens (identifier, token, expires_at) \
            VALUES ($1::VARCHAR, $2::VARCHAR, $3::TIMESTAMPTZ)";
        self.exec(SQL, &[&identifier, &token, &expires_at])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Delete<By<VerificationToken, verification::Key>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<VerificationToken, verification::Key>>,
    ) -> Result<Self::Ok, Self::Err> {
        let verification::Key { identifier, token } = by.into_inner();

        const SQL: &str = "\
            DELETE FROM verification_tokens \
            WHERE identifier = $1::VARCHAR \
              AND token = $2::VARCHAR";
        self.exec(SQL, &[&identifier, &token])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C>
    Database<Delete<By<VerificationToken, verification::ExpirationDateTime>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<
            By<VerificationToken, verification::ExpirationDateTime>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let deadline = by.into_inner();

        const SQL: &str = "\
            DELETE FROM verification_tokens \
            WHERE expires_at <= $1::TIMESTAMPTZ";
        self.exec(SQL, &[&deadline])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
