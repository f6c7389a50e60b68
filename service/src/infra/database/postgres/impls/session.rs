//! [`Session`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Select, Update};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::Session;
use crate::{
    domain::user::session,
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<'t, C> Database<Select<By<Option<session::Stored>, &'t session::Token>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<session::Stored>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<session::Stored>, &'t session::Token>>,
    ) -> Result<Self::Ok, Self::Err> {
        let token = by.into_inner();

        const SQL: &str = "\
            SELECT token, user_id, expires_at \
            FROM sessions \
            WHERE token = $1::VARCHAR \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[&token])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| session::Stored {
                token: row.get("token"),
                user_id: row.get("user_id"),
                expires_at: row.get("expires_at"),
            }))
    }
}

impl<C> Database<Insert<session::Stored>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Update<session::Stored>,
        Ok = (),
        Err = Traced<database::Error>,
    >,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(stored): Insert<session::Stored>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(stored)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<session::Stored>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(stored): Update<session::Stored>,
    ) -> Result<Self::Ok, Self::Err> {
        let session::Stored {
            token,
            user_id,
            expires_at,
        } = stored;

        const SQL: &str = "\
            INSERT INTO sessions (token, user_id, expires_at) \
            VALUES ($1::VARCHAR, $2::UUID, $3::TIMESTAMPTZ) \
            ON CONFLICT (token) DO UPDATE \
            SET user_id = EXCLUDED.user_id, \
                expires_at = EXCLUDED.expires_at";
        self.exec(SQL, &[&token, &user_id, &expires_at])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Delete<By<session::Stored, session::Token>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<session::Stored, session::Token>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let token: session::Token = by.into_inner();

        const SQL: &str = "\
            DELETE FROM sessions \
            WHERE token = $1::VARCHAR";
        self.exec(SQL, &[&token])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Delete<By<session::Stored, session::ExpirationDateTime>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<
            By<session::Stored, session::ExpirationDateTime>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let deadline = by.into_inner();

        const SQL: &str = "\
            DELETE FROM sessions \
            WHERE expires_at <= $1::TIMESTAMPTZ";
        self.exec(SQL, &[&deadline])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
