//! [`Account`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select, Update};
use tracerr::Traced;

use crate::{
    domain::{account, Account},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<'k, C> Database<Select<By<Option<Account>, &'k account::Key>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Account>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Account>, &'k account::Key>>,
    ) -> Result<Self::Ok, Self::Err> {
        let account::Key {
            provider,
            provider_account_id,
        } = by.into_inner();

        const SQL: &str = "\
            SELECT user_id, provider, provider_account_id, \
                   kind, \
                   access_token, refresh_token, \
                   expires_at, token_type, \
                   scope, id_token, \
                   created_at \
            FROM accounts \
            WHERE provider = $1::VARCHAR \
              AND provider_account_id = $2::VARCHAR \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[provider, provider_account_id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| Account {
                user_id: row.get("user_id"),
                provider: row.get("provider"),
                provider_account_id: row.get("provider_account_id"),
                kind: row.get("kind"),
                access_token: row.get("access_token"),
                refresh_token: row.get("refresh_token"),
                expires_at: row.get("expires_at"),
                token_type: row.get("token_type"),
                scope: row.get("scope"),
                id_token: row.get("id_token"),
                created_at: row.get("created_at"),
            }))
    }
}

impl<C> Database<Insert<Account>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Account>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(account): Insert<Account>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(account))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Account>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(account): Update<Account>,
    ) -> Result<Self::Ok, Self::Err> {
        let Account {
            user_id,
            provider,
            provider_account_id,
            kind,
            access_token,
            refresh_token,
            expires_at,
            token_type,
            scope,
            id_token,
            created_at,
        } = account;

        const SQL: &str = "\
            INSERT INTO accounts (\
                user_id, provider, provider_account_id, \
                kind, \
                access_token, refresh_token, \
                expires_at, token_type, \
                scope, id_token, \
                created_at\
            ) \
            VALUES (\
                $1::UUID, $2::VARCHAR, $3::VARCHAR, \
                $4::account_kind, \
                $5::VARCHAR, $6::VARCHAR, \
                $7::TIMESTAMPTZ, $8::VARCHAR, \
                $9::VARCHAR, $10::VARCHAR, \
                $11::TIMESTAMPTZ\
            ) \
            ON CONFLICT (provider, provider_account_id) DO UPDATE \
            SET user_id = EXCLUDED.user_id, \
                kind = EXCLUDED.kind, \
                access_token = EXCLUDED.access_token, \
                refresh_token = EXCLUDED.refresh_token, \
                expires_at = EXCLUDED.expires_at, \
                token_type = EXCLUDED.token_type, \
                scope = EXCLUDED.scope, \
                id_token = EXCLUDED.id_token";
        self.exec(
            SQL,
            &[
                &user_id,
                &provider,
                &provider_account_id,
                &kind,
                &access_token,
                &refresh_token,
                &expires_at,
                &token_type,
                &scope,
                &id_token,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}
