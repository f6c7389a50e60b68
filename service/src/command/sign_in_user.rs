//! [`Command`] for signing a [`User`] in through an identity provider.

use common::{
    operations::{By, Commit, Insert, Perform, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{account, user, Account, User},
    infra::{database, identity, Database, IdentityProvider},
    Service,
};

use super::Command;

/// [`Command`] for signing a [`User`] in through an identity provider.
///
/// Completes a sign-in callback: exchanges the received authorization code
/// for the provider's [`identity::Profile`], then links or creates the
/// [`User`] and refreshes the [`Account`] token material.
#[derive(Clone, Debug)]
pub struct SignInUser {
    /// [`account::Provider`] the sign-in goes through.
    pub provider: account::Provider,

    /// [`identity::AuthorizationCode`] received on the callback.
    pub code: identity::AuthorizationCode,

    /// Redirect URI the [`identity::AuthorizationCode`] was issued for.
    pub redirect_uri: String,
}

impl<Db, Idp> Command<SignInUser> for Service<Db, Idp>
where
    Idp: IdentityProvider<
        Perform<identity::Exchange>,
        Ok = identity::Profile,
        Err = Traced<identity::Error>,
    >,
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: for<'k> Database<
            Select<By<Option<Account>, &'k account::Key>>,
            Ok = Option<Account>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + for<'e> Database<
            Select<By<Option<User>, &'e user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Insert<User>, Err = Traced<database::Error>>
        + Database<Insert<Account>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: SignInUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SignInUser {
            provider,
            code,
            redirect_uri,
        } = cmd;

        let profile = self
            .identity()
            .execute(Perform(identity::Exchange {
                provider,
                code,
                redirect_uri,
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let key = account::Key {
            provider: profile.provider.clone(),
            provider_account_id: profile.provider_account_id.clone(),
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let user = match tx
            .execute(Select(By::new(&key)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
        {
            Some(account) => tx
                .execute(Select(By::new(account.user_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or_else(|| E::UserNotExists(account.user_id))
                .map_err(tracerr::wrap!())?,
            None => {
                if let Some(email) = &profile.email {
                    if let Some(existing) = tx
                        .execute(Select(By::new(email)))
                        .await
                        .map_err(tracerr::map_from_and_wrap!(=> E))?
                    {
                        return Err(tracerr::new!(E::AccountNotLinked(
                            existing.id,
                        )));
                    }
                }

                let now = DateTime::now();
                let user = User {
                    id: user::Id::new(),
                    name: profile.name.clone(),
                    email: profile.email.clone(),
                    email_verified_at: (profile.email.is_some()
                        && profile.email_verified)
                        .then(|| now.coerce()),
                    image: profile.image.clone(),
                    created_at: now.coerce(),
                };
                tx.execute(Insert(user.clone()))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
                user
            }
        };

        tx.execute(Insert(Account {
            user_id: user.id,
            provider: profile.provider,
            provider_account_id: profile.provider_account_id,
            kind: profile.kind,
            access_token: profile.access_token,
            refresh_token: profile.refresh_token,
            expires_at: profile.expires_at,
            token_type: profile.token_type,
            scope: profile.scope,
            id_token: profile.id_token,
            created_at: DateTime::now().coerce(),
        }))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
        .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(user)
    }
}

/// Error of [`SignInUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Identity provider exchange failed.
    #[display("Identity provider exchange failed: {_0}")]
    Exchange(identity::Error),

    /// Another [`User`] already owns the email reported by the provider.
    #[display(
        "Email reported by the provider already belongs to `User(id: {_0})`"
    )]
    #[from(ignore)]
    AccountNotLinked(#[error(not(source))] user::Id),

    /// [`User`] the [`Account`] is linked to does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
        time::Duration,
    };

    use common::{
        operations::{By, Commit, Insert, Perform, Select, Transact},
        DateTime,
    };
    use tracerr::Traced;

    use crate::{
        domain::{account, user, Account, User},
        infra::{database, identity, Database, IdentityProvider},
        Command as _, Config, Service, SessionConfig, SessionStrategy,
    };

    use super::{ExecutionError, SignInUser};

    /// In-memory [`Database`] of [`User`]s and [`Account`]s.
    #[derive(Clone, Debug, Default)]
    struct Db {
        users: Arc<Mutex<HashMap<user::Id, User>>>,
        accounts: Arc<Mutex<HashMap<account::Key, Account>>>,
    }

    impl Database<Transact> for Db {
        type Ok = Self;
        type Err = Traced<database::Error>;

        async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
            Ok(self.clone())
        }
    }

    impl Database<Commit> for Db {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
            Ok(())
        }
    }

    impl<'k> Database<Select<By<Option<Account>, &'k account::Key>>> for Db {
        type Ok = Option<Account>;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Select(by): Select<By<Option<Account>, &'k account::Key>>,
        ) -> Result<Self::Ok, Self::Err> {
            Ok(self.accounts.lock().unwrap().get(by.into_inner()).cloned())
        }
    }

    impl Database<Select<By<Option<User>, user::Id>>> for Db {
        type Ok = Option<User>;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Select(by): Select<By<Option<User>, user::Id>>,
        ) -> Result<Self::Ok, Self::Err> {
            Ok(self.users.lock().unwrap().get(&by.into_inner()).cloned())
        }
    }

    impl<'e> Database<Select<By<Option<User>, &'e user::Email>>> for Db {
        type Ok = Option<User>;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Select(by): Select<By<Option<User>, &'e user::Email>>,
        ) -> Result<Self::Ok, Self::Err> {
            let email = by.into_inner();
            Ok(self
                .users
                .lock()
                .unwrap()
                .values()
                .find(|u| u.email.as_ref() == Some(email))
                .cloned())
        }
    }

    impl Database<Insert<User>> for Db {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Insert(user): Insert<User>,
        ) -> Result<Self::Ok, Self::Err> {
            drop(self.users.lock().unwrap().insert(user.id, user));
            Ok(())
        }
    }

    impl Database<Insert<Account>> for Db {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Insert(account): Insert<Account>,
        ) -> Result<Self::Ok, Self::Err> {
            let key = account::Key {
                provider: account.provider.clone(),
                provider_account_id: account.provider_account_id.clone(),
            };
            drop(self.accounts.lock().unwrap().insert(key, account));
            Ok(())
        }
    }

    /// [`IdentityProvider`] returning a canned [`identity::Profile`].
    #[derive(Clone, Debug)]
    struct Idp {
        profile: identity::Profile,
    }

    impl IdentityProvider<Perform<identity::Exchange>> for Idp {
        type Ok = identity::Profile;
        type Err = Traced<identity::Error>;

        async fn execute(
            &self,
            _: Perform<identity::Exchange>,
        ) -> Result<Self::Ok, Self::Err> {
            Ok(self.profile.clone())
        }
    }

    fn profile() -> identity::Profile {
        identity::Profile {
            provider: account::Provider::new("github").unwrap(),
            provider_account_id: "12345".into(),
            kind: account::Kind::Oauth,
            email: user::Email::new("jane@example.com"),
            email_verified: true,
            name: user::Name::new("Jane Doe"),
            image: None,
            access_token: Some("gho_token".into()),
            refresh_token: None,
            expires_at: None,
            token_type: Some("bearer".into()),
            scope: Some("read:user".into()),
            id_token: None,
        }
    }

    fn service(db: Db, profile: identity::Profile) -> Service<Db, Idp> {
        Service {
            config: Config {
                jwt_encoding_key: jsonwebtoken::EncodingKey::from_secret(
                    b"secret",
                ),
                jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(
                    b"secret",
                ),
                session: SessionConfig {
                    strategy: SessionStrategy::Jwt,
                    ttl: Duration::from_secs(30 * 60),
                    renew_after: Duration::from_secs(60),
                },
                verification_token_ttl: Duration::from_secs(24 * 60 * 60),
                clean_expired_sessions:
                    crate::task::clean_expired_sessions::Config {
                        interval: Duration::from_secs(60 * 60),
                    },
            },
            database: db,
            identity: Idp { profile },
        }
    }

    fn sign_in() -> SignInUser {
        SignInUser {
            provider: account::Provider::new("github").unwrap(),
            code: "authorization-code".parse().unwrap(),
            redirect_uri: "https://app.example.com/auth/callback/github"
                .to_owned(),
        }
    }

    #[tokio::test]
    async fn creates_user_and_links_account_on_first_sign_in() {
        let db = Db::default();
        let svc = service(db.clone(), profile());

        let user = svc.execute(sign_in()).await.unwrap();

        assert_eq!(user.email, user::Email::new("jane@example.com"));
        assert!(user.email_verified_at.is_some());

        let key = account::Key {
            provider: account::Provider::new("github").unwrap(),
            provider_account_id: "12345".into(),
        };
        let linked = db.accounts.lock().unwrap().get(&key).cloned().unwrap();
        assert_eq!(linked.user_id, user.id);
        assert_eq!(linked.kind, account::Kind::Oauth);
    }

    #[tokio::test]
    async fn reuses_user_of_already_linked_account() {
        let db = Db::default();
        let svc = service(db.clone(), profile());

        let first = svc.execute(sign_in()).await.unwrap();
        let second = svc.execute(sign_in()).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(db.users.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn refuses_to_link_occupied_email() {
        let db = Db::default();

        let existing = User {
            id: user::Id::new(),
            name: None,
            email: user::Email::new("jane@example.com"),
            email_verified_at: None,
            image: None,
            created_at: DateTime::now().coerce(),
        };
        drop(
            db.users
                .lock()
                .unwrap()
                .insert(existing.id, existing.clone()),
        );

        let svc = service(db, profile());
        let err = svc.execute(sign_in()).await.unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::AccountNotLinked(id) if *id == existing.id,
        ));
    }
}
