//! [`Command`] for signing a [`User`] in with a [`VerificationToken`].

use common::{
    operations::{By, Commit, Delete, Insert, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{user, verification, User, VerificationToken},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for signing a [`User`] in with a [`VerificationToken`].
///
/// The presented [`VerificationToken`] is consumed whether the sign-in
/// succeeds or not: a second attempt with the same token always fails.
#[derive(Clone, Debug)]
pub struct SignInEmail {
    /// [`user::Email`] the [`VerificationToken`] was issued for.
    pub identifier: user::Email,

    /// Presented [`verification::Token`] value.
    pub token: verification::Token,
}

impl<Db, Idp> Command<SignInEmail> for Service<Db, Idp>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: for<'k> Database<
            Select<By<Option<VerificationToken>, &'k verification::Key>>,
            Ok = Option<VerificationToken>,
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<VerificationToken, verification::Key>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + for<'e> Database<
            Select<By<Option<User>, &'e user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Insert<User>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: SignInEmail) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SignInEmail { identifier, token } = cmd;

        let key = verification::Key { identifier, token };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let verification = tx
            .execute(Select(By::new(&key)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::TokenNotExists)
            .map_err(tracerr::wrap!())?;

        tx.execute(Delete(By::new(key)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let now = DateTime::now();
        if verification.expires_at <= now.coerce() {
            // The token stays consumed even when it turns out expired.
            tx.execute(Commit)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            return Err(tracerr::new!(E::TokenExpired));
        }

        let user = match tx
            .execute(Select(By::new(&verification.identifier)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
        {
            Some(mut user) => {
                if user.email_verified_at.is_none() {
                    user.email_verified_at = Some(now.coerce());
                    tx.execute(Insert(user.clone()))
                        .await
                        .map_err(tracerr::map_from_and_wrap!(=> E))
                        .map(drop)?;
                }
                user
            }
            None => {
                let user = User {
                    id: user::Id::new(),
                    name: None,
                    email: Some(verification.identifier.clone()),
                    email_verified_at: Some(now.coerce()),
                    image: None,
                    created_at: now.coerce(),
                };
                tx.execute(Insert(user.clone()))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
                user
            }
        };

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(user)
    }
}

/// Error of [`SignInEmail`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// No [`VerificationToken`] matches the presented one.
    #[display("No `VerificationToken` matches the presented one")]
    TokenNotExists,

    /// Presented [`VerificationToken`] has expired.
    #[display("Presented `VerificationToken` has expired")]
    TokenExpired,
}

#[cfg(test)]
mod spec {
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
        time::Duration,
    };

    use common::operations::{By, Commit, Delete, Insert, Select, Transact};
    use tracerr::Traced;

    use crate::{
        command::CreateVerificationToken,
        domain::{user, verification, User, VerificationToken},
        infra::{database, Database},
        Command as _, Config, Service, SessionConfig, SessionStrategy,
    };

    use super::{ExecutionError, SignInEmail};

    /// In-memory [`Database`] of [`User`]s and [`VerificationToken`]s.
    #[derive(Clone, Debug, Default)]
    struct Db {
        users: Arc<Mutex<HashMap<user::Id, User>>>,
        tokens: Arc<Mutex<HashMap<verification::Key, VerificationToken>>>,
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

    impl<'k> Database<Select<By<Option<VerificationToken>, &'k verification::Key>>>
        for Db
    {
        type Ok = Option<VerificationToken>;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Select(by): Select<
                By<Option<VerificationToken>, &'k verification::Key>,
            >,
        ) -> Result<Self::Ok, Self::Err> {
            Ok(self.tokens.lock().unwrap().get(by.into_inner()).cloned())
        }
    }

    impl Database<Delete<By<VerificationToken, verification::Key>>> for Db {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Delete(by): Delete<By<VerificationToken, verification::Key>>,
        ) -> Result<Self::Ok, Self::Err> {
            drop(self.tokens.lock().unwrap().remove(&by.into_inner()));
            Ok(())
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

    impl Database<Insert<VerificationToken>> for Db {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Insert(vt): Insert<VerificationToken>,
        ) -> Result<Self::Ok, Self::Err> {
            let key = verification::Key {
                identifier: vt.identifier.clone(),
                token: vt.token.clone(),
            };
            drop(self.tokens.lock().unwrap().insert(key, vt));
            Ok(())
        }
    }

    fn service(db: Db) -> Service<Db, ()> {
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
            identity: (),
        }
    }

    #[tokio::test]
    async fn signs_in_and_verifies_email() {
        let db = Db::default();
        let svc = service(db);
        let email = user::Email::new("jane@example.com").unwrap();

        let issued = svc
            .execute(CreateVerificationToken {
                identifier: email.clone(),
            })
            .await
            .unwrap();
        let user = svc
            .execute(SignInEmail {
                identifier: email.clone(),
                token: issued.token,
            })
            .await
            .unwrap();

        assert_eq!(user.email, Some(email));
        assert!(user.email_verified_at.is_some());
    }

    #[tokio::test]
    async fn consumed_token_cannot_be_used_twice() {
        let db = Db::default();
        let svc = service(db);
        let email = user::Email::new("jane@example.com").unwrap();

        let issued = svc
            .execute(CreateVerificationToken {
                identifier: email.clone(),
            })
            .await
            .unwrap();

        drop(
            svc.execute(SignInEmail {
                identifier: email.clone(),
                token: issued.token.clone(),
            })
            .await
            .unwrap(),
        );
        let err = svc
            .execute(SignInEmail {
                identifier: email,
                token: issued.token,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::TokenNotExists));
    }

    #[tokio::test]
    async fn rejects_token_of_another_identifier() {
        let db = Db::default();
        let svc = service(db);

        let issued = svc
            .execute(CreateVerificationToken {
                identifier: user::Email::new("jane@example.com").unwrap(),
            })
            .await
            .unwrap();
        let err = svc
            .execute(SignInEmail {
                identifier: user::Email::new("mallory@example.com").unwrap(),
                token: issued.token,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::TokenNotExists));
    }
}
