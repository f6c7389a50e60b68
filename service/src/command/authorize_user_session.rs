//! [`Command`] for authorizing a [`User`].

use common::{
    operations::{By, Select, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use jsonwebtoken::Validation;
use tracerr::Traced;

use crate::{
    domain::{
        user::{self, session, Session},
        User,
    },
    infra::{database, Database},
    Service, SessionStrategy,
};

use super::Command;

/// [`Command`] for authorizing a [`User`].
#[derive(Clone, Debug, From)]
pub struct AuthorizeUserSession {
    /// [`Session`] token to authorize.
    pub token: session::Token,
}

impl<Db, Idp> Command<AuthorizeUserSession> for Service<Db, Idp>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + for<'t> Database<
            Select<By<Option<session::Stored>, &'t session::Token>>,
            Ok = Option<session::Stored>,
            Err = Traced<database::Error>,
        > + Database<
            Update<session::Stored>,
            Ok = (),
            Err = Traced<database::Error>,
        >,
{
    type Ok = Session;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AuthorizeUserSession { token } = cmd;

        let session = match self.config.session.strategy {
            SessionStrategy::Jwt => {
                jsonwebtoken::decode::<Session>(
                    token.as_ref(),
                    &self.config.jwt_decoding_key,
                    &Validation::default(),
                )
                .map_err(tracerr::from_and_wrap!(=> E))?
                .claims
            }
            SessionStrategy::Database => {
                let mut stored = self
                    .database()
                    .execute(Select(By::new(&token)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .ok_or(E::SessionNotExists)
                    .map_err(tracerr::wrap!())?;

                let now = DateTime::now().coerce();
                if stored.expires_at <= now {
                    return Err(tracerr::new!(E::SessionExpired));
                }

                let age = self
                    .config
                    .session
                    .ttl
                    .checked_sub(stored.expires_at - now)
                    .unwrap_or_default();
                if age >= self.config.session.renew_after {
                    stored.expires_at =
                        (now + self.config.session.ttl).coerce();
                    self.database()
                        .execute(Update(stored.clone()))
                        .await
                        .map_err(tracerr::map_from_and_wrap!(=> E))?;
                }

                Session {
                    user_id: stored.user_id,
                    expires_at: stored.expires_at,
                }
            }
        };

        drop(
            self.database()
                .execute(Select(By::new(session.user_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or_else(|| E::UserNotExists(session.user_id))
                .map_err(tracerr::wrap!())?,
        );

        Ok(session)
    }
}

/// Error of [`AuthorizeUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`jsonwebtoken`] decoding error.
    #[display("Failed to decode a JSON Web Token: {_0}")]
    JsonWebTokenDecodeError(jsonwebtoken::errors::Error),

    /// No [`Session`] refers to the provided token.
    #[display("No `Session` refers to the provided token")]
    SessionNotExists,

    /// [`Session`] referred to by the provided token has expired.
    #[display("`Session` referred to by the provided token has expired")]
    SessionExpired,

    /// [`User`] the [`Session`] belongs to does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{
        operations::{By, Insert, Select, Update},
        DateTime,
    };
    use tracerr::Traced;

    use crate::{
        command::CreateUserSession,
        domain::{
            user::{self, session, Session},
            User,
        },
        infra::{database, Database},
        Command as _, Config, Service, SessionConfig, SessionStrategy,
    };

    use super::{AuthorizeUserSession, ExecutionError};

    /// In-memory [`Database`] holding a single [`User`] and at most one
    /// stored [`Session`].
    #[derive(Clone, Debug)]
    struct Db {
        user: Option<User>,
        stored: Option<session::Stored>,
    }

    impl Database<Select<By<Option<User>, user::Id>>> for Db {
        type Ok = Option<User>;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Select(by): Select<By<Option<User>, user::Id>>,
        ) -> Result<Self::Ok, Self::Err> {
            Ok(self
                .user
                .clone()
                .filter(|u| u.id == by.into_inner()))
        }
    }

    impl<'t> Database<Select<By<Option<session::Stored>, &'t session::Token>>>
        for Db
    {
        type Ok = Option<session::Stored>;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Select(by): Select<
                By<Option<session::Stored>, &'t session::Token>,
            >,
        ) -> Result<Self::Ok, Self::Err> {
            let token = by.into_inner();
            Ok(self
                .stored
                .clone()
                .filter(|stored| stored.token == *token))
        }
    }

    impl Database<Update<session::Stored>> for Db {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            _: Update<session::Stored>,
        ) -> Result<Self::Ok, Self::Err> {
            Ok(())
        }
    }

    impl Database<Insert<session::Stored>> for Db {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            _: Insert<session::Stored>,
        ) -> Result<Self::Ok, Self::Err> {
            Ok(())
        }
    }

    fn user() -> User {
        User {
            id: user::Id::new(),
            name: None,
            email: None,
            email_verified_at: None,
            image: None,
            created_at: DateTime::now().coerce(),
        }
    }

    fn service(user: Option<User>, secret: &str) -> Service<Db, ()> {
        with_strategy(
            Db { user, stored: None },
            SessionStrategy::Jwt,
            secret,
        )
    }

    fn with_strategy(
        database: Db,
        strategy: SessionStrategy,
        secret: &str,
    ) -> Service<Db, ()> {
        Service {
            config: Config {
                jwt_encoding_key: jsonwebtoken::EncodingKey::from_secret(
                    secret.as_bytes(),
                ),
                jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(
                    secret.as_bytes(),
                ),
                session: SessionConfig {
                    strategy,
                    ttl: Duration::from_secs(30 * 60),
                    renew_after: Duration::from_secs(60),
                },
                verification_token_ttl: Duration::from_secs(24 * 60 * 60),
                clean_expired_sessions:
                    crate::task::clean_expired_sessions::Config {
                        interval: Duration::from_secs(60 * 60),
                    },
            },
            database,
            identity: (),
        }
    }

    #[tokio::test]
    async fn authorizes_issued_token_with_matching_user_id() {
        let user = user();
        let svc = service(Some(user.clone()), "secret");

        let issued = svc
            .execute(CreateUserSession { user_id: user.id })
            .await
            .unwrap();
        let session: Session = svc
            .execute(AuthorizeUserSession {
                token: issued.token,
            })
            .await
            .unwrap();

        assert_eq!(session.user_id, user.id);
        assert_eq!(
            session.expires_at.unix_timestamp(),
            issued.expires_at.unix_timestamp(),
        );
    }

    #[tokio::test]
    async fn rejects_garbage_token() {
        let svc = service(Some(user()), "secret");

        #[expect(unsafe_code, reason = "intentionally malformed")]
        let token = unsafe {
            session::Token::new_unchecked("not-a-jwt".to_owned())
        };
        let err = svc
            .execute(AuthorizeUserSession { token })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::JsonWebTokenDecodeError(..),
        ));
    }

    #[tokio::test]
    async fn rejects_token_signed_with_another_secret() {
        let user = user();
        let foreign = service(Some(user.clone()), "another secret");
        let issued = foreign
            .execute(CreateUserSession { user_id: user.id })
            .await
            .unwrap();

        let svc = service(Some(user), "secret");
        let err = svc
            .execute(AuthorizeUserSession {
                token: issued.token,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::JsonWebTokenDecodeError(..),
        ));
    }

    #[tokio::test]
    async fn authorizes_stored_session() {
        let user = user();
        let token = session::Token::generate();
        let svc = with_strategy(
            Db {
                user: Some(user.clone()),
                stored: Some(session::Stored {
                    token: token.clone(),
                    user_id: user.id,
                    expires_at: (DateTime::now()
                        + Duration::from_secs(20 * 60))
                    .coerce(),
                }),
            },
            SessionStrategy::Database,
            "secret",
        );

        let session = svc
            .execute(AuthorizeUserSession { token })
            .await
            .unwrap();

        assert_eq!(session.user_id, user.id);
    }

    #[tokio::test]
    async fn rejects_expired_stored_session() {
        let user = user();
        let token = session::Token::generate();
        let svc = with_strategy(
            Db {
                user: Some(user.clone()),
                stored: Some(session::Stored {
                    token: token.clone(),
                    user_id: user.id,
                    expires_at: (DateTime::now()
                        - Duration::from_secs(60))
                    .coerce(),
                }),
            },
            SessionStrategy::Database,
            "secret",
        );

        let err = svc
            .execute(AuthorizeUserSession { token })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::SessionExpired));
    }

    #[tokio::test]
    async fn rejects_unknown_stored_session_token() {
        let svc = with_strategy(
            Db {
                user: Some(user()),
                stored: None,
            },
            SessionStrategy::Database,
            "secret",
        );

        let err = svc
            .execute(AuthorizeUserSession {
                token: session::Token::generate(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::SessionNotExists));
    }

    #[tokio::test]
    async fn rejects_token_of_absent_user() {
        let user = user();
        let svc = service(Some(user.clone()), "secret");
        let issued = svc
            .execute(CreateUserSession { user_id: user.id })
            .await
            .unwrap();

        let svc = service(None, "secret");
        let err = svc
            .execute(AuthorizeUserSession {
                token: issued.token,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::UserNotExists(id) if *id == user.id,
        ));
    }
}
