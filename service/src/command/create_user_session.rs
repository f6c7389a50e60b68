//! [`Command`] for creating a [`Session`].

use common::{
    operations::{By, Insert, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
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

/// [`Command`] for creating a [`Session`].
#[derive(Clone, Copy, Debug, From)]
pub struct CreateUserSession {
    /// ID of the [`User`] to create a [`Session`] for.
    pub user_id: user::Id,
}

/// Output of [`CreateUserSession`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// [`Token`] of the created [`Session`].
    ///
    /// [`Token`]: session::Token
    pub token: session::Token,

    /// [`User`] whose [`Session`] has been created.
    pub user: User,

    /// [`DateTime`] when the [`Session`] expires.
    pub expires_at: session::ExpirationDateTime,
}

impl<Db, Idp> Command<CreateUserSession> for Service<Db, Idp>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Insert<session::Stored>,
            Ok = (),
            Err = Traced<database::Error>,
        >,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateUserSession { user_id } = cmd;

        let user = self
            .database()
            .execute(Select(By::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;

        let expires_at =
            (DateTime::now() + self.config.session.ttl).coerce();

        let token = match self.config.session.strategy {
            SessionStrategy::Jwt => {
                let token = jsonwebtoken::encode::<Session>(
                    &jsonwebtoken::Header::default(),
                    &Session {
                        user_id: user.id,
                        expires_at,
                    },
                    &self.config.jwt_encoding_key,
                )
                .map_err(tracerr::from_and_wrap!(=> E))?;

                // SAFETY: `jsonwebtoken::encode` always returns a valid
                //         `session::Token`.
                #[expect(unsafe_code, reason = "invariants are preserved")]
                unsafe {
                    session::Token::new_unchecked(token)
                }
            }
            SessionStrategy::Database => {
                let token = session::Token::generate();
                self.database()
                    .execute(Insert(session::Stored {
                        token: token.clone(),
                        user_id: user.id,
                        expires_at,
                    }))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
                token
            }
        };

        Ok(Output {
            token,
            user,
            expires_at,
        })
    }
}

/// Error of [`CreateUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`jsonwebtoken`] encoding error.
    #[display("Failed to encode a JSON Web Token: {_0}")]
    JsonWebTokenEncodeError(jsonwebtoken::errors::Error),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}
