//! [`Command`] for creating a [`VerificationToken`].

use common::{operations::Insert, DateTime};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{user, verification, VerificationToken},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a [`VerificationToken`].
#[derive(Clone, Debug, From)]
pub struct CreateVerificationToken {
    /// [`user::Email`] to issue a [`VerificationToken`] for.
    pub identifier: user::Email,
}

impl<Db, Idp> Command<CreateVerificationToken> for Service<Db, Idp>
where
    Db: Database<
        Insert<VerificationToken>,
        Ok = (),
        Err = Traced<database::Error>,
    >,
{
    type Ok = VerificationToken;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateVerificationToken,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateVerificationToken { identifier } = cmd;

        let token = VerificationToken {
            identifier,
            token: verification::Token::generate(),
            expires_at: (DateTime::now()
                + self.config.verification_token_ttl)
                .coerce(),
        };

        self.database()
            .execute(Insert(token.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(token)
    }
}

/// Error of [`CreateVerificationToken`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}
