//! [`Command`] for terminating a [`Session`].

use common::operations::{By, Delete};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::Session;
use crate::{
    domain::user::session,
    infra::{database, Database},
    Service, SessionStrategy,
};

use super::Command;

/// [`Command`] for terminating a [`Session`].
///
/// In the [`SessionStrategy::Jwt`] mode there is no server-side state to
/// discard, so the command is a no-op: the token simply stops being
/// presented.
#[derive(Clone, Debug, From)]
pub struct TerminateUserSession {
    /// [`session::Token`] of the [`Session`] to terminate.
    pub token: session::Token,
}

impl<Db, Idp> Command<TerminateUserSession> for Service<Db, Idp>
where
    Db: Database<
        Delete<By<session::Stored, session::Token>>,
        Ok = (),
        Err = Traced<database::Error>,
    >,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: TerminateUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let TerminateUserSession { token } = cmd;

        match self.config.session.strategy {
            SessionStrategy::Jwt => Ok(()),
            SessionStrategy::Database => self
                .database()
                .execute(Delete(By::new(token)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E)),
        }
    }
}

/// Error of [`TerminateUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}
