//! [`CleanExpiredSessions`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::operations::{By, Delete, Perform, Start};
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::user::Session;
use crate::{
    domain::{user::session, verification, VerificationToken},
    infra::{database, Database},
    Service,
};

use super::Task;

/// Configuration for [`CleanExpiredSessions`] [`Task`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Interval between expired entities cleaning.
    pub interval: time::Duration,
}

/// [`Task`] for cleaning expired [`Session`]s and [`VerificationToken`]s.
#[derive(Clone, Copy, Debug)]
pub struct CleanExpiredSessions<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<Db, Idp> Task<Start<By<CleanExpiredSessions<Self>, Config>>>
    for Service<Db, Idp>
where
    CleanExpiredSessions<Service<Db, Idp>>:
        Task<Perform<()>, Ok = (), Err: Error> + Send + Sync + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<CleanExpiredSessions<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = CleanExpiredSessions {
            config,
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            _ = task.execute(Perform(())).await.map_err(|e| {
                log::error!("`task::CleanExpiredSessions` failed: {e}");
            });
        }
    }
}

impl<Db, Idp> Task<Perform<()>> for CleanExpiredSessions<Service<Db, Idp>>
where
    Db: Database<
            Delete<By<session::Stored, session::ExpirationDateTime>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<VerificationToken, verification::ExpirationDateTime>>,
            Ok = (),
            Err = Traced<database::Error>,
        >,
{
    type Ok = ();
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        let deadline = session::ExpirationDateTime::now();
        self.service
            .database()
            .execute(Delete(By::new(deadline)))
            .await
            .map_err(tracerr::map_from_and_wrap!())?;

        let deadline = verification::ExpirationDateTime::now();
        self.service
            .database()
            .execute(Delete(By::new(deadline)))
            .await
            .map_err(tracerr::map_from_and_wrap!())
    }
}

/// Error of [`CleanExpiredSessions`] execution.
pub type ExecutionError = Traced<database::Error>;
