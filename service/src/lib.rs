//! Service contains the business logic of the application.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod task;

use std::time::Duration;

use common::operations::{By, Start};
use derive_more::{Debug, Display, Error};

#[cfg(doc)]
use infra::{Database, IdentityProvider};

pub use self::{command::Command, query::Query, task::Task};

/// [`Service`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// [JWT] encoding key.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[debug(skip)]
    pub jwt_encoding_key: jsonwebtoken::EncodingKey,

    /// [JWT] decoding key.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[debug(skip)]
    pub jwt_decoding_key: jsonwebtoken::DecodingKey,

    /// [`Session`] issuing configuration.
    ///
    /// [`Session`]: domain::user::Session
    pub session: SessionConfig,

    /// Time-to-live of issued [`VerificationToken`]s.
    ///
    /// [`VerificationToken`]: domain::VerificationToken
    pub verification_token_ttl: Duration,

    /// [`task::CleanExpiredSessions`] configuration.
    pub clean_expired_sessions: task::clean_expired_sessions::Config,
}

/// [`Session`] issuing configuration.
///
/// [`Session`]: domain::user::Session
#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    /// Strategy of storing issued [`Session`]s.
    ///
    /// [`Session`]: domain::user::Session
    pub strategy: SessionStrategy,

    /// Time-to-live of an issued [`Session`].
    ///
    /// [`Session`]: domain::user::Session
    pub ttl: Duration,

    /// Minimum age of a [`SessionStrategy::Database`] [`Session`] before its
    /// expiration is renewed on authorization.
    ///
    /// [`Session`]: domain::user::Session
    pub renew_after: Duration,
}

/// Strategy of storing issued [`Session`]s.
///
/// [`Session`]: domain::user::Session
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionStrategy {
    /// [`Session`] claims are encoded into a signed [JWT], so no server-side
    /// state is kept.
    ///
    /// [`Session`]: domain::user::Session
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    Jwt,

    /// [`Session`]s are persisted in the [`Database`] and referred to by an
    /// opaque [`Token`].
    ///
    /// [`Session`]: domain::user::Session
    /// [`Token`]: domain::user::session::Token
    Database,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db, Idp> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,

    /// [`IdentityProvider`] of this [`Service`].
    identity: Idp,
}

impl<Db, Idp> Service<Db, Idp> {
    /// Creates a new [`Service`] with the provided parameters.
    pub fn new(
        config: Config,
        database: Db,
        identity: Idp,
    ) -> (Self, task::Background)
    where
        Self: Task<
                Start<
                    By<
                        task::CleanExpiredSessions<Self>,
                        task::clean_expired_sessions::Config,
                    >,
                >,
                Ok = (),
                Err: Error,
            > + Clone
            + 'static,
    {
        let this = Service {
            config,
            database,
            identity,
        };

        let mut bg = task::Background::default();
        let svc = this.clone();
        bg.spawn(async move {
            svc.execute(Start(By::new(svc.config().clean_expired_sessions)))
                .await
        });

        (this, bg)
    }

    /// Returns [`Config`] of this [`Service`].
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }

    /// Returns [`IdentityProvider`] of this [`Service`].
    #[must_use]
    pub fn identity(&self) -> &Idp {
        &self.identity
    }
}

/// Shortcut for the error of starting a [`Task`].
type TaskStartError<Svc, T, Args> = <Svc as Task<Start<By<T, Args>>>>::Err;

/// Error of starting a [`Service`].
#[derive(Debug, Display, Error)]
pub enum StartupError<Svc>
where
    Svc: Task<
        Start<
            By<
                task::CleanExpiredSessions<Svc>,
                task::clean_expired_sessions::Config,
            >,
        >,
    >,
{
    /// [`task::CleanExpiredSessions`] failed to start.
    CleanExpiredSessionsTask(
        TaskStartError<
            Svc,
            task::CleanExpiredSessions<Svc>,
            task::clean_expired_sessions::Config,
        >,
    ),
}
