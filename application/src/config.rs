//! [`Config`]-related definitions.

use std::{collections::HashMap, time};

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use derive_more::{Display, Error};
use secrecy::SecretString;
use serde::Deserialize;
use service::{domain::account, infra::identity::oauth};
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: Server,

    /// Authentication configuration.
    pub auth: Auth,

    /// Postgres configuration.
    pub postgres: Postgres,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,

    /// Public base URL this server is reachable at, overriding the bind
    /// address when building provider callback URLs.
    #[default("http://127.0.0.1:8080".to_owned())]
    pub public_url: String,

    /// Path prefix of API routes: unauthorized requests under it are
    /// rejected instead of being redirected to the sign-in page.
    #[default("/api".to_owned())]
    pub api_prefix: String,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    #[default(vec!["*".to_owned()])]
    pub origins: Vec<String>,
}

/// Authentication configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Auth {
    /// [JWT] signing secret.
    ///
    /// [JWT]: https://wikipedia.org/wiki/JSON_Web_Token
    #[default("secret".to_owned())]
    pub secret: String,

    /// Location of the sign-in page unauthorized page requests are
    /// redirected to.
    #[default("/signin".to_owned())]
    pub signin_page: String,

    /// Session configuration.
    pub session: Session,

    /// Time-to-live of issued email verification tokens.
    #[default(time::Duration::from_secs(24 * 60 * 60))]
    #[serde(with = "humantime_serde")]
    pub verification_token_ttl: time::Duration,

    /// Configured identity providers, keyed by name.
    pub providers: HashMap<String, Provider>,

    /// Service tasks configuration.
    pub tasks: Tasks,
}

impl From<Auth> for service::Config {
    fn from(value: Auth) -> Self {
        let Auth {
            secret,
            signin_page: _,
            session,
            verification_token_ttl,
            providers: _,
            tasks: Tasks {
                clean_expired_sessions,
            },
        } = value;
        Self {
            jwt_encoding_key: jsonwebtoken::EncodingKey::from_secret(
                secret.as_bytes(),
            ),
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(
                secret.as_bytes(),
            ),
            session: service::SessionConfig {
                strategy: session.strategy.into(),
                ttl: session.max_age,
                renew_after: session.update_age,
            },
            verification_token_ttl,
            clean_expired_sessions:
                service::task::clean_expired_sessions::Config {
                    interval: clean_expired_sessions.interval,
                },
        }
    }
}

impl TryFrom<&Auth> for oauth::Config {
    type Error = InvalidProviderError;

    fn try_from(value: &Auth) -> Result<Self, Self::Error> {
        use InvalidProviderError as E;

        let mut providers = HashMap::with_capacity(value.providers.len());
        for (name, p) in &value.providers {
            let provider = account::Provider::new(name.clone())
                .ok_or_else(|| E::Name(name.clone()))?;
            drop(providers.insert(
                provider,
                oauth::Provider {
                    client_id: p.client_id.clone(),
                    client_secret: SecretString::from(p.client_secret.clone()),
                    authorization_url: p.authorization_url.clone(),
                    token_url: p.token_url.clone(),
                    userinfo_url: p.userinfo_url.clone(),
                    scope: p.scope.clone(),
                    kind: p.kind.into(),
                },
            ));
        }
        Ok(Self { providers })
    }
}

/// Error of an invalid [`Provider`] configuration.
#[derive(Clone, Debug, Display, Error)]
pub enum InvalidProviderError {
    /// Configured provider name is not a valid [`account::Provider`].
    #[display("`{_0}` is not a valid provider name")]
    Name(#[error(not(source))] String),
}

/// Session configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Session {
    /// Strategy of storing issued sessions.
    pub strategy: SessionStrategy,

    /// Time-to-live of an issued session.
    #[default(time::Duration::from_secs(30 * 24 * 60 * 60))]
    #[serde(with = "humantime_serde")]
    pub max_age: time::Duration,

    /// Minimum age of a database-backed session before its expiration is
    /// renewed on authorization.
    #[default(time::Duration::from_secs(24 * 60 * 60))]
    #[serde(with = "humantime_serde")]
    pub update_age: time::Duration,
}

/// Strategy of storing issued sessions.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStrategy {
    /// Session claims are encoded into a signed [JWT].
    ///
    /// [JWT]: https://wikipedia.org/wiki/JSON_Web_Token
    #[default]
    Jwt,

    /// Sessions are persisted in the database and referred to by an opaque
    /// token.
    Database,
}

impl From<SessionStrategy> for service::SessionStrategy {
    fn from(value: SessionStrategy) -> Self {
        match value {
            SessionStrategy::Jwt => Self::Jwt,
            SessionStrategy::Database => Self::Database,
        }
    }
}

/// Identity provider configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Provider {
    /// Client ID registered with the provider.
    pub client_id: String,

    /// Client secret registered with the provider.
    pub client_secret: String,

    /// Authorization endpoint of the provider.
    pub authorization_url: String,

    /// Token endpoint of the provider.
    pub token_url: String,

    /// Profile endpoint of the provider.
    pub userinfo_url: String,

    /// Scope requested on authorization.
    #[default("openid email profile".to_owned())]
    pub scope: String,

    /// Kind of the provider.
    pub kind: ProviderKind,
}

/// Kind of an identity provider.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderKind {
    /// Plain [OAuth 2.0] provider.
    ///
    /// [OAuth 2.0]: https://datatracker.ietf.org/doc/html/rfc6749
    #[default]
    Oauth,

    /// [OIDC] provider.
    ///
    /// [OIDC]: https://openid.net/specs/openid-connect-core-1_0.html
    Oidc,
}

impl From<ProviderKind> for account::Kind {
    fn from(value: ProviderKind) -> Self {
        match value {
            ProviderKind::Oauth => Self::Oauth,
            ProviderKind::Oidc => Self::Oidc,
        }
    }
}

/// Service tasks configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Tasks {
    /// `CleanExpiredSessions` task configuration.
    pub clean_expired_sessions: Task,
}

/// Service task configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Task {
    /// Task execution interval.
    #[default(time::Duration::from_secs(60 * 60))]
    #[serde(with = "humantime_serde")]
    pub interval: time::Duration,
}

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("postgres".to_owned())]
    pub dbname: String,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            ..Self::default()
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod spec {
    use super::Config;

    #[test]
    fn defaults_are_sane() {
        let conf = Config::default();

        assert_eq!(conf.server.port, 8080);
        assert_eq!(conf.server.api_prefix, "/api");
        assert_eq!(conf.auth.signin_page, "/signin");
        assert!(conf.auth.providers.is_empty());
    }
}
