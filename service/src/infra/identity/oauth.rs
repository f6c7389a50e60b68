//! [OAuth 2.0] [`IdentityProvider`] implementation.
//!
//! [OAuth 2.0]: https://datatracker.ietf.org/doc/html/rfc6749

use std::{collections::HashMap, time::Duration};

use common::{operations::Perform, DateTime};
use secrecy::{ExposeSecret as _, SecretString};
use serde::Deserialize;
use tracerr::Traced;

use crate::domain::{account, user};

use super::{Error, Exchange, IdentityProvider, Profile};

/// [`OAuth`] client configuration.
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Configured [`Provider`]s, keyed by their name.
    pub providers: HashMap<account::Provider, Provider>,
}

/// Single [OAuth 2.0] provider configuration.
///
/// [OAuth 2.0]: https://datatracker.ietf.org/doc/html/rfc6749
#[derive(Clone, Debug)]
pub struct Provider {
    /// Client ID registered with the provider.
    pub client_id: String,

    /// Client secret registered with the provider.
    pub client_secret: SecretString,

    /// Authorization endpoint the end user is redirected to.
    pub authorization_url: String,

    /// Token endpoint the authorization code is exchanged at.
    pub token_url: String,

    /// Endpoint returning the profile claims of the authorized user.
    pub userinfo_url: String,

    /// Scope requested on authorization.
    pub scope: String,

    /// [`account::Kind`] of accounts this provider produces.
    pub kind: account::Kind,
}

/// [OAuth 2.0] [`IdentityProvider`] exchanging authorization codes over
/// HTTP.
///
/// [OAuth 2.0]: https://datatracker.ietf.org/doc/html/rfc6749
#[derive(Clone, Debug)]
pub struct OAuth {
    /// [`Config`] of this client.
    config: Config,

    /// HTTP client performing the round trips.
    http: reqwest::Client,
}

impl OAuth {
    /// Creates a new [`OAuth`] client with the provided [`Config`].
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Returns names of all the configured [`Provider`]s, sorted.
    #[must_use]
    pub fn providers(&self) -> Vec<&account::Provider> {
        let mut names = self.config.providers.keys().collect::<Vec<_>>();
        names.sort_unstable_by(|a, b| {
            AsRef::<str>::as_ref(*a).cmp((*b).as_ref())
        });
        names
    }

    /// Returns the configured [`Provider`] with the given `name`.
    fn provider(
        &self,
        name: &account::Provider,
    ) -> Result<&Provider, Traced<Error>> {
        self.config
            .providers
            .get(name)
            .ok_or_else(|| tracerr::new!(Error::UnknownProvider(name.clone())))
    }

    /// Builds the authorization URL the end user should be redirected to for
    /// signing in with the given provider.
    ///
    /// # Errors
    ///
    /// Errors if the provider is not configured, or its authorization
    /// endpoint cannot be turned into a valid URL.
    pub fn authorization_request(
        &self,
        name: &account::Provider,
        state: &str,
        redirect_uri: &str,
    ) -> Result<reqwest::Url, Traced<Error>> {
        let provider = self.provider(name)?;

        let mut url =
            reqwest::Url::parse(&provider.authorization_url).map_err(|e| {
                tracerr::new!(Error::AuthorizationUrl {
                    provider: name.clone(),
                    message: e.to_string(),
                })
            })?;
        _ = url
            .query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &provider.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", &provider.scope)
            .append_pair("state", state);

        Ok(url)
    }
}

impl IdentityProvider<Perform<Exchange>> for OAuth {
    type Ok = Profile;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Perform(exchange): Perform<Exchange>,
    ) -> Result<Self::Ok, Self::Err> {
        let Exchange {
            provider: name,
            code,
            redirect_uri,
        } = exchange;

        let provider = self.provider(&name)?;

        let response = self
            .http
            .post(&provider.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code.as_ref()),
                ("client_id", &provider.client_id),
                ("client_secret", provider.client_secret.expose_secret()),
                ("redirect_uri", &redirect_uri),
            ])
            .send()
            .await
            .map_err(|source| {
                tracerr::new!(Error::Exchange {
                    provider: name.clone(),
                    source,
                })
            })?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(tracerr::new!(Error::ExchangeRejected {
                provider: name,
                status,
                body,
            }));
        }
        let tokens =
            response.json::<TokenResponse>().await.map_err(|source| {
                tracerr::new!(Error::MalformedTokenResponse {
                    provider: name.clone(),
                    source,
                })
            })?;

        let response = self
            .http
            .get(&provider.userinfo_url)
            .bearer_auth(&tokens.access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| {
                tracerr::new!(Error::Userinfo {
                    provider: name.clone(),
                    source,
                })
            })?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(tracerr::new!(Error::UserinfoRejected {
                provider: name,
                status,
                body,
            }));
        }
        let claims =
            response.json::<serde_json::Value>().await.map_err(|source| {
                tracerr::new!(Error::Userinfo {
                    provider: name.clone(),
                    source,
                })
            })?;

        let provider_account_id = claims
            .get("sub")
            .and_then(serde_json::Value::as_str)
            .map(ToOwned::to_owned)
            .or_else(|| {
                claims.get("id").map(|id| match id {
                    serde_json::Value::String(s) => s.clone(),
                    other @ (serde_json::Value::Null
                    | serde_json::Value::Bool(..)
                    | serde_json::Value::Number(..)
                    | serde_json::Value::Array(..)
                    | serde_json::Value::Object(..)) => other.to_string(),
                })
            })
            .filter(|id| !id.is_empty() && *id != "null")
            .ok_or_else(|| {
                tracerr::new!(Error::MissingAccountId {
                    provider: name.clone(),
                })
            })?;

        let expires_at = tokens.expires_in.map(|secs| {
            (DateTime::now() + Duration::from_secs(secs)).coerce()
        });

        Ok(Profile {
            provider_account_id: provider_account_id.into(),
            kind: provider.kind,
            email: claims
                .get("email")
                .and_then(serde_json::Value::as_str)
                .and_then(user::Email::new),
            email_verified: claims
                .get("email_verified")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or_default(),
            name: claims
                .get("name")
                .or_else(|| claims.get("login"))
                .and_then(serde_json::Value::as_str)
                .and_then(user::Name::new),
            image: claims
                .get("picture")
                .or_else(|| claims.get("avatar_url"))
                .and_then(serde_json::Value::as_str)
                .and_then(user::ImageUrl::new),
            access_token: Some(tokens.access_token.into()),
            refresh_token: tokens.refresh_token.map(Into::into),
            expires_at,
            token_type: tokens.token_type.map(Into::into),
            scope: tokens.scope.map(Into::into),
            id_token: tokens.id_token.map(Into::into),
            provider: name,
        })
    }
}

/// Response of a [`Provider`]'s token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    /// Issued access token.
    access_token: String,

    /// Type of the issued access token.
    token_type: Option<String>,

    /// Lifetime of the issued access token, in seconds.
    expires_in: Option<u64>,

    /// Issued refresh token.
    refresh_token: Option<String>,

    /// Granted scope.
    scope: Option<String>,

    /// Issued OIDC ID token.
    id_token: Option<String>,
}
