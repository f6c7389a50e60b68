//! [`IdentityProvider`]-related implementations.

pub mod oauth;

use std::str::FromStr;

use derive_more::{AsRef, Display, Error as StdError};

#[cfg(doc)]
use common::operations::Perform;

use crate::domain::{account, user};

pub use self::oauth::OAuth;

/// Identity provider operation.
pub use common::Handler as IdentityProvider;

/// [`Perform`]ed operation exchanging an [`AuthorizationCode`] for a
/// [`Profile`].
#[derive(Clone, Debug)]
pub struct Exchange {
    /// [`account::Provider`] to perform the exchange against.
    pub provider: account::Provider,

    /// [`AuthorizationCode`] received on the callback.
    pub code: AuthorizationCode,

    /// Redirect URI the [`AuthorizationCode`] was issued for.
    pub redirect_uri: String,
}

/// Authorization code received from an identity provider on a sign-in
/// callback.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
pub struct AuthorizationCode(String);

impl AuthorizationCode {
    /// Creates a new [`AuthorizationCode`] if the given `code` is valid.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Option<Self> {
        let code = code.into();
        (!code.is_empty() && code.len() <= 2048).then_some(Self(code))
    }
}

impl FromStr for AuthorizationCode {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `AuthorizationCode`")
    }
}

/// Identity claims returned by a provider after a successful [`Exchange`].
#[derive(Clone, Debug)]
pub struct Profile {
    /// [`account::Provider`] the claims were obtained from.
    pub provider: account::Provider,

    /// ID of the account on the provider's side.
    pub provider_account_id: account::ProviderAccountId,

    /// [`account::Kind`] of the exchange performed.
    pub kind: account::Kind,

    /// Email address reported by the provider, if any.
    pub email: Option<user::Email>,

    /// Whether the provider reports the email address as verified.
    pub email_verified: bool,

    /// Display name reported by the provider, if any.
    pub name: Option<user::Name>,

    /// Avatar image URL reported by the provider, if any.
    pub image: Option<user::ImageUrl>,

    /// Access token issued by the provider, if any.
    pub access_token: Option<account::AccessToken>,

    /// Refresh token issued by the provider, if any.
    pub refresh_token: Option<account::RefreshToken>,

    /// Expiration of the issued access token, if reported.
    pub expires_at: Option<account::ExpirationDateTime>,

    /// Type of the issued access token, if reported.
    pub token_type: Option<account::TokenType>,

    /// Scope granted by the provider, if reported.
    pub scope: Option<account::Scope>,

    /// ID token issued by an OIDC provider, if any.
    pub id_token: Option<account::IdToken>,
}

/// [`IdentityProvider`] error.
#[derive(Debug, Display, StdError)]
pub enum Error {
    /// Requested [`account::Provider`] is not configured.
    #[display("`Provider(name: {_0})` is not configured")]
    UnknownProvider(#[error(not(source))] account::Provider),

    /// Configured authorization endpoint cannot be turned into a valid URL.
    #[display(
        "Failed to build an authorization URL for `Provider(name: \
         {provider})`: {message}"
    )]
    AuthorizationUrl {
        /// [`account::Provider`] the URL was built for.
        #[error(not(source))]
        provider: account::Provider,

        /// Description of the failure.
        message: String,
    },

    /// Network failure of the code exchange round trip.
    #[display("Code exchange with `Provider(name: {provider})` failed: {source}")]
    Exchange {
        /// [`account::Provider`] the exchange was performed against.
        provider: account::Provider,

        /// Underlying transport error.
        source: reqwest::Error,
    },

    /// Provider rejected the code exchange.
    #[display(
        "`Provider(name: {provider})` rejected the code exchange with \
         {status}: {body}"
    )]
    ExchangeRejected {
        /// [`account::Provider`] that rejected the exchange.
        #[error(not(source))]
        provider: account::Provider,

        /// HTTP status of the rejection.
        status: reqwest::StatusCode,

        /// Response body of the rejection.
        body: String,
    },

    /// Provider returned a token response this service cannot interpret.
    #[display(
        "Malformed token response from `Provider(name: {provider})`: {source}"
    )]
    MalformedTokenResponse {
        /// [`account::Provider`] that returned the response.
        provider: account::Provider,

        /// Underlying decoding error.
        source: reqwest::Error,
    },

    /// Network failure of the profile fetch round trip.
    #[display(
        "Profile fetch from `Provider(name: {provider})` failed: {source}"
    )]
    Userinfo {
        /// [`account::Provider`] the profile was fetched from.
        provider: account::Provider,

        /// Underlying transport error.
        source: reqwest::Error,
    },

    /// Provider rejected the profile fetch.
    #[display(
        "`Provider(name: {provider})` rejected the profile fetch with \
         {status}: {body}"
    )]
    UserinfoRejected {
        /// [`account::Provider`] that rejected the fetch.
        #[error(not(source))]
        provider: account::Provider,

        /// HTTP status of the rejection.
        status: reqwest::StatusCode,

        /// Response body of the rejection.
        body: String,
    },

    /// Provider returned a profile without an account identifier.
    #[display(
        "`Provider(name: {provider})` returned a profile without an account \
         identifier"
    )]
    MissingAccountId {
        /// [`account::Provider`] that returned the profile.
        #[error(not(source))]
        provider: account::Provider,
    },
}

impl Error {
    /// Returns the [`Class`] of this [`Error`], if the provider itself
    /// classified the failure.
    ///
    /// Unclassified failures (network errors, malformed responses) return
    /// [`None`] and are surfaced to the caller instead of being converted to
    /// a sign-in redirect.
    #[must_use]
    pub fn class(&self) -> Option<Class> {
        match self {
            Self::UnknownProvider(..) => Some(Class::Signin),
            Self::ExchangeRejected { .. }
            | Self::UserinfoRejected { .. }
            | Self::MissingAccountId { .. } => Some(Class::Callback),
            Self::AuthorizationUrl { .. }
            | Self::Exchange { .. }
            | Self::MalformedTokenResponse { .. }
            | Self::Userinfo { .. } => None,
        }
    }
}

/// Classification of a provider-originated sign-in failure, rendered as the
/// `error` query parameter of the sign-in redirect.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Class {
    /// Sign-in could not be started with the provider.
    #[display("OAuthSignin")]
    Signin,

    /// Provider refused the sign-in callback exchange.
    #[display("OAuthCallbackError")]
    Callback,

    /// End user denied the authorization request.
    #[display("AccessDenied")]
    AccessDenied,
}

#[cfg(test)]
mod spec {
    use super::{account, Class, Error};

    #[test]
    fn classifies_provider_rejections_only() {
        let provider = account::Provider::new("github").unwrap();

        let rejected = Error::ExchangeRejected {
            provider: provider.clone(),
            status: reqwest::StatusCode::BAD_REQUEST,
            body: "bad_verification_code".into(),
        };
        assert_eq!(rejected.class(), Some(Class::Callback));
        assert_eq!(rejected.class().unwrap().to_string(), "OAuthCallbackError");

        let unknown = Error::UnknownProvider(provider.clone());
        assert_eq!(unknown.class(), Some(Class::Signin));

        let missing = Error::MissingAccountId { provider };
        assert_eq!(missing.class(), Some(Class::Callback));
    }
}
