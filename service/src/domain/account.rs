//! [`Account`] definitions.

use std::{str::FromStr, sync::LazyLock};

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, From};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;

#[cfg(doc)]
use crate::domain::User;
use crate::domain::user;

/// External account linked to a [`User`].
///
/// Created on the first successful identity provider exchange and refreshed
/// with new token material on every subsequent sign-in through the same
/// provider.
#[derive(Clone, Debug)]
pub struct Account {
    /// ID of the [`User`] this [`Account`] is linked to.
    pub user_id: user::Id,

    /// [`Provider`] this [`Account`] belongs to.
    pub provider: Provider,

    /// ID of this [`Account`] on the [`Provider`]'s side.
    pub provider_account_id: ProviderAccountId,

    /// [`Kind`] of this [`Account`].
    pub kind: Kind,

    /// [`AccessToken`] issued by the [`Provider`], if any.
    pub access_token: Option<AccessToken>,

    /// [`RefreshToken`] issued by the [`Provider`], if any.
    pub refresh_token: Option<RefreshToken>,

    /// [`DateTime`] when the issued [`AccessToken`] expires, if reported.
    pub expires_at: Option<ExpirationDateTime>,

    /// Type of the issued [`AccessToken`] (e.g. `bearer`), if reported.
    pub token_type: Option<TokenType>,

    /// [`Scope`] granted by the [`Provider`], if reported.
    pub scope: Option<Scope>,

    /// [`IdToken`] issued by an [OIDC] [`Provider`], if any.
    ///
    /// [OIDC]: https://openid.net/specs/openid-connect-core-1_0.html
    pub id_token: Option<IdToken>,

    /// [`DateTime`] when this [`Account`] was linked.
    pub created_at: CreationDateTime,
}

/// Compound key uniquely identifying an [`Account`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Key {
    /// [`Provider`] of the [`Account`].
    pub provider: Provider,

    /// ID of the [`Account`] on the [`Provider`]'s side.
    pub provider_account_id: ProviderAccountId,
}

/// Name of an identity provider (e.g. `github`, `google`).
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Provider(String);

impl Provider {
    /// Creates a new [`Provider`] without checking its contents.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `name` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a new [`Provider`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Provider`].
    fn check(name: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Provider`] invariants:
        /// - Lowercase ASCII letters, digits and dashes only;
        /// - Must start with a letter;
        /// - Must be between 1 and 32 characters long.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[a-z][a-z0-9-]{0,31}$").expect("valid regex")
        });

        REGEX.is_match(name.as_ref())
    }
}

impl FromStr for Provider {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Provider`")
    }
}

/// ID of an [`Account`] on the [`Provider`]'s side.
#[derive(AsRef, Clone, Debug, Display, Eq, From, Hash, PartialEq)]
#[as_ref(str, String)]
#[from(&str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct ProviderAccountId(String);

/// Kind of an [`Account`].
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[cfg_attr(
    feature = "postgres",
    derive(FromSql, ToSql),
    postgres(name = "account_kind")
)]
pub enum Kind {
    /// [OAuth 2.0] account.
    ///
    /// [OAuth 2.0]: https://datatracker.ietf.org/doc/html/rfc6749
    #[display("OAUTH")]
    #[cfg_attr(feature = "postgres", postgres(name = "OAUTH"))]
    Oauth,

    /// [OIDC] account.
    ///
    /// [OIDC]: https://openid.net/specs/openid-connect-core-1_0.html
    #[display("OIDC")]
    #[cfg_attr(feature = "postgres", postgres(name = "OIDC"))]
    Oidc,

    /// Account linked via an emailed one-time token.
    #[display("EMAIL")]
    #[cfg_attr(feature = "postgres", postgres(name = "EMAIL"))]
    Email,
}

impl FromStr for Kind {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OAUTH" => Ok(Self::Oauth),
            "OIDC" => Ok(Self::Oidc),
            "EMAIL" => Ok(Self::Email),
            _ => Err("invalid `account::Kind`"),
        }
    }
}

/// Access token issued to an [`Account`] by its [`Provider`].
#[derive(AsRef, Clone, Debug, Display, Eq, From, PartialEq)]
#[as_ref(str, String)]
#[from(&str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct AccessToken(String);

/// Refresh token issued to an [`Account`] by its [`Provider`].
#[derive(AsRef, Clone, Debug, Display, Eq, From, PartialEq)]
#[as_ref(str, String)]
#[from(&str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct RefreshToken(String);

/// [OIDC] ID token issued to an [`Account`] by its [`Provider`].
///
/// [OIDC]: https://openid.net/specs/openid-connect-core-1_0.html
#[derive(AsRef, Clone, Debug, Display, Eq, From, PartialEq)]
#[as_ref(str, String)]
#[from(&str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct IdToken(String);

/// Type of an [`AccessToken`] (e.g. `bearer`).
#[derive(AsRef, Clone, Debug, Display, Eq, From, PartialEq)]
#[as_ref(str, String)]
#[from(&str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct TokenType(String);

/// Scope granted to an [`Account`] by its [`Provider`].
#[derive(AsRef, Clone, Debug, Display, Eq, From, PartialEq)]
#[as_ref(str, String)]
#[from(&str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Scope(String);

/// [`DateTime`] when an [`Account`]'s [`AccessToken`] expires.
pub type ExpirationDateTime = DateTimeOf<(Account, unit::Expiration)>;

/// [`DateTime`] when an [`Account`] was linked.
pub type CreationDateTime = DateTimeOf<(Account, unit::Creation)>;

#[cfg(test)]
mod spec {
    use super::{Kind, Provider};

    #[test]
    fn validates_provider_name() {
        assert!(Provider::new("github").is_some());
        assert!(Provider::new("azure-ad").is_some());
        assert!(Provider::new("GitHub").is_none());
        assert!(Provider::new("1password").is_none());
        assert!(Provider::new("").is_none());
    }

    #[test]
    fn parses_kind() {
        assert_eq!("OAUTH".parse::<Kind>().unwrap(), Kind::Oauth);
        assert_eq!(Kind::Oidc.to_string(), "OIDC");
        assert!("oauth".parse::<Kind>().is_err());
    }
}
