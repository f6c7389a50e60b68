//! [`VerificationToken`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, FromStr};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use uuid::Uuid;

use crate::domain::user;

/// One-time token verifying ownership of an email address.
///
/// Consumed (deleted) on the first sign-in attempt presenting it, whether
/// that attempt succeeds or not.
#[derive(Clone, Debug)]
pub struct VerificationToken {
    /// [`user::Email`] this [`VerificationToken`] was issued for.
    pub identifier: user::Email,

    /// Opaque [`Token`] value sent out in the sign-in link.
    pub token: Token,

    /// [`DateTime`] when this [`VerificationToken`] expires.
    pub expires_at: ExpirationDateTime,
}

/// Compound key uniquely identifying a [`VerificationToken`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Key {
    /// [`user::Email`] the [`VerificationToken`] was issued for.
    pub identifier: user::Email,

    /// Opaque [`Token`] value.
    pub token: Token,
}

/// Opaque value of a [`VerificationToken`].
#[derive(AsRef, Clone, Debug, Display, Eq, FromStr, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Token(String);

impl Token {
    /// Creates a new [`Token`] without checking its contents.
    ///
    /// # Safety
    ///
    /// The provided `token` must be a valid [`Token`] representation.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub const unsafe fn new_unchecked(token: String) -> Self {
        Self(token)
    }

    /// Generates a new random opaque [`Token`].
    #[must_use]
    pub fn generate() -> Self {
        Self(format!(
            "{}{}",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple(),
        ))
    }
}

/// [`DateTime`] of a [`VerificationToken`] expiration.
pub type ExpirationDateTime = DateTimeOf<(VerificationToken, unit::Expiration)>;
