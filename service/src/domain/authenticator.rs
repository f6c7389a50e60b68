//! [`Authenticator`] definitions.

use derive_more::{AsRef, Display, From, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};

#[cfg(doc)]
use crate::domain::User;
use crate::domain::{account, user};

/// Public-key credential registered for a [`User`].
///
/// Rows of this kind are written by the external [WebAuthn] tooling sharing
/// the database; this service only reads them back.
///
/// [WebAuthn]: https://www.w3.org/TR/webauthn-2
#[derive(Clone, Debug)]
pub struct Authenticator {
    /// ID of the credential, as assigned by the authenticator.
    pub credential_id: CredentialId,

    /// ID of the [`User`] this [`Authenticator`] is registered for.
    pub user_id: user::Id,

    /// ID of the [`account::Account`] this [`Authenticator`] is bound to.
    pub provider_account_id: account::ProviderAccountId,

    /// Public key of the credential.
    pub public_key: PublicKey,

    /// Signature counter of the credential.
    pub counter: Counter,

    /// [`DeviceType`] of the credential.
    pub device_type: DeviceType,

    /// Whether the credential is backed up.
    pub backed_up: bool,

    /// Transports the credential supports, if reported.
    pub transports: Option<Transports>,
}

/// ID of an [`Authenticator`] credential.
#[derive(AsRef, Clone, Debug, Display, Eq, From, Hash, PartialEq)]
#[as_ref(str, String)]
#[from(&str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct CredentialId(String);

/// Public key of an [`Authenticator`] credential.
#[derive(AsRef, Clone, Debug, Display, Eq, From, PartialEq)]
#[as_ref(str, String)]
#[from(&str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct PublicKey(String);

/// Signature counter of an [`Authenticator`] credential.
#[derive(
    Clone, Copy, Debug, Default, Display, Eq, From, Into, Ord, PartialEq,
    PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Counter(i64);

/// Device type of an [`Authenticator`] credential.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[cfg_attr(
    feature = "postgres",
    derive(FromSql, ToSql),
    postgres(name = "authenticator_device_type")
)]
pub enum DeviceType {
    /// Credential bound to a single device.
    #[display("SINGLE_DEVICE")]
    #[cfg_attr(feature = "postgres", postgres(name = "SINGLE_DEVICE"))]
    SingleDevice,

    /// Credential synced across multiple devices.
    #[display("MULTI_DEVICE")]
    #[cfg_attr(feature = "postgres", postgres(name = "MULTI_DEVICE"))]
    MultiDevice,
}

/// Transports an [`Authenticator`] credential supports, as a comma-separated
/// list.
#[derive(AsRef, Clone, Debug, Display, Eq, From, PartialEq)]
#[as_ref(str, String)]
#[from(&str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Transports(String);
