//! Domain definitions.

pub mod account;
pub mod authenticator;
pub mod user;
pub mod verification;

pub use self::{
    account::Account, authenticator::Authenticator, user::User,
    verification::VerificationToken,
};
