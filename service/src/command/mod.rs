//! [`Command`] definition.

pub mod authorize_user_session;
pub mod create_user_session;
pub mod create_verification_token;
pub mod sign_in_email;
pub mod sign_in_user;
pub mod terminate_user_session;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    authorize_user_session::AuthorizeUserSession,
    create_user_session::CreateUserSession,
    create_verification_token::CreateVerificationToken,
    sign_in_email::SignInEmail, sign_in_user::SignInUser,
    terminate_user_session::TerminateUserSession,
};
