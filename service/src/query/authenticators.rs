//! [`Query`] collection related to [`Authenticator`]s.

use common::operations::By;

use crate::domain::{user, Authenticator};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries all the [`Authenticator`]s registered for a [`User`].
///
/// [`User`]: crate::domain::User
pub type ByUser = DatabaseQuery<By<Vec<Authenticator>, user::Id>>;
