//! Infrastructure layer.

pub mod database;
pub mod identity;

#[cfg(feature = "postgres")]
pub use self::database::{postgres, Postgres};
pub use self::{
    database::Database,
    identity::{IdentityProvider, OAuth},
};
