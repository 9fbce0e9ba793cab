//! Persistent entities.

mod api_key;
mod team;
mod user;

pub use api_key::ApiKey;
pub use team::{FetchGroup, Team};
pub use user::{LdapUser, ManagedUser};
