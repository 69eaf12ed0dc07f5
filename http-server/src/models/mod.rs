mod database;
mod user;

pub use database::SessionStore;
pub use user::{Account, AuthenticatedUser};
