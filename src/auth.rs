//! Token models: the redacted secret wrapper and the cached credential with TTL helpers.

pub mod credential;
pub mod secret;

pub use credential::*;
pub use secret::*;
