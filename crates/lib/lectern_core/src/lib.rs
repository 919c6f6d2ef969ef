//! # lectern_core
//!
//! Core domain logic for Lectern: authentication, the classroom services,
//! notifications and the storage seam they share.

pub mod auth;
pub mod classroom;
pub mod mail;
pub mod migrate;
pub mod models;
pub mod notifications;
pub mod store;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
