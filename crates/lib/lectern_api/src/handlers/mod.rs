//! Request handlers.

pub mod announcements;
pub mod assignments;
pub mod auth;
pub mod courses;
pub mod enrollment;
pub mod health;
pub mod notifications;
pub mod submissions;
