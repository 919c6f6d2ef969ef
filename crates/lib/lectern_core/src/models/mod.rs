//! Domain models shared by the store, the services and the API layer.

pub mod auth;
pub mod course;
pub mod coursework;
pub mod notification;
