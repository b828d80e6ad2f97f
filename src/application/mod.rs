//! Application services: use cases over the repository traits and the cache.

pub mod auth;
pub mod comments;
pub mod content;
pub mod error;
pub mod identity;
pub mod market;
pub mod moderation;
pub mod notifications;
pub mod realtime;
pub mod repos;
pub mod stats;
pub mod taxonomy;
pub mod users;
pub mod views;
