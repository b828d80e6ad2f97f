//! Agora: a forum backend with posts, news, events, threaded comments,
//! notifications and a small marketplace, fronted by a read-through cache.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
