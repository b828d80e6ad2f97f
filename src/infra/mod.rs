//! Infrastructure adapters and runtime bootstrap.

pub mod db;
pub mod error;
pub mod http;
pub mod memory;
pub mod realtime;
pub mod telemetry;
pub mod uploads;
