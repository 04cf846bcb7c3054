//! Data models shared across database access and API handlers.

pub mod attendance;
pub mod course;
pub mod session;
pub mod user;
