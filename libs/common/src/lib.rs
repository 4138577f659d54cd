//! Common library for the KitabGhar library services
//!
//! This crate provides shared functionality used by the auth and api
//! services: database connectivity and migrations, the Redis session cache,
//! error types, and the role model that drives authorization.

pub mod cache;
pub mod database;
pub mod error;
pub mod role;

pub use role::{Action, Role};
