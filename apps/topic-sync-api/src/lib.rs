//! HTTP service for forum topic membership sync.
//!
//! Exposes `PUT /v4/topics/syncUsers`, which reconciles every forum topic
//! linked to a reference entity with that entity's roster.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod router;
pub mod state;

pub use router::router;
pub use state::AppState;
