//! # Jukebox Common Library
//!
//! Shared code for the jukebox service:
//! - Database initialization, schema, and row models
//! - Event types (PlayerEvent enum)
//! - Configuration loading
//! - Human-readable duration formatting

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod human_time;

pub use error::{Error, Result};
