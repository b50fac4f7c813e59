//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the sync engine and its hosts:
//! - Configuration (`SyncSettings`, marketplace profiles, credentials)
//! - Logging and tracing setup
//! - Event bus for structured run events
//!
//! ## Overview
//!
//! Nothing here holds process-wide state except the `tracing` subscriber
//! installed by [`logging::init_logging`]. Configuration and the event bus
//! are plain values passed into the engine.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
