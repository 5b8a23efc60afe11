//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the playback core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Domain event bus
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the other core crates
//! depend on. It establishes the logging conventions, the configuration
//! builder with fail-fast bridge validation, and the broadcast channel used
//! for discrete queue/playback telemetry.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
