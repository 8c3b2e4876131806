//! # trustlog-core
//!
//! Trait seams and runtime configuration for the TRUSTLOG audit core.
//!
//! The `EntryStore` trait is the boundary between the chaining logic and
//! whatever durable store a deployment uses. `LogConfig` is the TOML-driven
//! operator configuration shared by the appender and the fan-out.

pub mod config;
pub mod traits;

pub use config::{ChainConfig, LogConfig, StreamConfig};
pub use traits::EntryStore;
