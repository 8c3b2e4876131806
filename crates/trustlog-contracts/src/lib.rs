//! # trustlog-contracts
//!
//! Shared types and contracts for the TRUSTLOG tamper-evident audit core.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate — only data definitions and error types.

pub mod entry;
pub mod error;
pub mod query;
pub mod request;
pub mod verify;
