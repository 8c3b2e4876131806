//! # trustlog-query
//!
//! Bounded, deterministic query views and portable exports over the
//! TRUSTLOG chain.
//!
//! The [`QueryEngine`] answers conjunctive filter + pagination requests
//! with reproducible ordering; [`export::materialize`] renders a result
//! page to CSV or JSON without filtering or reordering anything.

pub mod engine;
pub mod export;

pub use engine::QueryEngine;
pub use export::{ExportFormat, COLUMNS};

// ── Tests ─────────────────────────────────────────────────────────────────────
