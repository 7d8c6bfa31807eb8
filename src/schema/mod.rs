//! Event table schema
//!
//! This module defines the per-user event table handed to the feature engine
//! and the adapter that decodes it from JSON or NDJSON.

mod adapter;
mod table;

pub use adapter::*;
pub use table::*;
