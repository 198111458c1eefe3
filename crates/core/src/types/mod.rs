//! Core types for Ordergate.
//!
//! This module provides type-safe wrappers for common domain concepts and
//! the outward-facing order document model.

pub mod export;
pub mod filter;
pub mod id;

pub use export::*;
pub use filter::{FilterMap, FilterValue, InvalidFilters};
pub use id::*;
