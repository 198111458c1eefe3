//! Ordergate Core - Shared types library.
//!
//! This crate provides the common types used across Ordergate components:
//! - `server` - Read-only order export API over the commerce database
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, the exported order document model, and the
//!   filter-value model accepted by the export API

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
