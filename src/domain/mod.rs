//! Domain modules organized as vertical slices.
//!
//! Each sub-module contains:
//! - `mod.rs` — Record types (validated, ready to persist)
//! - `wire.rs` — Provider method names, request parameters and table columns
//! - `convert.rs` — Table rows to records, with coercion and validation
//! - `client.rs` — Sub-client with one method per provider call

pub mod bar;
pub mod calendar;
pub mod futures;
pub mod security;
