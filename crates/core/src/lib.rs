//! Petalpost Core - Shared types library.
//!
//! This crate provides common types used across all Petalpost components:
//! - `storefront` - Cart and checkout engine for the flower-delivery shop
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
