//! Petalpost Storefront - Cart mutation and checkout orchestration engine.
//!
//! Client-side engine for the Petalpost flower-delivery shop. It owns the
//! logic that the UI layer drives:
//!
//! - [`cart::CartStore`] - local cart mirror with per-item mutation locks
//!   and generation-guarded reconciliation against the remote store
//! - [`discount::DiscountEngine`] - promotional code validation and
//!   auto-invalidation
//! - [`checkout::CheckoutWizard`] - the Shipping -> Payment -> Review
//!   order-draft state machine
//! - [`order::OrderSubmitter`] - terminal multipart order submission with
//!   timeout/retry classification
//!
//! # Architecture
//!
//! All remote access goes through the [`api::RemoteStore`] trait
//! (implemented over HTTP by [`api::HttpStoreClient`]). UI collaborators
//! (session, confirmation dialogs, notifications) are injected as the
//! traits in [`surfaces`] - the engine never reaches for globals.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod discount;
pub mod order;
pub mod surfaces;

#[cfg(test)]
pub(crate) mod testing;
