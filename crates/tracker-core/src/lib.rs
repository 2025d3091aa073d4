//! Core types and trait definitions for the payload tracker.
//!
//! This crate is deliberately free of HTTP and database dependencies. It holds
//! the domain model, the inbound message shape, the pure normalisation step
//! and the timeline duration math. Storage backends implement
//! [`store::TrackerStore`]; everything else depends on that abstraction.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod dimension;
pub mod error;
pub mod message;
pub mod normalize;
pub mod payload;
pub mod status;
pub mod store;
pub mod timeline;

pub use error::{Error, RejectKind, Result};
