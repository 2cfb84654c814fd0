//! Persistent key/value storage.
//!
//! # Data Flow
//! ```text
//! RateLimiter ──► Namespace("rate_limit") ──┐
//!                                           ├──► sled::Db (db.path)
//! PowChallenge ─► Namespace("pow") ─────────┘
//! ```
//!
//! # Design Decisions
//! - One sled database per process, one tree per consumer
//! - Values are JSON so the on-disk format stays inspectable
//! - Read-modify-write goes through sled's compare-and-swap loop, never a
//!   separate get then put

pub mod store;

pub use store::{Namespace, Store, StoreError};
