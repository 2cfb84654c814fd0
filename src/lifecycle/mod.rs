//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     broadcast → HTTP server stops accepting and drains
//!               → health monitor exits its loop
//!     main      → flushes the store → exits
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accepting, drain in-flight sends, flush, exit
//! - The dispatcher worker stops once the last handle to it is dropped

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
