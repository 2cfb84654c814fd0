//! Admission control for send requests.
//!
//! # Data Flow
//! ```text
//! POST /send/{chain}/{address}:
//!     → captcha.rs (external verification, optional)
//!     → pow.rs (single-use challenge, optional)
//!     → rate_limit.rs (per-address and per-IP sliding window)
//!     → dispatcher
//! successful send:
//!     → rate_limit.rs update(address), update(chain + ip)
//! ```
//!
//! # Design Decisions
//! - Counters are bumped only after a successful send, never on admission
//! - PoW fails closed: unknown, reused or stale nonces are rejected
//! - Limiter reads fail open: a storage glitch does not block a requester
//! - Time is injected through `Clock` so windows are testable

pub mod captcha;
pub mod clock;
pub mod pow;
pub mod rate_limit;

pub use captcha::{CaptchaVerifier, RecaptchaVerifier};
pub use clock::{Clock, ManualClock, SystemClock};
pub use pow::{Challenge, PowChallenge};
pub use rate_limit::{RateLimiter, WINDOW_MS};
