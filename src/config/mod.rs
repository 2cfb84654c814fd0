//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! faucet.toml
//!     → loader.rs (read, parse, apply env overrides)
//!     → validation.rs (semantic checks)
//!     → FaucetConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields outside a chain entry have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{AccountModel, ChainConfig, Coin, FaucetConfig};
pub use validation::{validate_config, ValidationError};
