//! HTTP surface of the faucet.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → middleware (request ID, trace span, timeout, route metrics)
//!     → request.rs (client IP, optional JSON body)
//!     → server.rs handlers (CAPTCHA → PoW → address → rate limits → dispatcher)
//!     → response.rs (`{"result": ...}` with a status per outcome)
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use middleware::{RequestId, X_REQUEST_ID};
pub use request::{client_ip, ClientIp, SendRequest};
pub use response::ApiError;
pub use server::{AppState, HttpServer};
