//! Router-wide middleware.

pub mod request_id;
pub mod track;

pub use request_id::{request_id_middleware, RequestId, X_REQUEST_ID};
pub use track::track_metrics;
