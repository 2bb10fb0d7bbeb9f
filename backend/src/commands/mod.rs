//! Commands Layer
//!
//! Command handlers that bridge a desktop frontend to backend services.
//! Each takes the shared [`crate::AppState`] and reports errors as strings.

mod plan_cmd;
mod periodontal_cmd;

pub use plan_cmd::*;
pub use periodontal_cmd::*;
