//! Database models for the F&B Supply Chain Platform
//!
//! Re-exports models from the shared crate and adds backend-specific models

pub use shared::models::*;
