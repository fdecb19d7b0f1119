//! Shared types for quillstack

mod error;

pub use error::{ApiError, Result};
