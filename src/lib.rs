//! Quillstack - REST backend for a blogging platform
//!
//! Serves posts, comments, search, and platform statistics over plain
//! hyper http1, backed by MongoDB. Write endpoints validate JWT bearer
//! tokens issued by an external identity service.
//!
//! ## Modules
//!
//! - **routes**: HTTP handlers and response shaping
//! - **services**: post/comment/search/stats operations over MongoDB
//! - **domain**: pure derivation functions (slugs, excerpts, scores)
//! - **db**: typed collection wrapper with index management and soft delete
//! - **auth**: JWT validation

pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{ApiError, Result};
