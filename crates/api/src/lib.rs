// Test code patterns:
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Inkwell API Library
//!
//! Auth/session core and content routes for the Inkwell blog service.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod security;
pub mod state;
pub mod store;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
pub use store::Stores;
