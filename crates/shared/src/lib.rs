#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Inkwell shared infrastructure
//!
//! Pieces used by the API server that are independent of HTTP:
//!
//! - **Database**: Postgres pool creation and embedded migrations
//! - **Blob storage**: the abstract object store behind image uploads, plus a
//!   filesystem backend

pub mod blob;
pub mod db;

pub use blob::{Blob, BlobError, BlobStore, FsBlobStore};
pub use db::{create_pool, run_migrations};
