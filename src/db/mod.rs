//! Database layer
//!
//! SQLite-backed persistence using sqlx. The layer is split into:
//! - `pool` - connection pool creation
//! - `migrations` - code-based schema migrations embedded in the binary
//! - `repositories` - trait-based data access, one repository per entity

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool};
