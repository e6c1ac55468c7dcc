//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity.

pub mod investment;
pub mod user;

pub use investment::{InvestmentRepository, SqlxInvestmentRepository};
pub use user::{SqlxUserRepository, UserRepository};
