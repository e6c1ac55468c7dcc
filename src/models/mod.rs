//! Data models
//!
//! Domain entities shared between the persistence layer, services and API.

pub mod investment;
pub mod user;

pub use investment::{round_currency, Investment};
pub use user::User;
