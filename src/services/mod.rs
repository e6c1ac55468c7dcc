//! Services layer - Business logic
//!
//! This module contains all business logic services for the Fundtrack
//! service. Services are responsible for:
//! - Implementing business rules
//! - Coordinating between repositories and external collaborators
//! - Handling validation and error cases

pub mod email;
pub mod investment;
pub mod password;
pub mod quote;
pub mod revocation;
pub mod scheduler;
pub mod token;
pub mod user;

pub use email::{send_in_background, Mailer, SmtpMailer};
pub use investment::{InvestmentService, InvestmentServiceError, RefreshOutcome};
pub use password::{hash_password, verify_password};
pub use quote::{QuoteError, QuoteSource, RapidApiQuoteSource, SchemeQuote};
pub use revocation::RevocationRegistry;
pub use scheduler::NavRefreshScheduler;
pub use token::{TokenClaims, TokenClass, TokenError, TokenPair, TokenService};
pub use user::{LoginInput, SignupInput, UserService, UserServiceError};
