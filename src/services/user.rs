//! User service
//!
//! Business logic for accounts and sessions: signup with a queued
//! verification mail, email verification, credential login issuing an
//! access/refresh token pair, access-token refresh, and logout via the
//! revocation registry.

use anyhow::{anyhow, Context};
use std::sync::Arc;

use crate::db::repositories::UserRepository;
use crate::models::User;
use crate::services::email::{send_in_background, Mailer};
use crate::services::password::{hash_password, verify_password};
use crate::services::revocation::RevocationRegistry;
use crate::services::token::{TokenClaims, TokenPair, TokenService};

/// Minimum accepted password length.
const MIN_PASSWORD_LEN: usize = 8;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// A user with this email already exists
    #[error("User with email '{0}' already exists")]
    UserExists(String),

    /// Unknown email or wrong password; deliberately indistinguishable
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Credentials are valid but the email address was never verified
    #[error("Account email is not verified")]
    AccountNotVerified,

    /// Verification link token is invalid, expired or for an unknown user
    #[error("Invalid verification token")]
    InvalidVerificationToken,

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Signup input
#[derive(Debug, Clone)]
pub struct SignupInput {
    pub email: String,
    pub password: String,
}

/// Login input
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// User service for accounts and session tokens
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    tokens: Arc<TokenService>,
    revocations: Arc<RevocationRegistry>,
    mailer: Arc<dyn Mailer>,
    public_url: String,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        tokens: Arc<TokenService>,
        revocations: Arc<RevocationRegistry>,
        mailer: Arc<dyn Mailer>,
        public_url: String,
    ) -> Self {
        Self {
            user_repo,
            tokens,
            revocations,
            mailer,
            public_url,
        }
    }

    /// Register a new account and queue a verification mail.
    ///
    /// The mail is fire-and-forget: a delivery failure is logged by the
    /// background task and never surfaces to the signup request.
    pub async fn signup(&self, input: SignupInput) -> Result<User, UserServiceError> {
        self.validate_signup_input(&input)?;

        if self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(input.email));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = User::new(input.email, password_hash);

        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        self.queue_verification_email(&created);

        Ok(created)
    }

    /// Consume a verification-link token, marking the account verified.
    ///
    /// Idempotent: verifying an already-verified account succeeds.
    pub async fn verify_email(&self, token: &str) -> Result<User, UserServiceError> {
        let email = self
            .tokens
            .verify_email_token(token)
            .map_err(|_| UserServiceError::InvalidVerificationToken)?;

        let mut user = self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to look up user")?
            .ok_or(UserServiceError::InvalidVerificationToken)?;

        if !user.is_verified {
            self.user_repo
                .mark_verified(user.id)
                .await
                .context("Failed to mark user verified")?;
            user.is_verified = true;
        }

        Ok(user)
    }

    /// Validate credentials and issue the access + refresh pair.
    pub async fn login(&self, input: LoginInput) -> Result<(User, TokenPair), UserServiceError> {
        let user = self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to look up user")?
            .ok_or(UserServiceError::InvalidCredentials)?;

        if !verify_password(&input.password, &user.password_hash) {
            return Err(UserServiceError::InvalidCredentials);
        }

        if !user.is_verified {
            return Err(UserServiceError::AccountNotVerified);
        }

        let pair = self
            .tokens
            .issue_pair(&user)
            .map_err(|e| anyhow!("Failed to issue token pair: {}", e))?;

        Ok((user, pair))
    }

    /// Mint a new access token from verified refresh-token claims.
    ///
    /// The gate has already checked signature, expiry, revocation and
    /// class; this only confirms the subject still exists.
    pub async fn refresh_access_token(
        &self,
        claims: &TokenClaims,
    ) -> Result<String, UserServiceError> {
        let user_id = claims
            .user_id()
            .map_err(|_| UserServiceError::InvalidCredentials)?;

        let user = self
            .user_repo
            .get_by_id(user_id)
            .await
            .context("Failed to look up user")?
            .ok_or(UserServiceError::InvalidCredentials)?;

        let access = self
            .tokens
            .issue(&user, crate::services::token::TokenClass::Access)
            .map_err(|e| anyhow!("Failed to issue access token: {}", e))?;

        Ok(access)
    }

    /// Revoke the presented token's jti. The token keeps failing the gate
    /// for at least its remaining natural lifetime.
    pub async fn logout(&self, jti: &str) -> Result<(), UserServiceError> {
        self.revocations.revoke(jti).await;
        Ok(())
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: uuid::Uuid) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?;
        Ok(user)
    }

    fn validate_signup_input(&self, input: &SignupInput) -> Result<(), UserServiceError> {
        if input.email.is_empty() || !input.email.contains('@') {
            return Err(UserServiceError::ValidationError(
                "A valid email address is required".to_string(),
            ));
        }
        if input.password.len() < MIN_PASSWORD_LEN {
            return Err(UserServiceError::ValidationError(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }

    fn queue_verification_email(&self, user: &User) {
        let token = match self.tokens.issue_email_token(&user.email) {
            Ok(token) => token,
            Err(e) => {
                tracing::error!("Failed to issue verification token: {}", e);
                return;
            }
        };

        let link = format!("{}/api/v1/auth/verify?token={}", self.public_url, token);
        let body = format!(
            "<p>Welcome to Fundtrack!</p>\
             <p>Please verify your email address by following \
             <a href=\"{}\">this link</a>.</p>\
             <p>The link is valid for 24 hours.</p>",
            link
        );

        send_in_background(
            self.mailer.clone(),
            user.email.clone(),
            "Verify your Fundtrack account".to_string(),
            body,
        );
    }
}
