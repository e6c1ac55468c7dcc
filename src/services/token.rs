//! Session token issuing and verification
//!
//! Signed JWTs carry the user identity, an absolute expiry, a unique token
//! id (jti) used as the revocation key, and a flag distinguishing the
//! access and refresh classes. Access and refresh tokens are structurally
//! identical apart from that flag; class enforcement happens at the
//! authentication gate, not here.
//!
//! `verify` maps every structural or cryptographic failure to
//! `TokenError::Invalid` - malformed input from a client must never become
//! a crash condition.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::models::User;

/// Purpose claim embedded in email-verification tokens so they can never
/// be presented as session tokens and vice versa.
const EMAIL_VERIFY_PURPOSE: &str = "verify_email";

/// Default lifetime of email-verification tokens.
const EMAIL_TOKEN_TTL_HOURS: i64 = 24;

/// Token class required or carried by a session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    /// Short-lived credential authorizing ordinary requests
    Access,
    /// Longer-lived credential used only to mint new access tokens
    Refresh,
}

/// Claims embedded in every session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: user ID
    pub sub: String,
    /// User email, carried so handlers need no extra lookup
    pub email: String,
    /// Unique token id, used as the revocation key
    pub jti: String,
    /// Class flag: true for refresh tokens
    pub refresh: bool,
    /// Issued-at (Unix timestamp, seconds)
    pub iat: i64,
    /// Expiry (Unix timestamp, seconds)
    pub exp: i64,
}

impl TokenClaims {
    /// Parse the subject claim back into a user ID.
    pub fn user_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::Invalid)
    }

    /// The class this token belongs to.
    pub fn class(&self) -> TokenClass {
        if self.refresh {
            TokenClass::Refresh
        } else {
            TokenClass::Access
        }
    }
}

/// Claims embedded in email-verification tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EmailTokenClaims {
    /// Subject: email address being verified
    sub: String,
    /// Fixed purpose marker
    purpose: String,
    /// Issued-at (Unix timestamp, seconds)
    iat: i64,
    /// Expiry (Unix timestamp, seconds)
    exp: i64,
}

/// Access/refresh token pair issued at login.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Error types for token operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Signature, expiry or structural failure; deliberately carries no
    /// detail about which check failed
    #[error("Invalid or expired token")]
    Invalid,

    /// Token could not be signed (should not happen with a valid secret)
    #[error("Failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Issues and verifies session tokens with a process-wide signing secret.
///
/// The secret is read-only after startup; misconfiguration is caught by
/// `Config::validate` before this service is constructed.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    /// Create a token service with explicit TTLs.
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    /// Create a token service from configuration.
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            &config.jwt_secret,
            Duration::minutes(config.access_ttl_minutes),
            Duration::days(config.refresh_ttl_days),
        )
    }

    /// Longest lifetime any issued session token can have. Revocation
    /// entries live at least this long so they outlive the token they block.
    pub fn max_token_lifetime(&self) -> std::time::Duration {
        self.refresh_ttl
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(0))
    }

    /// Issue a single token of the given class for a user.
    ///
    /// Every issued token carries a freshly generated jti, so two tokens
    /// for the same user are always independently revocable.
    pub fn issue(&self, user: &User, class: TokenClass) -> Result<String, TokenError> {
        let ttl = match class {
            TokenClass::Access => self.access_ttl,
            TokenClass::Refresh => self.refresh_ttl,
        };
        let now = Utc::now();
        let claims = TokenClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            jti: Uuid::new_v4().to_string(),
            refresh: class == TokenClass::Refresh,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)
    }

    /// Issue the access + refresh pair handed out at login.
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access: self.issue(user, TokenClass::Access)?,
            refresh: self.issue(user, TokenClass::Refresh)?,
        })
    }

    /// Verify signature and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| TokenError::Invalid)
    }

    /// Issue a short-lived email-verification token for an address.
    pub fn issue_email_token(&self, email: &str) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = EmailTokenClaims {
            sub: email.to_string(),
            purpose: EMAIL_VERIFY_PURPOSE.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(EMAIL_TOKEN_TTL_HOURS)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)
    }

    /// Verify an email-verification token, returning the email address.
    pub fn verify_email_token(&self, token: &str) -> Result<String, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let claims = decode::<EmailTokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| TokenError::Invalid)?;

        if claims.purpose != EMAIL_VERIFY_PURPOSE {
            return Err(TokenError::Invalid);
        }

        Ok(claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_secret() -> String {
        "a-test-signing-secret-of-sufficient-length".to_string()
    }

    fn service() -> TokenService {
        TokenService::new(&test_secret(), Duration::hours(1), Duration::days(7))
    }

    fn test_user() -> User {
        User::new("investor@example.com", "hash")
    }

    #[test]
    fn test_issue_and_verify_round_trips_access_claims() {
        let service = service();
        let user = test_user();

        let token = service.issue(&user, TokenClass::Access).unwrap();
        let claims = service.verify(&token).unwrap();

        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.email, user.email);
        assert!(!claims.refresh);
        assert_eq!(claims.class(), TokenClass::Access);
        assert_eq!(claims.user_id().unwrap(), user.id);
    }

    #[test]
    fn test_refresh_token_carries_refresh_flag() {
        let service = service();
        let token = service.issue(&test_user(), TokenClass::Refresh).unwrap();
        let claims = service.verify(&token).unwrap();
        assert!(claims.refresh);
        assert_eq!(claims.class(), TokenClass::Refresh);
    }

    #[test]
    fn test_expired_token_is_invalid() {
        // Negative TTL puts the expiry in the past at issue time.
        let service = TokenService::new(&test_secret(), Duration::seconds(-30), Duration::days(7));
        let token = service.issue(&test_user(), TokenClass::Access).unwrap();
        assert!(matches!(service.verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_tampered_token_is_invalid() {
        let service = service();
        let token = service.issue(&test_user(), TokenClass::Access).unwrap();

        let mut tampered = token.into_bytes();
        let last = tampered.len() - 1;
        tampered[last] = if tampered[last] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(tampered).unwrap();

        assert!(matches!(service.verify(&tampered), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_garbage_input_is_invalid_not_a_panic() {
        let service = service();
        assert!(matches!(service.verify(""), Err(TokenError::Invalid)));
        assert!(matches!(
            service.verify("not.a.token"),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_token_signed_with_other_secret_is_invalid() {
        let other = TokenService::new(
            "a-completely-different-signing-secret!!",
            Duration::hours(1),
            Duration::days(7),
        );
        let token = other.issue(&test_user(), TokenClass::Access).unwrap();
        assert!(matches!(service().verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_pair_tokens_carry_distinct_jtis() {
        let service = service();
        let user = test_user();
        let pair = service.issue_pair(&user).unwrap();

        let access = service.verify(&pair.access).unwrap();
        let refresh = service.verify(&pair.refresh).unwrap();
        assert_ne!(access.jti, refresh.jti);

        // Two access tokens for the same user are independent too.
        let second = service.issue(&user, TokenClass::Access).unwrap();
        let second_claims = service.verify(&second).unwrap();
        assert_ne!(access.jti, second_claims.jti);
    }

    #[test]
    fn test_email_token_round_trip() {
        let service = service();
        let token = service.issue_email_token("investor@example.com").unwrap();
        let email = service.verify_email_token(&token).unwrap();
        assert_eq!(email, "investor@example.com");
    }

    #[test]
    fn test_session_token_is_not_an_email_token() {
        let service = service();
        let token = service.issue(&test_user(), TokenClass::Access).unwrap();
        assert!(service.verify_email_token(&token).is_err());
    }

    #[test]
    fn test_email_token_is_not_a_session_token() {
        let service = service();
        let token = service.issue_email_token("investor@example.com").unwrap();
        assert!(service.verify(&token).is_err());
    }
}
