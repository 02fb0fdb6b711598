use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::automock;

/// Session-token claims. `moderator` rides along as a custom claim so
/// moderation handlers never need a second identity-provider round trip for
/// the caller's own role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
    pub email_verified: bool,
    #[serde(default)]
    pub moderator: bool,
}

/// Claims of the attested-client token sent alongside every RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestationClaims {
    pub aud: String,
    pub exp: usize,
    pub iat: usize,
}

pub const ATTESTATION_AUDIENCE: &str = "attested-client";

#[derive(Debug)]
pub enum AuthError {
    InvalidToken,
    ExpiredToken,
    EmailNotVerified,
    InvalidAttestation,
    JwtError(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidToken => write!(f, "Invalid session token"),
            AuthError::ExpiredToken => write!(f, "Expired session token"),
            AuthError::EmailNotVerified => write!(f, "Session email is not verified"),
            AuthError::InvalidAttestation => write!(f, "Invalid client attestation token"),
            AuthError::JwtError(msg) => write!(f, "JWT error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

#[cfg_attr(test, automock)]
pub trait TokenVerifier: Send + Sync {
    /// Verifies the session token and the verified-email requirement.
    fn verify_session(&self, token: &str) -> Result<SessionClaims, AuthError>;
    /// Verifies the attested-client token.
    fn verify_attestation(&self, token: &str) -> Result<(), AuthError>;
}

pub struct JwtTokenVerifier {
    session_secret: String,
    attestation_secret: String,
}

impl JwtTokenVerifier {
    pub fn new() -> Self {
        let session_secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET environment variable must be set");
        let attestation_secret = std::env::var("ATTESTATION_SECRET")
            .expect("ATTESTATION_SECRET environment variable must be set");
        Self {
            session_secret,
            attestation_secret,
        }
    }

    pub fn with_secrets(session_secret: &str, attestation_secret: &str) -> Self {
        Self {
            session_secret: session_secret.to_string(),
            attestation_secret: attestation_secret.to_string(),
        }
    }

    /// Mints a session token. Exists for tests and local tooling; production
    /// tokens come from the identity provider.
    pub fn generate_session_token(
        &self,
        user_id: &str,
        email_verified: bool,
        moderator: bool,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user_id.to_string(),
            exp: (now + Duration::hours(24)).timestamp() as usize,
            iat: now.timestamp() as usize,
            email_verified,
            moderator,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.session_secret.as_ref()),
        )
        .map_err(|e| AuthError::JwtError(format!("{:#?}", e)))
    }

    pub fn generate_attestation_token(&self) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = AttestationClaims {
            aud: ATTESTATION_AUDIENCE.to_string(),
            exp: (now + Duration::hours(1)).timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.attestation_secret.as_ref()),
        )
        .map_err(|e| AuthError::JwtError(format!("{:#?}", e)))
    }
}

impl TokenVerifier for JwtTokenVerifier {
    fn verify_session(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let decoding_key = DecodingKey::from_secret(self.session_secret.as_ref());
        let validation = Validation::default();
        let claims = match decode::<SessionClaims>(token, &decoding_key, &validation) {
            Ok(token_data) => token_data.claims,
            Err(err) => {
                return Err(match err.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                    _ => AuthError::InvalidToken,
                })
            }
        };
        if !claims.email_verified {
            return Err(AuthError::EmailNotVerified);
        }
        Ok(claims)
    }

    fn verify_attestation(&self, token: &str) -> Result<(), AuthError> {
        let decoding_key = DecodingKey::from_secret(self.attestation_secret.as_ref());
        let mut validation = Validation::default();
        validation.set_audience(&[ATTESTATION_AUDIENCE]);
        decode::<AttestationClaims>(token, &decoding_key, &validation)
            .map(|_| ())
            .map_err(|_| AuthError::InvalidAttestation)
    }
}
