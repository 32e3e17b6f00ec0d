// Session token minting and validation (HS256 JWT)

use crate::auth::error::{AuthError, TokenError};
use crate::auth::models::{AuthContext, Role};
use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // account email
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub role: Role,
    pub iat: i64, // issued at timestamp
    pub exp: i64, // expiration timestamp
}

/// Claims supplied by the caller when minting, on top of subject and timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClaims {
    pub user_id: i64,
    pub role: Role,
}

/// Result of checking a bearer token on an inbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid(AuthContext),
    Invalid(TokenError),
}

/// Token service for JWT operations.
///
/// Holds the process-wide signing secret; it is built once at startup and
/// shared read-only between requests.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl TokenService {
    /// Default token lifetime: one hour
    pub const DEFAULT_TTL_SECS: i64 = 3600;

    /// Create a new TokenService from the signing secret and token lifetime
    pub fn new(secret: &[u8], ttl_secs: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against an explicit clock in `validate_at`
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl_secs,
        }
    }

    /// Mint a token for `subject` issued now
    pub fn mint(&self, subject: &str, claims: SessionClaims) -> Result<String, AuthError> {
        self.mint_at(subject, claims, Utc::now().timestamp())
    }

    /// Mint a token for `subject` issued at `issued_at` (unix seconds)
    pub fn mint_at(
        &self,
        subject: &str,
        claims: SessionClaims,
        issued_at: i64,
    ) -> Result<String, AuthError> {
        let exp = issued_at.checked_add(self.ttl_secs).ok_or_else(|| {
            AuthError::TokenGeneration(format!(
                "expiry overflows: issued_at={} ttl={}",
                issued_at, self.ttl_secs
            ))
        })?;

        let claims = Claims {
            sub: subject.to_string(),
            user_id: claims.user_id,
            role: claims.role,
            iat: issued_at,
            exp,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }

    /// Validate a token against the current time
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate_at(token, Utc::now().timestamp())
    }

    /// Validate a token against `now` (unix seconds).
    ///
    /// The signature is verified before any claim is read. A token is valid
    /// up to and including its `exp` second.
    pub fn validate_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })?;

        if now > claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    /// Validate a bearer token and turn it into a request identity
    pub fn authenticate(&self, token: &str) -> ValidationOutcome {
        match self.validate(token) {
            Ok(claims) => ValidationOutcome::Valid(AuthContext {
                subject: claims.sub,
                user_id: claims.user_id,
                role: claims.role,
            }),
            Err(reason) => ValidationOutcome::Invalid(reason),
        }
    }
}
