// security/src/lib.rs
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use models::{ClinicError, ClinicResult};

pub mod context;
pub mod roles;

pub use context::CallerContext;
pub use roles::{Permission, Role, RoleConfig, RolesConfig};

/// Claims for JWT.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (username)
    pub user_id: i64,
    pub role_id: u32,
    pub exp: u64, // Expiration time
    pub iat: u64, // Issued at
}

/// Generates a signed bearer token for an authenticated account.
/// Session cookie issuance itself is an external collaborator; this exists
/// for the auth boundary and for tests.
pub fn generate_token(
    username: &str,
    user_id: i64,
    role: Role,
    secret: &[u8],
) -> ClinicResult<String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| ClinicError::Storage(format!("system time error: {}", e)))?
        .as_secs();

    let claims = Claims {
        sub: username.to_string(),
        user_id,
        role_id: role.id(),
        exp: now + (60 * 60 * 24), // Token expires in 24 hours
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| ClinicError::Storage(format!("failed to encode JWT: {}", e)))
}

/// Decodes and validates a bearer token. Any failure is `Unauthorized`;
/// the caller never learns whether the signature, shape, or expiry was bad.
pub fn validate_token(token: &str, secret: &[u8]) -> ClinicResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ClinicError::Unauthorized)
}

/// Claims for the OAuth `state` round trip. The consent redirect comes back
/// unauthenticated, so the account binding must not be forgeable.
#[derive(Debug, Serialize, Deserialize)]
struct StateClaims {
    sub: String,
    user_id: i64,
    exp: u64,
}

const STATE_TOKEN_TTL_SECS: u64 = 60 * 10;

/// Signs a short-lived `state` value binding the consent flow to an account.
pub fn generate_state_token(user_id: i64, secret: &[u8]) -> ClinicResult<String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| ClinicError::Storage(format!("system time error: {}", e)))?
        .as_secs();

    let claims = StateClaims {
        sub: "oauth-state".to_string(),
        user_id,
        exp: now + STATE_TOKEN_TTL_SECS,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| ClinicError::Storage(format!("failed to encode state token: {}", e)))
}

/// Resolves a `state` value back to the account that started the flow.
pub fn validate_state_token(token: &str, secret: &[u8]) -> ClinicResult<i64> {
    decode::<StateClaims>(
        token,
        &DecodingKey::from_secret(secret),
        &Validation::default(),
    )
    .map(|data| data.claims.user_id)
    .map_err(|_| ClinicError::Unauthorized)
}
