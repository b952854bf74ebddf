//! Signed credential pairs.
//!
//! Access and refresh credentials are HS256 JWTs: base64url (no padding)
//! header and claims signed with HMAC-SHA256. The two kinds share a secret
//! but carry distinct `kind` claims and expiry policies, so a refresh token
//! can never authenticate a request and an access token can never mint a
//! new pair.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{Result, UserError};

/// Lifetime of an access token.
pub const ACCESS_TTL_SECS: i64 = 3600;
/// Lifetime of a refresh token.
pub const REFRESH_TTL_SECS: i64 = 30 * 24 * 3600;

#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// HMAC signing secret shared by both token kinds.
    pub secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_ttl_secs: ACCESS_TTL_SECS,
            refresh_ttl_secs: REFRESH_TTL_SECS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id the credential is bound to.
    pub sub: String,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

/// The pair returned by the exchange and refresh endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Issue a fresh access + refresh pair for the user.
pub fn issue_pair(config: &TokenConfig, user_id: &str) -> Result<TokenPair> {
    let now = Utc::now().timestamp();
    let access = sign(
        config,
        &Claims {
            sub: user_id.to_string(),
            kind: TokenKind::Access,
            iat: now,
            exp: now + config.access_ttl_secs,
        },
    )?;
    let refresh = sign(
        config,
        &Claims {
            sub: user_id.to_string(),
            kind: TokenKind::Refresh,
            iat: now,
            exp: now + config.refresh_ttl_secs,
        },
    )?;
    Ok(TokenPair { access, refresh })
}

/// Verify a token of the expected kind and return the bound user id.
pub fn verify(config: &TokenConfig, token: &str, expected: TokenKind) -> Result<String> {
    let claims = decode(config, token)?;
    if claims.kind != expected {
        return Err(UserError::InvalidToken("Wrong token kind".to_string()));
    }
    if claims.exp <= Utc::now().timestamp() {
        return Err(UserError::InvalidToken("Token expired".to_string()));
    }
    Ok(claims.sub)
}

fn sign(config: &TokenConfig, claims: &Claims) -> Result<String> {
    let header = Header {
        alg: "HS256".to_string(),
        typ: "JWT".to_string(),
    };

    let header_json = serde_json::to_vec(&header)
        .map_err(|e| UserError::Configuration(format!("Failed to serialize header: {e}")))?;
    let claims_json = serde_json::to_vec(claims)
        .map_err(|e| UserError::Configuration(format!("Failed to serialize claims: {e}")))?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(claims_json)
    );

    let mut mac = new_mac(config)?;
    mac.update(signing_input.as_bytes());
    let signature = mac.finalize().into_bytes();

    Ok(format!(
        "{signing_input}.{}",
        URL_SAFE_NO_PAD.encode(signature)
    ))
}

fn decode(config: &TokenConfig, token: &str) -> Result<Claims> {
    let token = token.trim();
    let mut parts = token.split('.');
    let (Some(header_b64), Some(claims_b64), Some(sig_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(UserError::InvalidToken("Malformed token".to_string()));
    };

    let header_raw = b64_decode(header_b64)?;
    let header: Header = serde_json::from_slice(&header_raw)
        .map_err(|_| UserError::InvalidToken("Invalid header".to_string()))?;
    if header.alg != "HS256" || !header.typ.eq_ignore_ascii_case("JWT") {
        return Err(UserError::InvalidToken("Unsupported header".to_string()));
    }

    let signing_input = format!("{header_b64}.{claims_b64}");
    let signature = b64_decode(sig_b64)?;

    let mut mac = new_mac(config)?;
    mac.update(signing_input.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| UserError::InvalidToken("Signature mismatch".to_string()))?;

    let claims_raw = b64_decode(claims_b64)?;
    let claims: Claims = serde_json::from_slice(&claims_raw)
        .map_err(|_| UserError::InvalidToken("Invalid claims".to_string()))?;

    Ok(claims)
}

fn new_mac(config: &TokenConfig) -> Result<Hmac<Sha256>> {
    Hmac::<Sha256>::new_from_slice(config.secret.as_bytes())
        .map_err(|e| UserError::Configuration(format!("Invalid HMAC key: {e}")))
}

fn b64_decode(value: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(value.as_bytes())
        .map_err(|_| UserError::InvalidToken("Invalid base64url".to_string()))
}
