use anyhow::Result;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Session token: user, device row and the session id stored on that row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub sub: String,
    pub did: String,
    pub sid: String,
    pub exp: usize,
}

pub fn create_session_jwt(
    secret: &str,
    user_id: &str,
    device_record_id: &str,
    session_id: &str,
    ttl_secs: i64,
) -> Result<String> {
    let exp = (chrono::Utc::now().timestamp() + ttl_secs) as usize;
    let claims = SessionClaims {
        sub: user_id.to_string(),
        did: device_record_id.to_string(),
        sid: session_id.to_string(),
        exp,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn decode_session_jwt(secret: &str, token: &str) -> Result<SessionClaims> {
    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}
