use anyhow::{Context, Result};
use tracing::warn;

use crate::device::{DeviceMatchPolicy, IpScope, MatchStrategy};

const DEFAULT_SESSION_TTL_SECS: i64 = 60 * 60 * 24 * 7;
const DEFAULT_REMEMBER_TTL_SECS: i64 = 60 * 60 * 24 * 30;

#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub db_path: String,
    pub jwt_secret: String,
    pub session_ttl_secs: i64,
    pub remember_ttl_secs: i64,
    pub admin: Option<AdminCredentials>,
    pub device_policy: DeviceMatchPolicy,
    pub trust_forwarded_for: bool,
}

fn var_or(name: &str, default: &str) -> String {
    dotenvy::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match dotenvy::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid {name}: {e}")),
        _ => Ok(default),
    }
}

impl AppConfig {
    /// Reads `.env` (if present) and the process environment.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let jwt_secret = dotenvy::var("JWT_SECRET").context("JWT_SECRET must be set")?;

        let admin = match (dotenvy::var("ADMIN_USERNAME"), dotenvy::var("ADMIN_PASSWORD")) {
            (Ok(username), Ok(password)) if !username.is_empty() && !password.is_empty() => {
                Some(AdminCredentials { username, password })
            }
            _ => {
                warn!("ADMIN_USERNAME/ADMIN_PASSWORD not set; admin device routes disabled");
                None
            }
        };

        let device_policy = DeviceMatchPolicy {
            strategy: parse_var("DEVICE_MATCH_STRATEGY", MatchStrategy::FamilyPlatform)?,
            ip_scope: parse_var("DEVICE_IP_SCOPE", IpScope::Subnet)?,
        };

        Ok(Self {
            bind_addr: var_or("BIND_ADDR", "0.0.0.0:3000"),
            db_path: var_or("DB_PATH", "fieldgatedb"),
            jwt_secret,
            session_ttl_secs: parse_var("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?,
            remember_ttl_secs: parse_var("REMEMBER_TTL_SECS", DEFAULT_REMEMBER_TTL_SECS)?,
            admin,
            device_policy,
            trust_forwarded_for: parse_var("TRUST_FORWARDED_FOR", false)?,
        })
    }

    /// Defaults for tests and local tooling.
    pub fn for_secret(jwt_secret: &str) -> Self {
        Self {
            bind_addr: "127.0.0.1:0".to_string(),
            db_path: "fieldgatedb".to_string(),
            jwt_secret: jwt_secret.to_string(),
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            remember_ttl_secs: DEFAULT_REMEMBER_TTL_SECS,
            admin: None,
            device_policy: DeviceMatchPolicy::default(),
            trust_forwarded_for: false,
        }
    }
}
