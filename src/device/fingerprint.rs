use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use axum::http::{header, HeaderMap};
use sha2::{Digest, Sha256};

use super::policy::IpScope;
use super::user_agent::{parse_user_agent, DeviceTraits};

const FINGERPRINT_VERSION: &str = "fp1";

/// Everything the gate knows about the client making a login request.
#[derive(Debug, Clone)]
pub struct RequestFingerprint {
    pub device_id: String,
    pub traits: DeviceTraits,
    pub user_agent: Option<String>,
    pub accept_language: Option<String>,
    pub accept_encoding: Option<String>,
    pub ip: Option<IpAddr>,
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Primary language tag only, so "en-US,en;q=0.9" and "en-US,en;q=0.8" agree.
fn normalize_language(raw: Option<&str>) -> String {
    raw.and_then(|v| v.split(',').next())
        .and_then(|tag| tag.split(';').next())
        .map(|tag| tag.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Sorted encoding tokens without quality values.
fn normalize_encoding(raw: Option<&str>) -> String {
    let mut tokens: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .filter_map(|t| t.split(';').next())
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    tokens.sort();
    tokens.dedup();
    tokens.join(",")
}

fn scoped_ip(ip: Option<IpAddr>, scope: IpScope) -> String {
    let Some(ip) = ip else {
        return String::new();
    };
    match (scope, ip) {
        (IpScope::Ignore, _) => String::new(),
        (IpScope::Exact, ip) => ip.to_string(),
        (IpScope::Subnet, IpAddr::V4(v4)) => {
            let [a, b, c, _] = v4.octets();
            Ipv4Addr::new(a, b, c, 0).to_string()
        }
        (IpScope::Subnet, IpAddr::V6(v6)) => {
            let s = v6.segments();
            Ipv6Addr::new(s[0], s[1], s[2], s[3], 0, 0, 0, 0).to_string()
        }
    }
}

/// First `X-Forwarded-For` hop when trusted, otherwise the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>, trust_forwarded: bool) -> Option<IpAddr> {
    if trust_forwarded {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok());
        if forwarded.is_some() {
            return forwarded;
        }
    }
    peer
}

impl RequestFingerprint {
    /// Never fails: absent headers just contribute empty components.
    pub fn from_parts(
        user_agent: Option<String>,
        accept_language: Option<String>,
        accept_encoding: Option<String>,
        ip: Option<IpAddr>,
        ip_scope: IpScope,
    ) -> Self {
        let traits = parse_user_agent(user_agent.as_deref());

        let mut hasher = Sha256::new();
        for component in [
            FINGERPRINT_VERSION.to_string(),
            traits.browser_family.to_ascii_lowercase(),
            traits.browser_major().unwrap_or_default().to_string(),
            traits.platform.to_ascii_lowercase(),
            traits.device_type.as_str().to_string(),
            normalize_language(accept_language.as_deref()),
            normalize_encoding(accept_encoding.as_deref()),
            scoped_ip(ip, ip_scope),
        ] {
            hasher.update(component.as_bytes());
            hasher.update(b"|");
        }
        let device_id = format!("{:x}", hasher.finalize());

        Self {
            device_id,
            traits,
            user_agent,
            accept_language,
            accept_encoding,
            ip,
        }
    }

    pub fn from_headers(headers: &HeaderMap, ip: Option<IpAddr>, ip_scope: IpScope) -> Self {
        Self::from_parts(
            header_str(headers, header::USER_AGENT),
            header_str(headers, header::ACCEPT_LANGUAGE),
            header_str(headers, header::ACCEPT_ENCODING),
            ip,
            ip_scope,
        )
    }
}
