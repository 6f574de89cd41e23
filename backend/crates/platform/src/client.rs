//! Client identification utilities
//!
//! Anonymous routes are rate limited per client. The identifier comes from
//! request headers set by the reverse proxy.

use axum::http::{HeaderMap, header};

/// Longest User-Agent prefix used when no address header is present
pub const USER_AGENT_PREFIX_LEN: usize = 50;

/// Fallback when the request carries no identifying header at all
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Derive a rate-limit identifier for an anonymous client.
///
/// Order of preference:
/// 1. first hop of `X-Forwarded-For`
/// 2. `X-Real-IP`
/// 3. the first 50 characters of `User-Agent`
pub fn client_identifier(headers: &HeaderMap) -> String {
    if let Some(first_hop) = header_str(headers, "x-forwarded-for")
        .and_then(|xff| xff.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
    {
        return first_hop.to_string();
    }

    if let Some(real_ip) = header_str(headers, "x-real-ip")
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return real_ip.to_string();
    }

    match header_str(headers, header::USER_AGENT.as_str()) {
        Some(ua) if !ua.trim().is_empty() => ua.chars().take(USER_AGENT_PREFIX_LEN).collect(),
        _ => UNKNOWN_CLIENT.to_string(),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
