//! Caller identifier resolution for the public trigger
//!
//! Sources are checked in this order:
//!
//! 1. First comma-separated entry of `X-Forwarded-For`
//! 2. `X-Real-IP`
//! 3. The connection's peer address
//!
//! Callers with none of these share one bucket, [`SHARED_POOL`], so
//! unidentifiable traffic draws from a single, tighter quota.

use axum::http::HeaderMap;
use std::net::SocketAddr;

/// Identifier for callers whose address cannot be determined
pub const SHARED_POOL: &str = "unknown-shared-pool";

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";

/// Resolve the identifier a request is rate limited under
///
/// Blank or non-UTF-8 header values are skipped.
pub fn resolve_identifier(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(first) = header_str(headers, FORWARDED_FOR)
        .and_then(|forwarded| forwarded.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return first.to_string();
    }

    if let Some(real_ip) = header_str(headers, REAL_IP)
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return real_ip.to_string();
    }

    match peer {
        Some(addr) => addr.ip().to_string(),
        None => SHARED_POOL.to_string(),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, value.parse().unwrap());
        }
        map
    }

    #[test]
    fn test_forwarded_for_first_entry() {
        let h = headers(&[("x-forwarded-for", "1.2.3.4, 5.6.7.8")]);
        assert_eq!(resolve_identifier(&h, None), "1.2.3.4");
    }

    #[test]
    fn test_forwarded_for_beats_real_ip_and_peer() {
        let h = headers(&[("x-forwarded-for", " 9.9.9.9 "), ("x-real-ip", "8.8.8.8")]);
        let peer: SocketAddr = "10.0.0.1:5555".parse().unwrap();
        assert_eq!(resolve_identifier(&h, Some(peer)), "9.9.9.9");
    }

    #[test]
    fn test_real_ip_when_no_forwarded_for() {
        let h = headers(&[("x-real-ip", "8.8.8.8")]);
        let peer: SocketAddr = "10.0.0.1:5555".parse().unwrap();
        assert_eq!(resolve_identifier(&h, Some(peer)), "8.8.8.8");
    }

    #[test]
    fn test_blank_forwarded_for_falls_through() {
        let h = headers(&[("x-forwarded-for", " , 5.6.7.8"), ("x-real-ip", "8.8.8.8")]);
        assert_eq!(resolve_identifier(&h, None), "8.8.8.8");
    }

    #[test]
    fn test_peer_address_without_port() {
        let peer: SocketAddr = "[2001:db8::1]:443".parse().unwrap();
        assert_eq!(resolve_identifier(&HeaderMap::new(), Some(peer)), "2001:db8::1");
    }

    #[test]
    fn test_shared_pool_fallback() {
        assert_eq!(
            resolve_identifier(&HeaderMap::new(), None),
            "unknown-shared-pool"
        );
    }
}
