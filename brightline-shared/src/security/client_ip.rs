/// Caller address resolution
///
/// The API runs behind a reverse proxy in production, so the socket peer is
/// usually the proxy. Resolution order:
///
/// 1. first hop of `X-Forwarded-For`
/// 2. `X-Real-IP`
/// 3. the socket peer address
///
/// Header values that do not parse as an IP address are skipped.

use std::net::IpAddr;

/// Resolves the caller address from header values and the peer address
pub fn resolve_client_ip(
    forwarded_for: Option<&str>,
    real_ip: Option<&str>,
    peer: Option<IpAddr>,
) -> Option<IpAddr> {
    forwarded_for
        .and_then(|value| value.split(',').next())
        .and_then(parse_ip)
        .or_else(|| real_ip.and_then(parse_ip))
        .or(peer)
}

fn parse_ip(value: &str) -> Option<IpAddr> {
    value.trim().parse().ok()
}
