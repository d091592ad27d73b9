//! Client identification utilities
//!
//! Derives a stable device fingerprint from the user agent and IP address a
//! request presents. The fingerprint is a one-way digest, so stored values do
//! not leak the raw header contents.

use std::net::IpAddr;

use crate::crypto::{sha256, to_base64_url};

/// Separator between the fingerprint inputs
const FINGERPRINT_SEPARATOR: char = '|';

/// Derive a device fingerprint from `(user_agent, ip)`
///
/// The result is 43 URL-safe characters. Identical inputs always produce the
/// same fingerprint; the user agent is compared byte-for-byte.
pub fn device_fingerprint(user_agent: &str, ip: IpAddr) -> String {
    let material = format!("{user_agent}{FINGERPRINT_SEPARATOR}{ip}");
    to_base64_url(&sha256(material.as_bytes()))
}

/// Whether an address belongs to a private, loopback or link-local range
pub fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                // fc00::/7 unique local
                || (first & 0xfe00) == 0xfc00
                // fe80::/10 link local
                || (first & 0xffc0) == 0xfe80
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let ip: IpAddr = "203.0.113.7".parse().unwrap();
        let a = device_fingerprint("Mozilla/5.0", ip);
        let b = device_fingerprint("Mozilla/5.0", ip);
        assert_eq!(a, b);
        assert_eq!(a.len(), 43);
    }

    #[test]
    fn test_fingerprint_changes_with_inputs() {
        let ip: IpAddr = "203.0.113.7".parse().unwrap();
        let other_ip: IpAddr = "203.0.113.8".parse().unwrap();
        let base = device_fingerprint("Mozilla/5.0", ip);
        assert_ne!(base, device_fingerprint("curl/8.0", ip));
        assert_ne!(base, device_fingerprint("Mozilla/5.0", other_ip));
    }

    #[test]
    fn test_private_ranges() {
        for private in ["10.1.2.3", "192.168.0.10", "172.16.5.4", "127.0.0.1", "::1", "fd00::1", "fe80::1"] {
            let ip: IpAddr = private.parse().unwrap();
            assert!(is_private_ip(ip), "{private} should be private");
        }
        for public in ["8.8.8.8", "203.0.113.7", "2001:db8::1"] {
            let ip: IpAddr = public.parse().unwrap();
            assert!(!is_private_ip(ip), "{public} should be public");
        }
    }
}
