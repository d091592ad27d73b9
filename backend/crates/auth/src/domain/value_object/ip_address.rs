//! Client IP address as seen by the transport layer

use kernel::error::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IpAddress(IpAddr);

impl IpAddress {
    pub fn parse(raw: &str) -> AppResult<Self> {
        raw.trim()
            .parse::<IpAddr>()
            .map(Self)
            .map_err(|e| {
                AppError::bad_request("Invalid IP address")
                    .with_code("INVALID_IP_ADDRESS")
                    .with_source(e)
            })
    }

    #[inline]
    pub fn addr(&self) -> IpAddr {
        self.0
    }

    /// Private, loopback or link-local
    pub fn is_private(&self) -> bool {
        platform::client::is_private_ip(self.0)
    }
}

impl From<IpAddr> for IpAddress {
    fn from(addr: IpAddr) -> Self {
        Self(addr)
    }
}

impl fmt::Display for IpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(IpAddress::parse(" 203.0.113.9 ").unwrap().to_string(), "203.0.113.9");
        assert!(IpAddress::parse("2001:db8::1").is_ok());
        assert_eq!(IpAddress::parse("not-an-ip").unwrap_err().status_code(), 400);
    }

    #[test]
    fn test_is_private() {
        assert!(IpAddress::parse("10.0.0.1").unwrap().is_private());
        assert!(!IpAddress::parse("8.8.8.8").unwrap().is_private());
    }
}
