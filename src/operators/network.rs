//! Network operators (@ipMatch, @ipMatchFromFile, @rbl, @geoLookup).

use super::traits::{Operator, OperatorResult};
use crate::engine::Transaction;
use crate::error::{Error, Result};
use ipnetwork::IpNetwork;
use std::net::{IpAddr, ToSocketAddrs};

/// IP/CIDR list operator (@ipMatch).
pub struct IpMatchOperator {
    networks: Vec<IpNetwork>,
}

impl IpMatchOperator {
    /// Build from a whitespace- or comma-separated IP/CIDR list.
    pub fn new(list: &str) -> Result<Self> {
        let entries = list
            .split(|c: char| c.is_ascii_whitespace() || c == ',')
            .map(str::trim)
            .filter(|s| !s.is_empty());
        Self::from_entries(entries, list)
    }

    /// Build from a file: one IP/CIDR per line, `#` comments skipped.
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileLoad {
            path: path.into(),
            source: e,
        })?;
        let entries: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string)
            .collect();
        Self::from_entries(entries.iter().map(|s| s.as_str()), path)
    }

    fn from_entries<'a>(
        entries: impl Iterator<Item = &'a str>,
        context: &str,
    ) -> Result<Self> {
        let mut networks = Vec::new();
        for entry in entries {
            networks.push(parse_network(entry).ok_or_else(|| Error::InvalidIp {
                value: context.to_string(),
                message: format!("cannot parse '{entry}'"),
            })?);
        }
        if networks.is_empty() {
            return Err(Error::InvalidIp {
                value: context.to_string(),
                message: "empty network list".to_string(),
            });
        }
        Ok(Self { networks })
    }
}

/// Parse a CIDR or a bare address (implied /32 or /128).
fn parse_network(s: &str) -> Option<IpNetwork> {
    if s.contains('/') {
        return s.parse().ok();
    }
    let ip: IpAddr = s.parse().ok()?;
    IpNetwork::new(ip, if ip.is_ipv4() { 32 } else { 128 }).ok()
}

impl Operator for IpMatchOperator {
    fn evaluate(&self, _tx: &Transaction, value: &str) -> OperatorResult {
        let Ok(ip) = value.trim().parse::<IpAddr>() else {
            return OperatorResult::no_match();
        };
        if self.networks.iter().any(|net| net.contains(ip)) {
            OperatorResult::matched(value.trim())
        } else {
            OperatorResult::no_match()
        }
    }

    fn name(&self) -> &'static str {
        "ipMatch"
    }
}

/// DNS block-list operator (@rbl).
///
/// Reverses the address octets under the configured zone and matches when
/// the name resolves. Resolution can block; callers schedule accordingly.
pub struct RblOperator {
    zone: String,
}

impl RblOperator {
    pub fn new(zone: &str) -> Result<Self> {
        if zone.trim().is_empty() {
            return Err(Error::config("rbl requires a zone argument"));
        }
        Ok(Self {
            zone: zone.trim().trim_end_matches('.').to_string(),
        })
    }

    /// The DNS name queried for a given address, if the address is IPv4.
    pub fn query_name(&self, value: &str) -> Option<String> {
        match value.trim().parse::<IpAddr>() {
            Ok(IpAddr::V4(v4)) => {
                let o = v4.octets();
                Some(format!("{}.{}.{}.{}.{}", o[3], o[2], o[1], o[0], self.zone))
            }
            _ => None,
        }
    }
}

impl Operator for RblOperator {
    fn evaluate(&self, _tx: &Transaction, value: &str) -> OperatorResult {
        let Some(name) = self.query_name(value) else {
            return OperatorResult::no_match();
        };
        // Listed addresses resolve (conventionally to 127.0.0.x).
        match (name.as_str(), 0u16).to_socket_addrs() {
            Ok(mut addrs) => {
                if addrs.next().is_some() {
                    OperatorResult::matched(name)
                } else {
                    OperatorResult::no_match()
                }
            }
            _ => OperatorResult::no_match(),
        }
    }

    fn name(&self) -> &'static str {
        "rbl"
    }
}

/// Geographic lookup operator (@geoLookup).
///
/// Resolves the value through the GEO collection. Without a geo database
/// wired into the deployment the collection stays empty and the operator
/// never matches; it logs once so operators notice the missing database.
pub struct GeoLookupOperator;

impl Operator for GeoLookupOperator {
    fn evaluate(&self, tx: &Transaction, value: &str) -> OperatorResult {
        if tx.geo_data().is_empty() {
            static WARNED: std::sync::Once = std::sync::Once::new();
            WARNED.call_once(|| {
                tracing::warn!("geoLookup evaluated without a geo database; matching nothing");
            });
            return OperatorResult::no_match();
        }
        if value.trim().parse::<IpAddr>().is_ok() {
            OperatorResult::matched(value.trim())
        } else {
            OperatorResult::no_match()
        }
    }

    fn name(&self) -> &'static str {
        "geoLookup"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Waf;

    fn tx() -> Transaction {
        Waf::from_directives("").unwrap().new_transaction()
    }

    #[test]
    fn test_ip_match_single() {
        let op = IpMatchOperator::new("192.168.1.1").unwrap();
        assert!(op.evaluate(&tx(), "192.168.1.1").matched);
        assert!(!op.evaluate(&tx(), "192.168.1.2").matched);
    }

    #[test]
    fn test_ip_match_cidr_and_list() {
        let op = IpMatchOperator::new("10.0.0.0/8, 192.168.0.0/16").unwrap();
        assert!(op.evaluate(&tx(), "10.1.2.3").matched);
        assert!(op.evaluate(&tx(), "192.168.1.1").matched);
        assert!(!op.evaluate(&tx(), "172.16.0.1").matched);
    }

    #[test]
    fn test_ip_match_ipv6() {
        let op = IpMatchOperator::new("2001:db8::/32").unwrap();
        assert!(op.evaluate(&tx(), "2001:db8::1").matched);
        assert!(!op.evaluate(&tx(), "2001:db9::1").matched);
    }

    #[test]
    fn test_ip_match_non_ip_value() {
        let op = IpMatchOperator::new("10.0.0.0/8").unwrap();
        assert!(!op.evaluate(&tx(), "not-an-ip").matched);
    }

    #[test]
    fn test_ip_match_bad_config() {
        assert!(IpMatchOperator::new("not-an-ip").is_err());
        assert!(IpMatchOperator::new("").is_err());
    }

    #[test]
    fn test_rbl_query_name() {
        let op = RblOperator::new("zen.spamhaus.org").unwrap();
        assert_eq!(
            op.query_name("127.0.0.2").as_deref(),
            Some("2.0.0.127.zen.spamhaus.org")
        );
        assert_eq!(op.query_name("not-an-ip"), None);
    }

    #[test]
    fn test_geo_lookup_without_database() {
        let op = GeoLookupOperator;
        assert!(!op.evaluate(&tx(), "8.8.8.8").matched);
    }
}
