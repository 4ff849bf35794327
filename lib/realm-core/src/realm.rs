//! Realm data model

use crate::client_build::BuildInfo;
use crate::era::{classify, ProtocolEra};
use bitflags::bitflags;
use ipnetwork::Ipv4Network;
use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

bitflags! {
    /// Realm flags as understood by the authentication protocol
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct RealmFlags: u8 {
        /// Version mismatch; rows carrying it are never loaded
        const INVALID = 0x01;
        const OFFLINE = 0x02;
        const SPECIFIC_BUILD = 0x04;
        const NEW_PLAYERS = 0x20;
        const RECOMMENDED = 0x40;
        const FULL = 0x80;
    }
}

impl RealmFlags {
    /// Flags an operator may set on a stored realm row.
    pub const STORABLE: RealmFlags = RealmFlags::OFFLINE
        .union(RealmFlags::SPECIFIC_BUILD)
        .union(RealmFlags::NEW_PLAYERS)
        .union(RealmFlags::RECOMMENDED);

    /// Split raw stored flags into the storable part and the rejected bits.
    pub fn mask_stored(raw: u8) -> (RealmFlags, u8) {
        let rejected = raw & !Self::STORABLE.bits();
        (RealmFlags::from_bits_retain(raw) & Self::STORABLE, rejected)
    }
}

/// Minimum account security level required to enter a realm
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum SecurityLevel {
    Player = 0,
    Moderator = 1,
    GameMaster = 2,
    Administrator = 3,
}

impl SecurityLevel {
    /// Convert a stored level, clamping anything above `Administrator`.
    pub fn clamped(raw: u8) -> SecurityLevel {
        match raw {
            0 => SecurityLevel::Player,
            1 => SecurityLevel::Moderator,
            2 => SecurityLevel::GameMaster,
            _ => SecurityLevel::Administrator,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// A game server instance as listed to clients
#[derive(Clone, Debug, PartialEq)]
pub struct Realm {
    pub id: u32,
    pub name: String,
    pub external_address: SocketAddr,
    pub local_address: SocketAddr,
    pub local_subnet_mask: Ipv4Addr,
    pub icon: u8,
    pub timezone: u8,
    pub flags: RealmFlags,
    pub allowed_security_level: SecurityLevel,
    pub population: f32,
    pub supported_builds: BTreeSet<u32>,
    /// Catalog entry for the lowest supported build, or a zeroed placeholder
    pub build_info: BuildInfo,
}

impl Realm {
    /// Lowest supported build, 0 when none
    pub fn primary_build(&self) -> u32 {
        self.supported_builds.first().copied().unwrap_or(0)
    }

    /// Whether the realm appears in any era listing
    pub fn is_listed(&self) -> bool {
        self.primary_build() != 0
    }

    pub fn era(&self) -> ProtocolEra {
        classify(self.primary_build())
    }

    pub fn supports_build(&self, build: u32) -> bool {
        self.supported_builds.contains(&build)
    }

    /// Flags to advertise to a client running `build`.
    pub fn flags_for_client(&self, build: u32) -> RealmFlags {
        if self.supports_build(build) {
            self.flags
        } else {
            self.flags | RealmFlags::INVALID
        }
    }

    /// Name shown in the realm list, with the version appended for
    /// realms pinned to a specific build.
    pub fn list_name(&self) -> String {
        if self.flags.contains(RealmFlags::SPECIFIC_BUILD) && self.build_info.major_version != 0 {
            format!(
                "{} ({}.{}.{})",
                self.name,
                self.build_info.major_version,
                self.build_info.minor_version,
                self.build_info.bugfix_version
            )
        } else {
            self.name.clone()
        }
    }

    /// Pick the address a client at `client` should connect to.
    pub fn address_for_client(&self, client: Ipv4Addr) -> SocketAddr {
        if client.is_loopback() {
            // realm on the same host as the client
            if self.local_address.ip().is_loopback() || self.external_address.ip().is_loopback() {
                return SocketAddr::new(IpAddr::V4(client), self.local_address.port());
            }
            return self.local_address;
        }

        if let IpAddr::V4(local) = self.local_address.ip() {
            if let Ok(network) = Ipv4Network::with_netmask(local, self.local_subnet_mask) {
                if network.contains(client) {
                    return self.local_address;
                }
            }
        }

        self.external_address
    }
}

/// Parse a whitespace separated build list.
///
/// Each token contributes its leading decimal digits; a token without any
/// (or one that overflows) counts as build 0, which keeps the realm out of
/// every era listing.
pub fn parse_builds(builds: &str) -> BTreeSet<u32> {
    builds.split_whitespace().map(parse_build_token).collect()
}

fn parse_build_token(token: &str) -> u32 {
    let token = token.strip_prefix('+').unwrap_or(token);
    let digits = token
        .find(|c: char| !c.is_ascii_digit())
        .map_or(token, |end| &token[..end]);
    digits.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn realm(builds: &str) -> Realm {
        Realm {
            id: 1,
            name: "Azeroth".to_string(),
            external_address: "203.0.113.7:8085".parse().unwrap(),
            local_address: "192.168.1.10:8085".parse().unwrap(),
            local_subnet_mask: Ipv4Addr::new(255, 255, 255, 0),
            icon: 0,
            timezone: 1,
            flags: RealmFlags::empty(),
            allowed_security_level: SecurityLevel::Player,
            population: 0.5,
            supported_builds: parse_builds(builds),
            build_info: BuildInfo::placeholder(0),
        }
    }

    #[test]
    fn test_mask_stored_flags() {
        let (flags, rejected) = RealmFlags::mask_stored(0xFF);
        assert_eq!(flags.bits(), 0x66);
        assert_eq!(flags, RealmFlags::STORABLE);
        assert_eq!(rejected, 0x99);

        let (flags, rejected) = RealmFlags::mask_stored(0x22);
        assert_eq!(flags, RealmFlags::OFFLINE | RealmFlags::NEW_PLAYERS);
        assert_eq!(rejected, 0);
    }

    #[test]
    fn test_security_level_clamped() {
        assert_eq!(SecurityLevel::clamped(0), SecurityLevel::Player);
        assert_eq!(SecurityLevel::clamped(2), SecurityLevel::GameMaster);
        assert_eq!(SecurityLevel::clamped(3), SecurityLevel::Administrator);
        assert_eq!(SecurityLevel::clamped(4), SecurityLevel::Administrator);
        assert_eq!(SecurityLevel::clamped(255), SecurityLevel::Administrator);
    }

    #[test]
    fn test_parse_builds() {
        assert_eq!(parse_builds("12340 11723"), BTreeSet::from([11723, 12340]));
        assert_eq!(parse_builds("  5875   6005 5875 "), BTreeSet::from([5875, 6005]));
        assert!(parse_builds("").is_empty());
        assert!(parse_builds("   ").is_empty());
    }

    #[test]
    fn test_parse_builds_is_lenient() {
        assert_eq!(parse_builds("abc"), BTreeSet::from([0]));
        assert_eq!(parse_builds("12340a"), BTreeSet::from([12340]));
        assert_eq!(parse_builds("-5 8606"), BTreeSet::from([0, 8606]));
        assert_eq!(parse_builds("+8606"), BTreeSet::from([8606]));
        assert_eq!(parse_builds("99999999999"), BTreeSet::from([0]));
    }

    #[test]
    fn test_primary_build_and_listing() {
        assert_eq!(realm("12340 11723").primary_build(), 11723);
        assert!(realm("12340").is_listed());
        assert!(!realm("").is_listed());
        // a junk token parses as 0 and hides the realm
        assert!(!realm("junk 12340").is_listed());
        assert_eq!(realm("8606").era(), ProtocolEra::BurningCrusade);
    }

    #[test]
    fn test_flags_for_client() {
        let r = realm("12340");
        assert_eq!(r.flags_for_client(12340), RealmFlags::empty());
        assert_eq!(r.flags_for_client(8606), RealmFlags::INVALID);
    }

    #[test]
    fn test_list_name() {
        let mut r = realm("12340");
        assert_eq!(r.list_name(), "Azeroth");

        r.flags = RealmFlags::SPECIFIC_BUILD;
        // unknown version, nothing to append
        assert_eq!(r.list_name(), "Azeroth");

        r.build_info = *crate::client_build::find_build_info(12340).unwrap();
        assert_eq!(r.list_name(), "Azeroth (3.3.5)");
    }

    #[test]
    fn test_address_for_client() {
        let r = realm("12340");
        assert_eq!(
            r.address_for_client(Ipv4Addr::new(192, 168, 1, 77)),
            r.local_address
        );
        assert_eq!(
            r.address_for_client(Ipv4Addr::new(198, 51, 100, 2)),
            r.external_address
        );
        assert_eq!(r.address_for_client(Ipv4Addr::LOCALHOST), r.local_address);
    }

    #[test]
    fn test_address_for_loopback_realm() {
        let mut r = realm("12340");
        r.local_address = "127.0.0.1:8085".parse().unwrap();
        assert_eq!(
            r.address_for_client(Ipv4Addr::new(127, 0, 0, 2)),
            "127.0.0.2:8085".parse::<SocketAddr>().unwrap()
        );
    }
}
