//! Catalog of client builds known to the realm service
//!
//! The catalog is ordered from the highest build to the lowest. The first
//! entry doubles as an open upper bound: any newer build is treated as that
//! entry so untested clients can still log in. Every other entry requires an
//! exact match.

use std::fmt;

/// Length of the executable and library fingerprints sent by clients.
pub const HASH_LEN: usize = 20;

/// Version data for a single client build
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildInfo {
    pub build: u32,
    pub major_version: u8,
    pub minor_version: u8,
    pub bugfix_version: u8,
    /// `' '` when the release has no hotfix letter
    pub hotfix_version: char,
    pub exe_hash: Option<[u8; HASH_LEN]>,
    pub dll_hash: Option<[u8; HASH_LEN]>,
}

impl BuildInfo {
    const fn new(build: u32, major: u8, minor: u8, bugfix: u8, hotfix: char) -> Self {
        Self {
            build,
            major_version: major,
            minor_version: minor,
            bugfix_version: bugfix,
            hotfix_version: hotfix,
            exe_hash: None,
            dll_hash: None,
        }
    }

    const fn with_exe_hash(mut self, hash: [u8; HASH_LEN]) -> Self {
        self.exe_hash = Some(hash);
        self
    }

    const fn with_dll_hash(mut self, hash: [u8; HASH_LEN]) -> Self {
        self.dll_hash = Some(hash);
        self
    }

    /// Zeroed entry used for realms whose lowest build is not in the catalog.
    pub fn placeholder(build: u32) -> Self {
        Self::new(build, 0, 0, 0, ' ')
    }

    /// Human readable version, e.g. `3.3.5a`
    pub fn version_string(&self) -> String {
        let mut version = format!(
            "{}.{}.{}",
            self.major_version, self.minor_version, self.bugfix_version
        );
        if self.hotfix_version != ' ' {
            version.push(self.hotfix_version);
        }
        version
    }

    /// True if no executable fingerprint is recorded or `hash` matches it.
    pub fn accepts_exe_hash(&self, hash: &[u8; HASH_LEN]) -> bool {
        self.exe_hash.map_or(true, |expected| &expected == hash)
    }

    /// True if no library fingerprint is recorded or `hash` matches it.
    pub fn accepts_dll_hash(&self, hash: &[u8; HASH_LEN]) -> bool {
        self.dll_hash.map_or(true, |expected| &expected == hash)
    }

    pub fn exe_hash_hex(&self) -> Option<String> {
        self.exe_hash.map(hex::encode_upper)
    }

    pub fn dll_hash_hex(&self) -> Option<String> {
        self.dll_hash.map(hex::encode_upper)
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (build {})", self.version_string(), self.build)
    }
}

/// Known client builds, highest first.
pub static CLIENT_BUILDS: &[BuildInfo] = &[
    // also accepts every build above it
    BuildInfo::new(18414, 5, 4, 8, ' '),
    BuildInfo::new(18273, 5, 4, 8, ' '),
    BuildInfo::new(15595, 4, 3, 4, ' '),
    // 3.3.5a China Mainland
    BuildInfo::new(13930, 3, 3, 5, 'a'),
    BuildInfo::new(12340, 3, 3, 5, 'a')
        .with_exe_hash([
            0xCD, 0xCB, 0xBD, 0x51, 0x88, 0x31, 0x5E, 0x6B, 0x4D, 0x19, 0x44, 0x9D, 0x49, 0x2D,
            0xBC, 0xFA, 0xF1, 0x56, 0xA3, 0x47,
        ])
        .with_dll_hash([
            0xB7, 0x06, 0xD1, 0x3F, 0xF2, 0xF4, 0x01, 0x88, 0x39, 0x72, 0x94, 0x61, 0xE3, 0xF8,
            0xA0, 0xE2, 0xB5, 0xFD, 0xC0, 0x34,
        ]),
    BuildInfo::new(11723, 3, 3, 3, 'a'),
    BuildInfo::new(11403, 3, 3, 2, ' '),
    BuildInfo::new(11159, 3, 3, 0, 'a'),
    BuildInfo::new(10505, 3, 2, 2, 'a'),
    BuildInfo::new(8606, 2, 4, 3, ' ').with_exe_hash([
        0x31, 0x9A, 0xFA, 0xA3, 0xF2, 0x55, 0x96, 0x82, 0xF9, 0xFF, 0x65, 0x8B, 0xE0, 0x14, 0x56,
        0x25, 0x5F, 0x45, 0x6F, 0xB1,
    ]),
    BuildInfo::new(6141, 1, 12, 3, ' '),
    BuildInfo::new(6005, 1, 12, 2, ' '),
    BuildInfo::new(5875, 1, 12, 1, ' ').with_dll_hash([
        0x8D, 0x17, 0x3C, 0xC3, 0x81, 0x96, 0x1E, 0xEB, 0xAB, 0xF3, 0x36, 0xF5, 0xE6, 0x67, 0x5B,
        0x10, 0x1B, 0xB5, 0x13, 0xE5,
    ]),
    BuildInfo::new(5464, 1, 11, 2, ' '),
    BuildInfo::new(5302, 1, 10, 2, ' '),
    BuildInfo::new(5086, 1, 9, 4, ' '),
];

/// Find the catalog entry for a client build.
///
/// Builds at or above the newest entry resolve to that entry; anything
/// else must match exactly. Unknown builds yield `None` and the caller
/// decides whether to reject the client.
pub fn find_build_info(build: u32) -> Option<&'static BuildInfo> {
    let (newest, rest) = CLIENT_BUILDS.split_first()?;
    if build >= newest.build {
        return Some(newest);
    }

    rest.iter().find(|info| info.build == build)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_sorted_descending() {
        assert!(CLIENT_BUILDS.windows(2).all(|w| w[0].build > w[1].build));
    }

    #[test]
    fn test_newest_build_is_open_upper_bound() {
        let newest = &CLIENT_BUILDS[0];
        for build in [18414, 18415, 21742, 40000, u32::from(u16::MAX), u32::MAX] {
            assert_eq!(find_build_info(build), Some(newest));
        }
    }

    #[test]
    fn test_exact_match_below_newest() {
        for info in &CLIENT_BUILDS[1..] {
            let found = find_build_info(info.build).expect("catalog build");
            assert_eq!(found, info);
        }
    }

    #[test]
    fn test_unknown_build() {
        assert_eq!(find_build_info(0), None);
        assert_eq!(find_build_info(9999), None);
        assert_eq!(find_build_info(12341), None);
        assert_eq!(find_build_info(18413), None);
    }

    #[test]
    fn test_version_string() {
        assert_eq!(find_build_info(12340).unwrap().version_string(), "3.3.5a");
        assert_eq!(find_build_info(8606).unwrap().version_string(), "2.4.3");
        assert_eq!(BuildInfo::placeholder(9999).version_string(), "0.0.0");
        assert_eq!(
            find_build_info(5875).unwrap().to_string(),
            "1.12.1 (build 5875)"
        );
    }

    #[test]
    fn test_hash_checks() {
        let wotlk = find_build_info(12340).unwrap();
        let exe = wotlk.exe_hash.unwrap();
        assert!(wotlk.accepts_exe_hash(&exe));
        assert!(!wotlk.accepts_exe_hash(&[0u8; HASH_LEN]));
        assert_eq!(
            wotlk.exe_hash_hex().as_deref(),
            Some("CDCBBD5188315E6B4D19449D492DBCFAF156A347")
        );

        // no fingerprint recorded, nothing to check
        let cata = find_build_info(15595).unwrap();
        assert!(cata.accepts_exe_hash(&[0u8; HASH_LEN]));
        assert!(cata.accepts_dll_hash(&[0xFF; HASH_LEN]));
        assert_eq!(cata.dll_hash_hex(), None);
    }
}
