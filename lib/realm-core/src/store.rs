//! Persistent store contract for realm configuration rows

use crate::error::StoreError;
use crate::realm::RealmFlags;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One stored realm configuration row, as written by operators
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmRow {
    pub id: u32,
    pub name: String,
    pub address: String,
    #[serde(default = "default_local_address")]
    pub local_address: String,
    #[serde(default = "default_subnet_mask")]
    pub local_subnet_mask: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub icon: u8,
    #[serde(default)]
    pub realmflags: u8,
    #[serde(default)]
    pub timezone: u8,
    #[serde(default)]
    pub allowed_security_level: u8,
    #[serde(default)]
    pub population: f32,
    #[serde(default)]
    pub realmbuilds: String,
}

fn default_local_address() -> String {
    "127.0.0.1".to_string()
}

fn default_subnet_mask() -> String {
    "255.255.255.0".to_string()
}

fn default_port() -> u16 {
    8085
}

impl RealmRow {
    /// Rows flagged with a version mismatch are never handed to the registry.
    pub fn is_loadable(&self) -> bool {
        self.realmflags & RealmFlags::INVALID.bits() == 0
    }
}

/// Apply the query contract to raw rows: drop unloadable rows and order by name.
pub fn select_loadable(rows: impl IntoIterator<Item = RealmRow>) -> Vec<RealmRow> {
    let mut rows: Vec<RealmRow> = rows.into_iter().filter(RealmRow::is_loadable).collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    rows
}

/// Source of realm rows.
///
/// Implementations must exclude rows with the `INVALID` (0x01) flag bit and
/// return the rest ordered by name ascending.
#[async_trait]
pub trait RealmStore: Send + Sync {
    async fn load_realms(&self) -> Result<Vec<RealmRow>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: u32, name: &str, realmflags: u8) -> RealmRow {
        RealmRow {
            id,
            name: name.to_string(),
            address: "127.0.0.1".to_string(),
            local_address: default_local_address(),
            local_subnet_mask: default_subnet_mask(),
            port: default_port(),
            icon: 0,
            realmflags,
            timezone: 0,
            allowed_security_level: 0,
            population: 0.0,
            realmbuilds: "12340".to_string(),
        }
    }

    #[test]
    fn test_select_loadable_filters_and_sorts() {
        let rows = select_loadable(vec![
            row(1, "Zul", 0),
            row(2, "Broken", 0x01),
            row(3, "Alpha", 0x02),
            row(4, "Mid", 0x03),
        ]);
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Zul"]);
    }

    #[test]
    fn test_row_defaults_from_yaml() {
        let row: RealmRow =
            serde_yaml::from_str("id: 7\nname: Test\naddress: 10.0.0.1\nrealmbuilds: \"5875\"\n")
                .expect("valid row");
        assert_eq!(row.port, 8085);
        assert_eq!(row.local_address, "127.0.0.1");
        assert_eq!(row.local_subnet_mask, "255.255.255.0");
        assert_eq!(row.realmbuilds, "5875");
        assert!(row.is_loadable());
    }
}
