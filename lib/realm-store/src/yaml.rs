//! Realm list kept in a YAML file
//!
//! ```yaml
//! realms:
//!   - id: 1
//!     name: Northrend
//!     address: realm.example.org
//!     localAddress: 192.168.1.10
//!     localSubnetMask: 255.255.255.0
//!     port: 8085
//!     realmflags: 64
//!     allowedSecurityLevel: 0
//!     population: 0.5
//!     realmbuilds: "12340"
//! ```

use async_trait::async_trait;
use realm_core::store::select_loadable;
use realm_core::{RealmRow, RealmStore, StoreError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
struct RealmListFile {
    #[serde(default)]
    realms: Vec<RealmRow>,
}

/// YamlFileStore re-reads its file on every load, so edits are picked up
/// on the next refresh
pub struct YamlFileStore {
    path: PathBuf,
}

impl YamlFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse realm rows from YAML text, applying the store query contract
    pub fn parse(contents: &str) -> Result<Vec<RealmRow>, StoreError> {
        let file: Option<RealmListFile> =
            serde_yaml::from_str(contents).map_err(|e| StoreError::Parse(e.to_string()))?;
        Ok(select_loadable(file.unwrap_or_default().realms))
    }
}

#[async_trait]
impl RealmStore for YamlFileStore {
    async fn load_realms(&self) -> Result<Vec<RealmRow>, StoreError> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let rows = Self::parse(&contents)?;
        debug!("Loaded {} realm rows from {}", rows.len(), self.path.display());
        Ok(rows)
    }
}
