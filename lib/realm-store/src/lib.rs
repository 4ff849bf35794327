//! Realm store implementations
pub mod memory;
pub mod yaml;

pub use memory::MemoryStore;
pub use yaml::YamlFileStore;

#[cfg(test)]
pub(crate) mod tests {
    use realm_core::RealmRow;

    pub(crate) fn row(id: u32, name: &str, builds: &str) -> RealmRow {
        RealmRow {
            id,
            name: name.to_string(),
            address: "127.0.0.1".to_string(),
            local_address: "127.0.0.1".to_string(),
            local_subnet_mask: "255.0.0.0".to_string(),
            port: 8085,
            icon: 0,
            realmflags: 0,
            timezone: 1,
            allowed_security_level: 0,
            population: 0.0,
            realmbuilds: builds.to_string(),
        }
    }
}
