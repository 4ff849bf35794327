//! Core realm directory functionality
//!
//! This library provides:
//! - The catalog of supported client builds and their protocol eras
//! - The realm data model and the persistent store contract
//! - The realm registry, refreshed from the store and partitioned by era

pub mod client_build;
pub mod endpoint;
pub mod era;
pub mod error;
pub mod realm;
pub mod registry;
pub mod store;

pub use client_build::{find_build_info, BuildInfo};
pub use endpoint::RealmEndpoints;
pub use era::{classify, ProtocolEra};
pub use error::{CoreError, EndpointError, Result, StoreError};
pub use realm::{Realm, RealmFlags, SecurityLevel};
pub use registry::{RealmRegistry, RealmSnapshot, ReloadReport};
pub use store::{RealmRow, RealmStore};
