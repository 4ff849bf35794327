//! Realm registry: the realm list served to authentication clients
//!
//! Every refresh reads the whole realm table, builds a fresh
//! [`RealmSnapshot`] off to the side and publishes it with a single atomic
//! swap. Readers never observe a half-built list, and a failed refresh
//! leaves the previous snapshot in place.

use crate::client_build::{find_build_info, BuildInfo};
use crate::endpoint::RealmEndpoints;
use crate::era::{classify, ProtocolEra};
use crate::realm::{parse_builds, Realm, RealmFlags, SecurityLevel};
use crate::store::{RealmRow, RealmStore};
use crate::Result;
use arc_swap::ArcSwap;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Data-quality findings from one reload
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReloadReport {
    /// Rows returned by the store
    pub rows: usize,
    /// Realms in the published snapshot
    pub loaded: usize,
    /// Loaded realms without a usable build, absent from every era
    pub unlisted: usize,
    /// Rows whose flags carried bits an operator may not set
    pub masked_flags: usize,
    /// Rows whose security level was above `Administrator`
    pub clamped_security: usize,
    /// Rows dropped because an endpoint could not be resolved
    pub skipped_endpoints: usize,
}

/// Immutable view of the realm list produced by one refresh
#[derive(Debug)]
pub struct RealmSnapshot {
    realms: BTreeMap<String, Arc<Realm>>,
    by_era: [Vec<Arc<Realm>>; ProtocolEra::COUNT],
    report: ReloadReport,
    loaded_at: DateTime<Utc>,
}

impl RealmSnapshot {
    fn empty() -> Self {
        Self::from_realms(BTreeMap::new(), ReloadReport::default())
    }

    /// Derive the era partitions from the name map. Realms keep name order
    /// within each era.
    fn from_realms(realms: BTreeMap<String, Arc<Realm>>, report: ReloadReport) -> Self {
        let mut by_era: [Vec<Arc<Realm>>; ProtocolEra::COUNT] =
            std::array::from_fn(|_| Vec::new());
        for realm in realms.values().filter(|realm| realm.is_listed()) {
            by_era[realm.era().index()].push(Arc::clone(realm));
        }

        Self {
            realms,
            by_era,
            report,
            loaded_at: Utc::now(),
        }
    }

    /// Look up a realm by name
    pub fn realm(&self, name: &str) -> Option<&Arc<Realm>> {
        self.realms.get(name)
    }

    /// All loaded realms, listed or not, in name order
    pub fn realms(&self) -> impl Iterator<Item = &Arc<Realm>> {
        self.realms.values()
    }

    pub fn for_era(&self, era: ProtocolEra) -> &[Arc<Realm>] {
        self.by_era
            .get(era.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Realms visible to a client running `build`
    pub fn for_build(&self, build: u32) -> &[Arc<Realm>] {
        self.for_era(classify(build))
    }

    pub fn len(&self) -> usize {
        self.realms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.realms.is_empty()
    }

    /// Number of realms present in some era partition
    pub fn listed_len(&self) -> usize {
        self.by_era.iter().map(Vec::len).sum()
    }

    pub fn report(&self) -> ReloadReport {
        self.report
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

/// RealmRegistry keeps the current realm list and refreshes it from a store
pub struct RealmRegistry {
    store: Arc<dyn RealmStore>,
    snapshot: ArcSwap<RealmSnapshot>,
    refresh_interval: u32,
    /// Unix seconds of the next due refresh
    next_refresh: AtomicI64,
    /// Serializes writers so a slow reload cannot publish over a newer one
    reload_lock: Mutex<()>,
}

impl RealmRegistry {
    /// Load the realm list for the first time.
    ///
    /// `refresh_interval` is in seconds; 0 disables periodic refresh. The
    /// initial load is unconditional and a store failure here is returned
    /// to the caller.
    pub async fn initialize(store: Arc<dyn RealmStore>, refresh_interval: u32) -> Result<Self> {
        let now = Utc::now().timestamp();
        let registry = Self {
            store,
            snapshot: ArcSwap::from_pointee(RealmSnapshot::empty()),
            refresh_interval,
            next_refresh: AtomicI64::new(now + i64::from(refresh_interval)),
            reload_lock: Mutex::new(()),
        };

        registry.load(true).await?;
        Ok(registry)
    }

    /// Refresh the realm list if periodic refresh is enabled and due.
    ///
    /// Cheap enough to call on every incoming connection. Returns the
    /// reload report when a new snapshot was published.
    pub async fn maybe_refresh(&self) -> Result<Option<ReloadReport>> {
        self.maybe_refresh_at(Utc::now().timestamp()).await
    }

    pub(crate) async fn maybe_refresh_at(&self, now: i64) -> Result<Option<ReloadReport>> {
        if self.refresh_interval == 0 {
            return Ok(None);
        }

        let due = self.next_refresh.load(Ordering::Acquire);
        if due > now {
            return Ok(None);
        }

        // Only the caller that moves the deadline forward reloads
        let next = now + i64::from(self.refresh_interval);
        if self
            .next_refresh
            .compare_exchange(due, next, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(None);
        }

        self.load(false).await.map(Some)
    }

    /// Reload the realm list now, regardless of the refresh schedule.
    pub async fn reload(&self) -> Result<ReloadReport> {
        self.load(false).await
    }

    async fn load(&self, init: bool) -> Result<ReloadReport> {
        // held from the store query until the snapshot is published
        let _writer = self.reload_lock.lock().await;
        debug!("Updating realm list...");

        let rows = self.store.load_realms().await?;
        let snapshot = build_snapshot(rows, init).await;
        let report = snapshot.report();
        self.snapshot.store(Arc::new(snapshot));

        debug!(
            "Realm list updated: {} realms, {} unlisted, {} skipped",
            report.loaded, report.unlisted, report.skipped_endpoints
        );
        Ok(report)
    }

    /// Current snapshot, for consistent multi-step reads
    pub fn snapshot(&self) -> Arc<RealmSnapshot> {
        self.snapshot.load_full()
    }

    pub fn build_to_era(&self, build: u32) -> ProtocolEra {
        classify(build)
    }

    /// Realms a client running `build` may see, in name order
    pub fn realms_for_build(&self, build: u32) -> Vec<Arc<Realm>> {
        self.snapshot.load().for_build(build).to_vec()
    }

    pub fn count_for_build(&self, build: u32) -> usize {
        self.snapshot.load().for_build(build).len()
    }

    pub fn realm(&self, name: &str) -> Option<Arc<Realm>> {
        self.snapshot.load().realm(name).cloned()
    }

    pub fn refresh_interval(&self) -> u32 {
        self.refresh_interval
    }

    /// When the next periodic refresh becomes due, if refresh is enabled
    pub fn next_refresh_at(&self) -> Option<DateTime<Utc>> {
        if self.refresh_interval == 0 {
            return None;
        }
        Utc.timestamp_opt(self.next_refresh.load(Ordering::Acquire), 0)
            .single()
    }
}

async fn build_snapshot(rows: Vec<RealmRow>, init: bool) -> RealmSnapshot {
    let mut report = ReloadReport {
        rows: rows.len(),
        ..ReloadReport::default()
    };
    let mut realms = BTreeMap::new();

    for row in rows {
        let Some(realm) = load_row(row, &mut report).await else {
            continue;
        };

        if init {
            info!("Added realm id {}, name '{}'", realm.id, realm.name);
        }
        realms.insert(realm.name.clone(), Arc::new(realm));
    }

    report.loaded = realms.len();
    report.unlisted = realms.values().filter(|realm| !realm.is_listed()).count();
    RealmSnapshot::from_realms(realms, report)
}

async fn load_row(row: RealmRow, report: &mut ReloadReport) -> Option<Realm> {
    let (flags, rejected) = RealmFlags::mask_stored(row.realmflags);
    if rejected != 0 {
        warn!(
            "Realm (id {}, name '{}') can only be flagged as OFFLINE (mask 0x02), \
             NEW_PLAYERS (mask 0x20), RECOMMENDED (mask 0x40), or SPECIFIC_BUILD (mask 0x04); \
             ignoring bits 0x{:02X}",
            row.id, row.name, rejected
        );
        report.masked_flags += 1;
    }

    let allowed_security_level = SecurityLevel::clamped(row.allowed_security_level);
    if row.allowed_security_level > SecurityLevel::Administrator.as_u8() {
        warn!(
            "Realm (id {}, name '{}') allowedSecurityLevel {} is above administrator, clamping",
            row.id, row.name, row.allowed_security_level
        );
        report.clamped_security += 1;
    }

    let supported_builds = parse_builds(&row.realmbuilds);
    let primary_build = supported_builds.first().copied().unwrap_or(0);
    if primary_build == 0 {
        warn!(
            "You don't seem to have added any allowed realmbuilds to the realm: {} \
             and therefore it will not be listed to anyone",
            row.name
        );
    }

    let endpoints = match RealmEndpoints::resolve(
        &row.address,
        &row.local_address,
        &row.local_subnet_mask,
        row.port,
    )
    .await
    {
        Ok(endpoints) => endpoints,
        Err(e) => {
            warn!("Skipping realm (id {}, name '{}'): {}", row.id, row.name, e);
            report.skipped_endpoints += 1;
            return None;
        }
    };

    Some(Realm {
        id: row.id,
        name: row.name,
        external_address: endpoints.external,
        local_address: endpoints.local,
        local_subnet_mask: endpoints.local_subnet_mask,
        icon: row.icon,
        timezone: row.timezone,
        flags,
        allowed_security_level,
        population: row.population,
        supported_builds,
        build_info: primary_build_info(primary_build),
    })
}

/// Catalog entry for a realm's lowest build. Only an exact hit counts; the
/// open upper bound of the catalog does not apply to realms.
fn primary_build_info(build: u32) -> BuildInfo {
    match find_build_info(build) {
        Some(info) if info.build == build => *info,
        _ => BuildInfo::placeholder(build),
    }
}
