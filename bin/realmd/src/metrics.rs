//! Prometheus metrics for the realm list

use anyhow::Result;
use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder,
};
use realm_core::{ProtocolEra, RealmSnapshot, ReloadReport};
use std::sync::Arc;

/// Prometheus metrics collector for realm list refreshes
#[derive(Clone)]
pub struct RealmMetrics {
    /// Realms in the current snapshot
    pub realms_loaded: IntGauge,
    /// Listed realms per protocol era
    pub realms_listed: IntGaugeVec,
    /// Realms loaded without a usable build
    pub realms_unlisted: IntGauge,
    /// Completed refreshes
    pub refreshes_total: IntCounter,
    /// Refreshes aborted by a store failure
    pub refresh_failures_total: IntCounter,
    /// Row problems found while loading, by kind
    pub row_issues_total: IntCounterVec,
    pub registry: Arc<Registry>,
}

impl RealmMetrics {
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let realms_loaded =
            IntGauge::new("realmd_realms_loaded", "Realms in the current realm list")?;

        let realms_listed = IntGaugeVec::new(
            Opts::new("realmd_realms_listed", "Listed realms per protocol era"),
            &["era"],
        )?;

        let realms_unlisted = IntGauge::new(
            "realmd_realms_unlisted",
            "Realms loaded without any usable client build",
        )?;

        let refreshes_total =
            IntCounter::new("realmd_refreshes_total", "Completed realm list refreshes")?;

        let refresh_failures_total = IntCounter::new(
            "realmd_refresh_failures_total",
            "Realm list refreshes aborted by a store failure",
        )?;

        let row_issues_total = IntCounterVec::new(
            Opts::new("realmd_row_issues_total", "Realm row problems found while loading"),
            &["kind"],
        )?;

        registry.register(Box::new(realms_loaded.clone()))?;
        registry.register(Box::new(realms_listed.clone()))?;
        registry.register(Box::new(realms_unlisted.clone()))?;
        registry.register(Box::new(refreshes_total.clone()))?;
        registry.register(Box::new(refresh_failures_total.clone()))?;
        registry.register(Box::new(row_issues_total.clone()))?;

        Ok(Self {
            realms_loaded,
            realms_listed,
            realms_unlisted,
            refreshes_total,
            refresh_failures_total,
            row_issues_total,
            registry,
        })
    }

    /// Update the gauges from a freshly published snapshot
    pub fn record_snapshot(&self, snapshot: &RealmSnapshot) {
        self.realms_loaded.set(snapshot.len() as i64);
        self.realms_unlisted
            .set((snapshot.len() - snapshot.listed_len()) as i64);
        for era in ProtocolEra::ALL {
            self.realms_listed
                .with_label_values(&[era.as_str()])
                .set(snapshot.for_era(era).len() as i64);
        }
    }

    pub fn record_refresh(&self, report: &ReloadReport) {
        self.refreshes_total.inc();
        let issues = [
            ("masked_flags", report.masked_flags),
            ("clamped_security", report.clamped_security),
            ("skipped_endpoint", report.skipped_endpoints),
        ];
        for (kind, count) in issues {
            if count > 0 {
                self.row_issues_total
                    .with_label_values(&[kind])
                    .inc_by(count as u64);
            }
        }
    }

    /// Gather all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = vec![];
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
