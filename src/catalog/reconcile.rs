//! Merging a freshly fetched remote catalog into the local one

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use parking_lot::Mutex;

use super::{Catalog, CatalogStore, ModIdentity, ModRecord, ModSeed};
use crate::error::{ModError, Result};
use crate::logging::{log_info, log_warning};
use crate::registry::ModRegistry;
use crate::remote::{ReleaseInfo, ReleaseSource};

/// Upper bound on concurrent release-metadata requests
const MAX_PARALLEL_FETCHES: usize = 6;

/// Outcome of one reconciliation pass
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Identities appended because they were not in the local catalog
    pub added: Vec<ModIdentity>,
    /// Every installed mod whose latest known release is newer than what is installed
    pub updates: BTreeSet<ModIdentity>,
    /// Remote entries that were not applied (unusable names, failed metadata
    /// fetches), with the reason
    pub skipped: Vec<(ModIdentity, String)>,
    /// Set when the final save failed; the in-memory registry is still current
    pub persist_error: Option<ModError>,
}

pub struct Reconciler<'a> {
    source: &'a dyn ReleaseSource,
    store: Option<&'a CatalogStore>,
}

impl<'a> Reconciler<'a> {
    pub fn new(source: &'a dyn ReleaseSource) -> Self {
        Self {
            source,
            store: None,
        }
    }

    /// Persist through `store` once the pass completes
    pub fn with_store(mut self, store: &'a CatalogStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Merge `seeds` into `registry`.
    ///
    /// Entries are applied in the order received. A failed metadata fetch skips
    /// only that entry. Local entries missing from `seeds` are left untouched.
    /// Entries whose name or plugin file cannot be used as a path component
    /// are skipped before anything is fetched for them.
    pub fn run(&self, registry: &mut ModRegistry, seeds: &[ModSeed]) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let usable: Vec<&ModSeed> = seeds
            .iter()
            .filter(|seed| match seed.invalid_path_field() {
                Some(field) => {
                    log_warning(&format!("Skipping {:?}: unusable {}", seed.name, field));
                    report
                        .skipped
                        .push((seed.name.clone(), format!("unusable {}", field)));
                    false
                }
                None => true,
            })
            .collect();
        let releases = self.fetch_all(&usable);

        for (seed, release) in usable.into_iter().zip(releases) {
            let release = match release {
                Ok(release) => release,
                Err(e) => {
                    log_warning(&format!("Skipping {}: {}", seed.name, e));
                    report.skipped.push((seed.name.clone(), e.to_string()));
                    continue;
                }
            };

            if registry.find(&seed.name).is_none() {
                let mut record = ModRecord::from_seed(seed.clone());
                apply_release(&mut record, &release);
                registry.add(record);
                report.added.push(seed.name.clone());
            } else {
                registry.update_with(&seed.name, |record| apply_release(record, &release));
            }
        }

        log_info(&format!(
            "Reconciled {} remote mods ({} new, {} skipped)",
            seeds.len(),
            report.added.len(),
            report.skipped.len()
        ));

        if let Some(store) = self.store {
            if let Err(e) = store.save(registry.all()) {
                crate::logging::log_error(&format!("Failed to save catalog: {}", e));
                report.persist_error = Some(e);
            }
        }

        report.updates = pending_updates(registry.all());
        report
    }

    fn fetch_all(&self, seeds: &[&ModSeed]) -> Vec<Result<ReleaseInfo>> {
        let slots: Vec<Mutex<Option<Result<ReleaseInfo>>>> =
            seeds.iter().map(|_| Mutex::new(None)).collect();
        let next = AtomicUsize::new(0);
        let workers = seeds.len().clamp(1, MAX_PARALLEL_FETCHES);

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let i = next.fetch_add(1, Ordering::Relaxed);
                    let Some(seed) = seeds.get(i) else { break };
                    let result = self
                        .source
                        .latest_release(&seed.github_author, &seed.github_repo);
                    *slots[i].lock() = Some(result);
                });
            }
        });

        slots
            .into_iter()
            .zip(seeds)
            .map(|(slot, seed)| {
                slot.into_inner().unwrap_or_else(|| {
                    Err(ModError::remote(
                        format!("{}/{}", seed.github_author, seed.github_repo),
                        "metadata fetch did not complete",
                    ))
                })
            })
            .collect()
    }
}

/// Copy remote release fields onto a record; identity fields are never touched
fn apply_release(record: &mut ModRecord, release: &ReleaseInfo) {
    record.latest_version = Some(release.version.clone());
    record.download_url = Some(release.download_url.clone());
    record.release_date = Some(release.created_at);
}

/// Identities of every record with an update available
pub(crate) fn pending_updates(records: &[ModRecord]) -> BTreeSet<ModIdentity> {
    records
        .iter()
        .filter(|r| r.update_available())
        .map(|r| r.name.clone())
        .collect()
}

/// Reconcile a plain catalog without persisting it
pub fn reconcile_catalog(
    local: Catalog,
    seeds: &[ModSeed],
    source: &dyn ReleaseSource,
) -> (Catalog, ReconcileReport) {
    let mut registry = ModRegistry::from_catalog(local);
    let report = Reconciler::new(source).run(&mut registry, seeds);
    (registry.into_catalog(), report)
}
