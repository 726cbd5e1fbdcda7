//! Per-run classification of instrumented volumes.
//!
//! Volumes are matched by substring against the configured name patterns
//! once per run. Every handle maps to at most one category, so the
//! classification of a step is a single lookup.

use calohit_core::config::SteppingConfig;
use calohit_core::geometry::{VolumeCatalog, VolumeHandle, VolumeInfo};
use calohit_core::step::Category;
use log::{debug, info, warn};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Name tag of crystals placed in reflected orientation.
const REFLECTED_TAG: &str = "refl";

/// Order in which categories claim volumes. A volume matching several
/// categories belongs to the first one here.
const CLAIM_ORDER: [Category; 3] = [Category::Hc, Category::Eb, Category::Ee];

/// Orientation sign of a crystal from its category and name.
fn orientation(category: Category, name: &str) -> f64 {
    let reflected = name.contains(REFLECTED_TAG);
    match (category, reflected) {
        (Category::Eb, false) | (Category::Ee, true) => -1.0,
        _ => 1.0,
    }
}

/// Instrumented volumes of the current run.
#[derive(Debug, Clone, Default)]
pub struct DetectorVolumes {
    categories: HashMap<VolumeHandle, Category>,
    crystals: HashMap<VolumeHandle, f64>,
    counts: [usize; 3],
}

impl DetectorVolumes {
    /// Resolves the configured name patterns against `catalog`.
    pub fn build(config: &SteppingConfig, catalog: &dyn VolumeCatalog) -> Self {
        let entries = catalog.volumes();
        let mut volumes = Self::default();
        for category in CLAIM_ORDER {
            for pattern in config.volume_names(category) {
                for entry in entries.iter().filter(|e| e.name.contains(pattern.as_str())) {
                    volumes.claim(category, entry);
                }
            }
        }
        info!(
            "{} volumes for EB, {} for EE, {} for HC ({} crystal lengths)",
            volumes.counts[0],
            volumes.counts[1],
            volumes.counts[2],
            volumes.crystals.len()
        );
        volumes
    }

    fn claim(&mut self, category: Category, entry: &VolumeInfo) {
        match self.categories.entry(entry.handle) {
            Entry::Occupied(existing) => {
                if *existing.get() != category {
                    warn!(
                        "volume {} ({}) matches {} and {}; keeping {}",
                        entry.name,
                        entry.handle,
                        existing.get(),
                        category,
                        existing.get()
                    );
                }
                return;
            }
            Entry::Vacant(slot) => {
                slot.insert(category);
            }
        }
        self.counts[category.index()] += 1;
        debug!("[{}] {} {}", category, entry.name, entry.handle);

        if category.is_electromagnetic() {
            if let Some(half_length) = entry.half_length {
                self.crystals
                    .entry(entry.handle)
                    .or_insert(half_length * orientation(category, &entry.name));
            }
        }
    }

    /// Category of a volume, or `None` if it is not instrumented.
    #[inline]
    #[must_use]
    pub fn classify(&self, volume: VolumeHandle) -> Option<Category> {
        self.categories.get(&volume).copied()
    }

    /// Signed half-length of a crystal, if the catalog provided one.
    #[inline]
    #[must_use]
    pub fn crystal(&self, volume: VolumeHandle) -> Option<f64> {
        self.crystals.get(&volume).copied()
    }

    /// Number of volumes claimed by a category.
    #[must_use]
    pub fn count(&self, category: Category) -> usize {
        self.counts[category.index()]
    }

    /// Total number of instrumented volumes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Returns true if no volume is instrumented.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
