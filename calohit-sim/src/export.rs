//! Conversion of an event's accumulated records into output collections.

use crate::hit_map::HitMap;
use calohit_core::hit::{CaloHit, HitCollection, HitRecord};
use calohit_core::step::Category;
use calohit_core::units;
use log::debug;

/// Converts an accumulated record to the output representation.
#[must_use]
pub fn to_calo_hit(record: &HitRecord, time_slice_ns: f64) -> CaloHit {
    CaloHit {
        event: record.key.event,
        cell: record.key.cell,
        em: units::to_gev(record.em),
        had: units::to_gev(record.had),
        time: record.key.time.start(time_slice_ns),
        track: record.key.track,
        depth: record.key.depth,
    }
}

/// Drains `map` into a collection labelled `label`.
///
/// Hits are ordered by (cell, time slice, track, depth) so repeated runs
/// write identical output. The map is empty afterwards, so a second call
/// in the same event returns an empty collection.
pub fn export_hits(
    map: &mut HitMap,
    category: Category,
    label: &str,
    event: u32,
    time_slice_ns: f64,
) -> HitCollection {
    debug!("exporting {} {} hits for event {event}", map.len(), category);
    let mut records: Vec<HitRecord> = map.drain().collect();
    records.sort_unstable_by_key(|r| r.key);

    let mut collection = HitCollection::with_capacity(label, category, event, records.len());
    collection
        .hits
        .extend(records.iter().map(|r| to_calo_hit(r, time_slice_ns)));
    collection
}
