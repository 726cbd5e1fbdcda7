//! Hit keys, accumulation records and exported hits.

use crate::step::Category;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Detector readout cell identifier. Zero means "unresolved".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct CellId(pub u32);

impl CellId {
    /// Returns true if the numbering scheme resolved the cell.
    #[inline]
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.0 > 0
    }

    /// Returns the raw identifier.
    #[inline]
    #[must_use]
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for CellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Packed longitudinal segment and orientation flag of a crystal hit.
///
/// Layout: bits 3..16 hold the segment index, bit 2 is set for crystals
/// read out from the reflected (back) side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct DepthCode(pub u16);

impl DepthCode {
    /// Mask applied to the segment index before shifting.
    pub const SEGMENT_MASK: u16 = 0x1FFF;
    /// Bit offset of the segment index.
    pub const SEGMENT_OFFSET: u16 = 3;
    /// Orientation bit for reflected crystals.
    pub const REFLECTED: u16 = 0x4;
    /// Depth code used by unsegmented (hadronic) hits.
    pub const NONE: DepthCode = DepthCode(0);

    /// Packs a segment index and orientation.
    #[inline]
    #[must_use]
    pub fn pack(front: bool, segment: u16) -> Self {
        let orientation = if front { 0 } else { Self::REFLECTED };
        Self(((segment & Self::SEGMENT_MASK) << Self::SEGMENT_OFFSET) | orientation)
    }

    /// Longitudinal segment index.
    #[inline]
    #[must_use]
    pub fn segment(&self) -> u16 {
        (self.0 >> Self::SEGMENT_OFFSET) & Self::SEGMENT_MASK
    }

    /// True if the crystal is read out from its front side.
    #[inline]
    #[must_use]
    pub fn is_front(&self) -> bool {
        self.0 & Self::REFLECTED == 0
    }
}

/// Quantized hit time: the index of the time slice the step fell into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TimeSlice(pub i64);

impl TimeSlice {
    /// Quantizes `time` into slices of `width` (both in ns).
    ///
    /// The index is 64-bit, so any physical time at sub-ns widths keeps
    /// its own slice. Infinite times saturate; NaN maps to slice 0.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_time(time: f64, width: f64) -> Self {
        Self((time / width).floor() as i64)
    }

    /// Start time of the slice.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn start(&self, width: f64) -> f64 {
        self.0 as f64 * width
    }
}

/// Accumulation key. Steps with equal keys merge into one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HitKey {
    pub event: u32,
    pub cell: CellId,
    pub time: TimeSlice,
    pub track: i32,
    pub depth: DepthCode,
}

impl HitKey {
    /// Creates a key.
    #[must_use]
    pub fn new(event: u32, cell: CellId, time: TimeSlice, track: i32, depth: DepthCode) -> Self {
        Self {
            event,
            cell,
            time,
            track,
            depth,
        }
    }
}

/// Energy accumulated for one key during the current event (MeV).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRecord {
    pub key: HitKey,
    pub em: f64,
    pub had: f64,
}

impl HitRecord {
    /// Creates a record holding the first deposit for `key`.
    #[must_use]
    pub fn new(key: HitKey, em: f64, had: f64) -> Self {
        Self { key, em, had }
    }

    /// Adds a further deposit.
    #[inline]
    pub fn add_energy_deposit(&mut self, em: f64, had: f64) {
        self.em += em;
        self.had += had;
    }

    /// Sum of the EM and hadronic parts.
    #[inline]
    #[must_use]
    pub fn total(&self) -> f64 {
        self.em + self.had
    }
}

/// Exported calorimeter hit, energies in GeV.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CaloHit {
    pub event: u32,
    pub cell: CellId,
    pub em: f64,
    pub had: f64,
    /// Start of the time slice (ns).
    pub time: f64,
    pub track: i32,
    pub depth: DepthCode,
}

impl CaloHit {
    /// Total energy (GeV).
    #[inline]
    #[must_use]
    pub fn energy(&self) -> f64 {
        self.em + self.had
    }
}

/// One category's hits for one event.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HitCollection {
    /// Output label the host registers the collection under.
    pub label: String,
    pub category: Category,
    pub event: u32,
    pub hits: Vec<CaloHit>,
}

impl HitCollection {
    /// Creates an empty collection with room for `capacity` hits.
    pub fn with_capacity(
        label: impl Into<String>,
        category: Category,
        event: u32,
        capacity: usize,
    ) -> Self {
        Self {
            label: label.into(),
            category,
            event,
            hits: Vec::with_capacity(capacity),
        }
    }

    /// Returns the number of hits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns true if the collection holds no hits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Iterates over the hits.
    pub fn iter(&self) -> impl Iterator<Item = &CaloHit> {
        self.hits.iter()
    }

    /// Sum of all hit energies (GeV).
    #[must_use]
    pub fn total_energy(&self) -> f64 {
        self.hits.iter().map(CaloHit::energy).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_depth_code_packing() {
        let front = DepthCode::pack(true, 5);
        assert_eq!(front.0, 5 << 3);
        assert!(front.is_front());
        assert_eq!(front.segment(), 5);

        let back = DepthCode::pack(false, 5);
        assert_eq!(back.0, (5 << 3) | 0x4);
        assert!(!back.is_front());
        assert_eq!(back.segment(), 5);
    }

    #[test]
    fn test_depth_code_mask() {
        let code = DepthCode::pack(true, 0x2001);
        assert_eq!(code.segment(), 1);
    }

    #[test]
    fn test_time_slice() {
        assert_eq!(TimeSlice::from_time(3.7, 1.0), TimeSlice(3));
        assert_eq!(TimeSlice::from_time(3.0, 1.0), TimeSlice(3));
        assert_eq!(TimeSlice::from_time(7.9, 2.5), TimeSlice(3));
        assert_eq!(TimeSlice::from_time(-0.5, 1.0), TimeSlice(-1));
        assert_relative_eq!(TimeSlice(3).start(2.5), 7.5);
    }

    #[test]
    fn test_late_times_keep_distinct_slices() {
        // 3 s and 10 s at 1 ns width are beyond the 32-bit range.
        let late = TimeSlice::from_time(3.0e9, 1.0);
        let later = TimeSlice::from_time(3.0e9 + 5.0, 1.0);
        let much_later = TimeSlice::from_time(1.0e10, 1.0);
        assert_eq!(late, TimeSlice(3_000_000_000));
        assert_eq!(later, TimeSlice(3_000_000_005));
        assert!(late < later && later < much_later);
        assert_relative_eq!(later.start(1.0), 3.0e9 + 5.0);
    }

    #[test]
    fn test_cell_id_resolution() {
        assert!(CellId(500).is_resolved());
        assert!(!CellId(0).is_resolved());
    }

    #[test]
    fn test_record_accumulation() {
        let key = HitKey::new(1, CellId(500), TimeSlice(0), 1, DepthCode::NONE);
        let mut record = HitRecord::new(key, 2.0, 0.0);
        record.add_energy_deposit(3.0, 0.5);
        assert_relative_eq!(record.em, 5.0);
        assert_relative_eq!(record.had, 0.5);
        assert_relative_eq!(record.total(), 5.5);
    }
}
