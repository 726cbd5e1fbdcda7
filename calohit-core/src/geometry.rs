//! Geometry collaborators: the volume catalog and numbering schemes.
//!
//! These are owned by the host. The stepping engine only queries them;
//! it never constructs geometry or computes numbering itself.

use crate::step::{GeometryLevel, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Opaque handle of a logical volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct VolumeHandle(pub u64);

impl std::fmt::Display for VolumeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One entry of the volume catalog.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VolumeInfo {
    /// Logical volume name.
    pub name: String,
    /// Volume handle.
    pub handle: VolumeHandle,
    /// Half-length along the crystal axis, when the solid has one.
    #[cfg_attr(feature = "serde", serde(default))]
    pub half_length: Option<f64>,
}

impl VolumeInfo {
    /// Creates a catalog entry.
    pub fn new(name: impl Into<String>, handle: u64, half_length: Option<f64>) -> Self {
        Self {
            name: name.into(),
            handle: VolumeHandle(handle),
            half_length,
        }
    }
}

/// Catalog of logical volumes known to the transport engine.
pub trait VolumeCatalog: Send + Sync {
    /// Returns every (name, handle) pair, in catalog order.
    fn volumes(&self) -> Vec<VolumeInfo>;
}

impl VolumeCatalog for Vec<VolumeInfo> {
    fn volumes(&self) -> Vec<VolumeInfo> {
        self.clone()
    }
}

impl VolumeCatalog for [VolumeInfo] {
    fn volumes(&self) -> Vec<VolumeInfo> {
        self.to_vec()
    }
}

/// Ordered geometry history handed to the ECAL numbering schemes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseNumber {
    levels: Vec<GeometryLevel>,
}

impl BaseNumber {
    /// Creates a base number with room for `capacity` levels.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            levels: Vec::with_capacity(capacity),
        }
    }

    /// Returns the number of levels that fit without reallocating.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.levels.capacity()
    }

    /// Grows the capacity to hold at least `size` levels.
    pub fn set_size(&mut self, size: usize) {
        if size > self.levels.capacity() {
            self.levels.reserve(size - self.levels.len());
        }
    }

    /// Appends a level.
    pub fn add_level(&mut self, name: impl Into<String>, copy: i32) {
        self.levels.push(GeometryLevel::new(name, copy));
    }

    /// Drops all levels, keeping the allocation.
    pub fn reset(&mut self) {
        self.levels.clear();
    }

    /// Returns the number of levels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Returns true if no level has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Name at the given level.
    #[must_use]
    pub fn level_name(&self, level: usize) -> Option<&str> {
        self.levels.get(level).map(|l| l.name.as_str())
    }

    /// Copy number at the given level.
    #[must_use]
    pub fn copy_number(&self, level: usize) -> Option<i32> {
        self.levels.get(level).map(|l| l.copy)
    }

    /// Iterates over the levels, innermost first.
    pub fn iter(&self) -> impl Iterator<Item = &GeometryLevel> {
        self.levels.iter()
    }
}

/// ECAL numbering scheme: geometry history to cell identifier.
pub trait EcalNumbering: Send + Sync {
    /// Returns the cell identifier, or 0 if the history does not resolve.
    fn unit_id(&self, base: &BaseNumber) -> u32;
}

/// Geometric HCAL identifier produced by the first resolution stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HcalId {
    pub subdet: i32,
    pub z_side: i32,
    pub depth: i32,
    pub eta: i32,
    pub phi: i32,
    pub layer: i32,
}

/// HCAL numbering: a geometric stage followed by a scheme-specific remap.
pub trait HcalNumbering: Send + Sync {
    /// Maps detector group, layer, depth and local position to a geometric id.
    fn geometric_id(&self, group: i32, layer: i32, depth: i32, position: Vector3) -> HcalId;

    /// Remaps a geometric id to the final cell identifier (0 = unresolved).
    fn unit_id(&self, id: &HcalId) -> u32;

    /// Runs both stages.
    fn resolve(&self, group: i32, layer: i32, depth: i32, position: Vector3) -> u32 {
        let id = self.geometric_id(group, layer, depth, position);
        self.unit_id(&id)
    }
}
