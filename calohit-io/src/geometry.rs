//! Geometry description files.
//!
//! A geometry file carries the volume catalog of a run together with
//! lookup tables that stand in for the detector numbering schemes:
//!
//! ```json
//! {
//!   "volumes": [{ "name": "EBRY", "handle": 10, "half_length": 115.0 }],
//!   "eb_cells": [{ "path": [{ "name": "EBRY", "copy": 1 }, { "name": "EBMD", "copy": 3 }], "cell": 838861000 }],
//!   "ee_cells": [],
//!   "hcal_cells": [{ "group": 1, "layer": 3, "depth": 1, "eta": 5, "phi": 12, "cell": 1140850821 }]
//! }
//! ```

use crate::{Error, Result};
use calohit_core::geometry::{
    BaseNumber, EcalNumbering, HcalId, HcalNumbering, VolumeCatalog, VolumeInfo,
};
use calohit_core::step::{GeometryLevel, Vector3};
use calohit_sim::NumberingSchemes;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

/// One ECAL table entry: a full geometry path and its cell id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EcalCellEntry {
    /// Levels from the touched volume outward.
    pub path: Vec<GeometryLevel>,
    /// Cell identifier.
    pub cell: u32,
}

/// One HCAL table entry, keyed by detector group, layer and depth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HcalCellEntry {
    /// Detector group.
    pub group: i32,
    /// Layer, 1-based.
    pub layer: i32,
    /// Readout depth, 1-based.
    pub depth: i32,
    /// Tower eta index.
    #[serde(default)]
    pub eta: i32,
    /// Tower phi index.
    #[serde(default)]
    pub phi: i32,
    /// Cell identifier on the positive side.
    pub cell: u32,
    /// Cell identifier on the negative side; unresolved if absent.
    #[serde(default)]
    pub mirror_cell: Option<u32>,
}

/// Contents of a geometry file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeometryDescription {
    /// Volume catalog.
    pub volumes: Vec<VolumeInfo>,
    /// Barrel crystal table.
    pub eb_cells: Vec<EcalCellEntry>,
    /// Endcap crystal table.
    pub ee_cells: Vec<EcalCellEntry>,
    /// Hadronic table.
    pub hcal_cells: Vec<HcalCellEntry>,
}

impl GeometryDescription {
    /// Parses a geometry description from a JSON string.
    ///
    /// # Errors
    /// Returns an error if the document is malformed or inconsistent.
    pub fn from_json(json: &str) -> Result<Self> {
        let geometry: Self = serde_json::from_str(json)?;
        geometry.check()?;
        Ok(geometry)
    }

    /// Loads a geometry file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is malformed or is
    /// inconsistent.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let geometry: Self = serde_json::from_reader(reader)?;
        geometry.check()?;
        info!(
            "geometry {}: {} volumes, {} EB / {} EE / {} HCAL cells",
            path.as_ref().display(),
            geometry.volumes.len(),
            geometry.eb_cells.len(),
            geometry.ee_cells.len(),
            geometry.hcal_cells.len()
        );
        Ok(geometry)
    }

    /// Builds the numbering schemes backed by the lookup tables.
    #[must_use]
    pub fn schemes(&self) -> NumberingSchemes {
        NumberingSchemes {
            eb: Arc::new(TableEcalNumbering::new(&self.eb_cells)),
            ee: Arc::new(TableEcalNumbering::new(&self.ee_cells)),
            hc: Arc::new(TableHcalNumbering::new(&self.hcal_cells)),
        }
    }

    fn check(&self) -> Result<()> {
        let mut handles = HashMap::with_capacity(self.volumes.len());
        for volume in &self.volumes {
            if let Some(previous) = handles.insert(volume.handle, volume.name.as_str()) {
                return Err(Error::InvalidFormat(format!(
                    "volume handle {} used by both {previous} and {}",
                    volume.handle, volume.name
                )));
            }
            if let Some(half) = volume.half_length {
                if !half.is_finite() {
                    return Err(Error::InvalidFormat(format!(
                        "volume {} has a non-finite half length",
                        volume.name
                    )));
                }
            }
        }
        for entry in self.eb_cells.iter().chain(&self.ee_cells) {
            if entry.cell == 0 {
                return Err(Error::InvalidFormat(format!(
                    "ECAL path {} maps to the reserved cell id 0",
                    path_key(entry.path.iter())
                )));
            }
        }
        Ok(())
    }
}

impl VolumeCatalog for GeometryDescription {
    fn volumes(&self) -> Vec<VolumeInfo> {
        self.volumes.clone()
    }
}

fn path_key<'a>(levels: impl Iterator<Item = &'a GeometryLevel>) -> String {
    let mut key = String::new();
    for level in levels {
        if !key.is_empty() {
            key.push('/');
        }
        key.push_str(&level.name);
        key.push(':');
        key.push_str(&level.copy.to_string());
    }
    key
}

/// ECAL numbering backed by a path → cell table.
#[derive(Debug, Clone, Default)]
pub struct TableEcalNumbering {
    cells: HashMap<String, u32>,
}

impl TableEcalNumbering {
    /// Builds the table; later entries override earlier ones.
    #[must_use]
    pub fn new(entries: &[EcalCellEntry]) -> Self {
        let cells = entries
            .iter()
            .map(|entry| (path_key(entry.path.iter()), entry.cell))
            .collect();
        Self { cells }
    }

    /// Number of distinct paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl EcalNumbering for TableEcalNumbering {
    fn unit_id(&self, base: &BaseNumber) -> u32 {
        if base.is_empty() {
            return 0;
        }
        let key = path_key(base.iter());
        match self.cells.get(&key) {
            Some(&cell) => cell,
            None => {
                debug!("no ECAL cell for path {key}");
                0
            }
        }
    }
}

/// HCAL numbering backed by a (group, layer, depth) table.
///
/// The geometric stage fills eta and phi from the table and takes the
/// side from the sign of the local z coordinate; the remap stage picks
/// the positive or mirror cell.
#[derive(Debug, Clone, Default)]
pub struct TableHcalNumbering {
    cells: HashMap<(i32, i32, i32), HcalCellEntry>,
}

impl TableHcalNumbering {
    /// Builds the table; later entries override earlier ones.
    #[must_use]
    pub fn new(entries: &[HcalCellEntry]) -> Self {
        let cells = entries
            .iter()
            .map(|entry| ((entry.group, entry.layer, entry.depth), *entry))
            .collect();
        Self { cells }
    }

    /// Number of table entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl HcalNumbering for TableHcalNumbering {
    fn geometric_id(&self, group: i32, layer: i32, depth: i32, position: Vector3) -> HcalId {
        let (eta, phi) = self
            .cells
            .get(&(group, layer, depth))
            .map_or((0, 0), |entry| (entry.eta, entry.phi));
        HcalId {
            subdet: group,
            z_side: if position.z < 0.0 { -1 } else { 1 },
            depth,
            eta,
            phi,
            layer,
        }
    }

    fn unit_id(&self, id: &HcalId) -> u32 {
        let Some(entry) = self.cells.get(&(id.subdet, id.layer, id.depth)) else {
            debug!(
                "no HCAL cell for group {} layer {} depth {}",
                id.subdet, id.layer, id.depth
            );
            return 0;
        };
        if id.z_side < 0 {
            entry.mirror_cell.unwrap_or(0)
        } else {
            entry.cell
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calohit_core::geometry::VolumeHandle;

    const GEOMETRY: &str = r#"{
        "volumes": [
            { "name": "World", "handle": 1 },
            { "name": "EBRY", "handle": 10, "half_length": 115.0 }
        ],
        "eb_cells": [
            { "path": [{ "name": "EBRY", "copy": 1 }, { "name": "EBMD", "copy": 3 }], "cell": 4001 }
        ],
        "hcal_cells": [
            { "group": 1, "layer": 3, "depth": 1, "eta": 5, "phi": 12, "cell": 9001, "mirror_cell": 9002 },
            { "group": 2, "layer": 1, "depth": 1, "cell": 9101 }
        ]
    }"#;

    #[test]
    fn test_parse_description() {
        let geometry = GeometryDescription::from_json(GEOMETRY).unwrap();
        let volumes = geometry.volumes();
        assert_eq!(volumes.len(), 2);
        assert_eq!(volumes[1].handle, VolumeHandle(10));
        assert_eq!(volumes[1].half_length, Some(115.0));
        assert!(geometry.ee_cells.is_empty());
    }

    #[test]
    fn test_ecal_table_lookup() {
        let geometry = GeometryDescription::from_json(GEOMETRY).unwrap();
        let table = TableEcalNumbering::new(&geometry.eb_cells);
        assert_eq!(table.len(), 1);

        let mut base = BaseNumber::with_capacity(2);
        base.add_level("EBRY", 1);
        base.add_level("EBMD", 3);
        assert_eq!(table.unit_id(&base), 4001);

        base.reset();
        base.add_level("EBRY", 2);
        base.add_level("EBMD", 3);
        assert_eq!(table.unit_id(&base), 0);

        base.reset();
        assert_eq!(table.unit_id(&base), 0);
    }

    #[test]
    fn test_hcal_table_lookup() {
        let geometry = GeometryDescription::from_json(GEOMETRY).unwrap();
        let table = TableHcalNumbering::new(&geometry.hcal_cells);

        let front = Vector3::new(0.0, 0.0, 3.0);
        let id = table.geometric_id(1, 3, 1, front);
        assert_eq!((id.eta, id.phi, id.z_side), (5, 12, 1));
        assert_eq!(table.unit_id(&id), 9001);

        let back = Vector3::new(0.0, 0.0, -3.0);
        assert_eq!(table.resolve(1, 3, 1, back), 9002);
        // No mirror entry: unresolved on the negative side.
        assert_eq!(table.resolve(2, 1, 1, back), 0);
        assert_eq!(table.resolve(2, 1, 1, front), 9101);
        assert_eq!(table.resolve(7, 1, 1, front), 0);
    }

    #[test]
    fn test_duplicate_handles_are_rejected() {
        let json = r#"{ "volumes": [
            { "name": "A", "handle": 3 },
            { "name": "B", "handle": 3 }
        ] }"#;
        let err = GeometryDescription::from_json(json).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn test_reserved_cell_is_rejected() {
        let json = r#"{ "ee_cells": [ { "path": [{ "name": "EFRY", "copy": 1 }], "cell": 0 } ] }"#;
        assert!(GeometryDescription::from_json(json).is_err());
    }
}
