//! calohit-core: Core traits and types for calorimeter hit aggregation.
//!
//! This crate provides the data model shared by the stepping engine and
//! its collaborators: simulated steps, detector categories, hit keys and
//! records, the volume catalog and numbering-scheme interfaces, and the
//! stepping configuration.
//!

pub mod config;
pub mod error;
pub mod geometry;
pub mod hit;
pub mod step;
pub mod units;

pub use config::{EcalBirkConstants, HcalBirkConstants, SteppingConfig};
pub use error::{Error, Result};
pub use geometry::{
    BaseNumber, EcalNumbering, HcalId, HcalNumbering, VolumeCatalog, VolumeHandle, VolumeInfo,
};
pub use hit::{CaloHit, CellId, DepthCode, HitCollection, HitKey, HitRecord, TimeSlice};
pub use step::{Category, GeometryLevel, Step, StepData, Vector3};
