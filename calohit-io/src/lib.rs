//! calohit-io: File I/O for calohit.
//!
//! JSON readers for the stepping configuration, the geometry tables
//! (volume catalog and lookup-table numbering schemes) and recorded step
//! streams, plus writers for the exported hit collections.
//!

mod config;
mod error;
pub mod geometry;
pub mod steps;
mod writer;

pub use config::{config_from_json, load_config};
pub use error::{Error, Result};
pub use geometry::{GeometryDescription, TableEcalNumbering, TableHcalNumbering};
pub use steps::{RunSteps, StepStream, StepSummary};
pub use writer::{HitFileWriter, OutputFormat, BINARY_HIT_SIZE};
