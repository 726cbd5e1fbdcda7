//! calohit-sim: Calorimeter stepping engine.
//!
//! This crate turns simulated steps into calorimeter hits:
//! - **Classification** of steps into EB, EE and HC volumes
//! - **Resolution** of cell identifiers through the numbering schemes
//! - **Correction** with Birk saturation and the crystal light curve
//! - **Aggregation** of deposits per (event, cell, time, track, depth)
//! - **Export** of one hit collection per category at end of event
//!
#![warn(missing_docs)]

pub mod correction;
pub mod depth;
mod engine;
pub mod export;
pub mod hit_map;
mod metrics;
mod parallel;
pub mod resolver;
pub mod volumes;

pub use correction::{EcalBirk, EnergyCorrector, HcalBirk, LightCollectionCurve, LightYield};
pub use depth::{encode_depth, CrystalPosition, DEFAULT_CRYSTAL_LENGTH};
pub use engine::{CaloStepEngine, EngineState, EventHits, StepOutcome};
pub use export::export_hits;
pub use hit_map::{HitMap, MergeOutcome};
pub use metrics::SteppingMetrics;
pub use parallel::{process_events, run_event, EventSteps, RunOutput};
pub use resolver::{CellResolver, HcalCopyNumbers, NumberingSchemes};
pub use volumes::DetectorVolumes;

// Re-export core types
pub use calohit_core::{Category, Error, Result, SteppingConfig};
