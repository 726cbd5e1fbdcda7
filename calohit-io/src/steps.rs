//! Recorded step streams.
//!
//! A step stream replays the output of a transport engine: a list of runs,
//! each a list of events, each the ordered steps of that event.

use crate::{Error, Result};
use calohit_core::step::StepData;
use calohit_sim::EventSteps;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// All events of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSteps {
    /// Run number.
    pub run: u32,
    /// Events in processing order.
    pub events: Vec<EventSteps<StepData>>,
}

impl RunSteps {
    /// Creates a run.
    #[must_use]
    pub fn new(run: u32, events: Vec<EventSteps<StepData>>) -> Self {
        Self { run, events }
    }

    /// Total number of steps over all events.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.events.iter().map(|event| event.steps.len()).sum()
    }
}

/// Contents of a step file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepStream {
    /// Runs in processing order.
    pub runs: Vec<RunSteps>,
}

impl StepStream {
    /// Creates a stream from runs.
    #[must_use]
    pub fn new(runs: Vec<RunSteps>) -> Self {
        Self { runs }
    }

    /// Parses a step stream from a JSON string.
    ///
    /// # Errors
    /// Returns an error if the document is malformed or an event id repeats
    /// within a run.
    pub fn from_json(json: &str) -> Result<Self> {
        let stream: Self = serde_json::from_str(json)?;
        stream.check()?;
        Ok(stream)
    }

    /// Loads a step file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the document is
    /// malformed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let stream: Self = serde_json::from_reader(reader)?;
        stream.check()?;
        info!(
            "step file {}: {} runs, {} steps",
            path.as_ref().display(),
            stream.runs.len(),
            stream.step_count()
        );
        Ok(stream)
    }

    /// Writes the stream as JSON.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Total number of steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.runs.iter().map(RunSteps::step_count).sum()
    }

    /// Summarizes the stream.
    #[must_use]
    pub fn summary(&self) -> StepSummary {
        let mut summary = StepSummary {
            runs: self.runs.len(),
            ..StepSummary::default()
        };
        for run in &self.runs {
            summary.events += run.events.len();
            for step in run.events.iter().flat_map(|event| &event.steps) {
                summary.steps += 1;
                summary.total_deposit += step.energy_deposit;
                if step.time < summary.time_range.0 || summary.steps == 1 {
                    summary.time_range.0 = step.time;
                }
                if step.time > summary.time_range.1 || summary.steps == 1 {
                    summary.time_range.1 = step.time;
                }
                *summary.volumes.entry(step.volume_name.clone()).or_default() += 1;
            }
        }
        summary
    }

    fn check(&self) -> Result<()> {
        for run in &self.runs {
            let mut seen = HashSet::with_capacity(run.events.len());
            for event in &run.events {
                if !seen.insert(event.event) {
                    return Err(Error::InvalidFormat(format!(
                        "event {} appears twice in run {}",
                        event.event, run.run
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Aggregate figures of a step stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepSummary {
    /// Number of runs.
    pub runs: usize,
    /// Number of events over all runs.
    pub events: usize,
    /// Number of steps over all events.
    pub steps: usize,
    /// Sum of the raw deposits (MeV).
    pub total_deposit: f64,
    /// Earliest and latest step time (ns).
    pub time_range: (f64, f64),
    /// Steps per volume name.
    pub volumes: BTreeMap<String, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use calohit_core::step::Vector3;
    use tempfile::NamedTempFile;

    const STREAM: &str = r#"{
        "runs": [{
            "run": 1,
            "events": [{
                "event": 7,
                "steps": [{
                    "volume": 10,
                    "volume_name": "EBRY",
                    "global_position": { "x": 0.0, "y": 1290.0, "z": 10.0 },
                    "local_position": { "x": 0.0, "y": 0.0, "z": -20.0 },
                    "momentum": { "x": 0.0, "y": 500.0, "z": 0.0 },
                    "energy_deposit": 1.5,
                    "step_length": 0.4,
                    "time": 4.2,
                    "track_id": 3,
                    "charge": -1.0,
                    "density": 8.28,
                    "radiation_length": 8.9,
                    "em": true,
                    "levels": [{ "name": "EBRY", "copy": 1 }, { "name": "EBMD", "copy": 3 }],
                    "dz": -20.0
                }, {
                    "volume": 30,
                    "volume_name": "HBScintillator",
                    "global_position": { "x": 0.0, "y": 1900.0, "z": 0.0 },
                    "local_position": { "x": 0.0, "y": 0.0, "z": 1.0 },
                    "momentum": { "x": 0.0, "y": 80.0, "z": 0.0 },
                    "energy_deposit": 0.5,
                    "step_length": 1.0,
                    "time": 12.0,
                    "track_id": 9,
                    "charge": 1.0,
                    "density": 1.032,
                    "radiation_length": 424.0,
                    "em": false,
                    "copy_numbers": [20, 1000]
                }]
            }]
        }]
    }"#;

    #[test]
    fn test_parse_stream() {
        let stream = StepStream::from_json(STREAM).unwrap();
        assert_eq!(stream.runs.len(), 1);
        let event = &stream.runs[0].events[0];
        assert_eq!(event.event, 7);
        assert_eq!(event.steps.len(), 2);
        assert_eq!(event.steps[0].levels.len(), 2);
        assert_eq!(event.steps[0].copy_numbers, [0, 0]);
        assert_eq!(event.steps[1].copy_numbers, [20, 1000]);
        assert!(event.steps[1].levels.is_empty());
        assert_relative_eq!(event.steps[1].dz, 0.0);
    }

    #[test]
    fn test_summary() {
        let summary = StepStream::from_json(STREAM).unwrap().summary();
        assert_eq!((summary.runs, summary.events, summary.steps), (1, 1, 2));
        assert_relative_eq!(summary.total_deposit, 2.0);
        assert_relative_eq!(summary.time_range.0, 4.2);
        assert_relative_eq!(summary.time_range.1, 12.0);
        assert_eq!(summary.volumes.get("EBRY"), Some(&1));
        assert_eq!(summary.volumes.get("HBScintillator"), Some(&1));
    }

    #[test]
    fn test_duplicate_event_is_rejected() {
        let json = r#"{ "runs": [{ "run": 1, "events": [
            { "event": 2, "steps": [] },
            { "event": 2, "steps": [] }
        ] }] }"#;
        assert!(matches!(
            StepStream::from_json(json),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_non_finite_coordinates_survive_save() {
        let mut step = StepData::new(calohit_core::VolumeHandle(10), "EBRY", 1.0);
        step.global_position = Vector3::new(f64::NAN, 0.0, 1.0);
        step.momentum = Vector3::new(f64::INFINITY, f64::NEG_INFINITY, 2.0);
        let stream = StepStream::new(vec![RunSteps::new(
            1,
            vec![EventSteps::new(1, vec![step])],
        )]);

        let file = NamedTempFile::new().unwrap();
        stream.save(file.path()).unwrap();
        let text = std::fs::read_to_string(file.path()).unwrap();
        assert!(text.contains(r#""x":"NaN""#));
        assert!(text.contains(r#""y":"-inf""#));

        let loaded = StepStream::load(file.path()).unwrap();
        let step = &loaded.runs[0].events[0].steps[0];
        assert!(step.global_position.x.is_nan());
        assert_relative_eq!(step.global_position.z, 1.0);
        assert!(step.momentum.x.is_infinite() && step.momentum.x > 0.0);
        assert!(step.momentum.y.is_infinite() && step.momentum.y < 0.0);
    }

    #[test]
    fn test_unknown_float_tag_is_rejected() {
        let json = STREAM.replacen(r#""x": 0.0, "y": 1290.0"#, r#""x": "big", "y": 1290.0"#, 1);
        assert!(matches!(StepStream::from_json(&json), Err(Error::Json(_))));
    }

    #[test]
    fn test_empty_stream_summary() {
        let summary = StepStream::default().summary();
        assert_eq!(summary.steps, 0);
        assert_eq!(summary.time_range, (0.0, 0.0));
    }
}
