//! Multi-worker event processing.
//!
//! Whole events are independent, so they are distributed over the rayon
//! pool with one engine per worker. Engines are cloned from a prototype
//! that has already seen the begin-of-run, so configuration errors
//! surface once, before any event is processed.

use crate::engine::{CaloStepEngine, EventHits};
use crate::metrics::SteppingMetrics;
use crate::resolver::NumberingSchemes;
use calohit_core::config::SteppingConfig;
use calohit_core::error::{Error, Result};
use calohit_core::geometry::VolumeCatalog;
use calohit_core::step::Step;
use log::error;
use rayon::prelude::*;

/// The steps of one event, in delivery order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventSteps<S> {
    /// Event identifier.
    pub event: u32,
    /// Steps of the event.
    pub steps: Vec<S>,
}

impl<S> EventSteps<S> {
    /// Creates an event.
    pub fn new(event: u32, steps: Vec<S>) -> Self {
        Self { event, steps }
    }
}

/// Per-event results in input order plus the summed counters.
#[derive(Debug)]
pub struct RunOutput {
    /// Hits or failure of each event.
    pub events: Vec<Result<EventHits>>,
    /// Counters summed over all workers.
    pub metrics: SteppingMetrics,
}

/// Runs one event through `engine`: begin, every step, end.
///
/// # Errors
/// Propagates the first fatal step error; the engine is left ready for
/// the next event.
pub fn run_event<S: Step>(engine: &mut CaloStepEngine, event: &EventSteps<S>) -> Result<EventHits> {
    engine.begin_event(event.event)?;
    for step in &event.steps {
        if let Err(err) = engine.step(step) {
            // Closes the aborted event so the engine can take the next one.
            return match engine.end_event(event.event) {
                Err(Error::EventAborted(_)) | Ok(_) => Err(err),
                Err(close) => {
                    error!("event {}: {err}; closing failed: {close}", event.event);
                    Err(close)
                }
            };
        }
    }
    engine.end_event(event.event)
}

/// Processes `events` of run `run` in parallel.
///
/// # Errors
/// Returns an error if the configuration is invalid. Per-event failures
/// are reported in [`RunOutput::events`].
pub fn process_events<S: Step + Sync>(
    config: &SteppingConfig,
    schemes: &NumberingSchemes,
    catalog: &dyn VolumeCatalog,
    run: u32,
    events: &[EventSteps<S>],
) -> Result<RunOutput> {
    let mut prototype = CaloStepEngine::new(config.clone(), schemes.clone())?;
    prototype.begin_run(run, catalog)?;

    let results: Vec<(Result<EventHits>, SteppingMetrics)> = events
        .par_iter()
        .map_init(
            || prototype.clone(),
            |engine, event| {
                let before = engine.metrics().clone();
                let result = run_event(engine, event);
                (result, engine.metrics().since(&before))
            },
        )
        .collect();

    let mut metrics = SteppingMetrics::default();
    let mut outputs = Vec::with_capacity(results.len());
    for (result, delta) in results {
        metrics.absorb(&delta);
        outputs.push(result);
    }

    Ok(RunOutput {
        events: outputs,
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineState;
    use calohit_core::geometry::{
        BaseNumber, EcalNumbering, HcalId, HcalNumbering, VolumeHandle, VolumeInfo,
    };
    use calohit_core::step::{Category, GeometryLevel, StepData, Vector3};
    use std::sync::Arc;

    struct FirstCopy;

    impl EcalNumbering for FirstCopy {
        fn unit_id(&self, base: &BaseNumber) -> u32 {
            base.copy_number(0)
                .map_or(0, |copy| u32::try_from(copy).unwrap_or(0))
        }
    }

    struct NoCells;

    impl HcalNumbering for NoCells {
        fn geometric_id(&self, group: i32, layer: i32, depth: i32, _position: Vector3) -> HcalId {
            HcalId {
                subdet: group,
                layer,
                depth,
                ..HcalId::default()
            }
        }

        fn unit_id(&self, _id: &HcalId) -> u32 {
            0
        }
    }

    fn engine() -> CaloStepEngine {
        let schemes = NumberingSchemes {
            eb: Arc::new(FirstCopy),
            ee: Arc::new(FirstCopy),
            hc: Arc::new(NoCells),
        };
        let mut engine = CaloStepEngine::new(SteppingConfig::default(), schemes).unwrap();
        let catalog = vec![VolumeInfo::new("EBRY", 4, Some(115.0))];
        engine.begin_run(1, &catalog).unwrap();
        engine
    }

    fn step(deposit: f64) -> StepData {
        StepData::new(VolumeHandle(4), "EBRY", deposit).with_levels(vec![
            GeometryLevel::new("EBRY", 12),
            GeometryLevel::new("EBMD", 1),
        ])
    }

    #[test]
    fn test_run_event_closes_aborted_event() {
        let mut engine = engine();
        let bad = step(1.0).with_position(Vector3::new(0.0, f64::INFINITY, 0.0));
        let event = EventSteps::new(3, vec![step(1.0), bad, step(2.0)]);

        let err = run_event(&mut engine, &event).unwrap_err();
        assert_eq!(
            err,
            Error::CorruptedStep {
                volume: "EBRY".to_string()
            }
        );
        assert_eq!(engine.state(), EngineState::EventClosed);
        assert_eq!(engine.metrics().events_aborted, 1);
        assert_eq!(engine.pending(Category::Eb), 0);

        let next = EventSteps::new(4, vec![step(1.0)]);
        let hits = run_event(&mut engine, &next).unwrap();
        assert_eq!(hits.get(Category::Eb).len(), 1);
    }

    #[test]
    fn test_run_event_rejects_open_engine() {
        let mut engine = engine();
        engine.begin_event(9).unwrap();
        let event = EventSteps::new(10, vec![step(1.0)]);
        assert!(matches!(
            run_event(&mut engine, &event),
            Err(Error::InvalidTransition { .. })
        ));
        // The open event is untouched.
        assert_eq!(engine.current_event(), 9);
        assert_eq!(engine.state(), EngineState::EventOpen);
    }
}
