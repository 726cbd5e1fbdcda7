//! Stepping engine: the per-worker lifecycle controller.
//!
//! The host drives the engine through one entry point per notification:
//!
//! 1. [`CaloStepEngine::begin_run`] resolves the instrumented volumes
//! 2. [`CaloStepEngine::begin_event`] clears the per-event maps
//! 3. [`CaloStepEngine::step`] classifies, resolves, corrects and merges
//! 4. [`CaloStepEngine::end_event`] exports one collection per category
//!
//! Each worker owns its engine; nothing is shared between instances
//! except the read-only numbering schemes.

use crate::correction::EnergyCorrector;
use crate::depth::{encode_depth, CrystalPosition};
use crate::export::export_hits;
use crate::hit_map::{HitMap, MergeOutcome};
use crate::metrics::SteppingMetrics;
use crate::resolver::{CellResolver, NumberingSchemes};
use crate::volumes::DetectorVolumes;
use calohit_core::config::SteppingConfig;
use calohit_core::error::{Error, Result};
use calohit_core::geometry::VolumeCatalog;
use calohit_core::hit::{DepthCode, HitCollection, HitKey, TimeSlice};
use calohit_core::step::{Category, Step};
use calohit_core::units;
use log::{debug, error, info};

/// Lifecycle state of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No run has begun.
    Uninitialized,
    /// Volumes resolved, no event seen in this run yet.
    RunReady,
    /// An event is accepting steps.
    EventOpen,
    /// The last event ended normally.
    EventClosed,
    /// The last event hit a corrupted step.
    EventAborted,
}

impl EngineState {
    /// Human-readable state name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::RunReady => "run ready",
            EngineState::EventOpen => "event open",
            EngineState::EventClosed => "event closed",
            EngineState::EventAborted => "event aborted",
        }
    }
}

/// What happened to a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Volume not instrumented.
    Ignored,
    /// Numbering scheme returned no cell.
    Unresolved(Category),
    /// Cell resolved but the deposit was not positive.
    EmptyDeposit(Category),
    /// A new record was created.
    Created(Category),
    /// The deposit was added to an existing record.
    Merged(Category),
}

/// Collections produced at the end of one event, in EB, EE, HC order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventHits {
    /// Event identifier.
    pub event: u32,
    /// One collection per category.
    pub collections: [HitCollection; 3],
}

impl EventHits {
    /// Collection of a category.
    #[must_use]
    pub fn get(&self, category: Category) -> &HitCollection {
        &self.collections[category.index()]
    }

    /// Iterates over the three collections.
    pub fn iter(&self) -> impl Iterator<Item = &HitCollection> {
        self.collections.iter()
    }

    /// Total number of hits over all categories.
    #[must_use]
    pub fn total_hits(&self) -> usize {
        self.collections.iter().map(HitCollection::len).sum()
    }
}

/// Calorimeter stepping engine.
#[derive(Debug, Clone)]
pub struct CaloStepEngine {
    config: SteppingConfig,
    corrector: EnergyCorrector,
    resolver: CellResolver,
    volumes: DetectorVolumes,
    maps: [HitMap; 3],
    state: EngineState,
    run: Option<u32>,
    event: u32,
    metrics: SteppingMetrics,
}

impl CaloStepEngine {
    /// Creates an engine, validating the configuration.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] if the configuration is malformed.
    pub fn new(config: SteppingConfig, schemes: NumberingSchemes) -> Result<Self> {
        config.validate()?;

        for category in Category::ALL {
            info!(
                "{} volume patterns for {}: {:?} -> collection {}",
                config.volume_names(category).len(),
                category,
                config.volume_names(category),
                config.collection_label(category)
            );
        }
        info!(
            "ECAL constants: light yield slope {} Birk {}:{}:{}",
            config.slope_light_yield, config.birk_ec.c1, config.birk_ec.slope, config.birk_ec.cut
        );
        info!(
            "HCAL constants: Birk {}:{}:{}; time slice {} ns",
            config.birk_hc.c1, config.birk_hc.c2, config.birk_hc.c3, config.time_slice_ns
        );

        Ok(Self {
            corrector: EnergyCorrector::new(&config),
            resolver: CellResolver::new(schemes),
            volumes: DetectorVolumes::default(),
            maps: Default::default(),
            state: EngineState::Uninitialized,
            run: None,
            event: 0,
            metrics: SteppingMetrics::default(),
            config,
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Configuration the engine was built with.
    #[must_use]
    pub fn config(&self) -> &SteppingConfig {
        &self.config
    }

    /// Counters accumulated since construction.
    #[must_use]
    pub fn metrics(&self) -> &SteppingMetrics {
        &self.metrics
    }

    /// Instrumented volumes of the current run.
    #[must_use]
    pub fn volumes(&self) -> &DetectorVolumes {
        &self.volumes
    }

    /// Current run number, if a run has begun.
    #[must_use]
    pub fn run(&self) -> Option<u32> {
        self.run
    }

    /// Identifier of the open (or last) event.
    #[must_use]
    pub fn current_event(&self) -> u32 {
        self.event
    }

    /// Number of records accumulated so far for a category.
    #[must_use]
    pub fn pending(&self, category: Category) -> usize {
        self.maps[category.index()].len()
    }

    /// Begin-of-run: rebuilds the instrumented volume sets from `catalog`.
    ///
    /// The previous run's volumes are discarded entirely.
    ///
    /// # Errors
    /// Returns [`Error::InvalidTransition`] while an event is open.
    pub fn begin_run(&mut self, run: u32, catalog: &dyn VolumeCatalog) -> Result<()> {
        if self.state == EngineState::EventOpen {
            return Err(self.invalid("begin_run"));
        }
        info!("begin of run {run}");
        self.volumes = DetectorVolumes::build(&self.config, catalog);
        self.run = Some(run);
        self.state = EngineState::RunReady;
        Ok(())
    }

    /// Begin-of-event: drops every record and caches the event id.
    ///
    /// # Errors
    /// Returns [`Error::InvalidTransition`] before the first run or while
    /// another event is open.
    pub fn begin_event(&mut self, event: u32) -> Result<()> {
        if matches!(
            self.state,
            EngineState::Uninitialized | EngineState::EventOpen
        ) {
            return Err(self.invalid("begin_event"));
        }
        info!("begin of event {event}");
        for map in &mut self.maps {
            map.clear();
        }
        self.event = event;
        self.state = EngineState::EventOpen;
        Ok(())
    }

    /// Processes one step of the open event.
    ///
    /// # Errors
    /// Returns [`Error::CorruptedStep`] if the position or momentum is not
    /// finite; the event is aborted and its records discarded.
    /// Returns [`Error::EventAborted`] for steps following such a failure,
    /// and [`Error::InvalidTransition`] when no event is open.
    pub fn step<S: Step + ?Sized>(&mut self, step: &S) -> Result<StepOutcome> {
        match self.state {
            EngineState::EventOpen => {}
            EngineState::EventAborted => return Err(Error::EventAborted(self.event)),
            _ => return Err(self.invalid("step")),
        }

        if !step.global_position().is_finite() || !step.momentum().is_finite() {
            return Err(self.abort(step.volume_name()));
        }
        self.metrics.steps_seen += 1;

        let Some(category) = self.volumes.classify(step.volume()) else {
            return Ok(StepOutcome::Ignored);
        };
        self.metrics.steps_accepted[category.index()] += 1;

        let cell = self.resolver.resolve(category, step);
        if !cell.is_resolved() {
            self.metrics.unresolved_cells += 1;
            return Ok(StepOutcome::Unresolved(category));
        }

        let de = step.energy_deposit();
        if de.is_nan() || de <= 0.0 {
            self.metrics.empty_deposits += 1;
            return Ok(StepOutcome::EmptyDeposit(category));
        }

        let time = TimeSlice::from_time(step.time() / units::NS, self.config.time_slice_ns);
        let (energy, depth) = if category.is_electromagnetic() {
            let position =
                CrystalPosition::locate(self.volumes.crystal(step.volume()), step.local_dz());
            let depth = encode_depth(&position, step.radiation_length());
            let correction = self.corrector.correct_crystal(
                de,
                step.step_length(),
                step.charge(),
                step.density(),
                position.length,
                position.depth,
            );
            if !correction.in_band {
                self.metrics.light_curve_warnings += 1;
            }
            (correction.energy, depth)
        } else {
            let energy = self.corrector.correct_hadronic(
                de,
                step.step_length(),
                step.charge(),
                step.density(),
            );
            (energy, DepthCode::NONE)
        };

        let key = HitKey::new(self.event, cell, time, step.track_id(), depth);
        let (em, had) = if step.is_em() {
            (energy, 0.0)
        } else {
            (0.0, energy)
        };
        debug!("{category} cell {cell} track {} dE {de} -> {energy}", step.track_id());

        let outcome = match self.maps[category.index()].merge(key, em, had) {
            MergeOutcome::Created => {
                self.metrics.hits_created += 1;
                StepOutcome::Created(category)
            }
            MergeOutcome::Merged => {
                self.metrics.hits_merged += 1;
                StepOutcome::Merged(category)
            }
        };
        Ok(outcome)
    }

    /// End-of-event: counts the event and drains every category.
    ///
    /// # Errors
    /// Returns [`Error::EventMismatch`] if `event` is not the open or
    /// aborted event (the state is left unchanged), [`Error::EventAborted`]
    /// if the event was aborted (the engine is then ready for the next
    /// event), and [`Error::InvalidTransition`] when no event is open.
    pub fn end_event(&mut self, event: u32) -> Result<EventHits> {
        match self.state {
            EngineState::EventOpen => {}
            EngineState::EventAborted => {}
            _ => return Err(self.invalid("end_event")),
        }
        if event != self.event {
            return Err(Error::EventMismatch {
                open: self.event,
                received: event,
            });
        }
        if self.state == EngineState::EventAborted {
            self.state = EngineState::EventClosed;
            return Err(Error::EventAborted(event));
        }

        self.metrics.events_processed += 1;
        self.state = EngineState::EventClosed;
        info!("end of event {event}");

        let width = self.config.time_slice_ns;
        let collections = Category::ALL.map(|category| {
            let label = self.config.collection_label(category).to_string();
            let collection =
                export_hits(&mut self.maps[category.index()], category, &label, event, width);
            info!("{label}: {} hits for {category}", collection.len());
            collection
        });
        Ok(EventHits { event, collections })
    }

    fn abort(&mut self, volume: &str) -> Error {
        error!("corrupted event {}: NaN detected in volume {volume}", self.event);
        for map in &mut self.maps {
            map.clear();
        }
        self.metrics.events_aborted += 1;
        self.state = EngineState::EventAborted;
        Error::CorruptedStep {
            volume: volume.to_string(),
        }
    }

    fn invalid(&self, operation: &'static str) -> Error {
        Error::InvalidTransition {
            operation,
            state: self.state.name(),
        }
    }
}
