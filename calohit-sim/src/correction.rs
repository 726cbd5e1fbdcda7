//! Energy deposit corrections.
//!
//! Two Birk-type saturation laws (crystal and hadronic) and the
//! light-collection curve of the crystals. All weights multiply the raw
//! deposit.
#![allow(clippy::float_cmp)]

use calohit_core::config::{EcalBirkConstants, HcalBirkConstants, SteppingConfig};
use calohit_core::units;
use log::{debug, warn};

/// Distance from the photo-sensor beyond which the light curve is flat (mm).
const LIGHT_CURVE_RANGE: f64 = 100.0;
/// Slack allowed on the distance-to-sensor band (mm).
const LIGHT_CURVE_TOLERANCE: f64 = 0.1;

/// Converts a Birk C1 constant from g/(MeV·cm²) to mm·g/(MeV·cm³), so that
/// dividing by a density in g/cm³ gives mm/MeV.
#[inline]
fn c1_internal(c1: f64) -> f64 {
    c1 * units::CM
}

/// Logarithmic saturation law used for the crystals.
#[derive(Debug, Clone, Copy)]
pub struct EcalBirk {
    c1: f64,
    slope: f64,
    cut: f64,
}

impl EcalBirk {
    /// Builds the law from configured constants.
    #[must_use]
    pub fn new(constants: &EcalBirkConstants) -> Self {
        Self {
            c1: c1_internal(constants.c1),
            slope: constants.slope,
            cut: constants.cut,
        }
    }

    /// Weight for a deposit `de` over `step_length` in a material of `density`.
    ///
    /// Neutral particles and zero-length steps are not corrected. For
    /// positive dE/dx the result is clamped to `[cut, 1]`.
    #[must_use]
    pub fn weight(&self, de: f64, step_length: f64, charge: f64, density: f64) -> f64 {
        if charge == 0.0 || step_length <= 0.0 {
            return 1.0;
        }
        let dedx = de / step_length;
        let rkb = self.c1 / density;
        let mut weight = 1.0;
        if dedx > 0.0 {
            weight = (1.0 - self.slope * (rkb * dedx).ln()).clamp(self.cut, 1.0);
        }
        debug!(
            "crystal Birk: charge {charge} dE/dx {dedx} rkb {rkb} weight {weight} dE {de} step {step_length}"
        );
        weight
    }
}

/// Rational saturation law used for the hadronic scintillators.
#[derive(Debug, Clone, Copy)]
pub struct HcalBirk {
    c1: f64,
    c2: f64,
    c3: f64,
}

impl HcalBirk {
    /// Builds the law from configured constants.
    #[must_use]
    pub fn new(constants: &HcalBirkConstants) -> Self {
        Self {
            c1: c1_internal(constants.c1),
            c2: constants.c2,
            c3: constants.c3,
        }
    }

    /// Weight for a deposit `de` over `step_length` in a material of `density`.
    ///
    /// The quadratic coefficient is computed from the unsuppressed constant;
    /// only the linear term is divided by C3 for |charge| >= 2.
    #[must_use]
    pub fn weight(&self, de: f64, step_length: f64, charge: f64, density: f64) -> f64 {
        if charge == 0.0 || step_length <= 0.0 {
            return 1.0;
        }
        let dedx = de / step_length;
        let mut rkb = self.c1 / density;
        let c = self.c2 * rkb * rkb;
        if charge.abs() >= 2.0 {
            rkb /= self.c3;
        }
        let weight = 1.0 / (1.0 + rkb * dedx + c * dedx * dedx);
        debug!("hadronic Birk: charge {charge} dE/dx {dedx} rkb {rkb}, {c} weight {weight} dE {de}");
        weight
    }
}

/// Light-collection weight and whether the geometry was inside the band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightYield {
    /// Multiplicative weight.
    pub weight: f64,
    /// False if the distance to the sensor was outside the crystal.
    pub in_band: bool,
}

/// Position-dependent light-collection efficiency of a crystal.
#[derive(Debug, Clone, Copy)]
pub struct LightCollectionCurve {
    slope: f64,
}

impl LightCollectionCurve {
    /// Creates a curve with the given slope.
    #[must_use]
    pub fn new(slope: f64) -> Self {
        Self { slope }
    }

    /// Evaluates the curve for a step `depth` into a crystal of `length`.
    ///
    /// Steps within 100 mm of the sensor end get a linear boost; further
    /// away the weight is 1. A distance outside `[0, length]` (with 0.1 mm
    /// slack) is reported but does not change the weight.
    #[must_use]
    pub fn evaluate(&self, length: f64, depth: f64) -> LightYield {
        let gap = length - depth;
        let in_band = (-LIGHT_CURVE_TOLERANCE..=length + LIGHT_CURVE_TOLERANCE).contains(&gap);
        if !in_band {
            warn!(
                "light collection curve: distance to sensor {gap} outside crystal length {length} (crystal depth {depth})"
            );
        }
        let weight = if gap <= LIGHT_CURVE_RANGE {
            1.0 + self.slope - gap * 0.01 * self.slope
        } else {
            1.0
        };
        debug!("light curve: depth {depth} length {length} gap {gap} weight {weight}");
        LightYield { weight, in_band }
    }
}

/// Crystal correction result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrystalCorrection {
    /// Corrected deposit.
    pub energy: f64,
    /// False if the light curve geometry was out of band.
    pub in_band: bool,
}

/// All deposit corrections configured for one engine.
#[derive(Debug, Clone, Copy)]
pub struct EnergyCorrector {
    ecal: EcalBirk,
    hcal: HcalBirk,
    curve: LightCollectionCurve,
}

impl EnergyCorrector {
    /// Builds the corrector from a stepping configuration.
    #[must_use]
    pub fn new(config: &SteppingConfig) -> Self {
        Self {
            ecal: EcalBirk::new(&config.birk_ec),
            hcal: HcalBirk::new(&config.birk_hc),
            curve: LightCollectionCurve::new(config.slope_light_yield),
        }
    }

    /// Corrects a crystal deposit: saturation times light collection.
    #[must_use]
    pub fn correct_crystal(
        &self,
        de: f64,
        step_length: f64,
        charge: f64,
        density: f64,
        crystal_length: f64,
        crystal_depth: f64,
    ) -> CrystalCorrection {
        let birk = self.ecal.weight(de, step_length, charge, density);
        let light = self.curve.evaluate(crystal_length, crystal_depth);
        CrystalCorrection {
            energy: de * birk * light.weight,
            in_band: light.in_band,
        }
    }

    /// Corrects a hadronic deposit: saturation only.
    #[must_use]
    pub fn correct_hadronic(&self, de: f64, step_length: f64, charge: f64, density: f64) -> f64 {
        de * self.hcal.weight(de, step_length, charge, density)
    }
}
