//! Simulated step interface and the owned step record.
//!
//! The stepping engine never sees a transport engine's native step type.
//! Each engine gets a thin adapter implementing [`Step`]; recorded or
//! deserialized steps use [`StepData`].

use crate::geometry::VolumeHandle;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Plain 3-vector (position or momentum).
///
/// With the `serde` feature, non-finite components are written as the
/// strings `"NaN"`, `"inf"` and `"-inf"` so a corrupted step survives a
/// round trip through formats without such numbers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vector3 {
    #[cfg_attr(feature = "serde", serde(with = "component"))]
    pub x: f64,
    #[cfg_attr(feature = "serde", serde(with = "component"))]
    pub y: f64,
    #[cfg_attr(feature = "serde", serde(with = "component"))]
    pub z: f64,
}

#[cfg(feature = "serde")]
mod component {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Tag(String),
    }

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value.is_sign_positive() {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Tag(tag) => match tag.as_str() {
                "NaN" | "nan" => Ok(f64::NAN),
                "inf" | "+inf" | "Infinity" => Ok(f64::INFINITY),
                "-inf" | "-Infinity" => Ok(f64::NEG_INFINITY),
                other => Err(D::Error::custom(format!(
                    "expected a number, \"NaN\", \"inf\" or \"-inf\", got \"{other}\""
                ))),
            },
        }
    }
}

impl Vector3 {
    /// Creates a new vector.
    #[inline]
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Returns true if every component is finite.
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// One level of the geometry navigation history: volume name and copy number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeometryLevel {
    pub name: String,
    pub copy: i32,
}

impl GeometryLevel {
    /// Creates a new geometry level.
    pub fn new(name: impl Into<String>, copy: i32) -> Self {
        Self {
            name: name.into(),
            copy,
        }
    }
}

/// Instrumented detector category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Category {
    /// Electromagnetic barrel crystals.
    Eb,
    /// Electromagnetic endcap crystals.
    Ee,
    /// Hadronic calorimeter.
    Hc,
}

impl Category {
    /// All categories in output order.
    pub const ALL: [Category; 3] = [Category::Eb, Category::Ee, Category::Hc];

    /// Index into per-category arrays (0 = EB, 1 = EE, 2 = HC).
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Category::Eb => 0,
            Category::Ee => 1,
            Category::Hc => 2,
        }
    }

    /// Returns true for the crystal (EB/EE) categories.
    #[inline]
    #[must_use]
    pub fn is_electromagnetic(self) -> bool {
        !matches!(self, Category::Hc)
    }

    /// Short display name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Category::Eb => "EB",
            Category::Ee => "EE",
            Category::Hc => "HC",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Abstract step as delivered by a transport engine.
///
/// Lengths are in mm, energies in MeV, times in ns and densities in g/cm³.
pub trait Step {
    /// Handle of the logical volume the step occurred in.
    fn volume(&self) -> VolumeHandle;

    /// Name of the volume, used for diagnostics.
    fn volume_name(&self) -> &str;

    /// Pre-step position in the global frame.
    fn global_position(&self) -> Vector3;

    /// Pre-step position in the local frame of the touched volume.
    fn local_position(&self) -> Vector3;

    /// Momentum at the pre-step point.
    fn momentum(&self) -> Vector3;

    /// Raw energy deposit.
    fn energy_deposit(&self) -> f64;

    /// Step length.
    fn step_length(&self) -> f64;

    /// Global time of the step.
    fn time(&self) -> f64;

    /// Identifier of the track that produced the step.
    fn track_id(&self) -> i32;

    /// Electric charge of the particle, in units of e.
    fn charge(&self) -> f64;

    /// Material density.
    fn density(&self) -> f64;

    /// Material radiation length.
    fn radiation_length(&self) -> f64;

    /// True if the particle is electromagnetic (e±, γ).
    fn is_em(&self) -> bool;

    /// Geometry history, innermost level first.
    fn levels(&self) -> &[GeometryLevel];

    /// Copy number at the given history depth (0 = touched volume).
    fn copy_number(&self, level: usize) -> i32;

    /// Longitudinal offset of the step inside the touched volume.
    fn local_dz(&self) -> f64;
}

/// Owned step record.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StepData {
    pub volume: VolumeHandle,
    pub volume_name: String,
    pub global_position: Vector3,
    pub local_position: Vector3,
    pub momentum: Vector3,
    pub energy_deposit: f64,
    pub step_length: f64,
    pub time: f64,
    pub track_id: i32,
    pub charge: f64,
    pub density: f64,
    pub radiation_length: f64,
    pub em: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub levels: Vec<GeometryLevel>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub copy_numbers: [i32; 2],
    #[cfg_attr(feature = "serde", serde(default))]
    pub dz: f64,
}

impl StepData {
    /// Creates a step in `volume` with the given deposit and neutral defaults
    /// everywhere else.
    pub fn new(volume: VolumeHandle, volume_name: impl Into<String>, energy_deposit: f64) -> Self {
        Self {
            volume,
            volume_name: volume_name.into(),
            global_position: Vector3::default(),
            local_position: Vector3::default(),
            momentum: Vector3::default(),
            energy_deposit,
            step_length: 1.0,
            time: 0.0,
            track_id: 0,
            charge: 0.0,
            density: 1.0,
            radiation_length: 1.0,
            em: true,
            levels: Vec::new(),
            copy_numbers: [0, 0],
            dz: 0.0,
        }
    }

    /// Sets the step time.
    #[must_use]
    pub fn with_time(mut self, time: f64) -> Self {
        self.time = time;
        self
    }

    /// Sets the producing track.
    #[must_use]
    pub fn with_track(mut self, track_id: i32) -> Self {
        self.track_id = track_id;
        self
    }

    /// Sets charge, density and step length used by the saturation laws.
    #[must_use]
    pub fn with_material(mut self, charge: f64, density: f64, step_length: f64) -> Self {
        self.charge = charge;
        self.density = density;
        self.step_length = step_length;
        self
    }

    /// Sets the EM/HAD flag.
    #[must_use]
    pub fn with_em(mut self, em: bool) -> Self {
        self.em = em;
        self
    }

    /// Sets the geometry history.
    #[must_use]
    pub fn with_levels(mut self, levels: Vec<GeometryLevel>) -> Self {
        self.levels = levels;
        self
    }

    /// Sets the two copy numbers used for hadronic decoding.
    #[must_use]
    pub fn with_copy_numbers(mut self, copy0: i32, copy1: i32) -> Self {
        self.copy_numbers = [copy0, copy1];
        self
    }

    /// Sets the global position.
    #[must_use]
    pub fn with_position(mut self, position: Vector3) -> Self {
        self.global_position = position;
        self
    }

    /// Sets the radiation length and local longitudinal offset.
    #[must_use]
    pub fn with_depth(mut self, radiation_length: f64, dz: f64) -> Self {
        self.radiation_length = radiation_length;
        self.dz = dz;
        self
    }
}

impl Step for StepData {
    #[inline]
    fn volume(&self) -> VolumeHandle {
        self.volume
    }

    #[inline]
    fn volume_name(&self) -> &str {
        &self.volume_name
    }

    #[inline]
    fn global_position(&self) -> Vector3 {
        self.global_position
    }

    #[inline]
    fn local_position(&self) -> Vector3 {
        self.local_position
    }

    #[inline]
    fn momentum(&self) -> Vector3 {
        self.momentum
    }

    #[inline]
    fn energy_deposit(&self) -> f64 {
        self.energy_deposit
    }

    #[inline]
    fn step_length(&self) -> f64 {
        self.step_length
    }

    #[inline]
    fn time(&self) -> f64 {
        self.time
    }

    #[inline]
    fn track_id(&self) -> i32 {
        self.track_id
    }

    #[inline]
    fn charge(&self) -> f64 {
        self.charge
    }

    #[inline]
    fn density(&self) -> f64 {
        self.density
    }

    #[inline]
    fn radiation_length(&self) -> f64 {
        self.radiation_length
    }

    #[inline]
    fn is_em(&self) -> bool {
        self.em
    }

    #[inline]
    fn levels(&self) -> &[GeometryLevel] {
        &self.levels
    }

    #[inline]
    fn copy_number(&self, level: usize) -> i32 {
        self.copy_numbers.get(level).copied().unwrap_or(0)
    }

    #[inline]
    fn local_dz(&self) -> f64 {
        self.dz
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_finite() {
        assert!(Vector3::new(1.0, -2.0, 3.0).is_finite());
        assert!(!Vector3::new(f64::NAN, 0.0, 0.0).is_finite());
        assert!(!Vector3::new(0.0, 0.0, f64::INFINITY).is_finite());
    }

    #[test]
    fn test_category_index() {
        for (i, category) in Category::ALL.iter().enumerate() {
            assert_eq!(category.index(), i);
        }
        assert!(Category::Eb.is_electromagnetic());
        assert!(Category::Ee.is_electromagnetic());
        assert!(!Category::Hc.is_electromagnetic());
    }

    #[test]
    fn test_step_data_copy_numbers() {
        let step = StepData::new(VolumeHandle(7), "HBS", 1.0).with_copy_numbers(123, 2000);
        assert_eq!(step.copy_number(0), 123);
        assert_eq!(step.copy_number(1), 2000);
        assert_eq!(step.copy_number(5), 0);
        assert_eq!(step.volume_name(), "HBS");
    }
}
