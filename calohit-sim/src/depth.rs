//! Longitudinal depth encoding for crystal hits.

use calohit_core::hit::DepthCode;

/// Crystal length assumed when a volume has no crystal entry (mm).
pub const DEFAULT_CRYSTAL_LENGTH: f64 = 230.0;

/// Where a step sits inside its crystal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrystalPosition {
    /// Crystal length used by the light curve (mm).
    pub length: f64,
    /// Distance from the crystal's front reference (mm).
    pub depth: f64,
    /// True if the crystal is read out from its front side.
    pub front: bool,
}

impl CrystalPosition {
    /// Locates a step with local offset `dz` in a crystal described by its
    /// signed half-length (sign = orientation). Volumes with no entry use
    /// the default length at depth 0, front oriented.
    #[must_use]
    pub fn locate(signed_half_length: Option<f64>, dz: f64) -> Self {
        match signed_half_length {
            Some(signed) => Self {
                length: signed.abs(),
                depth: (0.5 * signed + dz).abs(),
                front: signed >= 0.0,
            },
            None => Self {
                length: DEFAULT_CRYSTAL_LENGTH,
                depth: 0.0,
                front: true,
            },
        }
    }
}

/// Packs the segment index `floor(depth / radiation_length)` and the
/// orientation of `position` into a depth code.
///
/// A non-positive or non-finite radiation length gives segment 0.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn encode_depth(position: &CrystalPosition, radiation_length: f64) -> DepthCode {
    let segment = if radiation_length > 0.0 && radiation_length.is_finite() {
        // Saturating cast; the code keeps only the low 13 bits.
        (position.depth / radiation_length).floor() as u16
    } else {
        0
    };
    DepthCode::pack(position.front, segment)
}
