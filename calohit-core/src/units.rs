//! Unit system used throughout calohit.
//!
//! Values are stored in the transport-engine convention: millimetre,
//! nanosecond and MeV are 1. Densities arrive in g/cm³ and Birk C1
//! constants are configured in g/(MeV·cm²), so their ratio is a length
//! per MeV expressed in centimetres.

/// One millimetre.
pub const MM: f64 = 1.0;
/// One centimetre.
pub const CM: f64 = 10.0 * MM;
/// One nanosecond.
pub const NS: f64 = 1.0;
/// One MeV.
pub const MEV: f64 = 1.0;
/// One GeV.
pub const GEV: f64 = 1000.0 * MEV;

/// Converts an energy in internal units to GeV.
#[inline]
#[must_use]
pub fn to_gev(energy: f64) -> f64 {
    energy / GEV
}
