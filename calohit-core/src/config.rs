//! Stepping engine configuration.

use crate::error::{Error, Result};
use crate::step::Category;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Birk constants for the crystal (EB/EE) saturation law.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct EcalBirkConstants {
    /// C1 in g/(MeV·cm²).
    pub c1: f64,
    /// Logarithmic slope.
    pub slope: f64,
    /// Floor of the weight.
    pub cut: f64,
}

impl Default for EcalBirkConstants {
    fn default() -> Self {
        Self {
            c1: 0.03333,
            slope: 0.253_694,
            cut: 0.1,
        }
    }
}

/// Birk constants for the hadronic saturation law.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct HcalBirkConstants {
    /// C1 in g/(MeV·cm²).
    pub c1: f64,
    /// Quadratic term coefficient.
    pub c2: f64,
    /// Suppression divisor applied for |charge| >= 2.
    pub c3: f64,
}

impl Default for HcalBirkConstants {
    fn default() -> Self {
        Self {
            c1: 0.0052,
            c2: 0.142,
            c3: 1.75,
        }
    }
}

/// Configuration consumed by the stepping engine at construction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct SteppingConfig {
    /// Volume-name substrings selecting barrel crystals.
    pub eb_volume_names: Vec<String>,
    /// Volume-name substrings selecting endcap crystals.
    pub ee_volume_names: Vec<String>,
    /// Volume-name substrings selecting hadronic sensitive volumes.
    pub hc_volume_names: Vec<String>,
    /// Output labels, one per category in EB, EE, HC order.
    pub hit_collection_names: Vec<String>,
    /// Light-collection curve slope.
    pub slope_light_yield: f64,
    /// Crystal saturation constants.
    pub birk_ec: EcalBirkConstants,
    /// Hadronic saturation constants.
    pub birk_hc: HcalBirkConstants,
    /// Width of the time slices that form part of the hit key (ns).
    pub time_slice_ns: f64,
}

impl Default for SteppingConfig {
    fn default() -> Self {
        Self {
            eb_volume_names: vec!["EBRY".to_string()],
            ee_volume_names: vec!["EFRY".to_string()],
            hc_volume_names: vec!["HBS".to_string(), "HES".to_string(), "HTS".to_string()],
            hit_collection_names: vec![
                "EcalHitsEB".to_string(),
                "EcalHitsEE".to_string(),
                "HcalHits".to_string(),
            ],
            slope_light_yield: 0.02,
            birk_ec: EcalBirkConstants::default(),
            birk_hc: HcalBirkConstants::default(),
            time_slice_ns: 1.0,
        }
    }
}

impl SteppingConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the volume-name substrings for a category.
    #[must_use]
    pub fn with_volume_names(mut self, category: Category, names: &[&str]) -> Self {
        let names = names.iter().map(|s| (*s).to_string()).collect();
        match category {
            Category::Eb => self.eb_volume_names = names,
            Category::Ee => self.ee_volume_names = names,
            Category::Hc => self.hc_volume_names = names,
        }
        self
    }

    /// Sets the output labels (EB, EE, HC).
    #[must_use]
    pub fn with_hit_collection_names(mut self, names: &[&str]) -> Self {
        self.hit_collection_names = names.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Sets the light-collection slope.
    #[must_use]
    pub fn with_slope_light_yield(mut self, slope: f64) -> Self {
        self.slope_light_yield = slope;
        self
    }

    /// Sets the crystal Birk constants.
    #[must_use]
    pub fn with_birk_ec(mut self, c1: f64, slope: f64, cut: f64) -> Self {
        self.birk_ec = EcalBirkConstants { c1, slope, cut };
        self
    }

    /// Sets the hadronic Birk constants.
    #[must_use]
    pub fn with_birk_hc(mut self, c1: f64, c2: f64, c3: f64) -> Self {
        self.birk_hc = HcalBirkConstants { c1, c2, c3 };
        self
    }

    /// Sets the time slice width.
    #[must_use]
    pub fn with_time_slice_ns(mut self, width: f64) -> Self {
        self.time_slice_ns = width;
        self
    }

    /// Volume-name substrings for a category.
    #[must_use]
    pub fn volume_names(&self, category: Category) -> &[String] {
        match category {
            Category::Eb => &self.eb_volume_names,
            Category::Ee => &self.ee_volume_names,
            Category::Hc => &self.hc_volume_names,
        }
    }

    /// Output label for a category. Only meaningful on a validated config.
    #[must_use]
    pub fn collection_label(&self, category: Category) -> &str {
        self.hit_collection_names
            .get(category.index())
            .map_or("", String::as_str)
    }

    /// Checks that every value is well formed.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.hit_collection_names.len() != Category::ALL.len() {
            return Err(Error::ConfigError(format!(
                "expected {} hit collection names, got {}",
                Category::ALL.len(),
                self.hit_collection_names.len()
            )));
        }
        for (i, label) in self.hit_collection_names.iter().enumerate() {
            if label.trim().is_empty() {
                return Err(Error::ConfigError(format!(
                    "hit collection name {i} is empty"
                )));
            }
            if self.hit_collection_names[..i].contains(label) {
                return Err(Error::ConfigError(format!(
                    "duplicate hit collection name '{label}'"
                )));
            }
        }

        for category in Category::ALL {
            if self.volume_names(category).iter().any(String::is_empty) {
                return Err(Error::ConfigError(format!(
                    "empty volume name pattern for {category}"
                )));
            }
        }

        let constants = [
            ("slope_light_yield", self.slope_light_yield),
            ("birk_ec.c1", self.birk_ec.c1),
            ("birk_ec.slope", self.birk_ec.slope),
            ("birk_ec.cut", self.birk_ec.cut),
            ("birk_hc.c1", self.birk_hc.c1),
            ("birk_hc.c2", self.birk_hc.c2),
            ("birk_hc.c3", self.birk_hc.c3),
            ("time_slice_ns", self.time_slice_ns),
        ];
        for (name, value) in constants {
            if !value.is_finite() {
                return Err(Error::ConfigError(format!("{name} must be finite")));
            }
        }

        if self.birk_ec.c1 <= 0.0 || self.birk_hc.c1 <= 0.0 {
            return Err(Error::ConfigError("Birk C1 constants must be positive".into()));
        }
        if self.birk_hc.c3 <= 0.0 {
            return Err(Error::ConfigError("birk_hc.c3 must be positive".into()));
        }
        if self.birk_ec.cut <= 0.0 || self.birk_ec.cut > 1.0 {
            return Err(Error::ConfigError(format!(
                "birk_ec.cut must be in (0, 1], got {}",
                self.birk_ec.cut
            )));
        }
        if self.time_slice_ns <= 0.0 {
            return Err(Error::ConfigError(format!(
                "time_slice_ns must be positive, got {}",
                self.time_slice_ns
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SteppingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.collection_label(Category::Hc), "HcalHits");
        assert_eq!(config.volume_names(Category::Hc).len(), 3);
    }

    #[test]
    fn test_builder() {
        let config = SteppingConfig::new()
            .with_volume_names(Category::Eb, &["XTAL"])
            .with_slope_light_yield(0.0)
            .with_birk_hc(0.01, 0.2, 2.0)
            .with_time_slice_ns(0.5);

        assert_eq!(config.eb_volume_names, vec!["XTAL".to_string()]);
        assert!((config.slope_light_yield).abs() < f64::EPSILON);
        assert!((config.birk_hc.c3 - 2.0).abs() < f64::EPSILON);
        assert!((config.time_slice_ns - 0.5).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_wrong_label_count() {
        let config = SteppingConfig::new().with_hit_collection_names(&["EB", "EE"]);
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_duplicate_labels() {
        let config = SteppingConfig::new().with_hit_collection_names(&["A", "B", "A"]);
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_invalid_constants() {
        let config = SteppingConfig::new().with_birk_ec(0.03, 0.25, 0.0);
        assert!(config.validate().is_err());

        let config = SteppingConfig::new().with_birk_hc(0.0052, f64::NAN, 1.75);
        assert!(config.validate().is_err());

        let config = SteppingConfig::new().with_time_slice_ns(0.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_pattern() {
        let config = SteppingConfig::new().with_volume_names(Category::Ee, &[""]);
        assert!(config.validate().is_err());
    }
}
