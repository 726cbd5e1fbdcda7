//! Stepping configuration files.

use crate::Result;
use calohit_core::SteppingConfig;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Parses and validates a configuration from a JSON string.
///
/// Absent fields take their default values; unknown fields are rejected.
///
/// # Errors
/// Returns an error if the document is malformed or fails validation.
pub fn config_from_json(json: &str) -> Result<SteppingConfig> {
    let config: SteppingConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

/// Loads and validates a configuration file.
///
/// # Errors
/// Returns an error if the file cannot be read, is malformed or fails
/// validation.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SteppingConfig> {
    let reader = BufReader::new(File::open(path)?);
    let config: SteppingConfig = serde_json::from_reader(reader)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use calohit_core::Category;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = config_from_json("{}").unwrap();
        assert_eq!(config, SteppingConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let config = config_from_json(
            r#"{
                "eb_volume_names": ["EBRY", "EBCR"],
                "slope_light_yield": 0.05,
                "birk_hc": { "c1": 0.01, "c2": 0.1, "c3": 2.0 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.volume_names(Category::Eb), ["EBRY", "EBCR"]);
        assert!((config.slope_light_yield - 0.05).abs() < f64::EPSILON);
        assert!((config.birk_hc.c3 - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.collection_label(Category::Hc), "HcalHits");
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = config_from_json(r#"{ "slope": 0.1 }"#).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = config_from_json(r#"{ "hit_collection_names": ["A", "A", "B"] }"#).unwrap_err();
        assert!(matches!(
            err,
            Error::CoreError(calohit_core::Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_load_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "time_slice_ns": 25.0 }}"#).unwrap();
        let config = load_config(file.path()).unwrap();
        assert!((config.time_slice_ns - 25.0).abs() < f64::EPSILON);
    }
}
