use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::tumour::TumourLayer;

/// Tolerances and seeding for a generator run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Seed for random sidedness; `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Distance within which an existing point counts as an occurrence node.
    pub lookup_tolerance: f64,
    /// Maximum deviation when flattening curves into points.
    pub flatten_tolerance: f64,
    /// Distance of the support points added around each occurrence.
    pub local_curvature_distance: f64,
    /// Maximum deviation when simplifying point runs during reconstruction.
    pub simplify_tolerance: f64,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            seed: None,
            lookup_tolerance: 1e-6,
            flatten_tolerance: 0.1,
            local_curvature_distance: 2.0,
            simplify_tolerance: 0.05,
        }
    }
}

impl GeneratorSettings {
    /// Checks that every tolerance is positive and finite.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad setting.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let tolerances = [
            ("lookup_tolerance", self.lookup_tolerance),
            ("flatten_tolerance", self.flatten_tolerance),
            ("simplify_tolerance", self.simplify_tolerance),
        ];
        for (name, value) in tolerances {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")));
            }
        }
        if !(self.local_curvature_distance.is_finite() && self.local_curvature_distance >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "local_curvature_distance must not be negative, got {}",
                self.local_curvature_distance
            )));
        }
        Ok(())
    }
}

/// Serialized generator setup: settings plus the ordered layers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TumourGeneratorConfig {
    #[serde(default)]
    pub settings: GeneratorSettings,
    #[serde(default)]
    pub layers: Vec<TumourLayer>,
}

impl TumourGeneratorConfig {
    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::Invalid`] for out-of-range settings or layers.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self).map_err(ConfigError::from)?)
    }

    /// Validates the settings and every layer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.settings.validate()?;
        for (index, layer) in self.layers.iter().enumerate() {
            layer
                .validate()
                .map_err(|e| ConfigError::Invalid(format!("layer {index}: {e}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::TumourError;
    use crate::tumour::{Sidedness, TemplateKind};

    #[test]
    fn defaults_fill_missing_fields() {
        let config = TumourGeneratorConfig::from_json(r#"{ "settings": { "seed": 42 } }"#).unwrap();
        assert_eq!(config.settings.seed, Some(42));
        assert!((config.settings.flatten_tolerance - 0.1).abs() < f64::EPSILON);
        assert!(config.layers.is_empty());
    }

    #[test]
    fn layers_parse_in_order() {
        let json = r#"{
            "layers": [
                { "template": "square", "count": 2 },
                { "template": "wave", "sidedness": "alternating_right", "is_active": false }
            ]
        }"#;
        let config = TumourGeneratorConfig::from_json(json).unwrap();
        assert_eq!(config.layers.len(), 2);
        assert!(matches!(config.layers[0].template, TemplateKind::Square));
        assert_eq!(config.layers[1].sidedness, Sidedness::AlternatingRight);
        assert!(!config.layers[1].is_active);
    }

    #[test]
    fn round_trips_through_json() {
        let config = TumourGeneratorConfig::from_json(r#"{ "layers": [ { "count": 3 } ] }"#).unwrap();
        let again = TumourGeneratorConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(again.settings, config.settings);
        assert_eq!(again.layers[0].count, 3);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = TumourGeneratorConfig::from_json("{ layers: ").unwrap_err();
        assert!(matches!(err, TumourError::Config(ConfigError::Parse(_))));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = TumourGeneratorConfig::from_json(r#"{ "settings": { "flatten_tolerance": 0.0 } }"#)
            .unwrap_err();
        assert!(matches!(err, TumourError::Config(ConfigError::Invalid(_))));

        let err = TumourGeneratorConfig::from_json(r#"{ "layers": [ { "start": 0.9, "end": 0.1 } ] }"#)
            .unwrap_err();
        assert!(matches!(err, TumourError::Config(ConfigError::Invalid(_))));
    }
}
