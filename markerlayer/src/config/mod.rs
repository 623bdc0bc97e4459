//! Runtime configuration.
//!
//! [`MarkerLayerConfig`] bundles the tunables of every subsystem;
//! [`DisplayModeCatalog`] is the data-driven list of display modes a
//! deployment offers (loaded from JSON, typically shipped next to the data
//! source configuration).

use serde::{Deserialize, Serialize};

use crate::icon::MetricRegime;
use crate::interact::InteractConfig;
use crate::poller::PollerConfig;
use crate::reconcile::{DisplayMode, ReconcileConfig};

/// Default coordinator submission channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Top-level configuration for the marker layer.
#[derive(Debug, Clone)]
pub struct MarkerLayerConfig {
    pub reconcile: ReconcileConfig,
    pub poller: PollerConfig,
    pub interact: InteractConfig,
    pub channel_capacity: usize,
}

impl MarkerLayerConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for MarkerLayerConfig {
    fn default() -> Self {
        Self {
            reconcile: ReconcileConfig::default(),
            poller: PollerConfig::default(),
            interact: InteractConfig::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Errors from loading configuration data.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid display mode catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("display mode catalog is empty")]
    EmptyCatalog,
}

/// One display mode as described by deployment data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayModeDescriptor {
    /// Human-readable label.
    pub name: String,

    /// Stable key used to select the mode.
    pub value: String,

    /// Maximum for the continuous regime; absent means discrete states.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    /// Invert the continuous color ramp (low values are good).
    #[serde(default)]
    pub reverse: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

impl DisplayModeDescriptor {
    /// The metric regime this descriptor names.
    pub fn regime(&self) -> MetricRegime {
        match self.max {
            Some(max) if self.reverse => MetricRegime::continuous_reversed(max),
            Some(max) => MetricRegime::continuous(max),
            None => MetricRegime::discrete(),
        }
    }

    /// Full display mode (unclustered; clustering is a runtime modifier).
    pub fn mode(&self) -> DisplayMode {
        DisplayMode {
            metric: self.regime(),
            clustered: false,
        }
    }
}

/// The set of display modes a deployment offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayModeCatalog {
    modes: Vec<DisplayModeDescriptor>,
}

impl DisplayModeCatalog {
    /// Parses a catalog from its JSON form (an array of descriptors).
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let modes: Vec<DisplayModeDescriptor> = serde_json::from_str(json)?;
        if modes.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }
        Ok(Self { modes })
    }

    /// Looks up a mode by its stable key.
    pub fn find(&self, value: &str) -> Option<&DisplayModeDescriptor> {
        self.modes.iter().find(|mode| mode.value == value)
    }

    /// The first mode, used until the user picks one. `None` only for a
    /// catalog deserialized from an empty array, which `from_json` rejects.
    pub fn default_mode(&self) -> Option<&DisplayModeDescriptor> {
        self.modes.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DisplayModeDescriptor> {
        self.modes.iter()
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }
}

impl Default for DisplayModeCatalog {
    fn default() -> Self {
        Self {
            modes: vec![
                DisplayModeDescriptor {
                    name: "Status".to_string(),
                    value: "status".to_string(),
                    max: None,
                    reverse: false,
                    units: None,
                },
                DisplayModeDescriptor {
                    name: "Load".to_string(),
                    value: "load".to_string(),
                    max: Some(100.0),
                    reverse: true,
                    units: Some("%".to_string()),
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_from_json() {
        let catalog = DisplayModeCatalog::from_json(
            r#"[
                {"name": "Status", "value": "status"},
                {"name": "Throughput", "value": "tput", "max": 500.0, "units": "Mbit/s"}
            ]"#,
        )
        .unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.default_mode().unwrap().value, "status");

        let tput = catalog.find("tput").unwrap();
        assert_eq!(tput.max, Some(500.0));
        assert_eq!(tput.regime(), MetricRegime::continuous(500.0));
    }

    #[test]
    fn test_descriptor_without_max_is_discrete() {
        let catalog = DisplayModeCatalog::default();
        assert_eq!(
            catalog.find("status").unwrap().regime(),
            MetricRegime::discrete()
        );
    }

    #[test]
    fn test_reverse_descriptor() {
        let catalog = DisplayModeCatalog::default();
        assert_eq!(
            catalog.find("load").unwrap().regime(),
            MetricRegime::continuous_reversed(100.0)
        );
    }

    #[test]
    fn test_empty_catalog_rejected() {
        assert!(matches!(
            DisplayModeCatalog::from_json("[]"),
            Err(ConfigError::EmptyCatalog)
        ));
    }

    #[test]
    fn test_malformed_catalog_rejected() {
        assert!(matches!(
            DisplayModeCatalog::from_json("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_default_mode_of_deserialized_empty_catalog() {
        // Deserializing the struct directly bypasses from_json's check;
        // default_mode must not panic on the result
        let catalog: DisplayModeCatalog = serde_json::from_str(r#"{"modes":[]}"#).unwrap();
        assert!(catalog.default_mode().is_none());
    }

    #[test]
    fn test_unknown_mode_not_found() {
        assert!(DisplayModeCatalog::default().find("nonexistent").is_none());
    }
}
