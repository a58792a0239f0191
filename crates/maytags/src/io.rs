//! JSON configuration and readout files.

use crate::detector::{DetectionConfig, DetectorError};
use crate::merge::FrameReadout;
use crate::parallel::{PartitionConfig, PartitionedDetector};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(thiserror::Error, Debug)]
pub enum ConfigIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Detector and partition settings stored together on disk.
///
/// Missing fields take their defaults, so `{}` is a valid file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfigFile {
    pub detection: DetectionConfig,
    pub partition: PartitionConfig,
}

impl DetectorConfigFile {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn build_detector(&self) -> Result<PartitionedDetector, DetectorError> {
        PartitionedDetector::new(self.detection.clone(), self.partition.clone())
    }
}

impl FrameReadout {
    /// Load a readout from JSON on disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this readout to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
