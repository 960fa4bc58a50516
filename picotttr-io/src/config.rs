//! Encoder configuration.
//!
//! Loaded from JSON; every field is optional and falls back to the values
//! below.
//!
//! ```json
//! {
//!   "sync_rate_hz": 40000000,
//!   "resolution_ps": 25.0,
//!   "markers": { "frame": 4 }
//! }
//! ```

use crate::{Error, Result};
use picotttr_core::MarkerLayout;
use picotttr_ptu::Tag;
use picotttr_tttr::{ScanEncoder, MAX_PHOTON_CHANNEL};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// GUID written when none is configured.
pub const DEFAULT_FILE_GUID: &str = "{5320c18e-0f82-4508-e5ae-b6a6e7719890}";

/// Settings for writing a PTU file from a count image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Laser sync rate in Hz (default: 80 MHz).
    pub sync_rate_hz: u64,
    /// Width of one lifetime bin in ps (default: 96).
    pub resolution_ps: f64,
    /// Pixel size in µm (default: 1).
    pub pixel_resolution_um: f64,
    /// Channel photons are written on (default: 1).
    pub photon_channel: u8,
    /// Marker channels (default: 1/2/3).
    pub markers: MarkerLayout,
    pub file_guid: String,
    pub creator_name: String,
    pub creator_version: String,
    /// Tags appended after the standard ones.
    pub extra_tags: Vec<Tag>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            sync_rate_hz: 80_000_000,
            resolution_ps: 96.0,
            pixel_resolution_um: 1.0,
            photon_channel: 1,
            markers: MarkerLayout::default(),
            file_guid: DEFAULT_FILE_GUID.to_string(),
            creator_name: "picotttr".to_string(),
            creator_version: env!("CARGO_PKG_VERSION").to_string(),
            extra_tags: Vec::new(),
        }
    }
}

impl EncoderConfig {
    /// Load configuration from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON string.
    ///
    /// # Errors
    /// Returns an error if the JSON cannot be parsed or validated.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the sync rate in Hz.
    #[must_use]
    pub fn with_sync_rate_hz(mut self, rate: u64) -> Self {
        self.sync_rate_hz = rate;
        self
    }

    /// Set the lifetime bin width in ps.
    #[must_use]
    pub fn with_resolution_ps(mut self, resolution: f64) -> Self {
        self.resolution_ps = resolution;
        self
    }

    /// Set the pixel size in µm.
    #[must_use]
    pub fn with_pixel_resolution_um(mut self, resolution: f64) -> Self {
        self.pixel_resolution_um = resolution;
        self
    }

    /// Set the photon channel.
    #[must_use]
    pub fn with_photon_channel(mut self, channel: u8) -> Self {
        self.photon_channel = channel;
        self
    }

    /// Set the marker channels.
    #[must_use]
    pub fn with_markers(mut self, markers: MarkerLayout) -> Self {
        self.markers = markers;
        self
    }

    /// Append a tag after the standard header tags.
    #[must_use]
    pub fn with_extra_tag(mut self, tag: Tag) -> Self {
        self.extra_tags.push(tag);
        self
    }

    /// Checks that every setting can be written.
    ///
    /// # Errors
    /// Returns [`Error::Config`] describing the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.sync_rate_hz == 0 {
            return Err(Error::Config("sync_rate_hz must be positive".into()));
        }
        if !(self.resolution_ps.is_finite() && self.resolution_ps > 0.0) {
            return Err(Error::Config(format!(
                "resolution_ps must be positive, got {}",
                self.resolution_ps
            )));
        }
        if !(self.pixel_resolution_um.is_finite() && self.pixel_resolution_um > 0.0) {
            return Err(Error::Config(format!(
                "pixel_resolution_um must be positive, got {}",
                self.pixel_resolution_um
            )));
        }
        if self.photon_channel > MAX_PHOTON_CHANNEL {
            return Err(Error::Config(format!(
                "photon_channel must be at most {MAX_PHOTON_CHANNEL}, got {}",
                self.photon_channel
            )));
        }
        if !self.markers.is_valid() {
            return Err(Error::Config(format!(
                "marker channels must be distinct and within 1..=4, got {:?}",
                self.markers
            )));
        }
        Ok(())
    }

    /// Sync period in seconds.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn global_resolution_s(&self) -> f64 {
        1.0 / self.sync_rate_hz as f64
    }

    /// Lifetime bin width in seconds.
    #[must_use]
    pub fn resolution_s(&self) -> f64 {
        self.resolution_ps * 1e-12
    }

    /// Scan encoder using these channel settings.
    #[must_use]
    pub fn encoder(&self) -> ScanEncoder {
        ScanEncoder::new()
            .with_markers(self.markers)
            .with_photon_channel(self.photon_channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let config = EncoderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sync_rate_hz, 80_000_000);
        assert_relative_eq!(config.global_resolution_s(), 12.5e-9);
        assert_relative_eq!(config.resolution_s(), 96e-12);
    }

    #[test]
    fn test_partial_json() {
        let config = EncoderConfig::from_json(
            r#"{ "sync_rate_hz": 40000000, "markers": { "frame": 4 } }"#,
        )
        .unwrap();
        assert_eq!(config.sync_rate_hz, 40_000_000);
        assert_eq!(config.markers, MarkerLayout::new(1, 2, 4));
        assert_relative_eq!(config.resolution_ps, 96.0);
        assert_eq!(config.creator_name, "picotttr");
    }

    #[test]
    fn test_invalid_json_values() {
        assert!(matches!(
            EncoderConfig::from_json(r#"{ "photon_channel": 15 }"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            EncoderConfig::from_json(r#"{ "resolution_ps": -1.0 }"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            EncoderConfig::from_json(r#"{ "markers": { "line_start": 2 } }"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            EncoderConfig::from_json("{ not json"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_builder() {
        let config = EncoderConfig::default()
            .with_sync_rate_hz(20_000_000)
            .with_resolution_ps(8.0)
            .with_photon_channel(0)
            .with_extra_tag(Tag::string("File_Comment", "synthetic"));
        assert!(config.validate().is_ok());
        assert_eq!(config.extra_tags.len(), 1);
        assert_relative_eq!(config.global_resolution_s(), 50e-9);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("encoder.json");
        std::fs::write(&path, r#"{ "pixel_resolution_um": 0.25 }"#).unwrap();
        let config = EncoderConfig::from_file(&path).unwrap();
        assert_relative_eq!(config.pixel_resolution_um, 0.25);
    }
}
