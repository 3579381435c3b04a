use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::archive::{EntryCompression, ErrorPolicy, SymlinkPolicy};
use crate::error::{Result, XpackError};
use crate::gate::MediaGate;
use crate::report::render::ImageLayout;

use super::defaults::*;
use super::deserialize::*;
use super::util::expand_tilde;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct XpackConfig {
    /// Directory to archive. Must be given here or on the command line.
    #[serde(default)]
    pub source_dir: Option<String>,
    #[serde(default = "default_destination")]
    pub destination: String,
    #[serde(default)]
    pub compression: EntryCompression,
    #[serde(default)]
    pub on_error: ErrorPolicy,
    #[serde(default)]
    pub symlinks: SymlinkPolicy,
    #[serde(default, deserialize_with = "deserialize_duration")]
    pub entry_delay: Duration,
    /// Ask for a yes/no confirmation before archiving.
    #[serde(default)]
    pub confirm: bool,
    #[serde(default)]
    pub log_image: LogImageConfig,
    #[serde(default)]
    pub media_gate: MediaGateConfig,
}

impl Default for XpackConfig {
    fn default() -> Self {
        Self {
            source_dir: None,
            destination: default_destination(),
            compression: EntryCompression::default(),
            on_error: ErrorPolicy::default(),
            symlinks: SymlinkPolicy::default(),
            entry_delay: Duration::ZERO,
            confirm: false,
            log_image: LogImageConfig::default(),
            media_gate: MediaGateConfig::default(),
        }
    }
}

impl XpackConfig {
    pub fn validate(&self) -> Result<()> {
        if self.destination.trim().is_empty() {
            return Err(XpackError::Config("'destination' must not be empty".into()));
        }
        if matches!(&self.source_dir, Some(s) if s.trim().is_empty()) {
            return Err(XpackError::Config("'source_dir' must not be empty".into()));
        }
        self.log_image.validate()?;
        self.media_gate.validate()?;
        Ok(())
    }

    pub fn source_path(&self) -> Option<PathBuf> {
        self.source_dir.as_deref().map(expand_tilde)
    }

    pub fn destination_path(&self) -> PathBuf {
        expand_tilde(&self.destination)
    }
}

/// Largest accepted log image side, in pixels.
pub const MAX_IMAGE_SIDE: u32 = 16_384;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogImageConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_log_image_path")]
    pub path: String,
    /// Most recent lines kept for the image.
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
    #[serde(default = "default_image_width")]
    pub width: u32,
    #[serde(default = "default_image_height")]
    pub height: u32,
}

impl Default for LogImageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_log_image_path(),
            max_lines: default_max_lines(),
            width: default_image_width(),
            height: default_image_height(),
        }
    }
}

impl LogImageConfig {
    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(XpackError::Config(
                "log_image.width and log_image.height must be greater than zero".into(),
            ));
        }
        if self.width > MAX_IMAGE_SIDE || self.height > MAX_IMAGE_SIDE {
            return Err(XpackError::Config(format!(
                "log_image.width and log_image.height must be at most {MAX_IMAGE_SIDE}"
            )));
        }
        if self.enabled && self.path.trim().is_empty() {
            return Err(XpackError::Config("log_image.path must not be empty".into()));
        }
        Ok(())
    }

    pub fn layout(&self) -> ImageLayout {
        ImageLayout {
            width: self.width,
            height: self.height,
            ..ImageLayout::default()
        }
    }

    pub fn output_path(&self) -> PathBuf {
        expand_tilde(&self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MediaGateConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_mount_path")]
    pub mount_path: String,
    #[serde(
        default = "default_poll_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub poll_interval: Duration,
    #[serde(default, deserialize_with = "deserialize_optional_duration")]
    pub timeout: Option<Duration>,
}

impl Default for MediaGateConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mount_path: default_mount_path(),
            poll_interval: default_poll_interval(),
            timeout: None,
        }
    }
}

impl MediaGateConfig {
    fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(XpackError::Config(
                "media_gate.poll_interval must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn to_gate(&self) -> MediaGate {
        MediaGate {
            mount_path: expand_tilde(&self.mount_path),
            poll_interval: self.poll_interval,
            timeout: self.timeout,
        }
    }
}
