//! Configuration validation with range checks.

use crate::error::ConfigError;
use crate::pipeline::scope::normalize;

use super::{Config, REMOTE_IMAGE_FORMATS};

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Every photo's `src` is its path below the public directory
        if !normalize(&self.photos_dir()).starts_with(normalize(&self.public_dir())) {
            return Err(ConfigError::ValidationError(format!(
                "general.photos_dir ({}) must be inside general.public_dir ({})",
                self.general.photos_dir.display(),
                self.general.public_dir.display()
            )));
        }
        if self.processing.supported_formats.is_empty() {
            return Err(ConfigError::ValidationError(
                "processing.supported_formats must not be empty".into(),
            ));
        }
        if self.processing.placeholder_size == 0 {
            return Err(ConfigError::ValidationError(
                "processing.placeholder_size must be > 0".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.file_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.file_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.request_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.request_timeout_ms must be > 0".into(),
            ));
        }
        if self.remote.parallel_requests == 0 {
            return Err(ConfigError::ValidationError(
                "remote.parallel_requests must be > 0".into(),
            ));
        }
        if !REMOTE_IMAGE_FORMATS.contains(&self.remote.image_format.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "remote.image_format must be one of {}, got '{}'",
                REMOTE_IMAGE_FORMATS.join(", "),
                self.remote.image_format
            )));
        }
        if !self.remote.image_filters.is_empty() && !self.remote.image_filters.starts_with(':') {
            return Err(ConfigError::ValidationError(
                "remote.image_filters must start with ':'".into(),
            ));
        }
        if let Some(url) = self.remote.server_url.as_deref().filter(|u| !u.is_empty()) {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::ValidationError(format!(
                    "remote.server_url must be an http(s) URL, got '{url}'"
                )));
            }
        }
        Ok(())
    }
}
