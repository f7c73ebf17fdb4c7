//! Environment and flag overrides applied on top of the loaded config file.
//!
//! Each override reads the long-established environment variable name as a
//! fallback, so existing deployments keep working unchanged.

use clap::builder::BoolishValueParser;
use clap::Args;
use shutter_core::{Config, SortMode};

/// Global overrides, resolved once at startup.
#[derive(Args, Debug, Default)]
pub struct Overrides {
    /// Default log filter (e.g. `debug`, `shutter_core=trace`)
    #[arg(long, global = true, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Ignore existing caches and regenerate every run
    #[arg(long, global = true, env = "DISABLE_CACHE", value_parser = BoolishValueParser::new())]
    pub disable_cache: Option<bool>,

    /// Default photo sort mode
    #[arg(long, global = true, env = "PHOTO_SORT", value_parser = parse_sort_mode)]
    pub photo_sort: Option<SortMode>,

    /// Reverse the default sort order
    #[arg(long, global = true, env = "PHOTO_DEFAULT_REVERSE", value_parser = BoolishValueParser::new())]
    pub photo_default_reverse: Option<bool>,

    /// Use EXIF-embedded thumbnails as placeholders
    #[arg(long, global = true, env = "NODE_USE_EMBEDDED_THUMBNAILS", value_parser = BoolishValueParser::new())]
    pub use_embedded_thumbnails: Option<bool>,

    /// Skip blur placeholder generation
    #[arg(long, global = true, env = "NODE_DISABLE_BLUR_GENERATION", value_parser = BoolishValueParser::new())]
    pub disable_blur_generation: Option<bool>,

    /// Image service URL used for metadata requests
    #[arg(long, global = true, env = "IMAGOR_SERVER_BASE_URL")]
    pub imagor_server_base_url: Option<String>,

    /// Image service URL used in display URLs
    #[arg(long, global = true, env = "IMAGOR_CLIENT_BASE_URL")]
    pub imagor_client_base_url: Option<String>,

    /// Shared secret for signing image service URLs
    #[arg(long, global = true, env = "IMAGOR_SECRET", hide_env_values = true)]
    pub imagor_secret: Option<String>,

    /// Output format requested from the image service
    #[arg(long, global = true, env = "IMAGOR_IMAGE_FORMAT")]
    pub imagor_image_format: Option<String>,

    /// Extra filter chain for display URLs (e.g. `:hue(290)`)
    #[arg(long, global = true, env = "IMAGOR_IMAGE_FILTERS")]
    pub imagor_image_filters: Option<String>,
}

impl Overrides {
    /// Write every provided override into `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(disable) = self.disable_cache {
            config.processing.disable_cache = disable;
        }
        if let Some(sort) = self.photo_sort {
            config.photo.sort = sort;
        }
        if let Some(reverse) = self.photo_default_reverse {
            config.photo.default_reverse = reverse;
        }
        if let Some(use_thumbnails) = self.use_embedded_thumbnails {
            config.processing.use_embedded_thumbnails = use_thumbnails;
        }
        if let Some(disable) = self.disable_blur_generation {
            config.processing.disable_blur_generation = disable;
        }
        if let Some(url) = &self.imagor_server_base_url {
            config.remote.server_url = Some(url.clone());
        }
        if let Some(url) = &self.imagor_client_base_url {
            config.remote.client_url = Some(url.clone());
        }
        if let Some(secret) = &self.imagor_secret {
            config.remote.secret = Some(secret.clone());
        }
        if let Some(format) = &self.imagor_image_format {
            config.remote.image_format = format.clone();
        }
        if let Some(filters) = &self.imagor_image_filters {
            config.remote.image_filters = filters.clone();
        }
    }
}

pub fn parse_sort_mode(s: &str) -> Result<SortMode, String> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_overrides_keep_config() {
        let mut config = Config::default();
        Overrides::default().apply(&mut config);
        assert!(!config.uses_remote());
        assert_eq!(config.photo.sort, SortMode::ImageTakenDate);
        assert!(!config.processing.disable_cache);
    }

    #[test]
    fn test_apply_overrides() {
        let overrides = Overrides {
            photo_sort: Some(SortMode::NumericalFileName),
            photo_default_reverse: Some(true),
            use_embedded_thumbnails: Some(true),
            imagor_secret: Some("s3cr3t".to_string()),
            imagor_image_filters: Some(":hue(290)".to_string()),
            ..Default::default()
        };
        let mut config = Config::default();
        overrides.apply(&mut config);

        assert_eq!(config.photo.sort, SortMode::NumericalFileName);
        assert!(config.photo.default_reverse);
        assert!(config.processing_options().use_thumbnails);
        assert_eq!(config.remote.secret.as_deref(), Some("s3cr3t"));
        assert_eq!(config.remote.image_filters, ":hue(290)");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_override_fails_validation() {
        let overrides = Overrides {
            imagor_image_format: Some("bmp".to_string()),
            ..Default::default()
        };
        let mut config = Config::default();
        overrides.apply(&mut config);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_sort_mode() {
        assert_eq!(parse_sort_mode("modified_at").unwrap(), SortMode::ModifiedAt);
        assert!(parse_sort_mode("newest").is_err());
    }
}
