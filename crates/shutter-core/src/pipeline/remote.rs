//! Remote metadata extraction through an external image service.
//!
//! Talks to an imagor-compatible HTTP server: `GET {base}/{hash}/meta/{path}`
//! returns dimensions and EXIF, and display images are served from
//! `{base}/{hash}/{W}x{H}/filters:format(..)/{path}`. The `hash` segment is
//! an HMAC-SHA1 of the request path when a secret is shared with the
//! service, or the literal `unsafe` otherwise.

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha1::Sha1;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::metadata::parse_date_time_original;
use super::retry;
use super::scope::site_src;
use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::types::ProcessedPhoto;

type HmacSha1 = Hmac<Sha1>;

/// Hash segment used when no secret is configured.
pub const UNSAFE_HASH: &str = "unsafe";

/// Width placeholder in thumbnail URL templates.
pub const WIDTH_VAR: &str = "WIDTH_VAR";

/// Height placeholder in thumbnail URL templates.
pub const HEIGHT_VAR: &str = "HEIGHT_VAR";

/// `GET /meta/..` response body.
#[derive(Debug, Deserialize)]
struct MetaResponse {
    width: u32,
    height: u32,
    #[serde(default)]
    exif: MetaExif,
}

#[derive(Debug, Default, Deserialize)]
struct MetaExif {
    #[serde(rename = "DateTimeOriginal")]
    date_time_original: Option<String>,
}

/// Extractor that delegates to a remote image service.
#[derive(Debug, Clone)]
pub struct RemoteExtractor {
    server_url: String,
    client_url: Option<String>,
    secret: Option<String>,
    image_format: String,
    image_filters: String,
    public_dir: PathBuf,
    client: reqwest::Client,
    timeout: Duration,
    retry_attempts: u32,
    retry_delay_ms: u64,
}

impl RemoteExtractor {
    /// Build from configuration. Fails if no server URL is configured.
    pub fn from_config(config: &Config) -> PipelineResult<Self> {
        let server_url = config
            .remote
            .server_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| PipelineError::Remote {
                message: "remote.server_url is not configured".to_string(),
                status_code: None,
            })?;

        Ok(Self {
            server_url,
            client_url: config.remote.client_url.clone().filter(|u| !u.is_empty()),
            secret: config.remote.secret.clone().filter(|s| !s.is_empty()),
            image_format: config.remote.image_format.clone(),
            image_filters: config.remote.image_filters.clone(),
            public_dir: config.public_dir(),
            client: reqwest::Client::new(),
            timeout: Duration::from_millis(config.limits.request_timeout_ms),
            retry_attempts: config.limits.retry_attempts,
            retry_delay_ms: config.limits.retry_delay_ms,
        })
    }

    /// Path of the image relative to the serving root, percent-encoded per
    /// segment.
    fn encoded_relative_path(&self, image_path: &Path) -> PipelineResult<String> {
        let src = site_src(image_path, &self.public_dir)?;
        Ok(src
            .trim_start_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/"))
    }

    /// Signed metadata URL for an image.
    pub fn meta_url(&self, image_path: &Path) -> PipelineResult<String> {
        let path = format!("/meta/{}", self.encoded_relative_path(image_path)?);
        Ok(signed_url(&self.server_url, &path, self.secret.as_deref()))
    }

    /// Display URL template with [`WIDTH_VAR`]/[`HEIGHT_VAR`] placeholders.
    pub fn thumbnail_template(&self, image_path: &Path) -> PipelineResult<String> {
        let base = self.client_url.as_deref().unwrap_or(&self.server_url);
        let path = format!(
            "/{WIDTH_VAR}x{HEIGHT_VAR}/filters:format({}){}/{}",
            self.image_format,
            self.image_filters,
            self.encoded_relative_path(image_path)?
        );
        Ok(signed_url(base, &path, self.secret.as_deref()))
    }

    /// Fetch metadata for one image, retrying transient failures.
    pub async fn extract(&self, image_path: &Path) -> PipelineResult<ProcessedPhoto> {
        let url = self.meta_url(image_path)?;
        let thumbnail_src = self.thumbnail_template(image_path)?;
        let mut last_error = None;

        for attempt in 0..=self.retry_attempts {
            if attempt > 0 {
                let delay = retry::backoff_duration(attempt - 1, self.retry_delay_ms);
                tracing::debug!(
                    "Retry {attempt}/{} for {:?} after {delay:?}",
                    self.retry_attempts,
                    image_path
                );
                tokio::time::sleep(delay).await;
            }

            let result = match tokio::time::timeout(self.timeout, self.fetch_meta(image_path, &url))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(self.timeout_error(image_path)),
            };

            match result {
                Ok(meta) => return to_photo(image_path, meta, thumbnail_src),
                Err(e) if retry::is_retryable(&e) => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(PipelineError::Remote {
            message: "no attempts made".to_string(),
            status_code: None,
        }))
    }

    async fn fetch_meta(&self, image_path: &Path, url: &str) -> PipelineResult<MetaResponse> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.send_error(image_path, url, e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Remote {
                message: format!("Metadata HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        resp.json().await.map_err(|e| PipelineError::Remote {
            message: format!("Failed to parse metadata response: {e}"),
            status_code: None,
        })
    }

    fn timeout_error(&self, image_path: &Path) -> PipelineError {
        PipelineError::Timeout {
            path: image_path.to_path_buf(),
            stage: "remote".to_string(),
            timeout_ms: self.timeout.as_millis() as u64,
        }
    }

    /// Classify a failed send by what reqwest reports, not by its message.
    fn send_error(&self, image_path: &Path, url: &str, error: reqwest::Error) -> PipelineError {
        if error.is_timeout() {
            self.timeout_error(image_path)
        } else if error.is_connect() || error.is_request() {
            PipelineError::Unreachable {
                url: url.to_string(),
                message: error.to_string(),
            }
        } else {
            PipelineError::Remote {
                message: format!("Metadata request failed: {error}"),
                status_code: None,
            }
        }
    }
}

fn to_photo(
    image_path: &Path,
    meta: MetaResponse,
    thumbnail_src: String,
) -> PipelineResult<ProcessedPhoto> {
    if meta.width == 0 || meta.height == 0 {
        return Err(PipelineError::Extraction {
            path: image_path.to_path_buf(),
            message: format!("Service reported size {}x{}", meta.width, meta.height),
        });
    }
    Ok(ProcessedPhoto {
        width: meta.width,
        height: meta.height,
        blur_data_url: None,
        date_time_original_ms: meta
            .exif
            .date_time_original
            .as_deref()
            .and_then(parse_date_time_original),
        thumbnail_src: Some(thumbnail_src),
    })
}

/// Hash segment for a request path.
pub fn sign_path(path: &str, secret: Option<&str>) -> String {
    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        return UNSAFE_HASH.to_string();
    };
    // HMAC accepts keys of any length
    let Ok(mut mac) = HmacSha1::new_from_slice(secret.as_bytes()) else {
        return UNSAFE_HASH.to_string();
    };
    mac.update(path.as_bytes());
    URL_SAFE.encode(mac.finalize().into_bytes())
}

/// `{base}/{hash}{path}` for a path starting with `/`.
pub fn signed_url(base: &str, path: &str, secret: Option<&str>) -> String {
    format!(
        "{}/{}{}",
        base.trim_end_matches('/'),
        sign_path(path, secret),
        path
    )
}

/// Substitute concrete dimensions into a thumbnail URL template.
pub fn resolve_thumbnail_src(template: &str, width: u32, height: u32) -> String {
    template
        .replace(WIDTH_VAR, &width.to_string())
        .replace(HEIGHT_VAR, &height.to_string())
}
