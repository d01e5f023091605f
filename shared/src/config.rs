use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::ConfigError;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_CHUNK_SIZE: usize = 200;
pub const DEFAULT_ADVANCE_DELAY_MS: u64 = 300;
pub const DEFAULT_CRITICAL_IMAGES: usize = 4;
pub const DEFAULT_HIGH_IMAGES: usize = 12;
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://cdn.example.com/";
pub const DEFAULT_API_BASE_URL: &str = "https://api.example.com/";
pub const MAX_PAGE_SIZE: usize = 500;
pub const MAX_CRITICAL_IMAGES: usize = 16;

/// Tuning knobs for one catalog session. None of these affect correctness,
/// only pacing and per-frame work.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogConfig {
    pub page_size: usize,
    pub chunk_size: usize,
    pub advance_delay_ms: u64,
    pub critical_images: usize,
    pub high_images: usize,
    pub max_concurrent_preloads: usize,
    pub deferred_preload_delay_ms: u64,
    pub image_cache_capacity: usize,
    pub image_base_url: String,
    pub api_base_url: String,
    pub last_good_max_age_ms: u64,
    pub last_good_max_serves: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            advance_delay_ms: DEFAULT_ADVANCE_DELAY_MS,
            critical_images: DEFAULT_CRITICAL_IMAGES,
            high_images: DEFAULT_HIGH_IMAGES,
            max_concurrent_preloads: 4,
            deferred_preload_delay_ms: 150,
            image_cache_capacity: 512,
            image_base_url: DEFAULT_IMAGE_BASE_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            last_good_max_age_ms: 5 * 60 * 1000,
            last_good_max_serves: 3,
        }
    }
}

impl CatalogConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::OutOfRange {
                field: "page_size",
                value: self.page_size as u64,
                min: 1,
                max: MAX_PAGE_SIZE as u64,
            });
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be > 0".into()));
        }
        if self.critical_images == 0 || self.critical_images > MAX_CRITICAL_IMAGES {
            return Err(ConfigError::OutOfRange {
                field: "critical_images",
                value: self.critical_images as u64,
                min: 1,
                max: MAX_CRITICAL_IMAGES as u64,
            });
        }
        if self.max_concurrent_preloads == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_preloads must be > 0".into(),
            ));
        }
        if self.image_cache_capacity == 0 {
            return Err(ConfigError::Invalid("image_cache_capacity must be > 0".into()));
        }
        if self.last_good_max_age_ms == 0 {
            return Err(ConfigError::Invalid("last_good_max_age_ms must be > 0".into()));
        }
        Self::parse_base_url("image_base_url", &self.image_base_url)?;
        Self::parse_base_url("api_base_url", &self.api_base_url)?;
        Ok(())
    }

    pub fn page_size(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.page_size).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn chunk_size(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.chunk_size).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn image_cache_capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.image_cache_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    pub const fn advance_delay(&self) -> Duration {
        Duration::from_millis(self.advance_delay_ms)
    }

    pub const fn deferred_preload_delay(&self) -> Duration {
        Duration::from_millis(self.deferred_preload_delay_ms)
    }

    pub const fn last_good_max_age(&self) -> Duration {
        Duration::from_millis(self.last_good_max_age_ms)
    }

    pub fn image_base(&self) -> Result<Url, ConfigError> {
        Self::parse_base_url("image_base_url", &self.image_base_url)
    }

    pub fn api_base(&self) -> Result<Url, ConfigError> {
        Self::parse_base_url("api_base_url", &self.api_base_url)
    }

    /// Base URLs must be absolute http(s) and end in `/` so that
    /// `Url::join` appends instead of replacing the last segment.
    fn parse_base_url(field: &'static str, raw: &str) -> Result<Url, ConfigError> {
        let parsed = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidUrl {
            field,
            reason: e.to_string(),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                field,
                reason: format!("invalid scheme '{}', only 'http' and 'https' are allowed", parsed.scheme()),
            });
        }
        if parsed.host_str().is_none() {
            return Err(ConfigError::InvalidUrl {
                field,
                reason: "URL must have a host".to_string(),
            });
        }
        if parsed.username() != "" || parsed.password().is_some() {
            return Err(ConfigError::InvalidUrl {
                field,
                reason: "credentials in URL are not allowed".to_string(),
            });
        }
        if parsed.path().ends_with('/') {
            Ok(parsed)
        } else {
            let mut with_slash = parsed;
            let path = format!("{}/", with_slash.path());
            with_slash.set_path(&path);
            Ok(with_slash)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(CatalogConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_page_size() {
        let config = CatalogConfig {
            page_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { field: "page_size", .. })
        ));
    }

    #[test]
    fn rejects_non_http_base() {
        let config = CatalogConfig {
            image_base_url: "ftp://cdn.example.com/".into(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUrl { field: "image_base_url", .. })
        ));
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let config = CatalogConfig {
            image_base_url: "https://cdn.example.com/media".into(),
            ..Default::default()
        };
        let base = config.image_base().unwrap();
        assert_eq!(base.as_str(), "https://cdn.example.com/media/");
    }

    #[test]
    fn deserializes_partial_json() {
        let config: CatalogConfig = serde_json::from_str(r#"{"pageSize": 10}"#).unwrap();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
    }
}
