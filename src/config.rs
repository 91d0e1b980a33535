use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{DealerError, Result};
use crate::merge::Placeholder;
use crate::retry::RetryPolicy;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "avif", "svg"];

pub const DEFAULT_LOCAL_PREFIX: &str = "/images/cards";
pub const DEFAULT_PLACEHOLDER_PATH: &str = "/placeholder.svg";
pub const DEFAULT_PLACEHOLDER_WIDTH: u32 = 250;
pub const DEFAULT_PLACEHOLDER_HEIGHT: u32 = 400;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_LISTING_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_PROBE_CONCURRENCY: usize = 8;

/// Upper bound on cursor pages followed for a single blob listing.
pub const MAX_LISTING_PAGES: usize = 20;

pub const ENV_PREFIX: &str = "CARD_DEALER_";

/// Returns true if the path or URL ends in a known image extension.
pub fn is_image_path(path: &str) -> bool {
    let clean = path.split(['?', '#']).next().unwrap_or(path);
    let name = clean.rsplit('/').next().unwrap_or(clean);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// DealerConfig
// ---------------------------------------------------------------------------

/// Serializable settings for a [`CardDealer`](crate::CardDealer).
///
/// Every field has a default, so a config file only needs to name the
/// values it changes. Use [`CardDealerBuilder::from_config`](crate::CardDealerBuilder::from_config)
/// to turn a config into a builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DealerConfig {
    /// Remote blob listing endpoint. No remote origin when unset.
    pub blob_list_url: Option<String>,
    /// Bearer token sent with blob listing requests.
    pub blob_token: Option<String>,
    /// URL prefix under which local card images are served.
    pub local_prefix: String,
    /// JSON manifest (array of relative paths) describing local images.
    pub local_manifest: Option<PathBuf>,
    /// Directory scanned for local images when no manifest is given.
    pub local_dir: Option<PathBuf>,
    /// Site origin used to probe relative image paths over HTTP.
    pub site_base_url: Option<String>,
    /// Filesystem root used to probe relative image paths on disk.
    pub asset_root: Option<PathBuf>,
    pub probe_timeout_ms: u64,
    pub listing_timeout_ms: u64,
    pub probe_concurrency: usize,
    pub retry: RetryPolicy,
    pub placeholder: Placeholder,
}

impl Default for DealerConfig {
    fn default() -> Self {
        Self {
            blob_list_url: None,
            blob_token: None,
            local_prefix: DEFAULT_LOCAL_PREFIX.to_string(),
            local_manifest: None,
            local_dir: None,
            site_base_url: None,
            asset_root: None,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT.as_millis() as u64,
            listing_timeout_ms: DEFAULT_LISTING_TIMEOUT.as_millis() as u64,
            probe_concurrency: DEFAULT_PROBE_CONCURRENCY,
            retry: RetryPolicy::default(),
            placeholder: Placeholder::default(),
        }
    }
}

impl DealerConfig {
    /// Load a config from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Build a config from `CARD_DEALER_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build a config from a variable lookup, starting from the defaults.
    ///
    /// Keys are looked up with the [`ENV_PREFIX`] prepended, e.g.
    /// `CARD_DEALER_BLOB_LIST_URL`. Unset variables keep their default.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();
        config.blob_list_url = get("BLOB_LIST_URL");
        config.blob_token = get("BLOB_TOKEN");
        config.site_base_url = get("SITE_BASE_URL");
        config.asset_root = get("ASSET_ROOT").map(PathBuf::from);
        config.local_dir = get("LOCAL_DIR").map(PathBuf::from);
        config.local_manifest = get("LOCAL_MANIFEST").map(PathBuf::from);
        if let Some(prefix) = get("LOCAL_PREFIX") {
            config.local_prefix = prefix;
        }
        if let Some(v) = get("PROBE_TIMEOUT_MS") {
            config.probe_timeout_ms = parse_number("PROBE_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("LISTING_TIMEOUT_MS") {
            config.listing_timeout_ms = parse_number("LISTING_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("PROBE_CONCURRENCY") {
            config.probe_concurrency = parse_number("PROBE_CONCURRENCY", &v)?;
        }
        if let Some(v) = get("MAX_ATTEMPTS") {
            config.retry.max_attempts = parse_number("MAX_ATTEMPTS", &v)?;
        }
        Ok(config)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn listing_timeout(&self) -> Duration {
        Duration::from_millis(self.listing_timeout_ms)
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        DealerError::InvalidArgument(format!("{ENV_PREFIX}{name} is not a number: {value}"))
    })
}
