//! Local static-asset origin.
//!
//! Manifest files and directory trees are read on tokio's blocking pool.

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};

use super::ImageOrigin;
use crate::config::{self, DEFAULT_LOCAL_PREFIX};
use crate::error::{DealerError, Result};
use crate::models::{ImageSource, RawCandidate};

/// Where a manifest's entries come from.
#[derive(Debug, Clone, PartialEq)]
enum Entries {
    Static(Vec<String>),
    ManifestFile(PathBuf),
    Directory(PathBuf),
}

/// A list of locally served card images.
///
/// Entries are paths relative to `prefix`, the URL path the assets are
/// served under. File- and directory-backed manifests are read at listing
/// time, so a missing file surfaces as an origin failure rather than a
/// construction error.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalManifest {
    prefix: String,
    entries: Entries,
    source: ImageSource,
}

impl LocalManifest {
    /// A manifest with a fixed list of relative paths.
    pub fn from_paths<I, S>(prefix: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_entries(prefix, Entries::Static(paths.into_iter().map(Into::into).collect()))
    }

    /// A manifest read from a JSON array of relative paths.
    pub fn from_json_file(prefix: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self::with_entries(prefix, Entries::ManifestFile(path.as_ref().to_path_buf()))
    }

    /// A manifest built by scanning a directory tree for image files.
    pub fn from_dir(prefix: impl Into<String>, dir: impl AsRef<Path>) -> Self {
        Self::with_entries(prefix, Entries::Directory(dir.as_ref().to_path_buf()))
    }

    fn with_entries(prefix: impl Into<String>, entries: Entries) -> Self {
        let prefix = prefix.into();
        let prefix = if prefix.trim().is_empty() {
            DEFAULT_LOCAL_PREFIX.to_string()
        } else {
            prefix.trim_end_matches('/').to_string()
        };
        Self {
            prefix,
            entries,
            source: ImageSource::Local,
        }
    }

    /// Tag this manifest's images with a different provenance, e.g.
    /// [`ImageSource::Placeholder`] for a generic art pack.
    pub fn with_source(mut self, source: ImageSource) -> Self {
        self.source = source;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Read the relative paths this manifest describes.
    pub fn read_entries(&self) -> Result<Vec<String>> {
        match &self.entries {
            Entries::Static(paths) => Ok(paths.clone()),
            Entries::ManifestFile(path) => {
                let contents = fs::read_to_string(path)?;
                Ok(serde_json::from_str(&contents)?)
            }
            Entries::Directory(dir) => {
                if !dir.is_dir() {
                    return Err(DealerError::NotFound(format!(
                        "Asset directory not found: {}",
                        dir.display()
                    )));
                }
                let mut found = Vec::new();
                scan_dir(dir, dir, &mut found)?;
                found.sort();
                Ok(found)
            }
        }
    }

    /// [`read_entries`](Self::read_entries) on the blocking pool for
    /// file- and directory-backed manifests.
    async fn load_entries(&self) -> Result<Vec<String>> {
        if let Entries::Static(paths) = &self.entries {
            return Ok(paths.clone());
        }
        let manifest = self.clone();
        tokio::task::spawn_blocking(move || manifest.read_entries())
            .await
            .map_err(std::io::Error::from)?
    }

    fn url_for(&self, entry: &str) -> String {
        if entry.starts_with("http://") || entry.starts_with("https://") {
            return entry.to_string();
        }
        format!("{}/{}", self.prefix, entry.trim_start_matches('/'))
    }
}

fn scan_dir(root: &Path, dir: &Path, found: &mut Vec<String>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            scan_dir(root, &path, found)?;
            continue;
        }
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if config::is_image_path(&relative) {
            found.push(relative);
        }
    }
    Ok(())
}

#[async_trait]
impl ImageOrigin for LocalManifest {
    fn name(&self) -> &str {
        match self.source {
            ImageSource::Placeholder => "placeholder",
            _ => "local",
        }
    }

    fn source(&self) -> ImageSource {
        self.source
    }

    async fn list(&self) -> Result<Vec<RawCandidate>> {
        let candidates = self
            .load_entries()
            .await?
            .into_iter()
            .filter(|entry| config::is_image_path(entry))
            .map(|entry| {
                let url = self.url_for(&entry);
                RawCandidate::new(entry, url, self.source)
            })
            .collect();
        Ok(candidates)
    }
}
