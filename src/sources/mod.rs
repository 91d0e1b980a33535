//! Image origins and the source enumerator.
//!
//! An origin lists candidate images; [`enumerate`] asks every origin in
//! turn and keeps going when one of them fails.

pub mod blob;
pub mod local;

pub use blob::BlobOrigin;
pub use local::LocalManifest;

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::Result;
use crate::models::{ImageSource, RawCandidate};

/// A place card images can be listed from.
#[async_trait]
pub trait ImageOrigin: Send + Sync {
    /// Short name used in logs and error strings.
    fn name(&self) -> &str;

    /// Provenance tag applied to every candidate from this origin.
    fn source(&self) -> ImageSource;

    async fn list(&self) -> Result<Vec<RawCandidate>>;
}

/// Result of asking every origin for candidates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enumeration {
    /// Candidates from all origins, deduplicated by URL, first seen wins.
    pub candidates: Vec<RawCandidate>,
    /// One message per failed origin.
    pub errors: Vec<String>,
    pub origins_failed: usize,
    pub origins_total: usize,
}

impl Enumeration {
    /// True if there was at least one origin and all of them failed.
    pub fn all_failed(&self) -> bool {
        self.origins_total > 0 && self.origins_failed == self.origins_total
    }
}

/// List candidates from every origin, in order. Never fails: an origin
/// error is recorded and enumeration continues with the next origin.
pub async fn enumerate(origins: &[Arc<dyn ImageOrigin>]) -> Enumeration {
    let mut out = Enumeration {
        origins_total: origins.len(),
        ..Enumeration::default()
    };
    let mut seen = HashSet::new();

    for origin in origins {
        match origin.list().await {
            Ok(found) => {
                let before = out.candidates.len();
                for mut candidate in found {
                    if seen.insert(candidate.url.clone()) {
                        candidate.source = origin.source();
                        out.candidates.push(candidate);
                    }
                }
                tracing::debug!(
                    origin = origin.name(),
                    added = out.candidates.len() - before,
                    "Origin listed"
                );
            }
            Err(e) => {
                tracing::warn!(origin = origin.name(), error = %e, "Origin listing failed");
                out.origins_failed += 1;
                out.errors
                    .push(format!("Failed to list {} images: {}", origin.name(), e));
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DealerError;

    struct Fixed(&'static str, ImageSource, Vec<&'static str>);

    #[async_trait]
    impl ImageOrigin for Fixed {
        fn name(&self) -> &str {
            self.0
        }
        fn source(&self) -> ImageSource {
            self.1
        }
        async fn list(&self) -> Result<Vec<RawCandidate>> {
            Ok(self
                .2
                .iter()
                .map(|u| RawCandidate::new(*u, *u, self.1))
                .collect())
        }
    }

    struct Down;

    #[async_trait]
    impl ImageOrigin for Down {
        fn name(&self) -> &str {
            "blob"
        }
        fn source(&self) -> ImageSource {
            ImageSource::Blob
        }
        async fn list(&self) -> Result<Vec<RawCandidate>> {
            Err(DealerError::NotFound("listing endpoint".into()))
        }
    }

    #[tokio::test]
    async fn failed_origin_does_not_abort() {
        let origins: Vec<Arc<dyn ImageOrigin>> = vec![
            Arc::new(Down),
            Arc::new(Fixed("local", ImageSource::Local, vec!["/a.png", "/b.png"])),
        ];
        let out = enumerate(&origins).await;
        assert_eq!(out.candidates.len(), 2);
        assert_eq!(out.errors.len(), 1);
        assert!(out.errors[0].contains("blob"));
        assert!(!out.all_failed());
    }

    #[tokio::test]
    async fn all_failed_yields_empty_list() {
        let origins: Vec<Arc<dyn ImageOrigin>> = vec![Arc::new(Down), Arc::new(Down)];
        let out = enumerate(&origins).await;
        assert!(out.candidates.is_empty());
        assert!(out.all_failed());
        assert_eq!(out.errors.len(), 2);
    }

    #[tokio::test]
    async fn duplicates_keep_first_origin() {
        let origins: Vec<Arc<dyn ImageOrigin>> = vec![
            Arc::new(Fixed("blob", ImageSource::Blob, vec!["/a.png"])),
            Arc::new(Fixed("local", ImageSource::Local, vec!["/a.png", "/c.png"])),
        ];
        let out = enumerate(&origins).await;
        assert_eq!(out.candidates.len(), 2);
        assert_eq!(out.candidates[0].source, ImageSource::Blob);
        assert_eq!(out.candidates[1].url, "/c.png");
    }

    #[tokio::test]
    async fn no_origins_is_not_a_failure() {
        let out = enumerate(&[]).await;
        assert!(out.candidates.is_empty());
        assert!(!out.all_failed());
    }
}
