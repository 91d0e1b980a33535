use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::card::UnifiedCard;
use super::image::{DiscoveredImage, ImageSource};

// ---------------------------------------------------------------------------
// DiscoveryReport - the result of one discovery run
// ---------------------------------------------------------------------------

/// Everything a discovery run produced.
///
/// Failures never escape a run; they are recorded here instead. `errors`
/// holds origin-level and total failures, `warnings` holds mapping problems
/// (images that could not be tied to a card).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryReport {
    pub success: bool,
    /// Every validated candidate, in enumeration order.
    pub images: Vec<DiscoveredImage>,
    /// One unified card per master card, in master order.
    pub cards: Vec<UnifiedCard>,
    pub total_found: usize,
    pub valid_images: usize,
    pub invalid_images: usize,
    pub blob_images: usize,
    pub local_images: usize,
    pub placeholder_images: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub duration_ms: u64,
    /// Sequence number of the run within its cache, starting at 1.
    pub run: u64,
}

impl DiscoveryReport {
    /// Build a report, deriving the image counters from `images`.
    pub fn new(
        images: Vec<DiscoveredImage>,
        cards: Vec<UnifiedCard>,
        errors: Vec<String>,
        warnings: Vec<String>,
        success: bool,
    ) -> Self {
        let count = |source: ImageSource| images.iter().filter(|i| i.source == source).count();
        let valid_images = images.iter().filter(|i| i.is_valid).count();
        Self {
            success,
            total_found: images.len(),
            valid_images,
            invalid_images: images.len() - valid_images,
            blob_images: count(ImageSource::Blob),
            local_images: count(ImageSource::Local),
            placeholder_images: count(ImageSource::Placeholder),
            images,
            cards,
            errors,
            warnings,
            duration_ms: 0,
            run: 0,
        }
    }

    pub fn card(&self, id: &str) -> Option<&UnifiedCard> {
        self.cards.iter().find(|c| c.id() == id)
    }
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryStage {
    Enumerating,
    Validating,
    Merging,
    Complete,
}

impl fmt::Display for DiscoveryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiscoveryStage::Enumerating => "enumerating",
            DiscoveryStage::Validating => "validating",
            DiscoveryStage::Merging => "merging",
            DiscoveryStage::Complete => "complete",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryProgress {
    pub stage: DiscoveryStage,
    /// 0..=100
    pub percent: u8,
    pub loaded: usize,
    pub failed: usize,
    pub total: usize,
}

impl DiscoveryProgress {
    pub fn new(stage: DiscoveryStage, percent: u8) -> Self {
        Self {
            stage,
            percent: percent.min(100),
            loaded: 0,
            failed: 0,
            total: 0,
        }
    }

    pub fn with_counts(mut self, loaded: usize, failed: usize, total: usize) -> Self {
        self.loaded = loaded;
        self.failed = failed;
        self.total = total;
        self
    }
}

/// Progress callback. Purely informational; it cannot affect the run.
pub type ProgressFn = Arc<dyn Fn(&DiscoveryProgress) + Send + Sync>;
