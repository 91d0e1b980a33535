//! One discovery run: enumerate -> validate -> resolve -> merge.

use std::sync::Arc;
use std::time::Instant;

use crate::deck::MasterDeck;
use crate::merge::{self, Placeholder};
use crate::models::{
    DiscoveredImage, DiscoveryProgress, DiscoveryReport, DiscoveryStage, ProgressFn, RawCandidate,
};
use crate::resolver;
use crate::sources::{self, ImageOrigin};
use crate::validator::{ImageValidator, Validation};

/// The wiring for a discovery run. Cheap to share; holds no run state.
pub struct Discovery {
    deck: MasterDeck,
    origins: Vec<Arc<dyn ImageOrigin>>,
    validator: ImageValidator,
    placeholder: Placeholder,
}

impl Discovery {
    pub fn new(
        deck: MasterDeck,
        origins: Vec<Arc<dyn ImageOrigin>>,
        validator: ImageValidator,
        placeholder: Placeholder,
    ) -> Self {
        Self {
            deck,
            origins,
            validator,
            placeholder,
        }
    }

    pub fn deck(&self) -> &MasterDeck {
        &self.deck
    }

    pub fn origins(&self) -> &[Arc<dyn ImageOrigin>] {
        &self.origins
    }

    pub fn placeholder(&self) -> &Placeholder {
        &self.placeholder
    }

    /// Run a full discovery. Never fails; problems are recorded in the
    /// report's `errors` and `warnings`.
    pub async fn run(&self, on_progress: Option<&ProgressFn>) -> DiscoveryReport {
        let started = Instant::now();
        let emit = |progress: DiscoveryProgress| {
            if let Some(callback) = on_progress {
                callback(&progress);
            }
        };

        emit(DiscoveryProgress::new(DiscoveryStage::Enumerating, 0));
        let enumeration = sources::enumerate(&self.origins).await;
        let total = enumeration.candidates.len();
        let all_failed = enumeration.all_failed();

        emit(DiscoveryProgress::new(DiscoveryStage::Validating, 10).with_counts(0, 0, total));
        let validations = self
            .validator
            .validate_all(&enumeration.candidates, |loaded, failed, total| {
                let percent = 10 + (80 * (loaded + failed) / total.max(1)) as u8;
                emit(
                    DiscoveryProgress::new(DiscoveryStage::Validating, percent)
                        .with_counts(loaded, failed, total),
                );
            })
            .await;

        let images: Vec<DiscoveredImage> = enumeration
            .candidates
            .into_iter()
            .zip(validations)
            .map(|(candidate, validation)| discovered(candidate, validation))
            .collect();
        let valid = images.iter().filter(|i| i.is_valid).count();

        emit(
            DiscoveryProgress::new(DiscoveryStage::Merging, 95).with_counts(valid, total - valid, total),
        );
        let merged = merge::merge(self.deck.cards(), &images, &self.placeholder);

        let mut errors = enumeration.errors;
        if all_failed {
            errors.push("All image origins failed; every card falls back to placeholder art".into());
        }
        if self.deck.is_empty() {
            errors.push("Master card list is empty".into());
        }
        let success = !all_failed && !self.deck.is_empty();

        for warning in &merged.warnings {
            tracing::warn!("{}", warning);
        }

        let mut report = DiscoveryReport::new(images, merged.cards, errors, merged.warnings, success);
        report.duration_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            success = report.success,
            total = report.total_found,
            valid = report.valid_images,
            blob = report.blob_images,
            local = report.local_images,
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            duration_ms = report.duration_ms,
            "Card image discovery finished"
        );

        emit(
            DiscoveryProgress::new(DiscoveryStage::Complete, 100)
                .with_counts(report.valid_images, report.invalid_images, report.total_found),
        );
        report
    }
}

/// Combine a candidate, its validation and its resolved name.
///
/// The origin's filename is tried first since blob URLs often carry an
/// upload suffix; the URL is the fallback.
fn discovered(candidate: RawCandidate, validation: Validation) -> DiscoveredImage {
    let resolved = resolver::resolve(&candidate.filename).or_else(|| resolver::resolve(&candidate.url));
    if resolved.is_none() {
        tracing::debug!(filename = %candidate.filename, "No card id in image name");
    }
    let (card_id, element) = match resolved {
        Some(r) => (Some(r.card_id), r.element),
        None => (None, None),
    };

    DiscoveredImage {
        filename: candidate.filename,
        url: candidate.url,
        card_id,
        element,
        source: candidate.source,
        is_valid: validation.is_valid,
        retry_count: validation.retry_count,
        load_time: validation.load_time,
        size: validation.size,
        error: validation.error,
    }
}
