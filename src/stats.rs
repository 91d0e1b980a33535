//! Aggregate diagnostics over a discovery report.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{DiscoveryReport, Element, ImageLoadStatus, ImageSource};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceBreakdown {
    pub total: usize,
    pub valid: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryStatistics {
    pub run: u64,
    pub success: bool,
    pub total_images: usize,
    pub valid_images: usize,
    pub invalid_images: usize,
    pub by_source: BTreeMap<ImageSource, SourceBreakdown>,
    pub by_element: BTreeMap<Element, usize>,
    /// Images that were not attached to any card.
    pub unmapped_images: usize,
    pub total_cards: usize,
    pub cards_with_images: usize,
    pub cards_with_variants: usize,
    pub placeholder_cards: usize,
    /// Share of cards with at least one valid image, 0.0..=1.0.
    pub card_coverage: f64,
    /// Share of discovered images that validated, 0.0..=1.0.
    pub image_validity: f64,
    pub average_load_time_ms: f64,
    pub total_retries: u64,
    pub error_count: usize,
    pub warning_count: usize,
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

impl DiscoveryStatistics {
    pub fn from_report(report: &DiscoveryReport) -> Self {
        let mut by_source: BTreeMap<ImageSource, SourceBreakdown> = ImageSource::ALL
            .iter()
            .map(|s| (*s, SourceBreakdown { total: 0, valid: 0 }))
            .collect();
        let mut by_element = BTreeMap::new();
        let mut total_load = 0u64;
        let mut total_retries = 0u64;

        for image in &report.images {
            if let Some(entry) = by_source.get_mut(&image.source) {
                entry.total += 1;
                entry.valid += usize::from(image.is_valid);
            }
            if let Some(element) = image.element {
                *by_element.entry(element).or_insert(0) += 1;
            }
            total_load += image.load_time;
            total_retries += u64::from(image.retry_count);
        }

        let attached: usize = report.cards.iter().map(|c| c.available_images().len()).sum();
        let cards_with_images = report.cards.iter().filter(|c| c.has_valid_image()).count();
        let cards_with_variants = report
            .cards
            .iter()
            .filter(|c| c.has_multiple_variants())
            .count();
        let placeholder_cards = report
            .cards
            .iter()
            .filter(|c| c.image_load_status() == ImageLoadStatus::Placeholder)
            .count();

        Self {
            run: report.run,
            success: report.success,
            total_images: report.total_found,
            valid_images: report.valid_images,
            invalid_images: report.invalid_images,
            by_source,
            by_element,
            unmapped_images: report.images.len().saturating_sub(attached),
            total_cards: report.cards.len(),
            cards_with_images,
            cards_with_variants,
            placeholder_cards,
            card_coverage: ratio(cards_with_images, report.cards.len()),
            image_validity: ratio(report.valid_images, report.total_found),
            average_load_time_ms: if report.images.is_empty() {
                0.0
            } else {
                total_load as f64 / report.images.len() as f64
            },
            total_retries,
            error_count: report.errors.len(),
            warning_count: report.warnings.len(),
        }
    }
}
