//! Merge engine: master cards + discovered images -> unified cards.
//!
//! [`merge`] is a pure function of its inputs. It produces exactly one
//! [`UnifiedCard`] per master card, in master order, and never attaches an
//! image whose card id is missing or unknown; those become warnings.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::{DEFAULT_PLACEHOLDER_HEIGHT, DEFAULT_PLACEHOLDER_PATH, DEFAULT_PLACEHOLDER_WIDTH};
use crate::models::{DiscoveredImage, ImageSource, MasterCard, UnifiedCard};

// ---------------------------------------------------------------------------
// Placeholder
// ---------------------------------------------------------------------------

/// Parameterized placeholder art used when a card has no valid image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Placeholder {
    pub path: String,
    pub width: u32,
    pub height: u32,
}

impl Default for Placeholder {
    fn default() -> Self {
        Self {
            path: DEFAULT_PLACEHOLDER_PATH.to_string(),
            width: DEFAULT_PLACEHOLDER_WIDTH,
            height: DEFAULT_PLACEHOLDER_HEIGHT,
        }
    }
}

impl Placeholder {
    /// Placeholder URL for a card title. Same title, same URL.
    pub fn url_for(&self, title: &str) -> String {
        format!(
            "{}?height={}&width={}&text={}",
            self.path,
            self.height,
            self.width,
            urlencoding::encode(title)
        )
    }
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Preference rank of a source; lower is preferred.
pub fn source_rank(source: ImageSource) -> u8 {
    match source {
        ImageSource::Blob => 0,
        ImageSource::Local => 1,
        ImageSource::Placeholder => 2,
    }
}

/// Sort key for a card's images: source preference, then valid before invalid.
pub fn sort_key(image: &DiscoveredImage) -> (u8, bool) {
    (source_rank(image.source), !image.is_valid)
}

// ---------------------------------------------------------------------------
// merge
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub cards: Vec<UnifiedCard>,
    /// One entry per image that could not be attached.
    pub warnings: Vec<String>,
}

pub fn merge(
    master: &[MasterCard],
    images: &[DiscoveredImage],
    placeholder: &Placeholder,
) -> MergeOutcome {
    let index: HashMap<&str, usize> = master
        .iter()
        .enumerate()
        .map(|(i, card)| (card.id.as_str(), i))
        .collect();

    let mut buckets: Vec<Vec<DiscoveredImage>> = vec![Vec::new(); master.len()];
    let mut warnings = Vec::new();

    for image in images {
        match image.card_id.as_deref() {
            None => warnings.push(format!(
                "Could not resolve a card id from image '{}' ({})",
                image.filename, image.url
            )),
            Some(id) => match index.get(id) {
                Some(&slot) => buckets[slot].push(image.clone()),
                None => warnings.push(format!(
                    "Image '{}' references unknown card id '{}'",
                    image.filename, id
                )),
            },
        }
    }

    let cards = master
        .iter()
        .zip(buckets)
        .map(|(card, mut available)| {
            // Stable, so discovery order breaks remaining ties.
            available.sort_by_key(sort_key);
            UnifiedCard::assemble(card.clone(), available, placeholder.url_for(&card.title))
        })
        .collect();

    MergeOutcome { cards, warnings }
}
