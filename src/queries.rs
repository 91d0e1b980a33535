//! Lookup helpers over a discovery report.
//!
//! [`CardQuery`] borrows a [`DiscoveryReport`] and filters its unified
//! cards in memory. All string matching is case-insensitive.

use crate::models::{DiscoveredImage, DiscoveryReport, Element, ImageLoadStatus, UnifiedCard};

// ---------------------------------------------------------------------------
// CardQuery
// ---------------------------------------------------------------------------

pub struct CardQuery<'a> {
    report: &'a DiscoveryReport,
}

impl<'a> CardQuery<'a> {
    /// Create a new `CardQuery` bound to the given report.
    pub fn new(report: &'a DiscoveryReport) -> Self {
        Self { report }
    }

    pub fn all(&self) -> &'a [UnifiedCard] {
        &self.report.cards
    }

    pub fn get_by_id(&self, id: &str) -> Option<&'a UnifiedCard> {
        self.report.cards.iter().find(|c| c.id() == id)
    }

    pub fn by_suit(&self, suit: &str) -> Vec<&'a UnifiedCard> {
        self.filter(|c| c.card().suit.eq_ignore_ascii_case(suit))
    }

    /// Cards whose master record names the given element.
    pub fn by_element(&self, element: &str) -> Vec<&'a UnifiedCard> {
        self.filter(|c| {
            c.card()
                .element
                .as_deref()
                .map(|e| e.eq_ignore_ascii_case(element))
                .unwrap_or(false)
        })
    }

    pub fn with_status(&self, status: ImageLoadStatus) -> Vec<&'a UnifiedCard> {
        self.filter(|c| c.image_load_status() == status)
    }

    /// Cards that will render placeholder art.
    pub fn missing_art(&self) -> Vec<&'a UnifiedCard> {
        self.filter(|c| !c.has_valid_image())
    }

    /// Search card titles by substring.
    pub fn search(&self, text: &str) -> Vec<&'a UnifiedCard> {
        let needle = text.to_lowercase();
        self.filter(|c| c.title().to_lowercase().contains(&needle))
    }

    /// Valid images of one card, optionally restricted to an element variant.
    ///
    /// Returns an empty vector for unknown card ids.
    pub fn variants_of(&self, id: &str, element: Option<Element>) -> Vec<&'a DiscoveredImage> {
        self.get_by_id(id)
            .map(|card| {
                card.valid_images()
                    .filter(|img| element.is_none() || img.element == element)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn filter<P>(&self, predicate: P) -> Vec<&'a UnifiedCard>
    where
        P: Fn(&UnifiedCard) -> bool,
    {
        self.report.cards.iter().filter(|c| predicate(c)).collect()
    }
}
