//! Card readings.
//!
//! Deals distinct cards from a discovery report, mirroring how a physical
//! oracle deck is drawn: each card at most once, each upright or reversed.

use rand::prelude::*;
use serde::Serialize;

use crate::error::{DealerError, Result};
use crate::models::UnifiedCard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Upright,
    Reversed,
}

/// One card placed in a reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealtCard<'a> {
    /// Zero-based position in the spread.
    pub position: usize,
    pub orientation: Orientation,
    pub image_url: &'a str,
    pub card: &'a UnifiedCard,
}

impl<'a> DealtCard<'a> {
    /// The meaning matching this card's orientation, if the deck has one.
    pub fn meaning(&self) -> Option<&'a str> {
        let card = self.card.card();
        match self.orientation {
            Orientation::Upright => card.upright_meaning.as_deref(),
            Orientation::Reversed => card.reversed_meaning.as_deref(),
        }
    }
}

pub struct ReadingDealer<'a> {
    cards: &'a [UnifiedCard],
    allow_reversed: bool,
    vary_art: bool,
}

impl<'a> ReadingDealer<'a> {
    /// Create a new `ReadingDealer` over the given cards.
    pub fn new(cards: &'a [UnifiedCard]) -> Self {
        Self {
            cards,
            allow_reversed: true,
            vary_art: false,
        }
    }

    /// Allow cards to come up reversed. Defaults to `true`.
    pub fn allow_reversed(mut self, allow: bool) -> Self {
        self.allow_reversed = allow;
        self
    }

    /// Pick a random valid variant instead of the primary image.
    pub fn vary_art(mut self, vary: bool) -> Self {
        self.vary_art = vary;
        self
    }

    /// Draw `count` distinct cards using the given random source.
    pub fn draw_with<R: Rng>(&self, count: usize, rng: &mut R) -> Result<Vec<DealtCard<'a>>> {
        if count > self.cards.len() {
            return Err(DealerError::InvalidArgument(format!(
                "Cannot draw {} cards from a deck of {}",
                count,
                self.cards.len()
            )));
        }

        let dealt = self
            .cards
            .choose_multiple(rng, count)
            .collect::<Vec<_>>()
            .into_iter()
            .enumerate()
            .map(|(position, card)| {
                let orientation = if self.allow_reversed && rng.gen_bool(0.5) {
                    Orientation::Reversed
                } else {
                    Orientation::Upright
                };
                let image_url = if self.vary_art {
                    let valid: Vec<&str> = card.valid_images().map(|i| i.url.as_str()).collect();
                    valid
                        .choose(rng)
                        .copied()
                        .unwrap_or_else(|| card.primary_image_url())
                } else {
                    card.primary_image_url()
                };
                DealtCard {
                    position,
                    orientation,
                    image_url,
                    card,
                }
            })
            .collect();

        Ok(dealt)
    }

    /// Draw `count` distinct cards using the thread-local RNG.
    pub fn draw(&self, count: usize) -> Result<Vec<DealtCard<'a>>> {
        self.draw_with(count, &mut thread_rng())
    }
}
