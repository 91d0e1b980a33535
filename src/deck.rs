//! The master card table.
//!
//! A [`MasterDeck`] is the read-only list of card metadata every discovery
//! run merges artwork against. It is loaded once, shared behind an `Arc`,
//! and never mutated.

use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::error::{DealerError, Result};
use crate::models::MasterCard;

#[derive(Debug, Clone, Default)]
pub struct MasterDeck {
    cards: Arc<Vec<MasterCard>>,
}

impl MasterDeck {
    /// Build a deck from cards, rejecting empty or duplicate ids.
    pub fn from_cards(cards: Vec<MasterCard>) -> Result<Self> {
        let mut seen = HashSet::new();
        for card in &cards {
            if card.id.trim().is_empty() {
                return Err(DealerError::InvalidArgument(format!(
                    "Card '{}' has an empty id",
                    card.title
                )));
            }
            if !seen.insert(card.id.as_str()) {
                return Err(DealerError::InvalidArgument(format!(
                    "Duplicate card id: {}",
                    card.id
                )));
            }
        }
        Ok(Self {
            cards: Arc::new(cards),
        })
    }

    /// Parse a deck from JSON.
    ///
    /// Accepts either a bare array of cards or an object with the array
    /// under `cards` or `data`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        let array = match value {
            Value::Array(_) => value,
            Value::Object(mut map) => map
                .remove("cards")
                .or_else(|| map.remove("data"))
                .ok_or_else(|| {
                    DealerError::InvalidArgument(
                        "Deck JSON object has no 'cards' or 'data' array".into(),
                    )
                })?,
            _ => {
                return Err(DealerError::InvalidArgument(
                    "Deck JSON must be an array or an object".into(),
                ))
            }
        };
        let cards: Vec<MasterCard> = serde_json::from_value(array)?;
        Self::from_cards(cards)
    }

    /// Load a deck from a JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DealerError::NotFound(format!(
                "Deck file not found: {}",
                path.display()
            )));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn cards(&self) -> &[MasterCard] {
        &self.cards
    }

    pub fn get(&self, id: &str) -> Option<&MasterCard> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
