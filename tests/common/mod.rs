//! Shared test fixtures for the card dealer integration tests.
//!
//! Provides a small master deck plus scripted origins and probes that
//! stand in for the blob store and HTTP checks, with call counters so
//! tests can observe how often discovery actually ran. [`http`] serves
//! canned responses for tests that exercise the real HTTP clients.

#![allow(dead_code)]

pub mod http;

use async_trait::async_trait;
use card_dealer::{
    DealerError, ImageOrigin, ImageProbe, ImageSource, MasterCard, MasterDeck, ProbeOutcome,
    RawCandidate, Result,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Three cards across two suits.
pub fn sample_deck() -> MasterDeck {
    let mut cauldron = MasterCard::new("cauldron-01", "The Cauldron")
        .with_suit("cauldron")
        .with_element("water");
    cauldron.number = 1;
    cauldron.upright_meaning = Some("Transformation".into());
    cauldron.reversed_meaning = Some("Stagnation".into());

    let mut sword = MasterCard::new("sword-02", "Sword of Dawn")
        .with_suit("sword")
        .with_element("air");
    sword.number = 2;

    let mut pentacle = MasterCard::new("pentacle-03", "Pentacle & Root")
        .with_suit("pentacle")
        .with_element("earth");
    pentacle.number = 3;

    MasterDeck::from_cards(vec![cauldron, sword, pentacle]).unwrap()
}

// ---------------------------------------------------------------------------
// FakeOrigin
// ---------------------------------------------------------------------------

/// An origin returning fixed URLs, or failing, and counting its calls.
pub struct FakeOrigin {
    name: &'static str,
    source: ImageSource,
    urls: Vec<String>,
    fail: bool,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeOrigin {
    pub fn new(name: &'static str, source: ImageSource, urls: &[&str]) -> Self {
        Self {
            name,
            source,
            urls: urls.iter().map(|u| u.to_string()).collect(),
            fail: false,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: &'static str, source: ImageSource) -> Self {
        Self {
            fail: true,
            ..Self::new(name, source, &[])
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageOrigin for FakeOrigin {
    fn name(&self) -> &str {
        self.name
    }

    fn source(&self) -> ImageSource {
        self.source
    }

    async fn list(&self) -> Result<Vec<RawCandidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(DealerError::NotFound(format!("{} listing endpoint unreachable", self.name)));
        }
        Ok(self
            .urls
            .iter()
            .map(|u| {
                let filename = u.rsplit('/').next().unwrap_or(u);
                RawCandidate::new(filename, u.clone(), self.source)
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// FakeProbe
// ---------------------------------------------------------------------------

/// A probe answering from a URL table. Unlisted URLs are found.
#[derive(Default)]
pub struct FakeProbe {
    outcomes: HashMap<String, ProbeOutcome>,
    calls: Mutex<Vec<String>>,
}

impl FakeProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn missing(mut self, url: &str) -> Self {
        self.outcomes
            .insert(url.to_string(), ProbeOutcome::NotFound("HTTP 404 Not Found".into()));
        self
    }

    pub fn flaky(mut self, url: &str) -> Self {
        self.outcomes
            .insert(url.to_string(), ProbeOutcome::Transient("connection reset".into()));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageProbe for FakeProbe {
    async fn probe(&self, candidate: &RawCandidate) -> ProbeOutcome {
        self.calls.lock().unwrap().push(candidate.url.clone());
        self.outcomes
            .get(&candidate.url)
            .cloned()
            .unwrap_or(ProbeOutcome::Found { size: Some(1024) })
    }
}
