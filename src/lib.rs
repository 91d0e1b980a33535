//! Card Dealer for Rust.
//!
//! Discovers oracle card artwork from a remote blob store and local static
//! assets, validates every image, and merges the results against the
//! master card table into render-ready [`UnifiedCard`]s. Cards without
//! usable art fall back to deterministic placeholder images.
//!
//! # Quick start
//!
//! ```no_run
//! use card_dealer::{CardDealer, LocalManifest, MasterDeck};
//!
//! # async fn example() -> card_dealer::Result<()> {
//! let deck = MasterDeck::from_path("data/cards.json")?;
//! let dealer = CardDealer::builder()
//!     .deck(deck)
//!     .blob_list_url("https://blob.example.com/api/list")
//!     .local_manifest(LocalManifest::from_dir("/images/cards", "public/images/cards"))
//!     .asset_root("public")
//!     .build()?;
//!
//! // Runs discovery once per session; later calls reuse the result.
//! let report = dealer.fetch_all(None).await;
//! for card in &report.cards {
//!     println!("{} -> {}", card.id(), card.primary_image_url());
//! }
//!
//! // Draw a three-card reading.
//! let reading = dealer.reading(&report).draw(3)?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod deck;
pub mod error;
pub mod merge;
pub mod models;
pub mod pipeline;
pub mod queries;
pub mod reading;
pub mod resolver;
pub mod retry;
pub mod sources;
pub mod stats;
pub mod validator;

pub use cache::DiscoveryCache;
pub use config::DealerConfig;
pub use deck::MasterDeck;
pub use error::{DealerError, Result};
pub use merge::Placeholder;
pub use models::{
    DiscoveredImage, DiscoveryProgress, DiscoveryReport, DiscoveryStage, Element, ImageLoadStatus,
    ImageSource, MasterCard, ProgressFn, RawCandidate, UnifiedCard,
};
pub use pipeline::Discovery;
pub use retry::RetryPolicy;
pub use sources::{BlobOrigin, ImageOrigin, LocalManifest};
pub use stats::DiscoveryStatistics;
pub use validator::{HttpProbe, ImageProbe, ImageValidator, ProbeOutcome};

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// CardDealerBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`CardDealer`].
///
/// Use [`CardDealer::builder()`] or [`CardDealerBuilder::from_config`],
/// chain configuration methods, and call
/// [`build()`](CardDealerBuilder::build).
///
/// Origins named by the configuration come first (blob, then local),
/// followed by any added with [`origin()`](CardDealerBuilder::origin).
#[derive(Default)]
pub struct CardDealerBuilder {
    config: DealerConfig,
    deck: Option<MasterDeck>,
    local: Option<LocalManifest>,
    origins: Vec<Arc<dyn ImageOrigin>>,
    probe: Option<Arc<dyn ImageProbe>>,
    cache: Option<Arc<DiscoveryCache>>,
}

impl CardDealerBuilder {
    /// Start from a loaded [`DealerConfig`].
    ///
    /// A `localManifest` file takes precedence over a `localDir` scan.
    pub fn from_config(config: DealerConfig) -> Self {
        let local = match (&config.local_manifest, &config.local_dir) {
            (Some(file), _) => Some(LocalManifest::from_json_file(&config.local_prefix, file)),
            (None, Some(dir)) => Some(LocalManifest::from_dir(&config.local_prefix, dir)),
            (None, None) => None,
        };
        Self {
            config,
            local,
            ..Self::default()
        }
    }

    /// Set the master card table. Required.
    pub fn deck(mut self, deck: MasterDeck) -> Self {
        self.deck = Some(deck);
        self
    }

    /// List remote images from this blob listing endpoint.
    pub fn blob_list_url(mut self, url: impl Into<String>) -> Self {
        self.config.blob_list_url = Some(url.into());
        self
    }

    /// Bearer token for the blob listing endpoint.
    pub fn blob_token(mut self, token: impl Into<String>) -> Self {
        self.config.blob_token = Some(token.into());
        self
    }

    /// List local images from this manifest.
    pub fn local_manifest(mut self, manifest: LocalManifest) -> Self {
        self.local = Some(manifest);
        self
    }

    /// Add another image origin after the configured ones.
    pub fn origin(mut self, origin: Arc<dyn ImageOrigin>) -> Self {
        self.origins.push(origin);
        self
    }

    /// Replace the default [`HttpProbe`].
    pub fn probe(mut self, probe: Arc<dyn ImageProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Site origin used to probe relative image paths over HTTP.
    pub fn site_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.site_base_url = Some(url.into());
        self
    }

    /// Directory relative image paths are resolved against when probing.
    pub fn asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.asset_root = Some(root.into());
        self
    }

    /// Per-attempt probe timeout. Defaults to 5 seconds. Independent of
    /// [`listing_timeout`](Self::listing_timeout).
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// HTTP timeout for blob listing requests. Defaults to 10 seconds.
    pub fn listing_timeout(mut self, timeout: Duration) -> Self {
        self.config.listing_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Maximum probes in flight. Defaults to 8.
    pub fn probe_concurrency(mut self, concurrency: usize) -> Self {
        self.config.probe_concurrency = concurrency;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    pub fn placeholder(mut self, placeholder: Placeholder) -> Self {
        self.config.placeholder = placeholder;
        self
    }

    /// Share a session cache instead of creating a private one.
    pub fn cache(mut self, cache: Arc<DiscoveryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build the dealer. Does not contact any origin; discovery is lazy.
    pub fn build(self) -> Result<CardDealer> {
        let deck = self.deck.ok_or_else(|| {
            DealerError::InvalidArgument("A master deck is required to build a CardDealer".into())
        })?;
        let config = self.config;

        let mut origins: Vec<Arc<dyn ImageOrigin>> = Vec::new();
        if let Some(url) = &config.blob_list_url {
            let client = http_client(config.listing_timeout())?;
            let blob = BlobOrigin::with_client(client, url.clone())
                .with_token(config.blob_token.clone());
            origins.push(Arc::new(blob));
        }
        if let Some(local) = self.local {
            origins.push(Arc::new(local));
        }
        origins.extend(self.origins);
        if origins.is_empty() {
            return Err(DealerError::InvalidArgument(
                "No image origins configured; set a blob listing URL, a local manifest, or add an origin"
                    .into(),
            ));
        }

        let probe = match self.probe {
            Some(probe) => probe,
            None => Arc::new(
                HttpProbe::with_client(http_client(config.probe_timeout())?)
                    .site_base_url(config.site_base_url.clone())
                    .asset_root(config.asset_root.clone()),
            ),
        };
        let validator = ImageValidator::new(probe)
            .retry_policy(config.retry.clone())
            .timeout(config.probe_timeout())
            .concurrency(config.probe_concurrency);

        Ok(CardDealer {
            discovery: Discovery::new(deck, origins, validator, config.placeholder.clone()),
            cache: self.cache.unwrap_or_default(),
        })
    }
}

fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()?)
}

// ---------------------------------------------------------------------------
// CardDealer
// ---------------------------------------------------------------------------

/// The main entry point: cached card-image discovery for one session.
///
/// Created via [`CardDealer::builder()`]. Share it behind an `Arc` if
/// several tasks need it; concurrent [`fetch_all`](CardDealer::fetch_all)
/// calls trigger a single discovery run.
pub struct CardDealer {
    discovery: Discovery,
    cache: Arc<DiscoveryCache>,
}

impl CardDealer {
    /// Create a new builder for configuring the dealer.
    pub fn builder() -> CardDealerBuilder {
        CardDealerBuilder::default()
    }

    /// Return the cached discovery result, running discovery if needed.
    ///
    /// Never fails: origin, validation and mapping problems are reported in
    /// the result's `errors` and `warnings`. A caller that hits the cache
    /// receives a single `Complete` progress event.
    pub async fn fetch_all(&self, on_progress: Option<ProgressFn>) -> Arc<DiscoveryReport> {
        let mut ran = false;
        let report = self
            .cache
            .get_or_discover(|| {
                ran = true;
                self.discovery.run(on_progress.as_ref())
            })
            .await;

        if !ran {
            if let Some(callback) = &on_progress {
                callback(
                    &DiscoveryProgress::new(DiscoveryStage::Complete, 100).with_counts(
                        report.valid_images,
                        report.invalid_images,
                        report.total_found,
                    ),
                );
            }
        }
        report
    }

    /// Clear the cache and run a fresh discovery.
    pub async fn refresh(&self, on_progress: Option<ProgressFn>) -> Arc<DiscoveryReport> {
        self.cache.clear().await;
        self.fetch_all(on_progress).await
    }

    /// Force the next [`fetch_all`](Self::fetch_all) to rediscover.
    ///
    /// Returns `true` if a cached result was dropped.
    pub async fn clear_cache(&self) -> bool {
        self.cache.clear().await
    }

    /// Statistics for the cached result, or `None` if nothing is cached.
    ///
    /// Does not wait: while a discovery is running this returns `None`.
    pub fn statistics(&self) -> Option<DiscoveryStatistics> {
        self.cache
            .peek()
            .map(|report| DiscoveryStatistics::from_report(&report))
    }

    /// The cached result without triggering or waiting for discovery.
    pub fn cached(&self) -> Option<Arc<DiscoveryReport>> {
        self.cache.peek()
    }

    /// Query helpers over a report.
    pub fn query<'a>(&self, report: &'a DiscoveryReport) -> queries::CardQuery<'a> {
        queries::CardQuery::new(report)
    }

    /// Reading dealer over a report's cards.
    pub fn reading<'a>(&self, report: &'a DiscoveryReport) -> reading::ReadingDealer<'a> {
        reading::ReadingDealer::new(&report.cards)
    }

    pub fn deck(&self) -> &MasterDeck {
        self.discovery.deck()
    }

    pub fn cache(&self) -> &Arc<DiscoveryCache> {
        &self.cache
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for CardDealer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let origins: Vec<&str> = self.discovery.origins().iter().map(|o| o.name()).collect();
        write!(
            f,
            "CardDealer(cards={}, origins=[{}], runs={})",
            self.discovery.deck().len(),
            origins.join(", "),
            self.cache.runs()
        )
    }
}
