//! Image validation.
//!
//! An [`ImageProbe`] answers one question for one candidate: does it
//! resolve? The [`ImageValidator`] wraps a probe with a per-attempt timeout,
//! a [`RetryPolicy`] and bounded concurrency.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{header, Client, StatusCode};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{DEFAULT_PROBE_CONCURRENCY, DEFAULT_PROBE_TIMEOUT};
use crate::error::Result;
use crate::models::RawCandidate;
use crate::retry::{RetryPolicy, Retryable};

// ---------------------------------------------------------------------------
// ProbeOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The resource exists.
    Found { size: Option<u64> },
    /// The resource definitively does not exist. Not retried.
    NotFound(String),
    /// Network trouble or a server-side error. Retried.
    Transient(String),
}

impl Retryable for ProbeOutcome {
    fn is_transient(&self) -> bool {
        matches!(self, ProbeOutcome::Transient(_))
    }
}

/// Checks whether a candidate resolves.
#[async_trait]
pub trait ImageProbe: Send + Sync {
    async fn probe(&self, candidate: &RawCandidate) -> ProbeOutcome;
}

/// Classify an HTTP status. Timeouts, throttling and server errors are
/// transient; any other non-success is definitive.
pub fn classify_status(status: StatusCode, size: Option<u64>) -> ProbeOutcome {
    if status.is_success() {
        ProbeOutcome::Found { size }
    } else if status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
    {
        ProbeOutcome::Transient(format!("HTTP {}", status))
    } else {
        ProbeOutcome::NotFound(format!("HTTP {}", status))
    }
}

// ---------------------------------------------------------------------------
// HttpProbe
// ---------------------------------------------------------------------------

/// Default probe: HEAD requests for URLs, file metadata for local assets.
///
/// Absolute `http(s)` URLs are probed directly. Relative paths are looked
/// up under `asset_root` when set, otherwise joined to `site_base_url`.
/// With neither, a relative path cannot be checked and counts as missing.
pub struct HttpProbe {
    client: Client,
    site_base_url: Option<String>,
    asset_root: Option<PathBuf>,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            site_base_url: None,
            asset_root: None,
        }
    }

    pub fn site_base_url(mut self, base: Option<String>) -> Self {
        self.site_base_url = base.map(|b| b.trim_end_matches('/').to_string());
        self
    }

    pub fn asset_root(mut self, root: Option<PathBuf>) -> Self {
        self.asset_root = root;
        self
    }

    async fn head(&self, url: &str) -> ProbeOutcome {
        let resp = match self.client.head(url).send().await {
            Ok(resp) => resp,
            Err(e) => return transport_failure(e),
        };
        if resp.status() != StatusCode::METHOD_NOT_ALLOWED {
            return classify_status(resp.status(), content_length(&resp));
        }
        // Some static hosts refuse HEAD; ask for the first byte instead.
        match self
            .client
            .get(url)
            .header(header::RANGE, "bytes=0-0")
            .send()
            .await
        {
            Ok(resp) => classify_status(resp.status(), None),
            Err(e) => transport_failure(e),
        }
    }
}

fn content_length(resp: &reqwest::Response) -> Option<u64> {
    resp.headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

fn transport_failure(e: reqwest::Error) -> ProbeOutcome {
    if e.is_timeout() {
        ProbeOutcome::Transient("request timed out".into())
    } else {
        ProbeOutcome::Transient(e.to_string())
    }
}

fn is_absolute_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Map a site-relative URL path onto a file under `root`.
///
/// Returns `None` for paths that would escape the root.
pub fn asset_path(root: &Path, url: &str) -> Option<PathBuf> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let decoded = urlencoding::decode(path).ok()?;
    let relative = Path::new(decoded.trim_start_matches('/'));
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(relative))
}

async fn probe_file(path: &Path) -> ProbeOutcome {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => ProbeOutcome::Found {
            size: Some(meta.len()),
        },
        Ok(_) => ProbeOutcome::NotFound(format!("{} is not a file", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            ProbeOutcome::NotFound(format!("{} does not exist", path.display()))
        }
        Err(e) => ProbeOutcome::Transient(e.to_string()),
    }
}

#[async_trait]
impl ImageProbe for HttpProbe {
    async fn probe(&self, candidate: &RawCandidate) -> ProbeOutcome {
        let url = candidate.url.as_str();
        if is_absolute_url(url) {
            return self.head(url).await;
        }
        if let Some(root) = &self.asset_root {
            return match asset_path(root, url) {
                Some(path) => probe_file(&path).await,
                None => ProbeOutcome::NotFound(format!("'{}' escapes the asset root", url)),
            };
        }
        if let Some(base) = &self.site_base_url {
            let full = format!("{}/{}", base, url.trim_start_matches('/'));
            return self.head(&full).await;
        }
        ProbeOutcome::NotFound(format!(
            "No asset root or site base URL to resolve '{}'",
            url
        ))
    }
}

// ---------------------------------------------------------------------------
// ImageValidator
// ---------------------------------------------------------------------------

/// Validation result for one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub is_valid: bool,
    pub retry_count: u32,
    /// Milliseconds spent across all attempts, including backoff.
    pub load_time: u64,
    pub size: Option<u64>,
    pub error: Option<String>,
}

pub struct ImageValidator {
    probe: Arc<dyn ImageProbe>,
    policy: RetryPolicy,
    timeout: Duration,
    concurrency: usize,
}

impl ImageValidator {
    pub fn new(probe: Arc<dyn ImageProbe>) -> Self {
        Self {
            probe,
            policy: RetryPolicy::default(),
            timeout: DEFAULT_PROBE_TIMEOUT,
            concurrency: DEFAULT_PROBE_CONCURRENCY,
        }
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Per-attempt timeout. A timed-out attempt counts as transient.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Maximum probes in flight. Values below 1 act as 1.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Validate one candidate. Always settles: a candidate still failing
    /// transiently after the last attempt is reported invalid.
    pub async fn validate(&self, candidate: &RawCandidate) -> Validation {
        let started = Instant::now();
        let timeout = self.timeout;
        let attempted = self
            .policy
            .run(|_| async move {
                match tokio::time::timeout(timeout, self.probe.probe(candidate)).await {
                    Ok(outcome) => outcome,
                    Err(_) => ProbeOutcome::Transient(format!(
                        "probe timed out after {} ms",
                        timeout.as_millis()
                    )),
                }
            })
            .await;
        let load_time = started.elapsed().as_millis() as u64;

        let (is_valid, size, error) = match attempted.value {
            ProbeOutcome::Found { size } => (true, size.or(candidate.size), None),
            ProbeOutcome::NotFound(reason) | ProbeOutcome::Transient(reason) => {
                (false, candidate.size, Some(reason))
            }
        };

        tracing::debug!(
            url = %candidate.url,
            valid = is_valid,
            retries = attempted.retries,
            load_time_ms = load_time,
            error = error.as_deref().unwrap_or(""),
            "Probed image"
        );

        Validation {
            is_valid,
            retry_count: attempted.retries,
            load_time,
            size,
            error,
        }
    }

    /// Validate candidates concurrently, returning results in input order.
    ///
    /// `on_update(loaded, failed, total)` is called after each candidate
    /// settles.
    pub async fn validate_all<F>(&self, candidates: &[RawCandidate], on_update: F) -> Vec<Validation>
    where
        F: Fn(usize, usize, usize) + Sync,
    {
        let total = candidates.len();
        let loaded = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);
        let (loaded, failed, on_update) = (&loaded, &failed, &on_update);

        // Index-based iteration avoids a higher-ranked lifetime inference
        // failure when this future must be `Send` (e.g. under tokio::spawn).
        stream::iter(0..total)
            .map(|index| async move {
                let candidate = &candidates[index];
                let result = self.validate(candidate).await;
                if result.is_valid {
                    loaded.fetch_add(1, Ordering::Relaxed);
                } else {
                    failed.fetch_add(1, Ordering::Relaxed);
                }
                on_update(
                    loaded.load(Ordering::Relaxed),
                    failed.load(Ordering::Relaxed),
                    total,
                );
                result
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageSource;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Replays scripted outcomes per URL; the last outcome repeats.
    struct Scripted {
        script: HashMap<String, Vec<ProbeOutcome>>,
        calls: Mutex<HashMap<String, usize>>,
    }

    impl Scripted {
        fn new(entries: &[(&str, Vec<ProbeOutcome>)]) -> Self {
            Self {
                script: entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
                calls: Mutex::new(HashMap::new()),
            }
        }

        fn calls(&self, url: &str) -> usize {
            self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl ImageProbe for Scripted {
        async fn probe(&self, candidate: &RawCandidate) -> ProbeOutcome {
            let n = {
                let mut calls = self.calls.lock().unwrap();
                let n = calls.entry(candidate.url.clone()).or_insert(0);
                *n += 1;
                *n - 1
            };
            let steps = &self.script[&candidate.url];
            steps[n.min(steps.len() - 1)].clone()
        }
    }

    struct Hangs;

    #[async_trait]
    impl ImageProbe for Hangs {
        async fn probe(&self, _: &RawCandidate) -> ProbeOutcome {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            ProbeOutcome::Found { size: None }
        }
    }

    fn candidate(url: &str) -> RawCandidate {
        RawCandidate::new(url, url, ImageSource::Blob)
    }

    fn transient() -> ProbeOutcome {
        ProbeOutcome::Transient("connection reset".into())
    }

    #[test]
    fn status_classification() {
        assert_eq!(
            classify_status(StatusCode::OK, Some(10)),
            ProbeOutcome::Found { size: Some(10) }
        );
        assert!(matches!(classify_status(StatusCode::NOT_FOUND, None), ProbeOutcome::NotFound(_)));
        assert!(matches!(classify_status(StatusCode::FORBIDDEN, None), ProbeOutcome::NotFound(_)));
        assert!(matches!(classify_status(StatusCode::BAD_GATEWAY, None), ProbeOutcome::Transient(_)));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, None),
            ProbeOutcome::Transient(_)
        ));
    }

    #[test]
    fn asset_paths_stay_under_root() {
        let root = Path::new("/srv/public");
        assert_eq!(
            asset_path(root, "/images/cards/cauldron%2001.png?v=1"),
            Some(PathBuf::from("/srv/public/images/cards/cauldron 01.png"))
        );
        assert_eq!(asset_path(root, "/images/../../etc/passwd"), None);
    }

    #[tokio::test]
    async fn transient_then_found_counts_retries() {
        let probe = Arc::new(Scripted::new(&[(
            "/a.png",
            vec![transient(), ProbeOutcome::Found { size: Some(7) }],
        )]));
        let validator = ImageValidator::new(probe.clone()).retry_policy(RetryPolicy::immediate(3));
        let v = validator.validate(&candidate("/a.png")).await;
        assert!(v.is_valid);
        assert_eq!(v.retry_count, 1);
        assert_eq!(v.size, Some(7));
        assert_eq!(probe.calls("/a.png"), 2);
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let probe = Arc::new(Scripted::new(&[(
            "/gone.png",
            vec![ProbeOutcome::NotFound("HTTP 404 Not Found".into())],
        )]));
        let validator = ImageValidator::new(probe.clone()).retry_policy(RetryPolicy::immediate(5));
        let v = validator.validate(&candidate("/gone.png")).await;
        assert!(!v.is_valid);
        assert_eq!(v.retry_count, 0);
        assert_eq!(probe.calls("/gone.png"), 1);
        assert!(v.error.unwrap().contains("404"));
    }

    #[tokio::test]
    async fn exhausted_retries_mark_invalid() {
        let probe = Arc::new(Scripted::new(&[("/flaky.png", vec![transient()])]));
        let validator = ImageValidator::new(probe.clone()).retry_policy(RetryPolicy::immediate(3));
        let v = validator.validate(&candidate("/flaky.png")).await;
        assert!(!v.is_valid);
        assert_eq!(v.retry_count, 2);
        assert_eq!(probe.calls("/flaky.png"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_probe_times_out() {
        let validator = ImageValidator::new(Arc::new(Hangs))
            .retry_policy(RetryPolicy::immediate(2))
            .timeout(Duration::from_millis(50));
        let v = validator.validate(&candidate("/slow.png")).await;
        assert!(!v.is_valid);
        assert_eq!(v.retry_count, 1);
        assert!(v.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn validate_all_keeps_order_and_reports_progress() {
        let probe = Arc::new(Scripted::new(&[
            ("/1.png", vec![ProbeOutcome::Found { size: None }]),
            ("/2.png", vec![ProbeOutcome::NotFound("HTTP 404".into())]),
            ("/3.png", vec![ProbeOutcome::Found { size: None }]),
        ]));
        let validator = ImageValidator::new(probe)
            .retry_policy(RetryPolicy::none())
            .concurrency(2);
        let updates = Mutex::new(Vec::new());
        let candidates = vec![candidate("/1.png"), candidate("/2.png"), candidate("/3.png")];

        let results = validator
            .validate_all(&candidates, |loaded, failed, total| {
                updates.lock().unwrap().push((loaded, failed, total));
            })
            .await;

        let valid: Vec<bool> = results.iter().map(|v| v.is_valid).collect();
        assert_eq!(valid, [true, false, true]);
        let updates = updates.into_inner().unwrap();
        assert_eq!(updates.len(), 3);
        assert_eq!(*updates.last().unwrap(), (2, 1, 3));
    }

    #[tokio::test]
    async fn local_files_are_probed_under_asset_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("images")).unwrap();
        std::fs::write(dir.path().join("images/cauldron-01.png"), b"12345").unwrap();
        let probe = HttpProbe::new(Duration::from_secs(1))
            .unwrap()
            .asset_root(Some(dir.path().to_path_buf()));

        let found = probe.probe(&candidate("/images/cauldron-01.png")).await;
        assert_eq!(found, ProbeOutcome::Found { size: Some(5) });
        let missing = probe.probe(&candidate("/images/sword-02.png")).await;
        assert!(matches!(missing, ProbeOutcome::NotFound(_)));
    }

    #[tokio::test]
    async fn relative_path_without_resolver_is_missing() {
        let probe = HttpProbe::new(Duration::from_secs(1)).unwrap();
        let outcome = probe.probe(&candidate("/images/cauldron-01.png")).await;
        assert!(matches!(outcome, ProbeOutcome::NotFound(_)));
    }
}
