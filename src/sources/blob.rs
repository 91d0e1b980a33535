//! Remote blob-store origin.
//!
//! Lists objects from an HTTP listing endpoint. The response schema belongs
//! to the store, so parsing is lenient: either a bare array of object
//! descriptors or an object with `blobs`, `cursor` and `hasMore`.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::ImageOrigin;
use crate::config::{self, MAX_LISTING_PAGES};
use crate::error::{DealerError, Result};
use crate::models::{ImageSource, RawCandidate};

/// One page of a blob listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPage {
    pub candidates: Vec<RawCandidate>,
    pub cursor: Option<String>,
    pub has_more: bool,
}

pub struct BlobOrigin {
    client: Client,
    list_url: String,
    token: Option<String>,
}

impl BlobOrigin {
    /// Create an origin with its own HTTP client.
    pub fn new(list_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self::with_client(client, list_url))
    }

    /// Create an origin sharing an existing client.
    pub fn with_client(client: Client, list_url: impl Into<String>) -> Self {
        Self {
            client,
            list_url: list_url.into(),
            token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` with listing requests.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn list_url(&self) -> &str {
        &self.list_url
    }

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Value> {
        let mut request = self.client.get(&self.list_url);
        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor)]);
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let resp = request.send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl ImageOrigin for BlobOrigin {
    fn name(&self) -> &str {
        "blob"
    }

    fn source(&self) -> ImageSource {
        ImageSource::Blob
    }

    async fn list(&self) -> Result<Vec<RawCandidate>> {
        let mut all = Vec::new();
        let mut cursor: Option<String> = None;

        for page_no in 1..=MAX_LISTING_PAGES {
            let page = parse_listing(self.fetch_page(cursor.as_deref()).await?)?;
            all.extend(page.candidates);

            match (page.has_more, page.cursor) {
                (true, Some(next)) if Some(&next) != cursor.as_ref() => cursor = Some(next),
                _ => return Ok(all),
            }
            if page_no == MAX_LISTING_PAGES {
                tracing::warn!(
                    url = %self.list_url,
                    pages = MAX_LISTING_PAGES,
                    "Blob listing truncated at page limit"
                );
            }
        }

        Ok(all)
    }
}

/// Parse one listing response into image candidates.
///
/// Descriptors without a URL and non-image objects are skipped.
pub fn parse_listing(value: Value) -> Result<ListingPage> {
    let (items, cursor, has_more) = match value {
        Value::Array(items) => (items, None, false),
        Value::Object(mut map) => {
            let items = match map.remove("blobs").or_else(|| map.remove("data")) {
                Some(Value::Array(items)) => items,
                Some(_) | None => {
                    return Err(DealerError::Listing(
                        "object has no 'blobs' array".into(),
                    ))
                }
            };
            let cursor = map
                .get("cursor")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());
            let has_more = map.get("hasMore").and_then(|v| v.as_bool()).unwrap_or(false);
            (items, cursor, has_more)
        }
        _ => {
            return Err(DealerError::Listing(
                "expected an array or an object".into(),
            ))
        }
    };

    let candidates = items.iter().filter_map(descriptor_to_candidate).collect();

    Ok(ListingPage {
        candidates,
        cursor,
        has_more,
    })
}

fn descriptor_to_candidate(item: &Value) -> Option<RawCandidate> {
    let url = item.get("url").and_then(|v| v.as_str())?;
    let filename = ["pathname", "name", "filename"]
        .iter()
        .find_map(|k| item.get(*k).and_then(|v| v.as_str()))
        .unwrap_or(url);
    if !config::is_image_path(filename) && !config::is_image_path(url) {
        tracing::debug!(filename, "Skipping non-image blob");
        return None;
    }
    let size = item.get("size").and_then(|v| v.as_u64());
    Some(RawCandidate::new(filename, url, ImageSource::Blob).with_size(size))
}
