use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// ImageSource - provenance of a discovered image
// ---------------------------------------------------------------------------

/// Where a discovered image came from. Fixed at discovery time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSource {
    Blob,
    Local,
    Placeholder,
}

impl ImageSource {
    pub const ALL: [ImageSource; 3] = [ImageSource::Blob, ImageSource::Local, ImageSource::Placeholder];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSource::Blob => "blob",
            ImageSource::Local => "local",
            ImageSource::Placeholder => "placeholder",
        }
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Element - elemental variant tag
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    Fire,
    Water,
    Air,
    Earth,
    #[serde(alias = "aether", alias = "ether")]
    Spirit,
}

impl Element {
    pub const ALL: [Element; 5] = [
        Element::Fire,
        Element::Water,
        Element::Air,
        Element::Earth,
        Element::Spirit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Element::Fire => "fire",
            Element::Water => "water",
            Element::Air => "air",
            Element::Earth => "earth",
            Element::Spirit => "spirit",
        }
    }
}

impl FromStr for Element {
    type Err = ();

    /// Case-insensitive; accepts `aether`/`ether` for [`Element::Spirit`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fire" => Ok(Element::Fire),
            "water" => Ok(Element::Water),
            "air" => Ok(Element::Air),
            "earth" => Ok(Element::Earth),
            "spirit" | "aether" | "ether" => Ok(Element::Spirit),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RawCandidate - an enumerated, not yet validated image reference
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCandidate {
    /// Path or object name as reported by the origin.
    pub filename: String,
    /// Locator used for probing and rendering.
    pub url: String,
    pub source: ImageSource,
    /// Size reported by the origin listing, if any.
    pub size: Option<u64>,
}

impl RawCandidate {
    pub fn new(filename: impl Into<String>, url: impl Into<String>, source: ImageSource) -> Self {
        Self {
            filename: filename.into(),
            url: url.into(),
            source,
            size: None,
        }
    }

    pub fn with_size(mut self, size: Option<u64>) -> Self {
        self.size = size;
        self
    }
}

// ---------------------------------------------------------------------------
// DiscoveredImage - a validated and resolved candidate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredImage {
    pub filename: String,
    pub url: String,
    /// Card this image belongs to; `None` when the filename was unparseable.
    pub card_id: Option<String>,
    pub element: Option<Element>,
    pub source: ImageSource,
    pub is_valid: bool,
    pub retry_count: u32,
    /// Wall-clock time spent probing, in milliseconds.
    pub load_time: u64,
    pub size: Option<u64>,
    /// Last probe failure, kept for diagnostics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DiscoveredImage {
    /// A valid image with no probe metadata. Handy for feeding the merge
    /// engine directly.
    pub fn new(card_id: impl Into<String>, url: impl Into<String>, source: ImageSource) -> Self {
        let url = url.into();
        Self {
            filename: url.rsplit('/').next().unwrap_or(&url).to_string(),
            url,
            card_id: Some(card_id.into()),
            element: None,
            source,
            is_valid: true,
            retry_count: 0,
            load_time: 0,
            size: None,
            error: None,
        }
    }

    pub fn invalid(mut self) -> Self {
        self.is_valid = false;
        self
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.element = Some(element);
        self
    }
}
