use serde::{Deserialize, Serialize};

use super::image::DiscoveredImage;

// ---------------------------------------------------------------------------
// MasterCard - authoritative card metadata, independent of any artwork
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterCard {
    pub id: String,
    #[serde(default)]
    pub number: u32,
    pub title: String,
    #[serde(default)]
    pub suit: String,
    pub element: Option<String>,
    pub symbol: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub upright_meaning: Option<String>,
    pub reversed_meaning: Option<String>,
    pub description: Option<String>,
}

impl MasterCard {
    /// A card with only identity fields set.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            number: 0,
            title: title.into(),
            suit: String::new(),
            element: None,
            symbol: None,
            keywords: Vec::new(),
            upright_meaning: None,
            reversed_meaning: None,
            description: None,
        }
    }

    pub fn with_suit(mut self, suit: impl Into<String>) -> Self {
        self.suit = suit.into();
        self
    }

    pub fn with_element(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }
}

// ---------------------------------------------------------------------------
// ImageLoadStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageLoadStatus {
    /// At least one valid image was found.
    Loaded,
    /// No valid image; the card renders placeholder art.
    Placeholder,
    /// The consumer observed a failure rendering the chosen image.
    Error,
}

// ---------------------------------------------------------------------------
// UnifiedCard - render-ready merge of metadata and artwork
// ---------------------------------------------------------------------------

/// One card as handed to the presentation layer.
///
/// The image fields are derived from `available_images` when the card is
/// assembled and cannot be set independently. Deserializing derives them
/// again from the stored images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "UnifiedCardRecord")]
pub struct UnifiedCard {
    #[serde(flatten)]
    card: MasterCard,
    available_images: Vec<DiscoveredImage>,
    primary_image_url: String,
    secondary_image_url: String,
    image_load_status: ImageLoadStatus,
    has_multiple_variants: bool,
}

/// Stored form of a [`UnifiedCard`]. Only the metadata, the images, the
/// primary URL (kept as the placeholder when no image is valid) and an
/// `error` status are read back.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnifiedCardRecord {
    #[serde(flatten)]
    card: MasterCard,
    #[serde(default)]
    available_images: Vec<DiscoveredImage>,
    #[serde(default)]
    primary_image_url: String,
    #[serde(default)]
    image_load_status: Option<ImageLoadStatus>,
}

impl From<UnifiedCardRecord> for UnifiedCard {
    fn from(record: UnifiedCardRecord) -> Self {
        let card = Self::assemble(record.card, record.available_images, record.primary_image_url);
        match record.image_load_status {
            Some(ImageLoadStatus::Error) => card.with_load_error(),
            _ => card,
        }
    }
}

impl UnifiedCard {
    /// Assemble a card from already-ordered images.
    ///
    /// The primary URL is the first valid image, the secondary the next
    /// valid image with a different URL. Both fall back: primary to the
    /// placeholder, secondary to the primary.
    pub(crate) fn assemble(
        card: MasterCard,
        available_images: Vec<DiscoveredImage>,
        placeholder_url: String,
    ) -> Self {
        let mut valid = available_images.iter().filter(|img| img.is_valid);
        let primary = valid.next().map(|img| img.url.clone());
        let secondary = primary
            .as_ref()
            .and_then(|p| valid.find(|img| &img.url != p).map(|img| img.url.clone()));

        let (primary_image_url, image_load_status) = match primary {
            Some(url) => (url, ImageLoadStatus::Loaded),
            None => (placeholder_url, ImageLoadStatus::Placeholder),
        };
        let secondary_image_url = secondary.unwrap_or_else(|| primary_image_url.clone());
        let has_multiple_variants = available_images.len() > 1;

        Self {
            card,
            available_images,
            primary_image_url,
            secondary_image_url,
            image_load_status,
            has_multiple_variants,
        }
    }

    /// Copy of this card flagged as failing to render.
    pub fn with_load_error(&self) -> Self {
        Self {
            image_load_status: ImageLoadStatus::Error,
            ..self.clone()
        }
    }

    pub fn id(&self) -> &str {
        &self.card.id
    }

    pub fn title(&self) -> &str {
        &self.card.title
    }

    pub fn card(&self) -> &MasterCard {
        &self.card
    }

    pub fn available_images(&self) -> &[DiscoveredImage] {
        &self.available_images
    }

    pub fn valid_images(&self) -> impl Iterator<Item = &DiscoveredImage> {
        self.available_images.iter().filter(|img| img.is_valid)
    }

    pub fn primary_image_url(&self) -> &str {
        &self.primary_image_url
    }

    pub fn secondary_image_url(&self) -> &str {
        &self.secondary_image_url
    }

    pub fn image_load_status(&self) -> ImageLoadStatus {
        self.image_load_status
    }

    pub fn has_multiple_variants(&self) -> bool {
        self.has_multiple_variants
    }

    pub fn has_valid_image(&self) -> bool {
        self.valid_images().next().is_some()
    }
}
