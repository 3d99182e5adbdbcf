//! Photo data model
//!
//! Wire DTOs mirror the API's JSON shape; [`PhotoRecord`] is the immutable
//! value the store caches and hands out to readers.

use crate::traits::DateParser;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pixel dimensions of a photo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// A cached photo
///
/// `id` is stable across updates of the same logical photo; every other
/// field may change when the record is replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRecord {
    /// Opaque server identifier
    pub id: String,

    /// Photo dimensions
    pub size: Dimensions,

    /// Creation time (absent when the source date was missing or unparsable)
    pub created_at: Option<DateTime<Utc>>,

    /// Free-form description
    pub description: Option<String>,

    /// Thumbnail URL
    pub thumb_image_url: String,

    /// Small rendition URL
    pub small_image_url: String,

    /// Regular rendition URL
    pub regular_image_url: String,

    /// Full-size rendition URL
    pub large_image_url: String,

    /// Whether the current user likes this photo
    pub is_liked: bool,
}

impl PhotoRecord {
    /// Map a wire payload into a record
    ///
    /// Pure: the only collaborator is the date parser, and a date it cannot
    /// read becomes `None`.
    pub fn from_payload(payload: RawPhotoPayload, dates: &dyn DateParser) -> Self {
        let created_at = payload
            .created_at
            .as_deref()
            .and_then(|value| dates.parse(value));

        Self {
            id: payload.id,
            size: Dimensions {
                width: payload.width,
                height: payload.height,
            },
            created_at,
            description: payload.description,
            thumb_image_url: payload.urls.thumb,
            small_image_url: payload.urls.small,
            regular_image_url: payload.urls.regular,
            large_image_url: payload.urls.full,
            is_liked: payload.liked_by_user,
        }
    }

    /// Copy of this record with `is_liked` inverted
    pub fn with_like_toggled(&self) -> Self {
        Self {
            is_liked: !self.is_liked,
            ..self.clone()
        }
    }
}

/// Photo as sent by `GET /photos`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPhotoPayload {
    pub id: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub urls: RawPhotoUrls,
    pub liked_by_user: bool,
}

/// URL bundle nested in [`RawPhotoPayload`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPhotoUrls {
    pub full: String,
    pub regular: String,
    pub small: String,
    pub thumb: String,
}

/// Body of `POST`/`DELETE /photos/<id>/like`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLikeResponse {
    pub photo: RawPhotoPayload,
}
