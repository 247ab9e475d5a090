//! Shared typed models used across filtering, selection, and refresh layers.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// PhotoId
// ---------------------------------------------------------------------------

/// Stable identifier of a photo in the external library (its UUID string).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhotoId(pub String);

impl PhotoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PhotoId {
    fn from(s: &str) -> Self {
        PhotoId(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Orientation / MediaKind
// ---------------------------------------------------------------------------

/// Display orientation derived from pixel dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    /// Portrait iff the photo is taller than it is wide.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if height > width {
            Orientation::Portrait
        } else {
            Orientation::Landscape
        }
    }
}

/// Media kind as reported by the library binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    LivePhoto,
}

impl MediaKind {
    /// Motion files are always excluded from still-photo selection.
    pub fn is_motion(self) -> bool {
        matches!(self, MediaKind::Video | MediaKind::LivePhoto)
    }
}

// ---------------------------------------------------------------------------
// GeoCoordinate
// ---------------------------------------------------------------------------

/// GPS coordinate attached to a photo, when the library provides one.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

// ---------------------------------------------------------------------------
// PhotoRecord
// ---------------------------------------------------------------------------

/// Immutable metadata record for a single photo.
///
/// Created once when the library binding yields it; never mutated afterwards.
/// Owned by the selection index for the lifetime of the process.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub id: PhotoId,
    pub filename: String,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub orientation: Orientation,
    pub media_kind: MediaKind,
    pub captured_at: Option<DateTime<Utc>>,
    pub coordinate: Option<GeoCoordinate>,
    pub people: Vec<String>,
    pub keywords: Vec<String>,
    pub place: Option<String>,
}

impl PhotoRecord {
    /// Capture year, when a capture timestamp is known.
    pub fn capture_year(&self) -> Option<i32> {
        self.captured_at.map(|ts| ts.year())
    }

    pub fn is_portrait(&self) -> bool {
        self.orientation == Orientation::Portrait
    }

    /// Aspect ratio (width / height); used as a pairing preference only.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            0.0
        } else {
            self.width as f64 / self.height as f64
        }
    }
}

// ---------------------------------------------------------------------------
// SlideEntry / HistoryEntry
// ---------------------------------------------------------------------------

/// One displayed slide: a single photo or a portrait pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlideEntry {
    Single(PhotoId),
    Pair(PhotoId, PhotoId),
}

impl SlideEntry {
    /// The identifiers making up this slide, in display order.
    pub fn ids(&self) -> Vec<&PhotoId> {
        match self {
            SlideEntry::Single(id) => vec![id],
            SlideEntry::Pair(a, b) => vec![a, b],
        }
    }
}

/// A slide as recorded in navigation history, stamped with the display tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    pub entry: SlideEntry,
    pub tick: u64,
}

// ---------------------------------------------------------------------------
// DownloadSignal
// ---------------------------------------------------------------------------

/// Contents of the download-signal file written by the photo downloader.
///
/// Field names match the on-disk JSON produced by the download side.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadSignal {
    pub last_download_timestamp: DateTime<Utc>,
    pub photos_added: u64,
    pub total_photos: u64,
    pub download_session_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_from_dimensions() {
        assert_eq!(
            Orientation::from_dimensions(3000, 4000),
            Orientation::Portrait
        );
        assert_eq!(
            Orientation::from_dimensions(4000, 3000),
            Orientation::Landscape
        );
        // Square counts as landscape.
        assert_eq!(
            Orientation::from_dimensions(2000, 2000),
            Orientation::Landscape
        );
    }

    #[test]
    fn test_media_kind_motion() {
        assert!(!MediaKind::Image.is_motion());
        assert!(MediaKind::Video.is_motion());
        assert!(MediaKind::LivePhoto.is_motion());
    }

    #[test]
    fn test_slide_entry_ids() {
        let single = SlideEntry::Single(PhotoId::from("a"));
        assert_eq!(single.ids().len(), 1);
        let pair = SlideEntry::Pair(PhotoId::from("a"), PhotoId::from("b"));
        let ids: Vec<&str> = pair.ids().iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_download_signal_roundtrip() {
        let json = r#"{
            "last_download_timestamp": "2024-06-01T12:00:00Z",
            "photos_added": 12,
            "total_photos": 480,
            "download_session_id": "session_1717243200"
        }"#;
        let signal: DownloadSignal = serde_json::from_str(json).unwrap();
        assert_eq!(signal.photos_added, 12);
        assert_eq!(signal.total_photos, 480);
        let back = serde_json::to_string(&signal).unwrap();
        assert!(back.contains("last_download_timestamp"));
    }
}
