//! Wire records and their normalized projection.
//!
//! The backend exposes one paginated collection per [`Feature`]. Each page
//! deserializes into [`Page<RawRecord>`]; [`HistoryEntry::from_record`]
//! projects a record into the shape every view works with.
//!
//! Identifiers are only unique inside one collection, so anything that needs
//! uniqueness across the merged list keys on [`EntryKey`], never on `id`.

use crate::error::HistoryError;
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Marker used for missing artifacts and unparsable dates.
pub const UNKNOWN: &str = "Unknown";

/// The four document-processing capabilities; each owns one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Feature {
    PdfConversion,
    TableExtraction,
    DocumentAnalysis,
    ImageConversion,
}

impl Feature {
    /// All features in collection order. Merged lists are flattened in this order.
    pub const ALL: [Feature; 4] = [
        Feature::PdfConversion,
        Feature::TableExtraction,
        Feature::DocumentAnalysis,
        Feature::ImageConversion,
    ];

    /// Human-readable label, as shown in the history table.
    pub fn label(self) -> &'static str {
        match self {
            Feature::PdfConversion => "PDF Conversion",
            Feature::TableExtraction => "Table Extraction",
            Feature::DocumentAnalysis => "Document Analysis",
            Feature::ImageConversion => "Image Conversion",
        }
    }

    /// Collection path relative to the backend origin, with trailing slash.
    pub fn collection(self) -> &'static str {
        match self {
            Feature::PdfConversion => "api/scanned-files/",
            Feature::TableExtraction => "api/images/",
            Feature::DocumentAnalysis => "api/convert-doc/",
            Feature::ImageConversion => "api/files/",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Feature {
    type Err = HistoryError;

    /// Accepts the display label or the camelCase route identifier.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "PDF Conversion" | "pdfConversion" => Ok(Feature::PdfConversion),
            "Table Extraction" | "tableExtraction" => Ok(Feature::TableExtraction),
            "Document Analysis" | "documentAnalysis" => Ok(Feature::DocumentAnalysis),
            "Image Conversion" | "imageConversion" => Ok(Feature::ImageConversion),
            other => Err(HistoryError::UnknownFeature(other.to_string())),
        }
    }
}

/// Composite identity of an entry across all collections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryKey {
    pub feature: Feature,
    pub id: String,
}

impl EntryKey {
    pub fn new(feature: Feature, id: impl Into<String>) -> Self {
        Self {
            feature,
            id: id.into(),
        }
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.feature, self.id)
    }
}

/// One page of a collection: `{ "results": [...], "next": <url|null> }`.
///
/// Both fields are required; a body without `next` is not a page.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub results: Vec<T>,
    #[serde(deserialize_with = "required_nullable")]
    pub next: Option<String>,
}

/// Deserialize an `Option` without serde's implicit "missing means None".
fn required_nullable<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)
}

/// A record as the backend returns it. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    /// Page images the backend rendered itself, first page first.
    #[serde(default)]
    pub pages: Vec<RawPage>,
}

/// One server-rendered page of a record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPage {
    #[serde(default)]
    pub image: Option<String>,
}

/// Record ids arrive as integers from most collections and strings from some.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Int(i64),
        Str(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Int(n) => n.to_string(),
        RawId::Str(s) => s,
    })
}

/// Normalized projection of one remote record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub input: String,
    pub output: String,
    pub date: String,
    pub feature: Feature,
    /// Server-rendered thumbnail of the input, preferred over rendering it locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl HistoryEntry {
    /// Project a wire record produced by `feature`'s collection.
    pub fn from_record(record: RawRecord, feature: Feature) -> Self {
        let input = first_present([&record.file, &record.image]);
        let output = first_present([&record.document, &record.file]);
        // Converted collections render page images; the others keep the upload itself.
        let thumbnail = match feature {
            Feature::PdfConversion | Feature::ImageConversion => {
                record.pages.first().and_then(|p| p.image.as_deref())
            }
            Feature::TableExtraction | Feature::DocumentAnalysis => record.image.as_deref(),
        }
        .and_then(artifact_url)
        .map(str::to_string);
        let date = record
            .created
            .as_deref()
            .and_then(format_created)
            .unwrap_or_else(|| UNKNOWN.to_string());

        Self {
            id: record.id,
            input,
            output,
            date,
            feature,
            thumbnail,
        }
    }

    pub fn key(&self) -> EntryKey {
        EntryKey::new(self.feature, self.id.clone())
    }

    /// The artifact URL to download, if there is one.
    pub fn output_url(&self) -> Option<&str> {
        artifact_url(&self.output)
    }

    pub fn input_url(&self) -> Option<&str> {
        artifact_url(&self.input)
    }
}

/// `None` for empty strings and the `Unknown` marker.
pub fn artifact_url(value: &str) -> Option<&str> {
    let v = value.trim();
    if v.is_empty() || v == UNKNOWN {
        None
    } else {
        Some(v)
    }
}

fn first_present<const N: usize>(candidates: [&Option<String>; N]) -> String {
    candidates
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
        .cloned()
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Format a `created` timestamp as `YYYY-MM-DD HH:MM`.
///
/// Timestamps with an offset keep that offset; naive ones are shown as-is.
pub fn format_created(created: &str) -> Option<String> {
    const DISPLAY: &str = "%Y-%m-%d %H:%M";
    if let Ok(dt) = DateTime::parse_from_rfc3339(created) {
        return Some(dt.format(DISPLAY).to_string());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(created, fmt).ok())
        .map(|dt| dt.format(DISPLAY).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: &str) -> RawRecord {
        serde_json::from_str(json).expect("valid record")
    }

    #[test]
    fn feature_labels_round_trip() {
        for f in Feature::ALL {
            assert_eq!(f.label().parse::<Feature>().unwrap(), f);
        }
        assert_eq!(
            "tableExtraction".parse::<Feature>().unwrap(),
            Feature::TableExtraction
        );
        assert!(matches!(
            "Reader".parse::<Feature>(),
            Err(HistoryError::UnknownFeature(_))
        ));
    }

    #[test]
    fn collections_are_distinct() {
        let mut paths: Vec<_> = Feature::ALL.iter().map(|f| f.collection()).collect();
        paths.sort_unstable();
        paths.dedup();
        assert_eq!(paths.len(), 4);
    }

    #[test]
    fn same_id_different_feature_are_different_keys() {
        let a = EntryKey::new(Feature::PdfConversion, "1");
        let b = EntryKey::new(Feature::TableExtraction, "1");
        assert_ne!(a, b);
    }

    #[test]
    fn projection_prefers_file_then_image_for_input() {
        let e = HistoryEntry::from_record(
            record(r#"{"id": 4, "image": "https://x/a.png", "document": "https://x/a.docx"}"#),
            Feature::TableExtraction,
        );
        assert_eq!(e.id, "4");
        assert_eq!(e.input, "https://x/a.png");
        assert_eq!(e.output, "https://x/a.docx");
        assert_eq!(e.date, UNKNOWN);
    }

    #[test]
    fn projection_falls_back_to_unknown() {
        let e = HistoryEntry::from_record(
            record(r#"{"id": "abc", "file": "", "created": "not a date"}"#),
            Feature::ImageConversion,
        );
        assert_eq!(e.input, UNKNOWN);
        assert_eq!(e.output, UNKNOWN);
        assert_eq!(e.date, UNKNOWN);
        assert_eq!(e.output_url(), None);
    }

    #[test]
    fn thumbnail_follows_the_collection() {
        let json = r#"{"id": 3, "file": "/media/in.pdf", "image": "/media/up.png",
                       "pages": [{"image": "/media/pages/3-1.png"}, {"image": "/media/pages/3-2.png"}]}"#;

        let pdf = HistoryEntry::from_record(record(json), Feature::PdfConversion);
        assert_eq!(pdf.thumbnail.as_deref(), Some("/media/pages/3-1.png"));
        let img = HistoryEntry::from_record(record(json), Feature::ImageConversion);
        assert_eq!(img.thumbnail.as_deref(), Some("/media/pages/3-1.png"));
        let table = HistoryEntry::from_record(record(json), Feature::TableExtraction);
        assert_eq!(table.thumbnail.as_deref(), Some("/media/up.png"));

        let bare = HistoryEntry::from_record(
            record(r#"{"id": 4, "file": "/media/in.pdf", "pages": [{"image": ""}]}"#),
            Feature::PdfConversion,
        );
        assert_eq!(bare.thumbnail, None);
    }

    #[test]
    fn output_falls_back_to_file() {
        let e = HistoryEntry::from_record(
            record(r#"{"id": 9, "file": "/media/in.pdf"}"#),
            Feature::PdfConversion,
        );
        assert_eq!(e.input, "/media/in.pdf");
        assert_eq!(e.output, "/media/in.pdf");
    }

    #[test]
    fn created_formats() {
        assert_eq!(
            format_created("2024-09-01T12:34:56.789+05:45").as_deref(),
            Some("2024-09-01 12:34")
        );
        assert_eq!(
            format_created("2024-09-01T08:05:00Z").as_deref(),
            Some("2024-09-01 08:05")
        );
        assert_eq!(
            format_created("2024-09-01T08:05:00.123456").as_deref(),
            Some("2024-09-01 08:05")
        );
        assert_eq!(format_created("yesterday"), None);
    }

    #[test]
    fn page_requires_next_field() {
        let ok: Page<RawRecord> =
            serde_json::from_str(r#"{"results": [{"id": 1}], "next": null}"#).unwrap();
        assert!(ok.next.is_none());
        assert_eq!(ok.results.len(), 1);

        let missing = serde_json::from_str::<Page<RawRecord>>(r#"{"results": []}"#);
        assert!(missing.is_err());
    }
}
