use crate::error::IngestError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Tenant key. The only way to build one is through [`Organization::normalize`], so every
/// value written to the index or used as a filter has the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Organization(String);

impl Organization {
    /// Trims whitespace, lowercases, then strips surrounding dots. Inner spaces are kept.
    pub fn normalize(raw: &str) -> Self {
        Self(
            raw.trim()
                .to_lowercase()
                .trim_matches('.')
                .to_string(),
        )
    }

    /// Normalizes `raw` and rejects values that normalize to nothing.
    pub fn required(raw: &str) -> Result<Self, IngestError> {
        let organization = Self::normalize(raw);
        if organization.is_empty() {
            return Err(IngestError::InvalidArgument(
                "organization must not be empty".to_string(),
            ));
        }
        Ok(organization)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Path of an archived file owned by this organization.
    pub fn archive_path(&self, file_name: &str) -> String {
        format!("{}/{}", self.0, file_name)
    }

    /// Prefix shared by every archive path of this organization.
    pub fn archive_prefix(&self) -> String {
        format!("{}/", self.0)
    }
}

impl From<String> for Organization {
    fn from(value: String) -> Self {
        Self::normalize(&value)
    }
}

impl From<Organization> for String {
    fn from(value: Organization) -> Self {
        value.0
    }
}

impl fmt::Display for Organization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One chunk as persisted in the search index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestRecord {
    pub id: String,
    pub organization: Organization,
    pub title: String,
    pub page: u32,
    pub total_pages: u32,
    pub file: String,
    pub content: String,
    #[serde(rename = "contentVector")]
    pub content_vector: Vec<f32>,
    pub keywords: Vec<String>,
}

/// The subset of an indexed record needed to decide deletions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub file: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Pdf,
    XmlDossier,
}

impl SourceKind {
    /// Picks the converter by extension first, then by sniffing the leading bytes.
    pub fn detect(file_name: &str, bytes: &[u8]) -> Option<Self> {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("pdf") => return Some(Self::Pdf),
            Some("xml") => return Some(Self::XmlDossier),
            _ => {}
        }

        let head = bytes
            .iter()
            .position(|byte| !byte.is_ascii_whitespace())
            .map(|start| &bytes[start..])
            .unwrap_or_default();

        if head.starts_with(b"%PDF") {
            Some(Self::Pdf)
        } else if head.starts_with(b"<") {
            Some(Self::XmlDossier)
        } else {
            None
        }
    }
}

/// A unit of extracted text: one PDF page or one dossier document.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedUnit {
    pub kind: SourceKind,
    pub title: String,
    pub file: String,
    pub text: String,
    pub ordinal: u32,
    pub total_units: u32,
}

impl ExtractedUnit {
    /// Title and content for chunk `index` (1-based) out of `count` chunks of this unit.
    pub fn label_chunk(&self, index: usize, count: usize, chunk: &str) -> (String, String) {
        match self.kind {
            SourceKind::Pdf if count <= 1 => (self.title.clone(), chunk.to_string()),
            SourceKind::Pdf => (format!("{} - Part {index}", self.title), chunk.to_string()),
            SourceKind::XmlDossier => (
                format!("{} - Part {index}", self.title),
                format!("{} - Chunk {index}\n\n{chunk}", self.title),
            ),
        }
    }
}

/// An uploaded file as received by the pipeline.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Result of one upload request, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub processed_files: Vec<String>,
    pub skipped_files: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionReport {
    pub archives_deleted: usize,
    pub index_entries_deleted: usize,
    pub archive_found: bool,
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub chunk_size: usize,
    pub batch_size: usize,
    pub batch_pace: Duration,
    pub abort_on_batch_failure: bool,
    pub rollback_on_failure: bool,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_size: 5_000,
            batch_size: 5,
            batch_pace: Duration::from_millis(500),
            abort_on_batch_failure: false,
            rollback_on_failure: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn organization_is_trimmed_lowercased_and_undotted() {
        let org = Organization::normalize("  Acme Corp. ");
        assert_eq!(org.as_str(), "acme corp");
        assert_eq!(org.archive_path("A.pdf"), "acme corp/A.pdf");
        assert_eq!(org.archive_prefix(), "acme corp/");
    }

    #[test]
    fn deserialized_organization_is_normalized() {
        let org: Organization = serde_json::from_str(r#"" Acme Corp. ""#).unwrap();
        assert_eq!(org.as_str(), "acme corp");
        assert_eq!(serde_json::to_string(&org).unwrap(), r#""acme corp""#);
    }

    #[test]
    fn organization_of_dots_is_empty() {
        assert!(Organization::normalize(" .. ").is_empty());
    }

    #[test]
    fn required_organization_rejects_blank_input() {
        assert!(matches!(
            Organization::required("  . "),
            Err(IngestError::InvalidArgument(_))
        ));
        assert_eq!(Organization::required("Acme").unwrap().as_str(), "acme");
    }

    #[test]
    fn source_kind_uses_extension_then_content() {
        assert_eq!(SourceKind::detect("a.PDF", b""), Some(SourceKind::Pdf));
        assert_eq!(SourceKind::detect("a.xml", b"%PDF"), Some(SourceKind::XmlDossier));
        assert_eq!(SourceKind::detect("upload", b"%PDF-1.5"), Some(SourceKind::Pdf));
        assert_eq!(
            SourceKind::detect("upload", b"\n <folder/>"),
            Some(SourceKind::XmlDossier)
        );
        assert_eq!(SourceKind::detect("notes.txt", b"plain"), None);
    }

    #[test]
    fn record_serializes_with_index_field_names() {
        let record = IngestRecord {
            id: "1".to_string(),
            organization: Organization::normalize("Acme"),
            title: "Page 1".to_string(),
            page: 1,
            total_pages: 1,
            file: "a.pdf".to_string(),
            content: "text".to_string(),
            content_vector: vec![0.5],
            keywords: Vec::new(),
        };

        let value = serde_json::to_value(&record).expect("record serializes");
        assert_eq!(value["organization"], "acme");
        assert_eq!(value["contentVector"][0], 0.5);
        assert!(value.get("content_vector").is_none());
    }

    #[test]
    fn dossier_chunks_carry_header_and_part_title() {
        let unit = ExtractedUnit {
            kind: SourceKind::XmlDossier,
            title: "Intro".to_string(),
            file: "12".to_string(),
            text: String::new(),
            ordinal: 12,
            total_units: 3,
        };
        let (title, content) = unit.label_chunk(2, 3, "body");
        assert_eq!(title, "Intro - Part 2");
        assert_eq!(content, "Intro - Chunk 2\n\nbody");
    }
}
