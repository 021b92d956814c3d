use crate::chunking::{ChunkingConfig, Chunks};
use crate::dossier::extract_dossier_units;
use crate::error::IngestError;
use crate::extractor::extract_pdf_units;
use crate::models::{ExtractedUnit, SourceKind};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A chunk with its record metadata, before embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkDraft {
    pub title: String,
    pub file: String,
    pub page: u32,
    pub total_pages: u32,
    pub content: String,
}

/// Finds ingestible files (`.pdf`, `.xml`) under `folder`, recursively, sorted by path.
pub fn discover_upload_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let supported = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf") || ext.eq_ignore_ascii_case("xml"));

        if supported {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn extract_units(file_name: &str, bytes: &[u8]) -> Result<Vec<ExtractedUnit>, IngestError> {
    match SourceKind::detect(file_name, bytes) {
        Some(SourceKind::Pdf) => extract_pdf_units(bytes, file_name),
        Some(SourceKind::XmlDossier) => extract_dossier_units(bytes, file_name),
        None => Err(IngestError::UnsupportedFormat(file_name.to_string())),
    }
}

/// Chunks every unit in order. Units that render to nothing produce no drafts.
pub fn draft_chunks(units: &[ExtractedUnit], config: ChunkingConfig) -> Vec<ChunkDraft> {
    let mut drafts = Vec::new();

    for unit in units {
        let chunks = Chunks::new(&unit.text, config).collect::<Vec<_>>();
        let count = chunks.len();

        for (position, chunk) in chunks.into_iter().enumerate() {
            let (title, content) = unit.label_chunk(position + 1, count, chunk);
            drafts.push(ChunkDraft {
                title,
                file: unit.file.clone(),
                page: unit.ordinal,
                total_pages: unit.total_units,
                content,
            });
        }
    }

    drafts
}

/// Converts and chunks one uploaded file. CPU-bound; run it on the worker pool.
pub fn prepare_file(
    file_name: &str,
    bytes: &[u8],
    config: ChunkingConfig,
) -> Result<Vec<ChunkDraft>, IngestError> {
    let units = extract_units(file_name, bytes)?;
    Ok(draft_chunks(&units, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::build_pdf;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    fn config(size: usize) -> ChunkingConfig {
        ChunkingConfig::new(size).unwrap()
    }

    #[test]
    fn discover_upload_files_is_recursive_and_filtered() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        let nested = base.join("nested");
        fs::create_dir(&nested)?;

        File::create(base.join("a.pdf")).and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        File::create(nested.join("b.XML")).and_then(|mut file| file.write_all(b"<folder/>"))?;
        File::create(base.join("notes.txt")).and_then(|mut file| file.write_all(b"skip"))?;

        let files = discover_upload_files(base);
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|path| path.extension().is_some()));
        Ok(())
    }

    #[test]
    fn pdf_pages_become_one_draft_each_when_small() {
        let pdf = build_pdf(&["alpha", "beta"]);
        let drafts = prepare_file("A.pdf", &pdf, config(5_000)).unwrap();

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].title, "Page 1");
        assert_eq!(drafts[1].page, 2);
        assert_eq!(drafts[1].total_pages, 2);
        assert_eq!(drafts[1].file, "A.pdf");
        assert!(drafts[1].content.starts_with("## A.pdf - Page 2"));
    }

    #[test]
    fn long_units_are_split_into_numbered_parts() {
        let unit = ExtractedUnit {
            kind: SourceKind::Pdf,
            title: "Page 1".to_string(),
            file: "big.pdf".to_string(),
            text: "Sentence number one. ".repeat(10),
            ordinal: 1,
            total_units: 1,
        };

        let drafts = draft_chunks(&[unit], config(50));
        assert!(drafts.len() > 1);
        assert_eq!(drafts[0].title, "Page 1 - Part 1");
        assert_eq!(drafts[1].title, "Page 1 - Part 2");
        assert!(drafts.iter().all(|draft| draft.content.chars().count() <= 50));
    }

    #[test]
    fn dossier_drafts_carry_chunk_headers() {
        let xml = br#"<folder id="3"><document id="10"><naam>Intro</naam><section><p>Hello</p></section></document></folder>"#;
        let drafts = prepare_file("dossier.xml", xml, config(5_000)).unwrap();

        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title, "Intro - Part 1");
        assert_eq!(drafts[0].content, "Intro - Chunk 1\n\nHello");
        assert_eq!(drafts[0].file, "10");
        assert_eq!(drafts[0].page, 10);
        assert_eq!(drafts[0].total_pages, 3);
    }

    #[test]
    fn unknown_formats_are_rejected() {
        let result = prepare_file("notes.txt", b"plain text", config(100));
        assert!(matches!(result, Err(IngestError::UnsupportedFormat(_))));
    }
}
