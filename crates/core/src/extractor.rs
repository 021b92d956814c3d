use crate::error::IngestError;
use crate::models::{ExtractedUnit, SourceKind};
use lopdf::Document;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

pub trait PdfExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageText>, IngestError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageText>, IngestError> {
        let document = Document::load_mem(bytes)
            .map_err(|error| IngestError::MalformedDocument(format!("pdf parse error: {error}")))?;

        let pages = document.get_pages();
        if pages.is_empty() {
            return Err(IngestError::MalformedDocument(
                "pdf has no pages".to_string(),
            ));
        }

        let mut result = Vec::with_capacity(pages.len());
        for page_no in pages.keys().copied() {
            let text = match document.extract_text(&[page_no]) {
                Ok(text) => text,
                Err(error) => {
                    warn!(page = page_no, %error, "unreadable pdf page, keeping heading only");
                    String::new()
                }
            };
            result.push(PageText {
                number: page_no,
                text,
            });
        }

        Ok(result)
    }
}

/// Converts a PDF into one markdown unit per page, headed with the file name and page number.
pub fn extract_pdf_units(bytes: &[u8], file_name: &str) -> Result<Vec<ExtractedUnit>, IngestError> {
    let pages = LopdfExtractor.extract_pages(bytes)?;
    let total_pages = u32::try_from(pages.len()).unwrap_or(u32::MAX);

    Ok(pages
        .into_iter()
        .map(|page| ExtractedUnit {
            kind: SourceKind::Pdf,
            title: format!("Page {}", page.number),
            file: file_name.to_string(),
            text: page_markdown(file_name, &page),
            ordinal: page.number,
            total_units: total_pages,
        })
        .collect())
}

fn page_markdown(file_name: &str, page: &PageText) -> String {
    format!("## {file_name} - Page {}\n\n{}\n", page.number, page.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::build_pdf;

    #[test]
    fn pages_are_wrapped_with_a_heading() {
        let pdf = build_pdf(&["Hydraulic pump", "Pressure valve", "Flow meter"]);
        let units = extract_pdf_units(&pdf, "manual.pdf").expect("pdf should parse");

        assert_eq!(units.len(), 3);
        assert_eq!(units[1].ordinal, 2);
        assert_eq!(units[1].title, "Page 2");
        assert_eq!(units[1].file, "manual.pdf");
        assert!(units.iter().all(|unit| unit.total_units == 3));
        assert!(units[1].text.starts_with("## manual.pdf - Page 2\n\n"));
        assert!(units[1].text.contains("Pressure valve"));
    }

    #[test]
    fn garbage_bytes_are_a_malformed_document() {
        let result = extract_pdf_units(b"%PDF-1.4\n%broken", "broken.pdf");
        assert!(matches!(result, Err(IngestError::MalformedDocument(_))));
    }

    #[test]
    fn page_markdown_layout() {
        let page = PageText {
            number: 4,
            text: "body".to_string(),
        };
        assert_eq!(page_markdown("a.pdf", &page), "## a.pdf - Page 4\n\nbody\n");
    }
}
