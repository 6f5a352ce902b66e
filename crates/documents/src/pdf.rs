use crate::SourceChunk;
use anyhow::{Context, Result};
use embeddings::TextChunker;
use lopdf::Document;
use tracing::{error, info, warn};

/// Text pulled out of a PDF, page by page.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedText {
    pub text: String,
    pub page_count: usize,
    pub failed_pages: Vec<u32>,
}

/// Reads every page of the PDF and appends the page texts as they come,
/// without a separator. A page whose text cannot be extracted is logged and
/// skipped; only an unreadable document is an error.
pub fn extract_text(bytes: &[u8]) -> Result<ExtractedText> {
    let document = Document::load_mem(bytes).context("Failed to read PDF document")?;

    let pages = document.get_pages();
    let mut text = String::new();
    let mut failed_pages = Vec::new();

    for &page_number in pages.keys() {
        match document.extract_text(&[page_number]) {
            Ok(page_text) => text.push_str(&page_text),
            Err(e) => {
                error!("Failed to extract text from page {}: {}", page_number, e);
                failed_pages.push(page_number);
            }
        }
    }

    Ok(ExtractedText {
        text,
        page_count: pages.len(),
        failed_pages,
    })
}

/// Extracts the PDF's text and splits it into chunks tagged with `file_name`.
/// Returns an empty list when the document has no extractable text.
pub fn process_pdf(
    file_name: &str,
    bytes: &[u8],
    chunker: &TextChunker,
) -> Result<Vec<SourceChunk>> {
    let extracted = extract_text(bytes).map_err(|e| {
        error!("Error reading PDF file {}: {:#}", file_name, e);
        e
    })?;

    info!(
        "File {}: extracted text length: {}, pages processed: {}",
        file_name,
        extracted.text.chars().count(),
        extracted.page_count
    );
    if !extracted.failed_pages.is_empty() {
        warn!(
            "File {}: skipped {} unreadable page(s): {:?}",
            file_name,
            extracted.failed_pages.len(),
            extracted.failed_pages
        );
    }

    if extracted.text.trim().is_empty() {
        warn!("No text extracted from file {}", file_name);
        return Ok(vec![]);
    }

    let chunks: Vec<SourceChunk> = chunker
        .chunk_text(&extracted.text)
        .into_iter()
        .map(|chunk| SourceChunk::new(file_name, chunk.chunk_id, chunk.content))
        .collect();
    info!("File {}: split into {} chunks", file_name, chunks.len());

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pdf;
    use embeddings::ChunkConfig;

    #[test]
    fn should_extract_text_from_single_page() {
        let bytes = test_pdf::build(&["Hello World"]).unwrap();

        let extracted = extract_text(&bytes).unwrap();

        assert_eq!(extracted.page_count, 1);
        assert!(extracted.text.contains("Hello World"));
        assert!(extracted.failed_pages.is_empty());
    }

    #[test]
    fn should_concatenate_pages_in_order() {
        let bytes = test_pdf::build(&["First page", "Second page"]).unwrap();

        let extracted = extract_text(&bytes).unwrap();

        assert_eq!(extracted.page_count, 2);
        let first = extracted.text.find("First page").unwrap();
        let second = extracted.text.find("Second page").unwrap();
        assert!(first < second);
    }

    #[test]
    fn should_join_page_texts_without_adding_separators() {
        let bytes = test_pdf::build(&["First page", "Second page"]).unwrap();
        let document = Document::load_mem(&bytes).unwrap();
        let pages: Vec<u32> = document.get_pages().keys().copied().collect();
        let expected: String = pages
            .iter()
            .map(|&page| document.extract_text(&[page]).unwrap())
            .collect();

        let extracted = extract_text(&bytes).unwrap();

        assert_eq!(extracted.text, expected);
    }

    #[test]
    fn should_reject_bytes_that_are_not_a_pdf() {
        let result = extract_text(b"definitely not a pdf");
        assert!(result.is_err());
    }

    #[test]
    fn should_tag_chunks_with_file_name() {
        let bytes = test_pdf::build(&["Remote work is allowed three days a week"]).unwrap();
        let chunker = TextChunker::default();

        let chunks = process_pdf("policy.pdf", &bytes, &chunker).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].source, "policy.pdf");
        assert_eq!(chunks[0].chunk_id, 0);
        assert!(chunks[0].content.contains("Remote work"));
    }

    #[test]
    fn should_split_long_text_into_several_chunks() {
        let pages = ["alpha beta gamma delta epsilon", "zeta eta theta iota kappa"];
        let bytes = test_pdf::build(&pages).unwrap();
        let chunker = TextChunker::new(ChunkConfig {
            chunk_size: 20,
            overlap_size: 5,
        });

        let chunks = process_pdf("greek.pdf", &bytes, &chunker).unwrap();

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.source == "greek.pdf"));
        let ids: Vec<usize> = chunks.iter().map(|c| c.chunk_id).collect();
        assert_eq!(ids, (0..chunks.len()).collect::<Vec<_>>());
    }

    #[test]
    fn should_return_no_chunks_for_pdf_without_text() {
        let bytes = test_pdf::build(&[""]).unwrap();

        let chunks = process_pdf("blank.pdf", &bytes, &TextChunker::default()).unwrap();

        assert!(chunks.is_empty());
    }

    #[test]
    fn should_fail_processing_for_corrupt_file() {
        let result = process_pdf(
            "broken.pdf",
            b"<html>not a pdf</html>",
            &TextChunker::default(),
        );
        assert!(result.is_err());
    }
}
