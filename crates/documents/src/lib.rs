pub mod pdf;
#[cfg(any(test, feature = "test-support"))]
pub mod test_pdf;

pub use pdf::{extract_text, process_pdf, ExtractedText};

use serde::{Deserialize, Serialize};

/// A chunk of extracted text tagged with the file it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceChunk {
    pub source: String,
    pub chunk_id: usize,
    pub content: String,
}

impl SourceChunk {
    pub fn new(source: impl Into<String>, chunk_id: usize, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            chunk_id,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_serialize_source_chunk() {
        let chunk = SourceChunk::new("manual.pdf", 3, "Chapter one");

        let json = serde_json::to_string(&chunk).unwrap();

        assert_eq!(
            json,
            r#"{"source":"manual.pdf","chunk_id":3,"content":"Chapter one"}"#
        );
    }
}
