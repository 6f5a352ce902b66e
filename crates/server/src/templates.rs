use askama::Template;
use pdfchat_core::QaPair;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub history: Vec<QaPair>,
    pub files: Vec<String>,
}

#[derive(Template)]
#[template(path = "files.html")]
pub struct FilesTemplate {
    pub files: Vec<String>,
}

#[derive(Template)]
#[template(path = "partials/file_list.html")]
pub struct FileListTemplate {
    pub files: Vec<String>,
}

#[derive(Template)]
#[template(path = "partials/qa_pair.html")]
pub struct QaPairTemplate {
    pub question: String,
    pub answer: String,
    pub sources: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_escape_user_text_in_qa_pair() {
        let html = QaPairTemplate {
            question: "<script>alert(1)</script>".to_string(),
            answer: "Fine & dandy".to_string(),
            sources: vec!["a.pdf".to_string(), "b.pdf".to_string()],
        }
        .render()
        .unwrap();

        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("Fine &amp; dandy"));
        assert!(html.contains("Sources: a.pdf, b.pdf"));
    }

    #[test]
    fn should_omit_sources_line_when_empty() {
        let html = QaPairTemplate {
            question: "q".to_string(),
            answer: "a".to_string(),
            sources: vec![],
        }
        .render()
        .unwrap();

        assert!(!html.contains("Sources:"));
    }

    #[test]
    fn should_render_empty_file_list_message() {
        let html = FileListTemplate { files: vec![] }.render().unwrap();
        assert!(html.contains("No files uploaded yet."));
    }

    #[test]
    fn should_render_history_on_index_page() {
        let html = IndexTemplate {
            history: vec![QaPair::new("What is it?", "A manual.")],
            files: vec!["manual.pdf".to_string()],
        }
        .render()
        .unwrap();

        assert!(html.contains("<!DOCTYPE html>"));
        assert!(html.contains("What is it?"));
        assert!(html.contains("A manual."));
        assert!(html.contains("manual.pdf"));
    }

    #[test]
    fn should_wrap_file_list_in_full_page() {
        let html = FilesTemplate {
            files: vec!["report.pdf".to_string()],
        }
        .render()
        .unwrap();

        assert!(html.contains("<title>Uploaded files</title>"));
        assert!(html.contains("value=\"report.pdf\""));
    }
}
