use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AskForm {
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoveFileForm {
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilesQuery {
    #[serde(default)]
    pub partial: Option<String>,
}

impl FilesQuery {
    pub fn wants_partial(&self) -> bool {
        self.partial.as_deref() == Some("true")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_missing_question_to_empty() {
        let form: AskForm = serde_json::from_str("{}").unwrap();
        assert_eq!(form.question, "");
    }

    #[test]
    fn should_treat_only_literal_true_as_partial() {
        let partial: FilesQuery = serde_json::from_str(r#"{"partial":"true"}"#).unwrap();
        let other: FilesQuery = serde_json::from_str(r#"{"partial":"yes"}"#).unwrap();
        let missing: FilesQuery = serde_json::from_str("{}").unwrap();

        assert!(partial.wants_partial());
        assert!(!other.wants_partial());
        assert!(!missing.wants_partial());
    }

    #[test]
    fn should_serialize_health_response() {
        let response = HealthResponse {
            status: "ok".to_string(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"status":"ok"}"#);
    }
}
