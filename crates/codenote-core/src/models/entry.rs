//! Entry model and the views handed out over the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{ValidationError, non_blank};

/// A saved piece of text, optionally bound to a code and gated by a
/// security question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_answer: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Entry {
    /// The challenge question, if retrieval is gated.
    pub fn challenge(&self) -> Option<&str> {
        match (&self.security_question, &self.security_answer) {
            (Some(question), Some(_)) => Some(question.as_str()),
            _ => None,
        }
    }

    pub fn is_restricted(&self) -> bool {
        self.challenge().is_some()
    }

    /// Case-insensitive comparison of a provided answer against the stored one.
    pub fn answer_matches(&self, provided: Option<&str>) -> bool {
        match (&self.security_answer, provided.map(str::trim)) {
            (Some(expected), Some(provided)) if !provided.is_empty() => {
                expected.trim().to_lowercase() == provided.to_lowercase()
            }
            _ => false,
        }
    }

    pub fn to_record(&self) -> EntryRecord {
        EntryRecord {
            id: self.id.clone(),
            title: self.title.clone(),
            code: self.code,
            security_question: self.challenge().map(str::to_string),
            restricted: self.is_restricted(),
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }

    pub fn to_code_status(&self, code: i64) -> CodeStatus {
        CodeStatus {
            code,
            restricted: self.is_restricted(),
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }

    pub fn to_retrieved(&self) -> RetrievedEntry {
        RetrievedEntry {
            title: self.title.clone(),
            code: self.code,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

/// Input for creating an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewEntry {
    pub title: String,
    pub code: Option<i64>,
    pub security_question: Option<String>,
    pub security_answer: Option<String>,
}

impl NewEntry {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_challenge(mut self, question: impl Into<String>, answer: impl Into<String>) -> Self {
        self.security_question = Some(question.into());
        self.security_answer = Some(answer.into());
        self
    }

    /// Check required fields and normalize the challenge pair.
    pub fn validate(self) -> Result<Self, ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::new("text", "Text is required"));
        }

        let question = non_blank(self.security_question);
        let answer = non_blank(self.security_answer);
        match (&question, &answer) {
            (Some(_), None) => {
                return Err(ValidationError::new(
                    "securityAnswer",
                    "A security answer is required when a question is set",
                ));
            }
            (None, Some(_)) => {
                return Err(ValidationError::new(
                    "securityQuestion",
                    "A security question is required when an answer is set",
                ));
            }
            _ => {}
        }

        Ok(Self {
            title: self.title,
            code: self.code,
            security_question: question,
            security_answer: answer,
        })
    }
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryUpdate {
    pub title: Option<String>,
    pub new_code: Option<i64>,
}

/// Entry as listed or returned after an update. Never carries the answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntryRecord {
    pub id: String,
    pub title: String,
    pub code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_question: Option<String>,
    pub restricted: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Payload of a successful retrieve.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedEntry {
    pub title: String,
    pub code: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// What an availability check reveals about a taken code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CodeStatus {
    pub code: i64,
    pub restricted: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Parse a code typed by a user. Blank input yields `None`.
pub fn parse_code(raw: &str) -> Result<Option<i64>, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<i64>()
        .map(Some)
        .map_err(|_| ValidationError::new("code", "Invalid code. Please enter a valid number."))
}

/// A code as it arrives in a JSON body: a number or a numeric string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CodeInput {
    Number(i64),
    Text(String),
}

impl CodeInput {
    pub fn resolve(&self) -> Result<Option<i64>, ValidationError> {
        match self {
            CodeInput::Number(code) => Ok(Some(*code)),
            CodeInput::Text(raw) => parse_code(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_entry() -> Entry {
        let now = Utc::now();
        Entry {
            id: "id-1".to_string(),
            title: "secret".to_string(),
            code: Some(5555),
            security_question: Some("pet name?".to_string()),
            security_answer: Some("Rex".to_string()),
            created_at: now,
            expires_at: now + Duration::days(31),
        }
    }

    #[test]
    fn test_answer_matching_ignores_case_and_padding() {
        let entry = sample_entry();
        assert!(entry.answer_matches(Some("rex")));
        assert!(entry.answer_matches(Some("  REX ")));
        assert!(!entry.answer_matches(Some("max")));
        assert!(!entry.answer_matches(Some("")));
        assert!(!entry.answer_matches(None));
    }

    #[test]
    fn test_record_hides_answer() {
        let entry = sample_entry();
        let json = serde_json::to_value(entry.to_record()).unwrap();
        assert_eq!(json["restricted"], true);
        assert_eq!(json["securityQuestion"], "pet name?");
        assert!(json.get("securityAnswer").is_none());
    }

    #[test]
    fn test_retrieved_view_has_no_id() {
        let json = serde_json::to_value(sample_entry().to_retrieved()).unwrap();
        assert_eq!(json["title"], "secret");
        assert_eq!(json["code"], 5555);
        assert!(json.get("id").is_none());
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_validate_rejects_blank_title() {
        let err = NewEntry::new("   ").validate().unwrap_err();
        assert_eq!(err.field, "text");
    }

    #[test]
    fn test_validate_requires_both_halves_of_challenge() {
        let mut input = NewEntry::new("hello");
        input.security_question = Some("pet?".to_string());
        assert_eq!(input.validate().unwrap_err().field, "securityAnswer");

        let mut input = NewEntry::new("hello");
        input.security_answer = Some("rex".to_string());
        assert_eq!(input.validate().unwrap_err().field, "securityQuestion");
    }

    #[test]
    fn test_validate_drops_blank_challenge() {
        let mut input = NewEntry::new("hello");
        input.security_question = Some(" ".to_string());
        input.security_answer = Some(String::new());
        let validated = input.validate().unwrap();
        assert_eq!(validated.security_question, None);
        assert_eq!(validated.security_answer, None);
    }

    #[test]
    fn test_parse_code() {
        assert_eq!(parse_code(" 1234 ").unwrap(), Some(1234));
        assert_eq!(parse_code("").unwrap(), None);
        assert!(parse_code("12ab").is_err());
    }

    #[test]
    fn test_code_input_accepts_numbers_and_strings() {
        let number: CodeInput = serde_json::from_str("1234").unwrap();
        let text: CodeInput = serde_json::from_str("\"0042\"").unwrap();
        let blank: CodeInput = serde_json::from_str("\"\"").unwrap();

        assert_eq!(number.resolve().unwrap(), Some(1234));
        assert_eq!(text.resolve().unwrap(), Some(42));
        assert_eq!(blank.resolve().unwrap(), None);
    }
}
