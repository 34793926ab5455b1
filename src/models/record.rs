//! Reference record model: the structured result of extracting one citation.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Whether the extractor managed to pull usable metadata out of a reference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Found,
    #[default]
    NotFound,
}

impl ExtractionStatus {
    /// Returns the wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStatus::Found => "found",
            ExtractionStatus::NotFound => "not_found",
        }
    }
}

impl std::fmt::Display for ExtractionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured citation metadata for a single input reference
///
/// Model replies are parsed leniently: string fields tolerate numbers and
/// null, `year` accepts an integer or a numeric string, `authors` accepts a
/// list or a single string. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    /// Article title
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,

    /// Author names in citation order
    #[serde(default, deserialize_with = "lenient_authors")]
    pub authors: Vec<String>,

    /// Publication year
    #[serde(default, deserialize_with = "lenient_year", skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,

    /// Journal name
    #[serde(default, deserialize_with = "lenient_string")]
    pub journal: String,

    /// Volume
    #[serde(default, deserialize_with = "lenient_string")]
    pub volume: String,

    /// Issue, when the citation carries one
    #[serde(default, deserialize_with = "lenient_opt_string", skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,

    /// Page range
    #[serde(default, deserialize_with = "lenient_string")]
    pub pages: String,

    /// Digital Object Identifier
    #[serde(default, deserialize_with = "lenient_string")]
    pub doi: String,

    /// Resolvable URL, derived from the DOI when absent
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: String,

    /// Extraction outcome
    #[serde(default)]
    pub status: ExtractionStatus,

    /// Parsing certainty reported by the extractor, clamped to [0, 1]
    #[serde(default, deserialize_with = "lenient_confidence")]
    pub confidence: f64,

    /// The exact input text this record was extracted from
    #[serde(default, deserialize_with = "lenient_string")]
    pub original_reference: String,

    /// Failure description, present only on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReferenceRecord {
    /// Build a terminal not-found record for a reference that could not be processed
    pub fn not_found(original_reference: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: ExtractionStatus::NotFound,
            error: Some(error.into()),
            original_reference: original_reference.into(),
            ..Self::default()
        }
    }

    /// Parse a record out of a JSON value produced by the extractor
    pub fn from_extraction(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn is_found(&self) -> bool {
        self.status == ExtractionStatus::Found
    }

    /// True when the extractor populated title or authors non-trivially.
    /// A "found" reply failing this check is treated as a failed attempt.
    pub fn has_extracted_content(&self) -> bool {
        !self.title.trim().is_empty() || self.authors.iter().any(|a| !a.trim().is_empty())
    }

    /// Fill `url` from `doi` when the DOI is present and the URL is empty
    pub fn derive_url(&mut self) {
        if !self.doi.trim().is_empty() && self.url.trim().is_empty() {
            self.url = format!("https://doi.org/{}", self.doi.trim());
        }
    }

    /// Authors joined for tabular output
    pub fn authors_joined(&self) -> String {
        self.authors.join("; ")
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        Some(Value::String(s)) => s.trim().parse::<i32>().ok(),
        _ => None,
    })
}

fn lenient_authors<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    })
}

fn lenient_confidence<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(raw.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&ExtractionStatus::Found).unwrap(),
            "\"found\""
        );
        assert_eq!(
            serde_json::to_string(&ExtractionStatus::NotFound).unwrap(),
            "\"not_found\""
        );
    }

    #[test]
    fn test_from_extraction_typical_reply() {
        let value = json!({
            "title": "Deep learning",
            "authors": ["Smith J."],
            "year": 2020,
            "doi": "10.1/abc",
            "status": "found",
            "confidence": 0.8
        });

        let record = ReferenceRecord::from_extraction(value).unwrap();
        assert_eq!(record.title, "Deep learning");
        assert_eq!(record.authors, vec!["Smith J.".to_string()]);
        assert_eq!(record.year, Some(2020));
        assert_eq!(record.doi, "10.1/abc");
        assert!(record.is_found());
        assert_eq!(record.confidence, 0.8);
    }

    #[test]
    fn test_lenient_year_accepts_numeric_string() {
        let record =
            ReferenceRecord::from_extraction(json!({ "year": "2019", "status": "found" })).unwrap();
        assert_eq!(record.year, Some(2019));

        let record =
            ReferenceRecord::from_extraction(json!({ "year": "n.d.", "status": "found" })).unwrap();
        assert_eq!(record.year, None);

        let record =
            ReferenceRecord::from_extraction(json!({ "year": null, "status": "found" })).unwrap();
        assert_eq!(record.year, None);
    }

    #[test]
    fn test_lenient_authors_accepts_single_string() {
        let record =
            ReferenceRecord::from_extraction(json!({ "authors": "Smith J." })).unwrap();
        assert_eq!(record.authors, vec!["Smith J.".to_string()]);

        let record = ReferenceRecord::from_extraction(json!({ "authors": ["A", "B"] })).unwrap();
        assert_eq!(record.authors, vec!["A".to_string(), "B".to_string()]);

        let record = ReferenceRecord::from_extraction(json!({ "authors": null })).unwrap();
        assert!(record.authors.is_empty());
    }

    #[test]
    fn test_lenient_strings_tolerate_null_and_numbers() {
        let record = ReferenceRecord::from_extraction(json!({
            "title": null,
            "volume": 12,
            "journal": "Nature"
        }))
        .unwrap();
        assert_eq!(record.title, "");
        assert_eq!(record.volume, "12");
        assert_eq!(record.journal, "Nature");
    }

    #[test]
    fn test_confidence_clamped() {
        let record =
            ReferenceRecord::from_extraction(json!({ "confidence": 1.7 })).unwrap();
        assert_eq!(record.confidence, 1.0);

        let record =
            ReferenceRecord::from_extraction(json!({ "confidence": "0.75" })).unwrap();
        assert_eq!(record.confidence, 0.75);
    }

    #[test]
    fn test_derive_url_only_when_missing() {
        let mut record = ReferenceRecord {
            doi: "10.1/abc".to_string(),
            ..ReferenceRecord::default()
        };
        record.derive_url();
        assert_eq!(record.url, "https://doi.org/10.1/abc");

        let mut record = ReferenceRecord {
            doi: "10.1/abc".to_string(),
            url: "https://example.org/paper".to_string(),
            ..ReferenceRecord::default()
        };
        record.derive_url();
        assert_eq!(record.url, "https://example.org/paper");

        let mut record = ReferenceRecord::default();
        record.derive_url();
        assert_eq!(record.url, "");
    }

    #[test]
    fn test_not_found_constructor() {
        let record = ReferenceRecord::not_found("Some ref", "All attempts failed");
        assert_eq!(record.status, ExtractionStatus::NotFound);
        assert_eq!(record.error.as_deref(), Some("All attempts failed"));
        assert_eq!(record.original_reference, "Some ref");
        assert!(record.title.is_empty());
        assert!(!record.has_extracted_content());
    }

    #[test]
    fn test_has_extracted_content() {
        let record = ReferenceRecord {
            title: "Deep learning".to_string(),
            status: ExtractionStatus::Found,
            ..ReferenceRecord::default()
        };
        assert!(record.has_extracted_content());

        let record = ReferenceRecord {
            authors: vec!["Smith J.".to_string()],
            status: ExtractionStatus::Found,
            ..ReferenceRecord::default()
        };
        assert!(record.has_extracted_content());

        let record = ReferenceRecord {
            title: "   ".to_string(),
            authors: vec![" ".to_string()],
            status: ExtractionStatus::Found,
            ..ReferenceRecord::default()
        };
        assert!(!record.has_extracted_content());
    }

    #[test]
    fn test_error_skipped_when_absent() {
        let record = ReferenceRecord {
            title: "Deep learning".to_string(),
            status: ExtractionStatus::Found,
            ..ReferenceRecord::default()
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("\"error\""));
        assert!(!json.contains("\"year\""));
    }
}
