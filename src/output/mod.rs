//! Output serializers for processed reference batches.
//!
//! Three pure functions turn an ordered record list into the downloadable
//! formats: pretty JSON, RIS record blocks, and a fixed-column CSV. Each
//! format also carries its MIME type and download filename.

use crate::models::ReferenceRecord;

/// Fixed CSV column order, header always emitted
const CSV_COLUMNS: [&str; 12] = [
    "status",
    "title",
    "authors",
    "year",
    "journal",
    "volume",
    "issue",
    "pages",
    "doi",
    "url",
    "confidence",
    "original_reference",
];

/// Supported download formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Json,
    Ris,
    Csv,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Json, OutputFormat::Ris, OutputFormat::Csv];

    /// Parse a format from its wire name (`json`, `ris`, `csv`)
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "json" => Some(OutputFormat::Json),
            "ris" => Some(OutputFormat::Ris),
            "csv" => Some(OutputFormat::Csv),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Ris => "ris",
            OutputFormat::Csv => "csv",
        }
    }

    /// MIME type served on download
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Json => "application/json",
            OutputFormat::Ris => "application/x-research-info-systems",
            OutputFormat::Csv => "text/csv",
        }
    }

    /// Fixed attachment filename per format
    pub fn filename(&self) -> &'static str {
        match self {
            OutputFormat::Json => "references.json",
            OutputFormat::Ris => "references.ris",
            OutputFormat::Csv => "references.csv",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Errors that can occur while serializing a batch
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV serialization failed: {0}")]
    Csv(String),
}

impl From<csv::Error> for OutputError {
    fn from(err: csv::Error) -> Self {
        OutputError::Csv(err.to_string())
    }
}

/// Serialize a batch into the requested format
pub fn serialize(format: OutputFormat, records: &[ReferenceRecord]) -> Result<String, OutputError> {
    match format {
        OutputFormat::Json => to_json(records),
        OutputFormat::Ris => Ok(to_ris(records)),
        OutputFormat::Csv => to_csv(records),
    }
}

/// Pretty-printed JSON array, non-ASCII preserved
pub fn to_json(records: &[ReferenceRecord]) -> Result<String, OutputError> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// RIS export: one `TY  - JOUR ... ER  - ` block per record, input order
pub fn to_ris(records: &[ReferenceRecord]) -> String {
    records
        .iter()
        .map(ris_record)
        .collect::<Vec<_>>()
        .join("\n")
}

fn ris_record(record: &ReferenceRecord) -> String {
    let mut lines = vec!["TY  - JOUR".to_string()];

    if record.is_found() {
        for author in &record.authors {
            lines.push(format!("AU  - {}", author));
        }
        push_tag(&mut lines, "TI", &record.title);
        if let Some(year) = record.year {
            lines.push(format!("PY  - {}", year));
        }
        push_tag(&mut lines, "JO", &record.journal);
        push_tag(&mut lines, "VL", &record.volume);
        if let Some(issue) = &record.issue {
            push_tag(&mut lines, "IS", issue);
        }
        push_tag(&mut lines, "SP", &record.pages);
        push_tag(&mut lines, "DO", &record.doi);
        push_tag(&mut lines, "UR", &record.url);
        push_tag(&mut lines, "N1", &record.original_reference);
    } else {
        lines.push(format!("N1  - [NOT_FOUND] {}", record.original_reference));
        if let Some(error) = &record.error {
            lines.push(format!("N1  - Error: {}", error));
        }
    }

    lines.push("ER  - ".to_string());
    lines.join("\n")
}

fn push_tag(lines: &mut Vec<String>, tag: &str, value: &str) {
    if !value.trim().is_empty() {
        lines.push(format!("{}  - {}", tag, value));
    }
}

/// CSV export with the fixed column set; authors joined with "; ",
/// absent fields rendered as empty strings
pub fn to_csv(records: &[ReferenceRecord]) -> Result<String, OutputError> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(CSV_COLUMNS)?;

    for record in records {
        let confidence = if record.is_found() {
            record.confidence.to_string()
        } else {
            String::new()
        };

        writer.write_record([
            record.status.as_str().to_string(),
            record.title.clone(),
            record.authors_joined(),
            record.year.map(|y| y.to_string()).unwrap_or_default(),
            record.journal.clone(),
            record.volume.clone(),
            record.issue.clone().unwrap_or_default(),
            record.pages.clone(),
            record.doi.clone(),
            record.url.clone(),
            confidence,
            record.original_reference.clone(),
        ])?;
    }

    writer.flush().map_err(|e| OutputError::Csv(e.to_string()))?;
    let bytes = writer
        .into_inner()
        .map_err(|e| OutputError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| OutputError::Csv(e.to_string()))
}
