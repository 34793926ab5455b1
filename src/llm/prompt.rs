//! Prompt template for citation metadata extraction.

/// Build the extraction prompt for one reference string.
///
/// Pure function: the same reference always yields the same prompt. The
/// template asks for JSON-only output over a fixed field list so the reply
/// can be parsed without further negotiation.
pub fn extraction_prompt(reference: &str) -> String {
    format!(
        r#"[Request: Extract reference data]
Input: "{reference}"
Output format: JSON only
Fields: title (string), authors (list of strings), year (int or null), journal (string), volume (string), issue (string or null), pages (string), doi (string), url (string), status ("found" or "not_found"), confidence (float 0-1), original_reference (string)
Rules:
- Parse flexibly: extract as much metadata as possible from the input
- DOI format: 10.xxxx/xxxx if present
- URL: https://doi.org/[DOI] if DOI exists, otherwise empty string
- Status: "found" if metadata is extracted, "not_found" if unable to parse
- Confidence: 0-1 float based on parsing certainty
- original_reference: the exact input text
- Return only valid JSON, no additional text or code blocks"#
    )
}
