//! Adapter for reading post and profile records
//!
//! Records arrive as NDJSON, JSON arrays, or CSV exports with a header row.

use crate::error::FeatureError;
use crate::schema::record::{AuthorProfile, PostRecord, ValidationError};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Input encoding of a record stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
    /// CSV with a header row
    Csv,
}

/// Adapter for converting serialized records into typed records
pub struct RecordAdapter;

impl RecordAdapter {
    /// Parse posts in the given format
    pub fn parse_posts(input: &str, format: RecordFormat) -> Result<Vec<PostRecord>, FeatureError> {
        Self::parse(input, format)
    }

    /// Parse author profiles in the given format
    pub fn parse_profiles(
        input: &str,
        format: RecordFormat,
    ) -> Result<Vec<AuthorProfile>, FeatureError> {
        Self::parse(input, format)
    }

    fn parse<T: DeserializeOwned>(input: &str, format: RecordFormat) -> Result<Vec<T>, FeatureError> {
        let records = match format {
            RecordFormat::Ndjson => Self::parse_ndjson(input)?,
            RecordFormat::Json => Self::parse_array(input)?,
            RecordFormat::Csv => Self::parse_csv(input)?,
        };
        debug!(count = records.len(), ?format, "Parsed records");
        Ok(records)
    }

    /// Parse a JSON string containing an array of records
    pub fn parse_array<T: DeserializeOwned>(json: &str) -> Result<Vec<T>, FeatureError> {
        let records: Vec<T> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (newline-delimited JSON) records
    pub fn parse_ndjson<T: DeserializeOwned>(ndjson: &str) -> Result<Vec<T>, FeatureError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<T>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(FeatureError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Parse CSV with a header row; dataset column names are accepted
    pub fn parse_csv<T: DeserializeOwned>(csv_text: &str) -> Result<Vec<T>, FeatureError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(csv_text.as_bytes());

        let mut records = Vec::new();
        for (row_num, result) in reader.deserialize::<T>().enumerate() {
            match result {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(FeatureError::ParseError(format!(
                        "Failed to parse CSV row {}: {}",
                        row_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Validate a batch of posts, returning only the failures
    pub fn validate_posts(posts: &[PostRecord]) -> Vec<ValidationResult> {
        posts
            .iter()
            .enumerate()
            .filter_map(|(idx, post)| {
                post.validate().err().map(|error| ValidationResult {
                    index: idx,
                    post_id: Some(post.post_id.clone()).filter(|id| !id.is_empty()),
                    error,
                })
            })
            .collect()
    }
}

/// A post that failed validation
#[derive(Debug)]
pub struct ValidationResult {
    pub index: usize,
    pub post_id: Option<String>,
    pub error: ValidationError,
}
