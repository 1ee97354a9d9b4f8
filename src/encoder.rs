//! Feature table encoding
//!
//! This module encodes feature tables as JSON payloads with producer metadata,
//! as NDJSON rows, or as a flat CSV table for classifier training. Missing
//! values are written as `NaN` in CSV and `null` in JSON.

use crate::circular::HOURS_PER_DAY;
use crate::error::FeatureError;
use crate::types::{
    AuthorFeatureRow, AuthorTimeStatistics, BagOfWords, FeaturePayload, FeatureTable, Producer,
};
use crate::{FLUX_VERSION, PRODUCER_NAME};
use chrono::Utc;
use std::io::Write;
use uuid::Uuid;

/// Leading CSV columns, before the mode indicator columns
const TIME_COLUMNS: &[&str] = &[
    "userid",
    "earliest_tweet_time",
    "latest_tweet_time",
    "average_tweet_time",
    "median_tweet_time",
    "tweet_count",
    "stddev_tweet_time",
];

/// Trailing CSV columns, after the mode indicator columns
const AGGREGATE_COLUMNS: &[&str] = &[
    "total_posts",
    "retweet_ratio",
    "language_tweet_proportion",
    "avg_tweets_per_week",
    "avg_tweets_per_day",
    "avg_tweets_per_hour",
    "avg_tweets_per_min",
    "avg_quote_count",
    "avg_like_count",
    "avg_retweet_count",
    "avg_hashtags",
    "avg_urls",
    "avg_user_mentions",
    "BoW",
];

/// Encoder for feature tables
pub struct FeatureEncoder {
    instance_id: String,
}

impl Default for FeatureEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Wrap a table with producer metadata
    pub fn encode(&self, table: &FeatureTable, language: &str) -> FeaturePayload {
        FeaturePayload {
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: FLUX_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            language: language.to_string(),
            rows: table.rows.clone(),
        }
    }

    /// Encode to a pretty JSON payload
    pub fn encode_to_json(&self, table: &FeatureTable, language: &str) -> Result<String, FeatureError> {
        let payload = self.encode(table, language);
        serde_json::to_string_pretty(&payload).map_err(FeatureError::JsonError)
    }

    /// One JSON row per line, without payload metadata
    pub fn encode_to_ndjson(&self, table: &FeatureTable) -> Result<String, FeatureError> {
        let mut out = String::new();
        for row in &table.rows {
            out.push_str(&serde_json::to_string(row)?);
            out.push('\n');
        }
        Ok(out)
    }

    /// Write the flat CSV table
    pub fn write_csv<W: Write>(&self, table: &FeatureTable, writer: W) -> Result<(), FeatureError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(csv_header())?;
        for row in &table.rows {
            csv_writer.write_record(csv_record(row))?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Encode the flat CSV table to a string
    pub fn encode_to_csv(&self, table: &FeatureTable) -> Result<String, FeatureError> {
        let mut buffer = Vec::new();
        self.write_csv(table, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| FeatureError::EncodingError(e.to_string()))
    }

    /// Encode time-statistics rows alone as CSV (the leading columns of the
    /// full table)
    pub fn encode_time_rows_to_csv(&self, rows: &[AuthorTimeStatistics]) -> Result<String, FeatureError> {
        let mut csv_writer = csv::Writer::from_writer(Vec::new());
        csv_writer.write_record(time_csv_header())?;
        for row in rows {
            let mut record = vec![row.author_id.clone()];
            record.extend(time_fields(row));
            csv_writer.write_record(record)?;
        }
        let buffer = csv_writer
            .into_inner()
            .map_err(|e| FeatureError::EncodingError(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| FeatureError::EncodingError(e.to_string()))
    }
}

/// Time-statistics column names: author id, time columns, mode indicators
pub fn time_csv_header() -> Vec<String> {
    TIME_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain((0..HOURS_PER_DAY).map(|hour| format!("mode_{hour}")))
        .collect()
}

/// CSV column names in output order
pub fn csv_header() -> Vec<String> {
    let mut header = time_csv_header();
    header.extend(AGGREGATE_COLUMNS.iter().map(|c| c.to_string()));
    header
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        value.to_string()
    }
}

fn format_packed(value: Option<u32>) -> String {
    value.map_or_else(|| "NaN".to_string(), |v| v.to_string())
}

/// Time fields after the author id, aligned with [`TIME_COLUMNS`]
fn time_fields(time: &AuthorTimeStatistics) -> Vec<String> {
    let mut fields = vec![
        format_packed(time.earliest),
        format_packed(time.latest),
        format_packed(time.mean),
        format_packed(time.median),
        format_packed(time.count),
        format_packed(time.stddev),
    ];
    fields.extend((0..HOURS_PER_DAY).map(|hour| format_value(time.mode_slot(hour))));
    fields
}

fn csv_record(row: &AuthorFeatureRow) -> Vec<String> {
    let mut record = vec![row.author_id.clone()];
    record.extend(time_fields(&row.time));

    let activity = &row.activity;
    let engagement = &row.engagement;
    record.push(row.total_posts.to_string());
    record.extend(
        [
            activity.retweet_ratio,
            activity.language_ratio,
            activity.avg_posts_per_week,
            activity.avg_posts_per_day,
            activity.avg_posts_per_hour,
            activity.avg_posts_per_min,
            engagement.avg_quote_count,
            engagement.avg_like_count,
            engagement.avg_retweet_count,
            engagement.avg_hashtags,
            engagement.avg_urls,
            engagement.avg_user_mentions,
        ]
        .into_iter()
        .map(format_value),
    );
    record.push(match &row.bag_of_words {
        BagOfWords::Tokens(tokens) => tokens.join(" "),
        BagOfWords::Joined(text) => text.clone(),
    });
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActivityFeatures, EngagementFeatures};

    fn make_row(author_id: &str, with_times: bool) -> AuthorFeatureRow {
        let time = if with_times {
            let mut slots = [0u8; HOURS_PER_DAY];
            slots[9] = 1;
            AuthorTimeStatistics {
                author_id: author_id.to_string(),
                earliest: Some(905),
                latest: Some(1430),
                mean: Some(1147),
                median: Some(1147),
                stddev: Some(237),
                count: Some(2),
                mode_hours: Some(slots),
            }
        } else {
            AuthorTimeStatistics::missing(author_id)
        };

        AuthorFeatureRow {
            author_id: author_id.to_string(),
            total_posts: 2,
            time,
            activity: ActivityFeatures {
                retweet_ratio: 0.5,
                language_ratio: 1.0,
                avg_posts_per_week: 2.0,
                avg_posts_per_day: 2.0,
                avg_posts_per_hour: f64::NAN,
                avg_posts_per_min: f64::NAN,
            },
            engagement: EngagementFeatures {
                avg_quote_count: f64::NAN,
                avg_like_count: 3.5,
                avg_retweet_count: 1.0,
                avg_hashtags: 0.0,
                avg_urls: 1.0,
                avg_user_mentions: 0.5,
            },
            bag_of_words: BagOfWords::Tokens(vec!["vote".into(), "today".into()]),
        }
    }

    fn make_table() -> FeatureTable {
        FeatureTable {
            rows: vec![make_row("u1", true), make_row("u2", false)],
        }
    }

    #[test]
    fn test_csv_header_layout() {
        let header = csv_header();
        assert_eq!(header.len(), TIME_COLUMNS.len() + HOURS_PER_DAY + AGGREGATE_COLUMNS.len());
        assert_eq!(header[0], "userid");
        assert_eq!(header[7], "mode_0");
        assert_eq!(header[30], "mode_23");
        assert_eq!(header.last().map(String::as_str), Some("BoW"));
    }

    #[test]
    fn test_time_csv_matches_table_prefix() {
        let header = time_csv_header();
        assert_eq!(header.len(), TIME_COLUMNS.len() + HOURS_PER_DAY);
        assert_eq!(header[..], csv_header()[..header.len()]);

        let table = make_table();
        let rows: Vec<AuthorTimeStatistics> = table.rows.iter().map(|r| r.time.clone()).collect();
        let encoder = FeatureEncoder::new();
        let time_csv = encoder.encode_time_rows_to_csv(&rows).unwrap();
        let full_csv = encoder.encode_to_csv(&table).unwrap();

        for (time_line, full_line) in time_csv.lines().zip(full_csv.lines()) {
            let time_fields: Vec<&str> = time_line.split(',').collect();
            let full_fields: Vec<&str> = full_line.split(',').collect();
            assert_eq!(time_fields[..], full_fields[..time_fields.len()]);
        }
        assert_eq!(time_csv.lines().count(), 3);
    }

    #[test]
    fn test_encode_csv() {
        let encoder = FeatureEncoder::new();
        let csv_text = encoder.encode_to_csv(&make_table()).unwrap();
        let lines: Vec<&str> = csv_text.lines().collect();
        assert_eq!(lines.len(), 3);

        let first: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(&first[..7], &["u1", "905", "1430", "1147", "1147", "2", "237"]);
        assert_eq!(first[7 + 9], "1");
        assert_eq!(first[7], "0");
        assert_eq!(*first.last().unwrap(), "vote today");

        let second: Vec<&str> = lines[2].split(',').collect();
        assert!(second[1..31].iter().all(|v| *v == "NaN"));
    }

    #[test]
    fn test_encode_payload() {
        let encoder = FeatureEncoder::with_instance_id("test-instance".to_string());
        let payload = encoder.encode(&make_table(), "en");

        assert_eq!(payload.producer.name, PRODUCER_NAME);
        assert_eq!(payload.producer.version, FLUX_VERSION);
        assert_eq!(payload.producer.instance_id, "test-instance");
        assert_eq!(payload.language, "en");
        assert_eq!(payload.rows.len(), 2);
    }

    #[test]
    fn test_encode_to_json_writes_null_for_missing() {
        let encoder = FeatureEncoder::new();
        let json = encoder.encode_to_json(&make_table(), "en").unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed.get("producer").is_some());
        assert!(parsed.get("computed_at_utc").is_some());
        assert_eq!(parsed["rows"][0]["time"]["mean"], 1147);
        assert!(parsed["rows"][1]["time"]["mean"].is_null());
        assert!(parsed["rows"][0]["activity"]["avg_posts_per_hour"].is_null());
    }

    #[test]
    fn test_encode_to_ndjson() {
        let encoder = FeatureEncoder::new();
        let ndjson = encoder.encode_to_ndjson(&make_table()).unwrap();
        let lines: Vec<&str> = ndjson.lines().collect();
        assert_eq!(lines.len(), 2);

        let row: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(row["author_id"], "u2");
    }
}
