//! Core types for the Author Flux pipeline
//!
//! This module defines the data structures produced by each derivation stage:
//! per-author time series, circular time statistics, activity and engagement
//! aggregates, lexical features, and the joined feature row.

use crate::circular::{ClockTime, HOURS_PER_DAY};
use serde::{Deserialize, Serialize};

/// Posting times of one author after filtering, in input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorTimeSeries {
    pub author_id: String,
    pub times: Vec<ClockTime>,
}

/// Circular time statistics for one author.
///
/// Every field is `None` when the author has no valid posting time after
/// filtering. `mean`, `median`, and `stddev` use the concatenated encoding of
/// [`crate::circular::angle_to_time`]; `earliest` and `latest` are packed
/// `hour * 100 + minute` values ordered numerically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorTimeStatistics {
    pub author_id: String,
    pub earliest: Option<u32>,
    pub latest: Option<u32>,
    pub mean: Option<u32>,
    pub median: Option<u32>,
    pub stddev: Option<u32>,
    pub count: Option<u32>,
    /// 0/1 indicator per hour of day, 1 for every modal hour
    pub mode_hours: Option<[u8; HOURS_PER_DAY]>,
}

impl AuthorTimeStatistics {
    /// All-missing row for an author with no valid posting time
    pub fn missing(author_id: impl Into<String>) -> Self {
        Self {
            author_id: author_id.into(),
            earliest: None,
            latest: None,
            mean: None,
            median: None,
            stddev: None,
            count: None,
            mode_hours: None,
        }
    }

    pub fn is_missing(&self) -> bool {
        self.count.is_none()
    }

    /// Indicator for one hour slot; NaN when the row is missing
    pub fn mode_slot(&self, hour: usize) -> f64 {
        self.mode_hours
            .and_then(|slots| slots.get(hour).copied())
            .map_or(f64::NAN, f64::from)
    }

    /// Numeric row: earliest, latest, mean, median, count, stddev, mode_0..mode_23.
    ///
    /// Missing values are NaN.
    pub fn feature_vector(&self) -> Vec<f64> {
        let as_f64 = |v: Option<u32>| v.map_or(f64::NAN, f64::from);
        let mut row = vec![
            as_f64(self.earliest),
            as_f64(self.latest),
            as_f64(self.mean),
            as_f64(self.median),
            as_f64(self.count),
            as_f64(self.stddev),
        ];
        row.extend((0..HOURS_PER_DAY).map(|hour| self.mode_slot(hour)));
        row
    }
}

/// Posting-volume features for one author.
///
/// Ratios are 0 when the author has no qualifying posts; rates are NaN when
/// the author has no valid posting time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityFeatures {
    /// Share of posts that are retweets
    pub retweet_ratio: f64,
    /// Share of posts tagged with the configured language
    pub language_ratio: f64,
    pub avg_posts_per_week: f64,
    pub avg_posts_per_day: f64,
    pub avg_posts_per_hour: f64,
    pub avg_posts_per_min: f64,
}

/// Average engagement per post for one author; NaN when nothing to average
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementFeatures {
    pub avg_quote_count: f64,
    pub avg_like_count: f64,
    pub avg_retweet_count: f64,
    pub avg_hashtags: f64,
    pub avg_urls: f64,
    pub avg_user_mentions: f64,
}

/// Bag-of-words for one author
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BagOfWords {
    /// Token list in post order
    Tokens(Vec<String>),
    /// Tokens joined with single spaces
    Joined(String),
}

impl BagOfWords {
    pub fn token_count(&self) -> usize {
        match self {
            BagOfWords::Tokens(tokens) => tokens.len(),
            BagOfWords::Joined(text) => text.split_whitespace().count(),
        }
    }
}

/// Every derived feature for one author, joinable by `author_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorFeatureRow {
    pub author_id: String,
    /// Number of posts attributed to the author before any filtering
    pub total_posts: u32,
    pub time: AuthorTimeStatistics,
    pub activity: ActivityFeatures,
    pub engagement: EngagementFeatures,
    pub bag_of_words: BagOfWords,
}

/// Feature rows for a batch of authors, in author-list order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    pub rows: Vec<AuthorFeatureRow>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row for one author, if present
    pub fn get(&self, author_id: &str) -> Option<&AuthorFeatureRow> {
        self.rows.iter().find(|row| row.author_id == author_id)
    }
}

// ============================================================================
// Output payload
// ============================================================================

/// Producer metadata attached to every encoded table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Encoded feature table with provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturePayload {
    pub producer: Producer,
    pub computed_at_utc: String,
    /// Language tag the ratios and bag-of-words refer to
    pub language: String,
    pub rows: Vec<AuthorFeatureRow>,
}
