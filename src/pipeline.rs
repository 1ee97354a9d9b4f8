//! Pipeline orchestration
//!
//! This module provides the public API for Author Flux.
//! It orchestrates the full pipeline from typed post records to a feature
//! table with one row per author.

use crate::activity::ActivityDeriver;
use crate::adapters::{PlatformPayloadAdapter, TwitterStatusAdapter};
use crate::config::FeatureConfig;
use crate::encoder::FeatureEncoder;
use crate::error::FeatureError;
use crate::lexical::{author_bag_of_words, Lexicon};
use crate::schema::{AuthorProfile, PostRecord, RecordAdapter, RecordFormat};
use crate::timing::{author_time_statistics, group_by_author, unique_authors};
use crate::types::{AuthorFeatureRow, AuthorTimeStatistics, FeatureTable};
use std::sync::Arc;
use tracing::{debug, info};

/// Convert NDJSON posts to a JSON feature payload.
///
/// # Arguments
/// * `posts_ndjson` - One post record per line
/// * `config` - Feature settings
///
/// # Returns
/// Pretty JSON payload with one row per distinct author, in first-seen order
///
/// # Example
/// ```ignore
/// let payload = posts_to_features(ndjson, &FeatureConfig::default())?;
/// ```
pub fn posts_to_features(posts_ndjson: &str, config: &FeatureConfig) -> Result<String, FeatureError> {
    let posts = RecordAdapter::parse_posts(posts_ndjson, RecordFormat::Ndjson)?;
    let processor = FeatureProcessor::from_config(config.clone())?;
    let table = processor.process(&posts, &[])?;
    processor.encoder.encode_to_json(&table, &config.language)
}

/// Convert a raw Twitter v1.1 payload to a JSON feature payload.
///
/// Authors are taken from the profiles embedded in the statuses.
pub fn twitter_to_features(raw_json: &str, config: &FeatureConfig) -> Result<String, FeatureError> {
    let (posts, authors) = TwitterStatusAdapter.parse_records(raw_json)?;
    let processor = FeatureProcessor::from_config(config.clone())?;
    let table = processor.process(&posts, &authors)?;
    processor.encoder.encode_to_json(&table, &config.language)
}

/// Compute only the posting-time statistics for NDJSON posts.
///
/// Rows follow the first-seen order of author ids in the input.
pub fn posts_to_time_statistics(
    posts_ndjson: &str,
    config: &FeatureConfig,
) -> Result<Vec<AuthorTimeStatistics>, FeatureError> {
    config.validate()?;
    let posts = RecordAdapter::parse_posts(posts_ndjson, RecordFormat::Ndjson)?;
    let authors = unique_authors(posts.iter().map(|p| p.author_id.as_str()));
    author_time_statistics(
        &posts,
        authors,
        &config.language_selection(),
        &config.unset_timestamp,
    )
}

/// Feature processor holding settings, lexicon, and encoder.
///
/// Use this when processing several batches with the same settings.
pub struct FeatureProcessor {
    config: FeatureConfig,
    lexicon: Arc<Lexicon>,
    encoder: FeatureEncoder,
}

impl Default for FeatureProcessor {
    fn default() -> Self {
        Self::new(FeatureConfig::default())
    }
}

impl FeatureProcessor {
    /// Create a processor using the bundled stopword list.
    ///
    /// `config.lexicon_dir` is not read; use [`FeatureProcessor::from_config`]
    /// for that.
    pub fn new(config: FeatureConfig) -> Self {
        Self {
            config,
            lexicon: Arc::new(Lexicon::bundled()),
            encoder: FeatureEncoder::new(),
        }
    }

    /// Create a processor, loading the stopword list from `config.lexicon_dir`
    /// when it is set
    pub fn from_config(config: FeatureConfig) -> Result<Self, FeatureError> {
        let lexicon = match &config.lexicon_dir {
            Some(dir) => {
                let lexicon = Lexicon::from_dir(dir)?;
                debug!(dir = %dir.display(), words = lexicon.len(), "Loaded configured lexicon");
                lexicon
            }
            None => Lexicon::bundled(),
        };
        Ok(Self::new(config).with_lexicon(Arc::new(lexicon)))
    }

    /// Use a specific lexicon, e.g. the one returned by [`crate::lexical::initialize`]
    pub fn with_lexicon(mut self, lexicon: Arc<Lexicon>) -> Self {
        self.lexicon = lexicon;
        self
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    /// Derive one feature row per author.
    ///
    /// Pipeline stages:
    /// 1. Settings validation - an invalid language selection fails here
    /// 2. Time statistics - circular posting-time statistics per author
    /// 3. Activity - retweet/language ratios and posting rates
    /// 4. Engagement - average engagement and entity counts
    /// 5. Lexical - bag-of-words over posts in the configured language
    ///
    /// Rows follow `authors`; when it is empty, the distinct author ids of
    /// `posts` in first-seen order.
    pub fn process(
        &self,
        posts: &[PostRecord],
        authors: &[AuthorProfile],
    ) -> Result<FeatureTable, FeatureError> {
        // Stage 1: Validate settings before any output
        self.config.validate()?;

        let author_ids = if authors.is_empty() {
            unique_authors(posts.iter().map(|p| p.author_id.as_str()))
        } else {
            unique_authors(authors.iter().map(|a| a.author_id.as_str()))
        };

        // Stage 2: Time statistics, already in author order
        let time_rows = author_time_statistics(
            posts,
            author_ids.iter().copied(),
            &self.config.language_selection(),
            &self.config.unset_timestamp,
        )?;

        let groups = group_by_author(posts);
        let language = self.config.language.as_str();
        let unset = &self.config.unset_timestamp;

        let rows: Vec<AuthorFeatureRow> = author_ids
            .iter()
            .zip(time_rows)
            .map(|(author_id, time)| {
                let author_posts = groups.get(author_id).map(Vec::as_slice).unwrap_or(&[]);

                AuthorFeatureRow {
                    author_id: author_id.to_string(),
                    total_posts: author_posts.len() as u32,
                    time,
                    // Stage 3 and 4: Activity and engagement
                    activity: ActivityDeriver::activity(author_posts, language, unset),
                    engagement: ActivityDeriver::engagement(author_posts),
                    // Stage 5: Bag-of-words
                    bag_of_words: author_bag_of_words(
                        author_posts,
                        language,
                        &self.lexicon,
                        self.config.bag_of_words_as_list,
                    ),
                }
            })
            .collect();

        info!(authors = rows.len(), posts = posts.len(), "Derived author features");
        Ok(FeatureTable { rows })
    }

    /// Process posts and encode the table as a JSON payload
    pub fn process_to_json(
        &self,
        posts: &[PostRecord],
        authors: &[AuthorProfile],
    ) -> Result<String, FeatureError> {
        let table = self.process(posts, authors)?;
        self.encoder.encode_to_json(&table, &self.config.language)
    }

    /// Parse a raw platform payload with `adapter` and process it
    pub fn process_payload(
        &self,
        adapter: &dyn PlatformPayloadAdapter,
        raw_json: &str,
    ) -> Result<FeatureTable, FeatureError> {
        let parsed = adapter.parse(raw_json)?;
        let authors = crate::adapters::distinct_authors(&parsed);
        let posts: Vec<PostRecord> = parsed.into_iter().map(|p| p.post).collect();
        self.process(&posts, &authors)
    }
}
