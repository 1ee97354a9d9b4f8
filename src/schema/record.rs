//! Post and author record definitions
//!
//! Records use explicit, documented fields. Column names from the public
//! information-operations datasets (`tweetid`, `userid`, `tweet_time`, ...)
//! are accepted as aliases so dataset exports deserialize directly.

use crate::schema::fields;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current record schema version
pub const SCHEMA_VERSION: &str = "social.post_record.v1";

/// Sentinel timestamp meaning "post time not available": `1900-01-01 00:00`
pub static UNSET_TIMESTAMP: Lazy<NaiveDateTime> = Lazy::new(|| {
    NaiveDate::from_ymd_opt(1900, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
});

/// A single post as consumed by feature derivation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    /// Platform post identifier
    #[serde(alias = "tweetid", deserialize_with = "fields::id")]
    pub post_id: String,
    /// Identifier of the posting author
    #[serde(alias = "userid", deserialize_with = "fields::id")]
    pub author_id: String,
    /// Language tag assigned by the platform (e.g. `en`)
    #[serde(alias = "tweet_language", default, deserialize_with = "fields::opt_text")]
    pub language: Option<String>,
    /// Post text
    #[serde(alias = "tweet_text", default)]
    pub text: String,
    /// Post time, naive UTC. [`UNSET_TIMESTAMP`] means unknown.
    #[serde(
        alias = "tweet_time",
        deserialize_with = "fields::timestamp",
        serialize_with = "fields::serialize_timestamp"
    )]
    pub posted_at: NaiveDateTime,
    /// Name of the client application used to post
    #[serde(alias = "tweet_client_name", default, deserialize_with = "fields::opt_text")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(alias = "in_reply_to_userid", default, deserialize_with = "fields::opt_id")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_reply_to_author_id: Option<String>,
    #[serde(alias = "in_reply_to_tweetid", default, deserialize_with = "fields::opt_id")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_reply_to_post_id: Option<String>,
    /// Quoted post, absent when the post quotes nothing
    #[serde(alias = "quoted_tweet_tweetid", default, deserialize_with = "fields::opt_id")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quoted_post_id: Option<String>,
    /// Whether the post is a retweet/repost
    #[serde(default, deserialize_with = "fields::flexible_bool")]
    pub is_retweet: bool,
    /// Original author of a retweet
    #[serde(alias = "retweet_userid", default, deserialize_with = "fields::opt_id")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retweet_author_id: Option<String>,
    /// Original post of a retweet
    #[serde(alias = "retweet_tweetid", default, deserialize_with = "fields::opt_id")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retweet_post_id: Option<String>,
    #[serde(default, deserialize_with = "fields::opt_count")]
    pub quote_count: Option<u32>,
    #[serde(default, deserialize_with = "fields::opt_count")]
    pub reply_count: Option<u32>,
    #[serde(default, deserialize_with = "fields::opt_count")]
    pub like_count: Option<u32>,
    #[serde(default, deserialize_with = "fields::opt_count")]
    pub retweet_count: Option<u32>,
    /// Number of hashtags in the post
    #[serde(default, deserialize_with = "fields::entity_count")]
    pub hashtags: u32,
    /// Number of URLs in the post
    #[serde(default, deserialize_with = "fields::entity_count")]
    pub urls: u32,
    /// Number of user mentions in the post
    #[serde(default, deserialize_with = "fields::entity_count")]
    pub user_mentions: u32,
}

impl PostRecord {
    /// Minimal post with the given identity and time; all optional fields empty
    pub fn new(
        post_id: impl Into<String>,
        author_id: impl Into<String>,
        posted_at: NaiveDateTime,
    ) -> Self {
        Self {
            post_id: post_id.into(),
            author_id: author_id.into(),
            language: None,
            text: String::new(),
            posted_at,
            client_name: None,
            in_reply_to_author_id: None,
            in_reply_to_post_id: None,
            quoted_post_id: None,
            is_retweet: false,
            retweet_author_id: None,
            retweet_post_id: None,
            quote_count: None,
            reply_count: None,
            like_count: None,
            retweet_count: None,
            hashtags: 0,
            urls: 0,
            user_mentions: 0,
        }
    }

    /// Set the language tag
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Set the post text
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// True unless `posted_at` equals the given unset sentinel
    pub fn has_valid_time(&self, unset: &NaiveDateTime) -> bool {
        self.posted_at != *unset
    }

    /// True when the language tag equals `language`
    pub fn is_language(&self, language: &str) -> bool {
        self.language.as_deref() == Some(language)
    }

    /// Validate the record
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.post_id.trim().is_empty() {
            return Err(ValidationError::MissingField("post_id".to_string()));
        }
        if self.author_id.trim().is_empty() {
            return Err(ValidationError::MissingField("author_id".to_string()));
        }
        if self.posted_at > (Utc::now() + chrono::Duration::days(1)).naive_utc() {
            return Err(ValidationError::FutureTimestamp(self.posted_at.to_string()));
        }
        Ok(())
    }
}

/// Author profile information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorProfile {
    #[serde(alias = "userid", deserialize_with = "fields::id")]
    pub author_id: String,
    #[serde(alias = "user_display_name", default, deserialize_with = "fields::opt_text")]
    pub display_name: Option<String>,
    #[serde(alias = "user_screen_name", default, deserialize_with = "fields::opt_text")]
    pub screen_name: Option<String>,
    #[serde(alias = "user_reported_location", default, deserialize_with = "fields::opt_text")]
    pub reported_location: Option<String>,
    #[serde(alias = "user_profile_description", default, deserialize_with = "fields::opt_text")]
    pub profile_description: Option<String>,
    #[serde(alias = "user_profile_url", default, deserialize_with = "fields::opt_text")]
    pub profile_url: Option<String>,
    #[serde(default, deserialize_with = "fields::opt_count")]
    pub follower_count: Option<u32>,
    #[serde(default, deserialize_with = "fields::opt_count")]
    pub following_count: Option<u32>,
    /// Account creation time, naive UTC
    #[serde(alias = "account_creation_date", default, deserialize_with = "fields::opt_timestamp")]
    pub account_created_at: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "fields::opt_text")]
    pub account_language: Option<String>,
}

impl AuthorProfile {
    /// Profile carrying only an identifier
    pub fn new(author_id: impl Into<String>) -> Self {
        Self {
            author_id: author_id.into(),
            display_name: None,
            screen_name: None,
            reported_location: None,
            profile_description: None,
            profile_url: None,
            follower_count: None,
            following_count: None,
            account_created_at: None,
            account_language: None,
        }
    }
}

/// Validation errors for post records
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Timestamp is in the future: {0}")]
    FutureTimestamp(String),
}
