//! Twitter v1.1 status adapter
//!
//! Parses status objects as returned by the `statuses/user_timeline` and
//! `search/tweets` endpoints and maps them to post records and the embedded
//! author profile.

use crate::error::FeatureError;
use crate::schema::{parse_timestamp, AuthorProfile, PostRecord};
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ParsedPost, PlatformPayloadAdapter};

static SOURCE_ANCHOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<a[^>]*>([^<]*)</a>").expect("anchor pattern is valid"));

/// Twitter v1.1 payload adapter
pub struct TwitterStatusAdapter;

impl PlatformPayloadAdapter for TwitterStatusAdapter {
    fn parse(&self, raw_json: &str) -> Result<Vec<ParsedPost>, FeatureError> {
        let payload: TwitterPayload = serde_json::from_str(raw_json)?;
        let statuses = match payload {
            TwitterPayload::Timeline(statuses) => statuses,
            TwitterPayload::Search { statuses } => statuses,
        };

        let mut parsed = Vec::with_capacity(statuses.len());
        for status in statuses {
            match convert_status(status) {
                Ok(post) => parsed.push(post),
                Err(e) => {
                    warn!(error = %e, "Skipping status that cannot be mapped");
                }
            }
        }

        debug!(count = parsed.len(), "Parsed Twitter statuses");
        Ok(parsed)
    }
}

impl TwitterStatusAdapter {
    /// Parse a payload and split it into posts and distinct author profiles
    pub fn parse_records(
        &self,
        raw_json: &str,
    ) -> Result<(Vec<PostRecord>, Vec<AuthorProfile>), FeatureError> {
        let parsed = self.parse(raw_json)?;
        let authors = super::distinct_authors(&parsed);
        let posts = parsed.into_iter().map(|p| p.post).collect();
        Ok((posts, authors))
    }
}

/// Pretty-print raw records with sorted keys and a four-space indent
pub fn format_raw(raw_json: &str) -> Result<String, FeatureError> {
    use serde::Serialize;

    let value: serde_json::Value = serde_json::from_str(raw_json)?;
    let sorted = sort_keys(value);

    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    sorted.serialize(&mut serializer)?;
    String::from_utf8(out).map_err(|e| FeatureError::EncodingError(e.to_string()))
}

fn sort_keys(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            serde_json::Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect(),
            )
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(sort_keys).collect())
        }
        other => other,
    }
}

// ============================================================================
// Twitter API types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TwitterPayload {
    Timeline(Vec<TwitterStatus>),
    Search { statuses: Vec<TwitterStatus> },
}

#[derive(Debug, Deserialize)]
struct TwitterStatus {
    id: Option<u64>,
    id_str: Option<String>,
    full_text: Option<String>,
    text: Option<String>,
    created_at: String,
    lang: Option<String>,
    source: Option<String>,
    in_reply_to_user_id: Option<u64>,
    in_reply_to_status_id: Option<u64>,
    quoted_status_id: Option<u64>,
    retweeted_status: Option<Box<TwitterStatus>>,
    quote_count: Option<u32>,
    reply_count: Option<u32>,
    favorite_count: Option<u32>,
    retweet_count: Option<u32>,
    #[serde(default)]
    entities: TwitterEntities,
    user: Option<TwitterUser>,
}

#[derive(Debug, Default, Deserialize)]
struct TwitterEntities {
    #[serde(default)]
    hashtags: Vec<serde_json::Value>,
    #[serde(default)]
    urls: Vec<serde_json::Value>,
    #[serde(default)]
    user_mentions: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TwitterUser {
    id: Option<u64>,
    id_str: Option<String>,
    name: Option<String>,
    screen_name: Option<String>,
    location: Option<String>,
    description: Option<String>,
    url: Option<String>,
    followers_count: Option<u32>,
    friends_count: Option<u32>,
    created_at: Option<String>,
    lang: Option<String>,
}

fn pick_id(id_str: Option<&str>, id: Option<u64>) -> Option<String> {
    id_str
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| id.map(|id| id.to_string()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Client name from the `source` anchor, or the raw value when it is plain text
fn client_name(source: Option<&str>) -> Option<String> {
    let source = source?.trim();
    let name = SOURCE_ANCHOR_RE
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map_or(source, |m| m.as_str());
    Some(name.to_string()).filter(|s| !s.is_empty())
}

fn parse_created_at(raw: &str) -> Result<NaiveDateTime, FeatureError> {
    parse_timestamp(raw).ok_or_else(|| FeatureError::DateParseError(raw.to_string()))
}

fn convert_user(user: TwitterUser) -> Result<AuthorProfile, FeatureError> {
    let author_id = pick_id(user.id_str.as_deref(), user.id)
        .ok_or_else(|| FeatureError::MissingField("user.id".to_string()))?;

    Ok(AuthorProfile {
        author_id,
        display_name: non_empty(user.name),
        screen_name: non_empty(user.screen_name),
        reported_location: non_empty(user.location),
        profile_description: non_empty(user.description),
        profile_url: non_empty(user.url),
        follower_count: user.followers_count,
        following_count: user.friends_count,
        account_created_at: user.created_at.as_deref().and_then(parse_timestamp),
        account_language: non_empty(user.lang),
    })
}

fn convert_status(status: TwitterStatus) -> Result<ParsedPost, FeatureError> {
    let post_id = pick_id(status.id_str.as_deref(), status.id)
        .ok_or_else(|| FeatureError::MissingField("id".to_string()))?;
    let user = status
        .user
        .ok_or_else(|| FeatureError::MissingField("user".to_string()))?;
    let author = convert_user(user)?;
    let text = status.full_text.or(status.text).unwrap_or_default();

    let (retweet_author_id, retweet_post_id) = match status.retweeted_status.as_deref() {
        Some(original) => (
            original
                .user
                .as_ref()
                .and_then(|u| pick_id(u.id_str.as_deref(), u.id)),
            pick_id(original.id_str.as_deref(), original.id),
        ),
        None => (None, None),
    };
    // Truncated retweet text still starts with "RT"
    let is_retweet = status.retweeted_status.is_some() || text.contains("RT");

    let post = PostRecord {
        post_id,
        author_id: author.author_id.clone(),
        language: non_empty(status.lang),
        posted_at: parse_created_at(&status.created_at)?,
        client_name: client_name(status.source.as_deref()),
        in_reply_to_author_id: status.in_reply_to_user_id.map(|id| id.to_string()),
        in_reply_to_post_id: status.in_reply_to_status_id.map(|id| id.to_string()),
        quoted_post_id: status.quoted_status_id.map(|id| id.to_string()),
        is_retweet,
        retweet_author_id,
        retweet_post_id,
        quote_count: status.quote_count,
        reply_count: status.reply_count,
        like_count: status.favorite_count,
        retweet_count: status.retweet_count,
        hashtags: status.entities.hashtags.len() as u32,
        urls: status.entities.urls.len() as u32,
        user_mentions: status.entities.user_mentions.len() as u32,
        text,
    };

    Ok(ParsedPost { post, author })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_timeline_json() -> &'static str {
        r#"[
            {
                "id": 1050118621198921728,
                "id_str": "1050118621198921728",
                "full_text": "Polls close at 8pm #vote https://t.co/x @cnn",
                "created_at": "Wed Oct 10 20:19:24 +0000 2018",
                "lang": "en",
                "source": "<a href=\"http://twitter.com\" rel=\"nofollow\">Twitter Web Client</a>",
                "in_reply_to_user_id": null,
                "in_reply_to_status_id": null,
                "favorite_count": 12,
                "retweet_count": 3,
                "entities": {
                    "hashtags": [{"text": "vote"}],
                    "urls": [{"url": "https://t.co/x"}],
                    "user_mentions": [{"screen_name": "cnn"}]
                },
                "user": {
                    "id": 42,
                    "id_str": "42",
                    "name": "Daily Patriot",
                    "screen_name": "dailypatriot",
                    "location": "",
                    "description": "News you need",
                    "url": null,
                    "followers_count": 5100,
                    "friends_count": 30,
                    "created_at": "Mon Mar 10 14:00:00 +0000 2014",
                    "lang": "en"
                }
            },
            {
                "id": 1050118621198921729,
                "full_text": "RT @cnn: Polls are open",
                "created_at": "Wed Oct 10 21:00:00 +0000 2018",
                "lang": "en",
                "source": "Twitter for iPhone",
                "retweeted_status": {
                    "id": 99,
                    "created_at": "Wed Oct 10 19:00:00 +0000 2018",
                    "user": {"id": 7}
                },
                "quoted_status_id": 555,
                "user": {"id": 42}
            }
        ]"#
    }

    #[test]
    fn test_parse_timeline() {
        let parsed = TwitterStatusAdapter.parse(sample_timeline_json()).unwrap();
        assert_eq!(parsed.len(), 2);

        let first = &parsed[0].post;
        assert_eq!(first.post_id, "1050118621198921728");
        assert_eq!(first.author_id, "42");
        assert_eq!(first.posted_at.to_string(), "2018-10-10 20:19:24");
        assert_eq!(first.client_name.as_deref(), Some("Twitter Web Client"));
        assert!(!first.is_retweet);
        assert!(first.quoted_post_id.is_none());
        assert!(first.retweet_author_id.is_none());
        assert_eq!(first.like_count, Some(12));
        assert_eq!(first.quote_count, None);
        assert_eq!((first.hashtags, first.urls, first.user_mentions), (1, 1, 1));

        let author = &parsed[0].author;
        assert_eq!(author.screen_name.as_deref(), Some("dailypatriot"));
        assert!(author.reported_location.is_none());
        assert!(author.profile_url.is_none());
        assert_eq!(author.follower_count, Some(5100));
        assert!(author.account_created_at.is_some());
    }

    #[test]
    fn test_retweet_fields() {
        let parsed = TwitterStatusAdapter.parse(sample_timeline_json()).unwrap();
        let retweet = &parsed[1].post;
        assert!(retweet.is_retweet);
        assert_eq!(retweet.retweet_author_id.as_deref(), Some("7"));
        assert_eq!(retweet.retweet_post_id.as_deref(), Some("99"));
        assert_eq!(retweet.quoted_post_id.as_deref(), Some("555"));
        assert_eq!(retweet.client_name.as_deref(), Some("Twitter for iPhone"));
    }

    #[test]
    fn test_search_payload_and_distinct_authors() {
        let search = format!(r#"{{"statuses": {}}}"#, sample_timeline_json());
        let (posts, authors) = TwitterStatusAdapter.parse_records(&search).unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(authors.len(), 1);
        // First occurrence carries the full profile
        assert_eq!(authors[0].display_name.as_deref(), Some("Daily Patriot"));
    }

    #[test]
    fn test_status_without_user_is_skipped() {
        let json = r#"[{"id": 1, "text": "hi", "created_at": "Wed Oct 10 20:19:24 +0000 2018"}]"#;
        let parsed = TwitterStatusAdapter.parse(json).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_invalid_json() {
        assert!(TwitterStatusAdapter.parse("not json").is_err());
    }

    #[test]
    fn test_format_raw_sorts_keys() {
        let formatted = format_raw(r#"{"b": 1, "a": {"z": true, "c": [1]}}"#).unwrap();
        let expected = "{\n    \"a\": {\n        \"c\": [\n            1\n        ],\n        \"z\": true\n    },\n    \"b\": 1\n}";
        assert_eq!(formatted, expected);
    }
}
