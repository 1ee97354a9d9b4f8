//! Platform payload adapters
//!
//! This module provides adapters that parse raw platform JSON payloads and map
//! them to the typed post and author records used by feature derivation.

mod twitter;

pub use twitter::{format_raw, TwitterStatusAdapter};

use crate::error::FeatureError;
use crate::schema::{AuthorProfile, PostRecord};

/// A post together with the profile of its author as embedded in the payload
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPost {
    pub post: PostRecord,
    pub author: AuthorProfile,
}

/// Trait for platform payload adapters
pub trait PlatformPayloadAdapter {
    /// Parse raw JSON into typed posts
    fn parse(&self, raw_json: &str) -> Result<Vec<ParsedPost>, FeatureError>;
}

/// Distinct author profiles of parsed posts, first occurrence wins
pub fn distinct_authors(parsed: &[ParsedPost]) -> Vec<AuthorProfile> {
    let mut seen = std::collections::HashSet::new();
    parsed
        .iter()
        .filter(|p| seen.insert(p.author.author_id.clone()))
        .map(|p| p.author.clone())
        .collect()
}
