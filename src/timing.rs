//! Per-author posting-time statistics
//!
//! Groups posts by author, filters them by language and time validity, and
//! summarizes each author's posting times with the circular statistics in
//! [`crate::circular`].

use crate::circular::{
    mean_time_from_angles, median_time_from_angles, modal_hours, mode_indicator,
    stddev_time_from_angles, ClockTime,
};
use crate::error::FeatureError;
use crate::schema::PostRecord;
use crate::types::{AuthorTimeSeries, AuthorTimeStatistics};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Which posts enter the timing statistics, relative to a language tag.
///
/// The default includes every post. Use [`TimeSelection::matching_only`] for
/// statistics over posts tagged with the configured language alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeSelection {
    /// Include posts tagged with the language
    pub include_matching: bool,
    /// Include posts not tagged with the language (including untagged posts)
    pub include_non_matching: bool,
}

impl Default for TimeSelection {
    fn default() -> Self {
        Self {
            include_matching: true,
            include_non_matching: true,
        }
    }
}

impl TimeSelection {
    /// Only posts tagged with the configured language
    pub fn matching_only() -> Self {
        Self {
            include_matching: true,
            include_non_matching: false,
        }
    }
}

/// Language tag plus inclusion flags, as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSelection {
    pub language: String,
    pub include_matching: bool,
    pub include_non_matching: bool,
}

impl LanguageSelection {
    pub fn new(language: impl Into<String>, selection: &TimeSelection) -> Self {
        Self {
            language: language.into(),
            include_matching: selection.include_matching,
            include_non_matching: selection.include_non_matching,
        }
    }

    /// Every post regardless of language
    pub fn all(language: impl Into<String>) -> Self {
        Self::new(
            language,
            &TimeSelection {
                include_matching: true,
                include_non_matching: true,
            },
        )
    }

    /// Resolve the flags to a filter; neither flag set is a usage error
    pub fn resolve(&self) -> Result<LanguageFilter, FeatureError> {
        match (self.include_matching, self.include_non_matching) {
            (true, false) => Ok(LanguageFilter::Matching(self.language.clone())),
            (false, true) => Ok(LanguageFilter::NonMatching(self.language.clone())),
            (true, true) => Ok(LanguageFilter::All),
            (false, false) => Err(FeatureError::InvalidLanguageSelection),
        }
    }
}

/// Resolved language predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageFilter {
    Matching(String),
    NonMatching(String),
    All,
}

impl LanguageFilter {
    pub fn matches(&self, language: Option<&str>) -> bool {
        match self {
            LanguageFilter::Matching(tag) => language == Some(tag.as_str()),
            LanguageFilter::NonMatching(tag) => language != Some(tag.as_str()),
            LanguageFilter::All => true,
        }
    }
}

/// Group posts by author id, keeping input order within each author
pub fn group_by_author(posts: &[PostRecord]) -> HashMap<&str, Vec<&PostRecord>> {
    let mut groups: HashMap<&str, Vec<&PostRecord>> = HashMap::new();
    for post in posts {
        groups.entry(post.author_id.as_str()).or_default().push(post);
    }
    groups
}

/// Distinct author ids, first occurrence wins
pub fn unique_authors<'a, I>(authors: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    authors.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// Build one author's filtered time series
pub fn author_time_series(
    author_id: &str,
    posts: &[&PostRecord],
    filter: &LanguageFilter,
    unset: &NaiveDateTime,
) -> AuthorTimeSeries {
    let times = posts
        .iter()
        .filter(|post| filter.matches(post.language.as_deref()))
        .filter(|post| post.has_valid_time(unset))
        .map(|post| ClockTime::from_datetime(&post.posted_at))
        .collect();

    AuthorTimeSeries {
        author_id: author_id.to_string(),
        times,
    }
}

/// Summarize one author's time series; an empty series yields the missing row
pub fn summarize(series: &AuthorTimeSeries) -> AuthorTimeStatistics {
    if series.times.is_empty() {
        return AuthorTimeStatistics::missing(series.author_id.clone());
    }

    let mut earliest = u32::MAX;
    let mut latest = 0;
    let mut angles = Vec::with_capacity(series.times.len());
    let mut hours = Vec::with_capacity(series.times.len());

    for time in &series.times {
        let packed = time.packed();
        earliest = earliest.min(packed);
        latest = latest.max(packed);
        angles.push(time.angle());
        hours.push(time.hour());
    }

    AuthorTimeStatistics {
        author_id: series.author_id.clone(),
        earliest: Some(earliest),
        latest: Some(latest),
        mean: mean_time_from_angles(&angles),
        median: median_time_from_angles(&angles),
        stddev: stddev_time_from_angles(&angles),
        count: Some(series.times.len() as u32),
        mode_hours: Some(mode_indicator(&modal_hours(&hours))),
    }
}

/// Compute time statistics for every author, in author-list order.
///
/// Repeated author ids produce a single row at their first position. An
/// invalid selection fails before any row is produced.
pub fn author_time_statistics<'a, I>(
    posts: &[PostRecord],
    authors: I,
    selection: &LanguageSelection,
    unset: &NaiveDateTime,
) -> Result<Vec<AuthorTimeStatistics>, FeatureError>
where
    I: IntoIterator<Item = &'a str>,
{
    let filter = selection.resolve()?;
    let groups = group_by_author(posts);

    let rows = unique_authors(authors)
        .into_iter()
        .map(|author_id| {
            let author_posts = groups.get(author_id).map(Vec::as_slice).unwrap_or(&[]);
            let series = author_time_series(author_id, author_posts, &filter, unset);
            if series.times.is_empty() {
                debug!(author_id, "No valid posting times for author");
            }
            summarize(&series)
        })
        .collect();

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circular::HOURS_PER_DAY;
    use crate::schema::UNSET_TIMESTAMP;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2018, 3, 14)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn post(id: &str, author: &str, lang: Option<&str>, ts: NaiveDateTime) -> PostRecord {
        let post = PostRecord::new(id, author, ts);
        match lang {
            Some(lang) => post.with_language(lang),
            None => post,
        }
    }

    fn mixed_posts() -> Vec<PostRecord> {
        vec![
            post("1", "a", Some("en"), at(23, 0)),
            post("2", "a", Some("en"), at(1, 0)),
            post("3", "a", Some("ru"), at(12, 0)),
            post("4", "a", None, at(13, 30)),
            post("5", "a", Some("en"), *UNSET_TIMESTAMP),
            post("6", "b", Some("ru"), at(8, 15)),
        ]
    }

    #[test]
    fn test_resolve_selection() {
        let tag = "en".to_string();
        let flags = |m, n| LanguageSelection {
            language: tag.clone(),
            include_matching: m,
            include_non_matching: n,
        };
        assert_eq!(flags(true, false).resolve().unwrap(), LanguageFilter::Matching(tag.clone()));
        assert_eq!(flags(false, true).resolve().unwrap(), LanguageFilter::NonMatching(tag.clone()));
        assert_eq!(flags(true, true).resolve().unwrap(), LanguageFilter::All);
        assert!(matches!(
            flags(false, false).resolve(),
            Err(FeatureError::InvalidLanguageSelection)
        ));
    }

    #[test]
    fn test_neither_flag_is_a_usage_error() {
        let selection = LanguageSelection {
            language: "en".into(),
            include_matching: false,
            include_non_matching: false,
        };
        let result = author_time_statistics(&mixed_posts(), ["a", "b"], &selection, &UNSET_TIMESTAMP);
        assert!(matches!(result, Err(FeatureError::InvalidLanguageSelection)));
    }

    #[test]
    fn test_matching_only_wraps_midnight() {
        let selection = LanguageSelection::new(
            "en",
            &TimeSelection {
                include_matching: true,
                include_non_matching: false,
            },
        );
        let rows = author_time_statistics(&mixed_posts(), ["a"], &selection, &UNSET_TIMESTAMP).unwrap();
        let row = &rows[0];

        // Only the two valid English posts (23:00 and 01:00) remain
        assert_eq!(row.count, Some(2));
        assert_eq!(row.mean, Some(0));
        assert_eq!(row.earliest, Some(100));
        assert_eq!(row.latest, Some(2300));

        let slots = row.mode_hours.unwrap();
        assert_eq!(slots[23], 1);
        assert_eq!(slots[1], 1);
        assert_eq!(slots.iter().map(|&s| s as u32).sum::<u32>(), 2);
    }

    #[test]
    fn test_non_matching_includes_untagged_posts() {
        let selection = LanguageSelection::new(
            "en",
            &TimeSelection {
                include_matching: false,
                include_non_matching: true,
            },
        );
        let rows = author_time_statistics(&mixed_posts(), ["a"], &selection, &UNSET_TIMESTAMP).unwrap();
        assert_eq!(rows[0].count, Some(2));
        assert_eq!(rows[0].earliest, Some(1200));
        assert_eq!(rows[0].latest, Some(1330));
    }

    #[test]
    fn test_all_excludes_sentinel_only() {
        let rows = author_time_statistics(
            &mixed_posts(),
            ["a"],
            &LanguageSelection::all("en"),
            &UNSET_TIMESTAMP,
        )
        .unwrap();
        assert_eq!(rows[0].count, Some(4));
    }

    #[test]
    fn test_empty_author_is_all_missing() {
        let posts = vec![post("1", "a", Some("en"), *UNSET_TIMESTAMP)];
        let rows = author_time_statistics(&posts, ["a", "nobody"], &LanguageSelection::all("en"), &UNSET_TIMESTAMP)
            .unwrap();

        for row in &rows {
            assert!(row.is_missing());
            assert!(row.earliest.is_none());
            assert!(row.stddev.is_none());
            assert!((0..HOURS_PER_DAY).all(|h| row.mode_slot(h).is_nan()));
        }
    }

    #[test]
    fn test_rows_follow_author_order() {
        let rows = author_time_statistics(
            &mixed_posts(),
            ["b", "a", "b", "zed"],
            &LanguageSelection::all("en"),
            &UNSET_TIMESTAMP,
        )
        .unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.author_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "zed"]);
    }

    #[test]
    fn test_single_post_statistics() {
        let posts = vec![post("1", "solo", Some("en"), at(9, 5))];
        let rows = author_time_statistics(&posts, ["solo"], &LanguageSelection::all("en"), &UNSET_TIMESTAMP)
            .unwrap();
        let row = &rows[0];

        assert_eq!(row.earliest, Some(905));
        assert_eq!(row.latest, Some(905));
        // Derived values use the concatenated encoding
        assert_eq!(row.mean, Some(95));
        assert_eq!(row.median, Some(95));
        assert_eq!(row.stddev, Some(0));
        assert_eq!(row.count, Some(1));
        assert_eq!(row.mode_hours.unwrap()[9], 1);
    }

    #[test]
    fn test_custom_unset_sentinel() {
        let sentinel = at(0, 0);
        let posts = vec![
            post("1", "a", None, sentinel),
            post("2", "a", None, *UNSET_TIMESTAMP),
        ];
        let rows = author_time_statistics(&posts, ["a"], &LanguageSelection::all("en"), &sentinel).unwrap();
        // The 1900 post is a midnight post under a different sentinel
        assert_eq!(rows[0].count, Some(1));
        assert_eq!(rows[0].earliest, Some(0));
    }
}
