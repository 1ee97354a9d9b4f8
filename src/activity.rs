//! Activity and engagement derivation
//!
//! This module derives per-author aggregates from the author's posts:
//! - Retweet and language ratios
//! - Average posting rates per week, day, hour, and minute
//! - Average engagement and entity counts per post

use crate::schema::PostRecord;
use crate::types::{ActivityFeatures, EngagementFeatures};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

/// Deriver for activity and engagement aggregates
pub struct ActivityDeriver;

impl ActivityDeriver {
    /// Derive activity features for one author's posts
    pub fn activity(
        posts: &[&PostRecord],
        language: &str,
        unset: &NaiveDateTime,
    ) -> ActivityFeatures {
        let rates = posting_rates(posts, unset);

        ActivityFeatures {
            retweet_ratio: retweet_ratio(posts),
            language_ratio: language_ratio(posts, language),
            avg_posts_per_week: rates.per_week,
            avg_posts_per_day: rates.per_day,
            avg_posts_per_hour: rates.per_hour,
            avg_posts_per_min: rates.per_minute,
        }
    }

    /// Derive engagement features for one author's posts
    pub fn engagement(posts: &[&PostRecord]) -> EngagementFeatures {
        EngagementFeatures {
            avg_quote_count: mean_present(posts.iter().map(|p| p.quote_count)),
            avg_like_count: mean_present(posts.iter().map(|p| p.like_count)),
            avg_retweet_count: mean_present(posts.iter().map(|p| p.retweet_count)),
            avg_hashtags: mean_present(posts.iter().map(|p| Some(p.hashtags))),
            avg_urls: mean_present(posts.iter().map(|p| Some(p.urls))),
            avg_user_mentions: mean_present(posts.iter().map(|p| Some(p.user_mentions))),
        }
    }
}

/// Share of posts flagged as retweets; 0 for an author without posts
pub fn retweet_ratio(posts: &[&PostRecord]) -> f64 {
    if posts.is_empty() {
        return 0.0;
    }
    let retweets = posts.iter().filter(|p| p.is_retweet).count();
    retweets as f64 / posts.len() as f64
}

/// Share of language-tagged posts carrying `language`.
///
/// Untagged posts are left out of the denominator. 0 when no post carries the
/// language.
pub fn language_ratio(posts: &[&PostRecord], language: &str) -> f64 {
    let tagged = posts.iter().filter(|p| p.language.is_some()).count();
    let matching = posts.iter().filter(|p| p.is_language(language)).count();
    if matching == 0 {
        return 0.0;
    }
    matching as f64 / tagged as f64
}

/// Average posts per calendar bucket
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostingRates {
    pub per_week: f64,
    pub per_day: f64,
    pub per_hour: f64,
    pub per_minute: f64,
}

impl PostingRates {
    fn missing() -> Self {
        Self {
            per_week: f64::NAN,
            per_day: f64::NAN,
            per_hour: f64::NAN,
            per_minute: f64::NAN,
        }
    }
}

/// Average posting rates over the author's active span.
///
/// Buckets run from the first to the last valid post inclusive, and empty
/// buckets inside the span count. Weeks end on Sunday. Posts at the unset
/// sentinel are ignored; NaN when no valid post remains.
pub fn posting_rates(posts: &[&PostRecord], unset: &NaiveDateTime) -> PostingRates {
    let times: Vec<NaiveDateTime> = posts
        .iter()
        .filter(|p| p.has_valid_time(unset))
        .map(|p| p.posted_at)
        .collect();

    let (Some(first), Some(last)) = (times.iter().min(), times.iter().max()) else {
        return PostingRates::missing();
    };

    let count = times.len() as f64;
    let span = |bucket: fn(&NaiveDateTime) -> i64| (bucket(last) - bucket(first) + 1) as f64;

    PostingRates {
        per_week: count / span(week_index),
        per_day: count / span(day_index),
        per_hour: count / span(hour_index),
        per_minute: count / span(minute_index),
    }
}

fn seconds_since_epoch(ts: &NaiveDateTime) -> i64 {
    ts.and_utc().timestamp()
}

fn minute_index(ts: &NaiveDateTime) -> i64 {
    seconds_since_epoch(ts).div_euclid(60)
}

fn hour_index(ts: &NaiveDateTime) -> i64 {
    seconds_since_epoch(ts).div_euclid(3600)
}

fn day_index(ts: &NaiveDateTime) -> i64 {
    seconds_since_epoch(ts).div_euclid(86_400)
}

/// Index of the Monday-to-Sunday week containing `ts`
fn week_index(ts: &NaiveDateTime) -> i64 {
    let date: NaiveDate = ts.date();
    let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
    monday
        .signed_duration_since(NaiveDate::default())
        .num_days()
        .div_euclid(7)
}

/// Mean of the present values; NaN when none are present
fn mean_present<I>(values: I) -> f64
where
    I: Iterator<Item = Option<u32>>,
{
    let (sum, n) = values
        .flatten()
        .fold((0.0_f64, 0_u32), |(sum, n), v| (sum + f64::from(v), n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / f64::from(n)
    }
}
