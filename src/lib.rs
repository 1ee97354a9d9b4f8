//! Author Flux - Per-author behavioral feature engine for social-media posts
//!
//! Flux turns post records into one feature row per author through a
//! deterministic pipeline: record adaptation → grouping by author → feature
//! derivation (circular posting-time statistics, activity, engagement,
//! bag-of-words) → table encoding.
//!
//! ## Modules
//!
//! - **Circular statistics**: mean, median, standard deviation, and modal hours of
//!   posting times on a 24-hour clock
//! - **Activity and lexical features**: ratios, posting rates, engagement, bag-of-words
//!
//! The stopword lexicon is installed by [`lexical::initialize`], which the host
//! calls once at startup.

pub mod activity;
pub mod adapters;
pub mod circular;
pub mod config;
pub mod encoder;
pub mod error;
pub mod lexical;
pub mod pipeline;
pub mod schema;
pub mod timing;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::FeatureConfig;
pub use error::FeatureError;
pub use pipeline::{posts_to_features, posts_to_time_statistics, twitter_to_features, FeatureProcessor};

// Schema exports
pub use schema::{AuthorProfile, PostRecord, RecordAdapter, SCHEMA_VERSION, UNSET_TIMESTAMP};

// Core statistics exports
pub use timing::{author_time_statistics, LanguageSelection, TimeSelection};
pub use types::{AuthorTimeStatistics, FeatureTable};

/// Flux version embedded in all feature payloads
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for feature payloads
pub const PRODUCER_NAME: &str = "author-flux";
