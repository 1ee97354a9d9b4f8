//! Post and author record schema
//!
//! This module defines the typed input records for feature derivation and the
//! adapter that reads them from NDJSON, JSON, or CSV.

mod adapter;
pub(crate) mod fields;
mod record;

pub use adapter::*;
pub use fields::{parse_timestamp, TWITTER_CREATED_AT_FORMAT};
pub use record::*;
