//! Feature derivation settings
//!
//! Settings are plain serde structs so they can be loaded from a JSON file and
//! then overridden field by field (the CLI does this with its flags).

use crate::error::FeatureError;
use crate::schema::{fields, UNSET_TIMESTAMP};
use crate::timing::{LanguageSelection, TimeSelection};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Language tag used when none is configured
pub const DEFAULT_LANGUAGE: &str = "en";

/// Settings for one feature derivation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Language tag for the language ratio, bag-of-words, and time filter
    pub language: String,
    /// Which posts enter the posting-time statistics.
    ///
    /// Defaults to every post, so the time columns cover the same posts as the
    /// activity and engagement columns. Set
    /// [`TimeSelection::matching_only`] to restrict them to `language`.
    pub time_selection: TimeSelection,
    /// Post time meaning "not available"
    #[serde(
        deserialize_with = "fields::timestamp",
        serialize_with = "fields::serialize_timestamp"
    )]
    pub unset_timestamp: NaiveDateTime,
    /// Emit bag-of-words as a token list instead of a joined string
    pub bag_of_words_as_list: bool,
    /// Directory holding `stopwords.txt`.
    ///
    /// When unset, processors use the bundled list and
    /// [`crate::lexical::initialize`] installs into the platform cache dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lexicon_dir: Option<PathBuf>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            time_selection: TimeSelection::default(),
            unset_timestamp: *UNSET_TIMESTAMP,
            bag_of_words_as_list: true,
            lexicon_dir: None,
        }
    }
}

impl FeatureConfig {
    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, FeatureError> {
        let config: FeatureConfig = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Load settings from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self, FeatureError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Serialize settings to pretty JSON
    pub fn to_json(&self) -> Result<String, FeatureError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Language selection for the posting-time statistics
    pub fn language_selection(&self) -> LanguageSelection {
        LanguageSelection::new(self.language.clone(), &self.time_selection)
    }

    /// Reject settings that cannot produce output
    pub fn validate(&self) -> Result<(), FeatureError> {
        if self.language.trim().is_empty() {
            return Err(FeatureError::MissingField("language".to_string()));
        }
        self.language_selection().resolve()?;
        Ok(())
    }
}
