//! Lexical features
//!
//! Post text is reduced to a bag of lowercase word tokens with URLs, retweet
//! markers, mentions, and stopwords removed. The stopword lexicon is installed
//! and loaded by [`initialize`], which the host calls once at startup; nothing
//! is read or written when the module is merely referenced.

use crate::error::FeatureError;
use crate::schema::PostRecord;
use crate::types::BagOfWords;
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// File name of the installed stopword list
pub const STOPWORDS_FILE: &str = "stopwords.txt";

/// Tokens shorter than this are dropped
pub const MIN_TOKEN_LEN: usize = 2;

/// Tokens longer than this are dropped
pub const MAX_TOKEN_LEN: usize = 15;

/// English stopwords shipped with the crate
pub const BUNDLED_STOPWORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all",
    "almost", "alone", "along", "already", "also", "although", "always", "am", "among",
    "amongst", "amoungst", "amount", "an", "and", "another", "any", "anyhow", "anyone",
    "anything", "anyway", "anywhere", "are", "around", "as", "at", "back", "be", "became",
    "because", "become", "becomes", "becoming", "been", "before", "beforehand", "behind",
    "being", "below", "beside", "besides", "between", "beyond", "bill", "both", "bottom",
    "but", "by", "call", "can", "cannot", "cant", "co", "computer", "con", "could",
    "couldnt", "cry", "de", "describe", "detail", "did", "didn", "do", "does", "doesn",
    "doing", "don", "done", "down", "due", "during", "each", "eg", "eight", "either",
    "eleven", "else", "elsewhere", "empty", "enough", "etc", "even", "ever", "every",
    "everyone", "everything", "everywhere", "except", "few", "fifteen", "fifty", "fill",
    "find", "fire", "first", "five", "for", "former", "formerly", "forty", "found", "four",
    "from", "front", "full", "further", "get", "give", "go", "had", "has", "hasnt", "have",
    "he", "hence", "her", "here", "hereafter", "hereby", "herein", "hereupon", "hers",
    "herself", "him", "himself", "his", "how", "however", "hundred", "i", "ie", "if", "in",
    "inc", "indeed", "interest", "into", "is", "it", "its", "itself", "just", "keep", "kg",
    "km", "last", "latter", "latterly", "least", "less", "ltd", "made", "make", "many",
    "may", "me", "meanwhile", "might", "mill", "mine", "more", "moreover", "most", "mostly",
    "move", "much", "must", "my", "myself", "name", "namely", "neither", "never",
    "nevertheless", "next", "nine", "no", "nobody", "none", "noone", "nor", "not",
    "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one", "only", "onto",
    "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out", "over", "own",
    "part", "per", "perhaps", "please", "put", "quite", "rather", "re", "really", "regarding",
    "same", "say", "see", "seem", "seemed", "seeming", "seems", "serious", "several", "she",
    "should", "show", "side", "since", "sincere", "six", "sixty", "so", "some", "somehow",
    "someone", "something", "sometime", "sometimes", "somewhere", "still", "such", "system",
    "take", "ten", "than", "that", "the", "their", "them", "themselves", "then", "thence",
    "there", "thereafter", "thereby", "therefore", "therein", "thereupon", "these", "they",
    "thick", "thin", "third", "this", "those", "though", "three", "through", "throughout",
    "thru", "thus", "to", "together", "too", "top", "toward", "towards", "twelve", "twenty",
    "two", "un", "under", "unless", "until", "up", "upon", "us", "used", "using", "various",
    "very", "via", "was", "we", "well", "were", "what", "whatever", "when", "whence",
    "whenever", "where", "whereafter", "whereas", "whereby", "wherein", "whereupon",
    "wherever", "whether", "which", "while", "whither", "who", "whoever", "whole", "whom",
    "whose", "why", "will", "with", "within", "without", "would", "yet", "you", "your",
    "yours", "yourself", "yourselves",
];

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)https?://\S+").expect("url pattern is valid"));
static RETWEET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)RT @\S+").expect("retweet pattern is valid"));
static MENTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@\S+").expect("mention pattern is valid"));
static NON_ALNUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9]").expect("alnum pattern is valid"));
static WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z]+").expect("word pattern is valid"));

static SHARED_LEXICON: OnceCell<Arc<Lexicon>> = OnceCell::new();

/// Stopword set used to filter tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexicon {
    stopwords: HashSet<String>,
}

impl Lexicon {
    /// Lexicon built from the bundled stopword list, without touching disk
    pub fn bundled() -> Self {
        Self::from_words(BUNDLED_STOPWORDS.iter().copied())
    }

    pub fn from_words<'a, I>(words: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self {
            stopwords: words
                .into_iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// Load a stopword file with one word per line; `#` starts a comment line
    pub fn load(path: &Path) -> Result<Self, FeatureError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            FeatureError::LexiconError(format!("cannot read {}: {e}", path.display()))
        })?;
        let lexicon = Self::from_words(raw.lines().filter(|line| !line.starts_with('#')));
        if lexicon.is_empty() {
            return Err(FeatureError::LexiconError(format!(
                "{} contains no stopwords",
                path.display()
            )));
        }
        Ok(lexicon)
    }

    /// Load the stopword file [`install`] writes into `dir`
    pub fn from_dir(dir: &Path) -> Result<Self, FeatureError> {
        Self::load(&dir.join(STOPWORDS_FILE))
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    pub fn len(&self) -> usize {
        self.stopwords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stopwords.is_empty()
    }
}

/// Default lexicon directory under the platform cache dir
pub fn default_lexicon_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("author-flux")
}

/// Outcome of installing the stopword file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStatus {
    Installed,
    AlreadyPresent,
}

/// Write the bundled stopword list into `dir` unless the file already exists
pub fn install(dir: &Path) -> Result<(PathBuf, InstallStatus), FeatureError> {
    let path = dir.join(STOPWORDS_FILE);
    if path.exists() {
        debug!(path = %path.display(), "Stopword lexicon already installed");
        return Ok((path, InstallStatus::AlreadyPresent));
    }

    fs::create_dir_all(dir)?;
    let mut contents = String::from("# author-flux stopwords\n");
    for word in BUNDLED_STOPWORDS {
        contents.push_str(word);
        contents.push('\n');
    }
    fs::write(&path, contents)?;
    info!(path = %path.display(), words = BUNDLED_STOPWORDS.len(), "Installed stopword lexicon");
    Ok((path, InstallStatus::Installed))
}

/// Install (if absent) and load the process-wide lexicon.
///
/// Only the first call touches disk; later calls return the same lexicon
/// whatever directory they pass.
pub fn initialize(dir: Option<&Path>) -> Result<Arc<Lexicon>, FeatureError> {
    SHARED_LEXICON
        .get_or_try_init(|| {
            let dir = dir.map(Path::to_path_buf).unwrap_or_else(default_lexicon_dir);
            let (path, _) = install(&dir)?;
            let lexicon = Lexicon::load(&path)?;
            info!(words = lexicon.len(), "Loaded stopword lexicon");
            Ok(Arc::new(lexicon))
        })
        .map(Arc::clone)
}

/// Word normalization applied before tokenizing
pub trait Lemmatizer {
    fn lemmatize(&self, word: &str) -> String;
}

/// Leaves every word unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityLemmatizer;

impl Lemmatizer for IdentityLemmatizer {
    fn lemmatize(&self, word: &str) -> String {
        word.to_string()
    }
}

/// Strip URLs, retweet markers, and mentions, then reduce to single-spaced
/// ASCII alphanumerics
pub fn clean_text(text: &str) -> String {
    let text = URL_RE.replace_all(text, "");
    let text = RETWEET_RE.replace_all(&text, "");
    let text = MENTION_RE.replace_all(&text, "");
    let text = NON_ALNUM_RE.replace_all(&text, " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Tokenize post text with the identity lemmatizer
pub fn preprocess(text: &str, lexicon: &Lexicon) -> Vec<String> {
    preprocess_with(text, lexicon, &IdentityLemmatizer)
}

/// Tokenize post text: clean, lemmatize, keep lowercase alphabetic tokens of
/// 2-15 characters that are not stopwords
pub fn preprocess_with(text: &str, lexicon: &Lexicon, lemmatizer: &dyn Lemmatizer) -> Vec<String> {
    let cleaned = clean_text(text);
    let lemmatized = cleaned
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(|w| lemmatizer.lemmatize(w))
        .collect::<Vec<_>>()
        .join(" ");

    WORD_RE
        .find_iter(&lemmatized)
        .map(|m| m.as_str().to_lowercase())
        .filter(|token| (MIN_TOKEN_LEN..=MAX_TOKEN_LEN).contains(&token.len()))
        .filter(|token| !lexicon.is_stopword(token))
        .collect()
}

/// Bag-of-words over the author's posts tagged with `language`, in post order
pub fn author_bag_of_words(
    posts: &[&PostRecord],
    language: &str,
    lexicon: &Lexicon,
    as_list: bool,
) -> BagOfWords {
    let tokens: Vec<String> = posts
        .iter()
        .filter(|post| post.is_language(language))
        .flat_map(|post| preprocess(&post.text, lexicon))
        .collect();

    if as_list {
        BagOfWords::Tokens(tokens)
    } else {
        BagOfWords::Joined(tokens.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::UNSET_TIMESTAMP;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("author-flux-{name}-{}", std::process::id()));
        fs::remove_dir_all(&dir).ok();
        dir
    }

    #[test]
    fn test_clean_text_strips_markers() {
        let cleaned = clean_text("RT @news_bot: Vote now!! https://t.co/abc @friend #election2016");
        assert_eq!(cleaned, "Vote now election2016");
    }

    #[test]
    fn test_preprocess_filters_tokens() {
        let lexicon = Lexicon::bundled();
        let tokens = preprocess("The ELECTION is rigged, a b supercalifragilistic 2016 news", &lexicon);
        // "the" and "is" are stopwords, "a"/"b" too short, the long word too long
        assert_eq!(tokens, vec!["election", "rigged", "news"]);
    }

    #[test]
    fn test_preprocess_splits_digits_from_words() {
        let tokens = preprocess("maga2020 rally", &Lexicon::bundled());
        assert_eq!(tokens, vec!["maga", "rally"]);
    }

    struct Suffix;

    impl Lemmatizer for Suffix {
        fn lemmatize(&self, word: &str) -> String {
            word.strip_suffix('s').unwrap_or(word).to_string()
        }
    }

    #[test]
    fn test_custom_lemmatizer() {
        let tokens = preprocess_with("voters rallies", &Lexicon::bundled(), &Suffix);
        assert_eq!(tokens, vec!["voter", "rallie"]);
    }

    #[test]
    fn test_bag_of_words_uses_language_posts_only() {
        let posts = vec![
            PostRecord::new("1", "a", *UNSET_TIMESTAMP)
                .with_language("en")
                .with_text("Breaking news tonight"),
            PostRecord::new("2", "a", *UNSET_TIMESTAMP)
                .with_language("ru")
                .with_text("novosti segodnya"),
            PostRecord::new("3", "a", *UNSET_TIMESTAMP)
                .with_language("en")
                .with_text("more news"),
        ];
        let refs: Vec<&PostRecord> = posts.iter().collect();
        let lexicon = Lexicon::bundled();

        let list = author_bag_of_words(&refs, "en", &lexicon, true);
        assert_eq!(
            list,
            BagOfWords::Tokens(vec!["breaking".into(), "news".into(), "tonight".into(), "news".into()])
        );

        let joined = author_bag_of_words(&refs, "en", &lexicon, false);
        assert_eq!(joined, BagOfWords::Joined("breaking news tonight news".into()));

        let none = author_bag_of_words(&refs, "de", &lexicon, false);
        assert_eq!(none, BagOfWords::Joined(String::new()));
    }

    #[test]
    fn test_install_is_idempotent() {
        let dir = scratch_dir("lexicon-install");
        let (path, status) = install(&dir).unwrap();
        assert_eq!(status, InstallStatus::Installed);

        // A user-edited file is left alone
        fs::write(&path, "custom\n").unwrap();
        let (_, status) = install(&dir).unwrap();
        assert_eq!(status, InstallStatus::AlreadyPresent);

        let lexicon = Lexicon::load(&path).unwrap();
        assert_eq!(lexicon.len(), 1);
        assert!(lexicon.is_stopword("custom"));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_installed_file_matches_bundle() {
        let dir = scratch_dir("lexicon-bundle");
        let (path, _) = install(&dir).unwrap();
        assert_eq!(Lexicon::load(&path).unwrap(), Lexicon::bundled());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_rejects_empty_file() {
        let dir = scratch_dir("lexicon-empty");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(STOPWORDS_FILE);
        fs::write(&path, "# nothing\n").unwrap();
        assert!(matches!(Lexicon::load(&path), Err(FeatureError::LexiconError(_))));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_initialize_returns_shared_lexicon() {
        let dir = scratch_dir("lexicon-shared");
        let first = initialize(Some(&dir)).unwrap();
        let second = initialize(None).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!first.is_empty());
    }
}
