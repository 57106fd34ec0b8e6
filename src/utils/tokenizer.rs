use rust_stemmers::Algorithm;
use std::fmt;

/// Reduces a word to the form stored in the index.
pub trait Stemmer: Send + Sync {
    fn stem(&self, word: &str) -> String;
}

/// English Snowball stemmer, the default for indexing and queries.
pub struct SnowballStemmer {
    inner: rust_stemmers::Stemmer,
}

impl SnowballStemmer {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            inner: rust_stemmers::Stemmer::create(algorithm),
        }
    }
}

impl Default for SnowballStemmer {
    fn default() -> Self {
        Self::new(Algorithm::English)
    }
}

impl fmt::Debug for SnowballStemmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowballStemmer").finish_non_exhaustive()
    }
}

impl Stemmer for SnowballStemmer {
    fn stem(&self, word: &str) -> String {
        self.inner.stem(word).into_owned()
    }
}

/// Leaves words untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityStemmer;

impl Stemmer for IdentityStemmer {
    fn stem(&self, word: &str) -> String {
        word.to_owned()
    }
}

/// Turns a line of raw text into index terms, in order of appearance.
///
/// Shared by builders, the crawler and query parsing, so documents and
/// queries are normalized the same way.
pub trait Normalizer: Send + Sync {
    fn normalize(&self, line: &str) -> Vec<String>;
}

/// Default normalizer: lowercase, drop every character that is neither
/// alphabetic nor whitespace, split on whitespace, stem each token.
#[derive(Debug, Clone, Default)]
pub struct TextNormalizer<S = SnowballStemmer> {
    stemmer: S,
}

impl TextNormalizer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: Stemmer> TextNormalizer<S> {
    pub fn with_stemmer(stemmer: S) -> Self {
        Self { stemmer }
    }
}

impl<S: Stemmer> Normalizer for TextNormalizer<S> {
    fn normalize(&self, line: &str) -> Vec<String> {
        let cleaned = clean_text(line);
        cleaned
            .split_whitespace()
            .map(|word| self.stemmer.stem(word))
            .filter(|word| !word.is_empty())
            .collect()
    }
}

/// Lowercase, then keep only alphabetic and whitespace characters.
pub fn clean_text(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphabetic() || c.is_whitespace())
        .collect()
}
