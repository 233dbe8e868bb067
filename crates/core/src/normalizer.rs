//! Deterministic text normalization: lower-case, strip punctuation and digits,
//! tokenize, drop stop words, lemmatize.

use crate::config::SearchConfig;
use crate::error::Result;
use crate::lemmatizer::{lemmatizer_for, Lemmatizer};
use crate::models::ProcessedDocument;
use crate::stopwords::{Language, StopWords};
use regex::Regex;
use std::collections::{BTreeSet, HashMap};

const NON_WORD_PATTERN: &str = r"[^\p{L}\p{Nd}\s]+";
const DIGIT_RUN_PATTERN: &str = r"\d+";

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Intersection over union; an empty union scores 0.0.
pub fn jaccard(left: &BTreeSet<String>, right: &BTreeSet<String>) -> f64 {
    let union = left.union(right).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = left.intersection(right).count();
    intersection as f64 / union as f64
}

pub struct TextNormalizer {
    stop_words: StopWords,
    lemmatizer: Box<dyn Lemmatizer>,
    non_word_re: Regex,
    digit_run_re: Regex,
}

impl TextNormalizer {
    pub fn new(stop_words: StopWords, lemmatizer: Box<dyn Lemmatizer>) -> Result<Self> {
        Ok(Self {
            stop_words,
            lemmatizer,
            non_word_re: Regex::new(NON_WORD_PATTERN)?,
            digit_run_re: Regex::new(DIGIT_RUN_PATTERN)?,
        })
    }

    pub fn for_language(language: Language) -> Result<Self> {
        Self::new(StopWords::for_language(language), lemmatizer_for(language))
    }

    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        let language = config.language()?;
        let stop_words = if config.use_stop_words {
            StopWords::for_language(language)
        } else {
            StopWords::empty()
        };
        Self::new(stop_words, lemmatizer_for(language))
    }

    pub fn normalize(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        let without_symbols = self.non_word_re.replace_all(&lowered, " ");
        let without_digits = self.digit_run_re.replace_all(&without_symbols, " ");
        normalize_whitespace(&without_digits)
    }

    pub fn tokenize(&self, normalized: &str) -> Vec<String> {
        normalized.split_whitespace().map(str::to_string).collect()
    }

    pub fn remove_stop_words(&self, tokens: Vec<String>) -> Vec<String> {
        tokens
            .into_iter()
            .filter(|token| !self.stop_words.contains(token))
            .collect()
    }

    pub fn lemmatize(&self, tokens: Vec<String>) -> Vec<String> {
        tokens
            .iter()
            .map(|token| self.lemmatizer.lemmatize(token))
            .collect()
    }

    pub fn tokens(&self, text: &str) -> Vec<String> {
        let normalized = self.normalize(text);
        let tokens = self.tokenize(&normalized);
        let filtered = self.remove_stop_words(tokens);
        self.lemmatize(filtered)
    }

    pub fn term_set(&self, text: &str) -> BTreeSet<String> {
        self.tokens(text).into_iter().collect()
    }

    pub fn process(&self, text: &str) -> ProcessedDocument {
        ProcessedDocument::from_tokens(text, self.tokens(text))
    }

    /// Terms by descending frequency; ties keep first-occurrence order.
    pub fn extract_keywords(&self, text: &str, top_n: Option<usize>) -> Vec<(String, usize)> {
        let mut ordered: Vec<(String, usize)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for token in self.tokens(text) {
            match positions.get(&token) {
                Some(&position) => ordered[position].1 += 1,
                None => {
                    positions.insert(token.clone(), ordered.len());
                    ordered.push((token, 1));
                }
            }
        }

        ordered.sort_by(|left, right| right.1.cmp(&left.1));
        if let Some(limit) = top_n {
            ordered.truncate(limit);
        }
        ordered
    }

    pub fn similarity(&self, left: &str, right: &str) -> f64 {
        jaccard(&self.term_set(left), &self.term_set(right))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lemmatizer::Lemmatizer;

    fn normalizer() -> TextNormalizer {
        TextNormalizer::for_language(Language::English).expect("english normalizer")
    }

    struct UppercaseLemmatizer;

    impl Lemmatizer for UppercaseLemmatizer {
        fn lemmatize(&self, token: &str) -> String {
            token.to_uppercase()
        }
    }

    #[test]
    fn normalization_strips_symbols_digits_and_spacing() {
        let normalized = normalizer().normalize("  Hello, World!\tVersion 2.0 -- rust_lang  ");
        assert_eq!(normalized, "hello world version rust lang");
    }

    #[test]
    fn whitespace_is_normalized() {
        assert_eq!(normalize_whitespace("A  \t  lot\nof   spacing"), "A lot of spacing");
    }

    #[test]
    fn pipeline_filters_stop_words_before_lemmatizing() -> Result<(), Box<dyn std::error::Error>> {
        let normalizer = TextNormalizer::new(
            StopWords::for_language(Language::English),
            Box::new(UppercaseLemmatizer),
        )?;
        let tokens = normalizer.tokens("The page lists the Python languages");
        assert_eq!(tokens, vec!["LISTS", "PYTHON", "LANGUAGES"]);
        Ok(())
    }

    #[test]
    fn process_builds_consistent_statistics() {
        let doc = normalizer().process("Rust indexes PDFs. Rust searches indexes quickly.");

        assert_eq!(doc.tokens, vec!["rust", "index", "pdf", "rust", "search", "index", "quickly"]);
        assert_eq!(doc.frequency("rust"), 2);
        assert_eq!(doc.frequency("index"), 2);
        assert_eq!(doc.term_frequencies.values().sum::<usize>(), doc.tokens.len());
        assert_eq!(
            doc.unique_terms,
            doc.tokens.iter().cloned().collect::<BTreeSet<_>>()
        );
    }

    #[test]
    fn process_is_idempotent() {
        let normalizer = normalizer();
        let text = "Zażółć gęślą jaźń; The quick brown foxes jumped over 12 lazy dogs.";
        assert_eq!(normalizer.process(text), normalizer.process(text));
    }

    #[test]
    fn keywords_are_ranked_with_first_occurrence_tie_break() {
        let keywords = normalizer().extract_keywords("beta alpha gamma alpha beta delta", None);
        assert_eq!(
            keywords,
            vec![
                ("beta".to_string(), 2),
                ("alpha".to_string(), 2),
                ("gamma".to_string(), 1),
                ("delta".to_string(), 1),
            ]
        );

        let top = normalizer().extract_keywords("beta alpha gamma alpha beta delta", Some(1));
        assert_eq!(top, vec![("beta".to_string(), 2)]);
    }

    #[test]
    fn stop_words_can_be_disabled() -> Result<(), Box<dyn std::error::Error>> {
        let config = SearchConfig {
            use_stop_words: false,
            ..SearchConfig::default()
        };
        let normalizer = TextNormalizer::from_config(&config)?;
        assert_eq!(normalizer.tokens("the page"), vec!["the", "page"]);
        Ok(())
    }

    #[test]
    fn similarity_is_jaccard_over_term_sets() {
        let normalizer = normalizer();
        assert_eq!(normalizer.similarity("python language", "python language"), 1.0);
        assert_eq!(normalizer.similarity("python", "javascript language"), 0.0);
        assert_eq!(normalizer.similarity("the", "a"), 0.0);
        assert!((normalizer.similarity("python", "python language") - 0.5).abs() < f64::EPSILON);
    }
}
