use crate::stopwords::Language;

/// Reduces a normalized token to its base form. Implementations must be pure.
pub trait Lemmatizer: Send + Sync {
    fn lemmatize(&self, token: &str) -> String;
}

const IRREGULAR_NOUNS: &[(&str, &str)] = &[
    ("children", "child"),
    ("men", "man"),
    ("women", "woman"),
    ("mice", "mouse"),
    ("geese", "goose"),
    ("feet", "foot"),
    ("teeth", "tooth"),
    ("data", "datum"),
    ("criteria", "criterion"),
    ("phenomena", "phenomenon"),
    ("indices", "index"),
    ("matrices", "matrix"),
];

const INVARIANT_ENDINGS: &[&str] = &["ss", "us", "is"];

const INVARIANT_WORDS: &[&str] = &["series", "species", "news", "means", "physics", "mathematics"];

const SIBILANT_PLURALS: &[&str] = &["sses", "ches", "shes", "xes", "zes"];

/// Noun-oriented plural folding for English, in the manner of a dictionary
/// lemmatizer's default noun rules.
#[derive(Debug, Clone, Copy)]
pub struct EnglishLemmatizer {
    /// Tokens shorter than this are returned unchanged.
    pub min_len: usize,
}

impl EnglishLemmatizer {
    pub fn new() -> Self {
        Self { min_len: 4 }
    }
}

impl Default for EnglishLemmatizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Lemmatizer for EnglishLemmatizer {
    fn lemmatize(&self, token: &str) -> String {
        if let Some((_, base)) = IRREGULAR_NOUNS.iter().find(|(plural, _)| *plural == token) {
            return (*base).to_string();
        }

        if token.chars().count() < self.min_len.max(1)
            || INVARIANT_WORDS.contains(&token)
            || INVARIANT_ENDINGS.iter().any(|ending| token.ends_with(ending))
        {
            return token.to_string();
        }

        if let Some(stem) = token.strip_suffix("ies") {
            if stem.chars().count() >= 2 {
                return format!("{stem}y");
            }
        }

        if SIBILANT_PLURALS.iter().any(|suffix| token.ends_with(suffix)) {
            return token[..token.len() - 2].to_string();
        }

        match token.strip_suffix('s') {
            Some(stem) => stem.to_string(),
            None => token.to_string(),
        }
    }
}

pub fn lemmatizer_for(language: Language) -> Box<dyn Lemmatizer> {
    match language {
        Language::English => Box::new(EnglishLemmatizer::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::{EnglishLemmatizer, Lemmatizer};

    #[test]
    fn regular_plurals_are_folded() {
        let lemmatizer = EnglishLemmatizer::new();
        assert_eq!(lemmatizer.lemmatize("languages"), "language");
        assert_eq!(lemmatizer.lemmatize("studies"), "study");
        assert_eq!(lemmatizer.lemmatize("boxes"), "box");
        assert_eq!(lemmatizer.lemmatize("classes"), "class");
        assert_eq!(lemmatizer.lemmatize("branches"), "branch");
    }

    #[test]
    fn irregular_and_invariant_words() {
        let lemmatizer = EnglishLemmatizer::new();
        assert_eq!(lemmatizer.lemmatize("children"), "child");
        assert_eq!(lemmatizer.lemmatize("analysis"), "analysis");
        assert_eq!(lemmatizer.lemmatize("status"), "status");
        assert_eq!(lemmatizer.lemmatize("series"), "series");
        assert_eq!(lemmatizer.lemmatize("python"), "python");
        assert_eq!(lemmatizer.lemmatize("gas"), "gas");
    }

    #[test]
    fn lemmatizer_is_deterministic() {
        let lemmatizer = EnglishLemmatizer::new();
        assert_eq!(lemmatizer.lemmatize("documents"), lemmatizer.lemmatize("documents"));
    }
}
