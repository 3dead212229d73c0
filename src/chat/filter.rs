//! Dictionary-based profanity detection.

use std::collections::HashSet;

use lazy_static::lazy_static;

/// Classifies outgoing text. Must be side-effect free.
pub trait ContentFilter: Send + Sync {
    fn is_profane(&self, text: &str) -> bool;
}

lazy_static! {
    static ref DEFAULT_WORDS: HashSet<&'static str> = [
        "arse", "arsehole", "ass", "asshole", "bastard", "bitch", "bitches", "bollocks",
        "bullshit", "cock", "cocksucker", "crap", "cunt", "damn", "dick", "dickhead",
        "dildo", "douche", "douchebag", "fag", "faggot", "fuck", "fucked", "fucker",
        "fucking", "fucks", "goddamn", "hell", "jackass", "motherfucker", "nigga",
        "nigger", "piss", "pissed", "prick", "pussy", "shit", "shitty", "slut", "twat",
        "wank", "wanker", "whore",
    ]
    .into_iter()
    .collect();
}

/// Token-matching filter over a word list.
///
/// Text is split on anything that is not alphanumeric; a token is profane when
/// it equals a dictionary word ignoring case. Substrings do not match, so
/// "classic" and "hello" are clean.
#[derive(Debug, Clone)]
pub struct WordListFilter {
    words: HashSet<String>,
}

impl WordListFilter {
    /// Built-in dictionary, plus `extra_words`, minus `allowed_words`
    pub fn new<I, J, S, T>(extra_words: I, allowed_words: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let mut words: HashSet<String> = DEFAULT_WORDS.iter().map(|w| w.to_string()).collect();
        words.extend(
            extra_words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty()),
        );
        for word in allowed_words {
            words.remove(&word.as_ref().trim().to_lowercase());
        }
        Self { words }
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }
}

impl Default for WordListFilter {
    fn default() -> Self {
        Self::new(Vec::<String>::new(), Vec::<String>::new())
    }
}

impl ContentFilter for WordListFilter {
    fn is_profane(&self, text: &str) -> bool {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .any(|token| self.words.contains(&token.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        let filter = WordListFilter::default();
        assert!(!filter.is_profane("hello there"));
        assert!(!filter.is_profane(""));
        assert!(!filter.is_profane("a classic assessment"));
    }

    #[test]
    fn test_profane_text_any_case() {
        let filter = WordListFilter::default();
        assert!(filter.is_profane("what the hell"));
        assert!(filter.is_profane("SHIT happens"));
        assert!(filter.is_profane("you,bastard!"));
    }

    #[test]
    fn test_extra_and_allowed_words() {
        let filter = WordListFilter::new(["Gosh"], ["hell"]);
        assert!(filter.is_profane("oh gosh"));
        assert!(!filter.is_profane("what the hell"));
        assert_eq!(filter.word_count(), WordListFilter::default().word_count());
    }

    #[test]
    fn test_blank_extra_words_ignored() {
        let filter = WordListFilter::new(["  ", ""], Vec::<String>::new());
        assert!(!filter.is_profane("a  b"));
    }
}
