//! Pure message analyzers.
//!
//! Every skill maps message text to exactly one analysis field and is a deterministic
//! function of its input: calling a skill twice on the same text yields the same value.

pub mod categorizer;
pub mod priority;
pub mod reply;
pub mod summarizer;
pub mod tasks;

pub use categorizer::{categorize, CategoryAssessment};
pub use priority::{detect_priority, PriorityAssessment};
pub use reply::{suggest_reply, MessageType, ReplySuggestions};
pub use summarizer::{summarize, Summary};
pub use tasks::{extract_tasks, ExtractedTask, TaskList, TaskUrgency};

/// Text up to and including the first sentence terminator, or up to the first line break.
pub fn first_sentence(text: &str) -> String {
    let trimmed = text.trim_start();
    let mut chars = trimmed.char_indices().peekable();

    while let Some((index, character)) = chars.next() {
        if character == '\n' || character == '\r' {
            return trimmed[..index].trim().to_string();
        }
        if matches!(character, '.' | '!' | '?') {
            let at_boundary = chars.peek().map(|(_, next)| next.is_whitespace()).unwrap_or(true);
            if at_boundary {
                let end = index + character.len_utf8();
                return trimmed[..end].trim().to_string();
            }
        }
    }

    trimmed.trim().to_string()
}

/// Splits a line into sentences, keeping terminal punctuation.
pub(crate) fn split_sentences(line: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = line.char_indices().peekable();

    while let Some((index, character)) = chars.next() {
        if !matches!(character, '.' | '!' | '?') {
            continue;
        }
        let at_boundary = chars.peek().map(|(_, next)| next.is_whitespace()).unwrap_or(true);
        if at_boundary {
            let end = index + character.len_utf8();
            let sentence = line[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }

    let rest = line[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }
    sentences
}

/// Lower-cased alphanumeric words. Apostrophes stay inside words (`department's`).
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for character in text.chars() {
        if character.is_alphanumeric() || (character == '\'' && !current.is_empty()) {
            current.extend(character.to_lowercase());
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens.into_iter().map(|token| token.trim_end_matches('\'').to_string()).collect()
}

/// A keyword matches a token exactly or through a simple inflection
/// (`meeting` matches `meetings`, `expense` matches `expenses`, `schedule` matches `scheduled`).
/// Two-letter keywords only match exactly, so `hi` never matches `his`.
pub(crate) fn matches_keyword(token: &str, keyword: &str) -> bool {
    let token = token.strip_suffix("'s").unwrap_or(token);
    if token == keyword {
        return true;
    }
    if keyword.chars().count() < 3 {
        return false;
    }
    token
        .strip_prefix(keyword)
        .map(|suffix| matches!(suffix, "s" | "es" | "d" | "ed" | "ing"))
        .unwrap_or(false)
}

/// Multi-word phrases match consecutive tokens; single words go through [`matches_keyword`].
pub(crate) fn contains_term(tokens: &[String], term: &str) -> bool {
    let words = term.split_whitespace().collect::<Vec<_>>();
    match words.as_slice() {
        [] => false,
        [single] => tokens.iter().any(|token| matches_keyword(token, single)),
        phrase => tokens.windows(phrase.len()).any(|window| {
            window.iter().zip(phrase.iter()).all(|(token, word)| token == word)
        }),
    }
}

pub(crate) fn count_terms(tokens: &[String], terms: &[&str]) -> usize {
    terms.iter().filter(|term| contains_term(tokens, term)).count()
}

#[cfg(test)]
mod tests {
    use super::{contains_term, first_sentence, matches_keyword, split_sentences, tokenize};

    #[test]
    fn first_sentence_stops_at_terminator_or_line_break() {
        let request = "Can you review the report by Friday?";
        assert_eq!(first_sentence(request), request);
        assert_eq!(first_sentence("  Server down. Call me."), "Server down.");
        assert_eq!(first_sentence("Hi team,\nPlease read this."), "Hi team,");
        assert_eq!(first_sentence("Version 1.2 is out"), "Version 1.2 is out");
        assert_eq!(first_sentence(""), "");
    }

    #[test]
    fn sentences_keep_punctuation() {
        assert_eq!(
            split_sentences("Review it. Then send it! Done?"),
            vec!["Review it.", "Then send it!", "Done?"]
        );
        assert_eq!(split_sentences("no terminator"), vec!["no terminator"]);
    }

    #[test]
    fn tokenizer_lowercases_and_keeps_possessives() {
        assert_eq!(
            tokenize("Review your Department's EXPENSES, ok?"),
            vec!["review", "your", "department's", "expenses", "ok"]
        );
    }

    #[test]
    fn keywords_match_inflections_but_not_unrelated_words() {
        assert!(matches_keyword("meetings", "meeting"));
        assert!(matches_keyword("scheduled", "schedule"));
        assert!(matches_keyword("department's", "department"));
        assert!(!matches_keyword("homework", "work"));
        assert!(!matches_keyword("this", "hi"));
        assert!(!matches_keyword("his", "hi"));
    }

    #[test]
    fn phrases_match_consecutive_tokens() {
        let tokens = tokenize("Could you please take your time with this");
        assert!(contains_term(&tokens, "could you"));
        assert!(contains_term(&tokens, "take your time"));
        assert!(!contains_term(&tokens, "you could"));
    }
}
