use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::tokenize;

const STOP_WORDS: [&str; 14] =
    ["the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by"];
const KEY_POINT_MARKERS: [&str; 5] = ["important", "urgent", "key", "critical", "main"];
const SUMMARY_WORD_LIMIT: usize = 50;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub summary: String,
    pub key_points: Vec<String>,
    pub keywords: Vec<String>,
}

pub fn summarize(text: &str) -> Summary {
    let mut important_lines = Vec::new();
    let mut key_points = Vec::new();

    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if line.chars().count() > 50 || line.starts_with(['-', '*', '•', '#']) {
            important_lines.push(line);
        }

        let lowered = line.to_lowercase();
        if KEY_POINT_MARKERS.iter().any(|marker| lowered.contains(marker)) {
            key_points.push(line.to_string());
        }
    }

    if key_points.is_empty() {
        let mut longest = important_lines.clone();
        longest.sort_by_key(|line| std::cmp::Reverse(line.chars().count()));
        key_points = longest.into_iter().take(3).map(str::to_string).collect();
    }

    let summary = if important_lines.is_empty() {
        let words = text.split_whitespace().collect::<Vec<_>>();
        let mut summary =
            words.iter().take(SUMMARY_WORD_LIMIT).copied().collect::<Vec<_>>().join(" ");
        if words.len() > SUMMARY_WORD_LIMIT {
            summary.push_str("...");
        }
        summary
    } else {
        important_lines.iter().take(3).copied().collect::<Vec<_>>().join(" ")
    };

    Summary { summary, key_points, keywords: keywords(text) }
}

fn keywords(text: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    tokenize(text)
        .into_iter()
        .filter(|word| word.chars().count() > 4 && !STOP_WORDS.contains(&word.as_str()))
        .filter(|word| seen.insert(word.clone()))
        .take(5)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::summarize;

    #[test]
    fn short_messages_summarize_to_their_words() {
        let summary = summarize("Can you review the report by Friday?");
        assert_eq!(summary.summary, "Can you review the report by Friday?");
        assert!(summary.key_points.is_empty());
        assert_eq!(summary.keywords, vec!["review", "report", "friday"]);
    }

    #[test]
    fn long_lines_and_bullets_form_the_summary() {
        let text = "Hello team,\n\nWe need to schedule an urgent meeting tomorrow at 2 PM to discuss the budget.\n- bring numbers\nThanks";
        let summary = summarize(text);

        assert!(summary.summary.starts_with("We need to schedule an urgent meeting"));
        assert!(summary.summary.ends_with("- bring numbers"));
        assert_eq!(summary.key_points.len(), 1);
        assert!(summary.key_points[0].contains("urgent meeting"));
    }

    #[test]
    fn very_long_single_paragraph_is_truncated() {
        let text = std::iter::repeat("word").take(80).collect::<Vec<_>>().join(" ");
        let summary = summarize(&text.replace(' ', "\n"));
        assert!(summary.summary.ends_with("..."));
        assert_eq!(summary.summary.trim_end_matches("...").split_whitespace().count(), 50);
    }

    #[test]
    fn summarizing_is_repeatable() {
        let text = "Quarterly numbers are late. Important: finance needs them today.";
        assert_eq!(summarize(text), summarize(text));
    }
}
