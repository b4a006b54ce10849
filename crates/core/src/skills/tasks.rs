use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{contains_term, matches_keyword, split_sentences, tokenize};

const TITLE_LIMIT: usize = 100;
const MIN_TASK_WORDS: usize = 3;

const ACTION_VERBS: [&str; 44] = [
    "do", "complete", "finish", "send", "review", "check", "prepare", "submit", "attend", "call",
    "email", "contact", "respond", "reply", "follow", "remind", "inform", "notify", "buy",
    "purchase", "order", "arrange", "schedule", "book", "setup", "configure", "install", "update",
    "change", "read", "create", "draft", "write", "edit", "organize", "plan", "decide", "fix",
    "approve", "sign", "pay", "confirm", "share", "register",
];

const REQUEST_PHRASES: [&str; 13] = [
    "please", "can you", "could you", "would you", "need to", "needs to", "must", "have to",
    "has to", "should", "remember to", "don't forget", "make sure",
];

const TASK_NOUNS: [&str; 5] = ["todo", "to do", "action item", "next step", "assignment"];

const DEADLINE_WORDS: [&str; 11] = [
    "by", "before", "until", "due", "tomorrow", "today", "tonight", "asap", "deadline", "eod",
    "week",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskUrgency {
    Urgent,
    High,
    Normal,
}

impl TaskUrgency {
    fn assess(text: &str) -> Self {
        let tokens = tokenize(text);
        let any = |terms: &[&str]| terms.iter().any(|term| contains_term(&tokens, term));
        if any(&["urgent", "asap", "immediately", "critical"]) {
            Self::Urgent
        } else if any(&["important", "priority", "must"]) {
            Self::High
        } else {
            Self::Normal
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedTask {
    pub title: String,
    pub description: String,
    pub priority: TaskUrgency,
    pub index: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    pub tasks: Vec<ExtractedTask>,
}

impl TaskList {
    pub fn titles(&self) -> Vec<String> {
        self.tasks.iter().map(|task| task.title.clone()).collect()
    }
}

/// Finds action items. Explicit asks (request phrase plus verb, imperative sentences, task
/// nouns) come first in text order, then remaining sentences that pair an action with a
/// deadline.
pub fn extract_tasks(text: &str) -> TaskList {
    let sentences = candidate_sentences(text);
    let mut seen = HashSet::new();
    let mut found = Vec::new();

    for sentence in &sentences {
        if is_explicit_task(sentence) && seen.insert(dedupe_key(sentence)) {
            found.push(sentence.clone());
        }
    }
    for sentence in &sentences {
        if is_deadline_task(sentence) && seen.insert(dedupe_key(sentence)) {
            found.push(sentence.clone());
        }
    }

    TaskList {
        tasks: found
            .into_iter()
            .enumerate()
            .map(|(index, description)| ExtractedTask {
                title: description.chars().take(TITLE_LIMIT).collect(),
                priority: TaskUrgency::assess(&description),
                description,
                index,
            })
            .collect(),
    }
}

fn candidate_sentences(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(strip_list_marker)
        .flat_map(split_sentences)
        .filter(|sentence| tokenize(sentence).len() >= MIN_TASK_WORDS)
        .map(str::to_string)
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    if let Some(rest) = line.strip_prefix(['-', '*', '•']) {
        return rest.trim_start();
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(['.', ')']) {
            if rest.starts_with(char::is_whitespace) {
                return rest.trim_start();
            }
        }
    }
    line
}

fn is_explicit_task(sentence: &str) -> bool {
    let tokens = tokenize(sentence);
    let has_verb = tokens.iter().any(|token| is_action_verb(token));
    let requested = REQUEST_PHRASES.iter().any(|phrase| contains_term(&tokens, phrase));
    let imperative = tokens.first().map(|token| is_action_verb(token)).unwrap_or(false);
    let task_noun = TASK_NOUNS.iter().any(|noun| contains_term(&tokens, noun));

    (requested && has_verb) || imperative || task_noun
}

fn is_deadline_task(sentence: &str) -> bool {
    let tokens = tokenize(sentence);
    tokens.iter().any(|token| is_action_verb(token))
        && DEADLINE_WORDS.iter().any(|word| contains_term(&tokens, word))
}

fn is_action_verb(token: &str) -> bool {
    ACTION_VERBS.iter().any(|verb| matches_keyword(token, verb))
}

fn dedupe_key(sentence: &str) -> String {
    sentence
        .trim()
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ';' | ':') || c.is_whitespace())
        .to_lowercase()
}
