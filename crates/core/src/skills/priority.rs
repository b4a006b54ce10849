use serde::{Deserialize, Serialize};

use super::{count_terms, tokenize};
use crate::domain::analysis::Priority;

const URGENT_INDICATORS: [&str; 15] = [
    "urgent",
    "asap",
    "immediately",
    "right now",
    "today",
    "within hours",
    "crucial",
    "critical",
    "emergency",
    "deadline",
    "cannot wait",
    "high priority",
    "top priority",
    "priority 1",
    "time sensitive",
];

const LOW_INDICATORS: [&str; 8] = [
    "whenever",
    "take your time",
    "optional",
    "nice to have",
    "eventually",
    "someday",
    "not urgent",
    "no rush",
];

const TIME_SENSITIVE_WORDS: [&str; 5] = ["tomorrow", "meeting", "due", "report", "review"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriorityAssessment {
    pub priority: Priority,
    pub confidence: f64,
    pub reasoning: String,
}

pub fn detect_priority(text: &str) -> PriorityAssessment {
    let tokens = tokenize(text);
    let mut urgent_count = count_terms(&tokens, &URGENT_INDICATORS);
    let low_count = count_terms(&tokens, &LOW_INDICATORS);

    // "not urgent" also contains "urgent"; the negated form only counts as low.
    if count_terms(&tokens, &["not urgent"]) > 0 && urgent_count > 0 {
        urgent_count -= 1;
    }

    let time_sensitive_count = tokens
        .iter()
        .filter(|token| TIME_SENSITIVE_WORDS.contains(&token.as_str()))
        .count();

    let (priority, confidence) = if urgent_count > low_count {
        (Priority::High, (0.8 + urgent_count as f64 * 0.05).min(1.0))
    } else if low_count > urgent_count {
        (Priority::Low, (0.6 + low_count as f64 * 0.05).min(0.9))
    } else if time_sensitive_count > 2 {
        (Priority::Medium, 0.7)
    } else {
        (Priority::Medium, 0.6)
    };

    PriorityAssessment {
        priority,
        confidence,
        reasoning: format!(
            "Found {urgent_count} urgent indicators, {low_count} low priority indicators, {time_sensitive_count} time-sensitive terms"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::detect_priority;
    use crate::domain::analysis::Priority;

    #[test]
    fn urgent_language_is_high_priority() {
        let assessment = detect_priority(
            "URGENT: the production server is down. This is critical, respond immediately.",
        );
        assert_eq!(assessment.priority, Priority::High);
        assert!(assessment.confidence > 0.9);
        assert!(assessment.reasoning.starts_with("Found 3 urgent indicators"));
    }

    #[test]
    fn relaxed_language_is_low_priority() {
        let assessment = detect_priority("Not urgent, take your time with the slides.");
        assert_eq!(assessment.priority, Priority::Low);
    }

    #[test]
    fn neutral_text_is_medium() {
        let assessment = detect_priority("Can you review the report by Friday?");
        assert_eq!(assessment.priority, Priority::Medium);
        assert!((assessment.confidence - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn busy_schedule_raises_confidence_but_stays_medium() {
        let assessment =
            detect_priority("Review the report before tomorrow's meeting, the review is due.");
        assert_eq!(assessment.priority, Priority::Medium);
        assert!((assessment.confidence - 0.7).abs() < f64::EPSILON);
    }
}
