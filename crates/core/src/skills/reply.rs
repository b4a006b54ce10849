use serde::{Deserialize, Serialize};

use super::{contains_term, tokenize};

const MAX_SUGGESTIONS: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Greeting,
    Request,
    Problem,
    Urgent,
    Question,
    Meeting,
    Appreciation,
    Compliment,
    General,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Request => "request",
            Self::Problem => "problem",
            Self::Urgent => "urgent",
            Self::Question => "question",
            Self::Meeting => "meeting",
            Self::Appreciation => "appreciation",
            Self::Compliment => "compliment",
            Self::General => "general",
        }
    }

    /// Detection order matters: a greeting that also asks for something is still a greeting,
    /// and "can you fix this" is a request before it is a problem report.
    pub fn detect(text: &str) -> Self {
        let tokens = tokenize(text);
        let any = |terms: &[&str]| terms.iter().any(|term| contains_term(&tokens, term));
        let any_prefix = |prefixes: &[&str]| {
            tokens.iter().any(|token| prefixes.iter().any(|prefix| token.starts_with(prefix)))
        };

        if any(&["hi", "hello", "hey", "good morning", "good afternoon", "good evening"]) {
            Self::Greeting
        } else if any(&["can you", "could you", "please", "need you to", "would you", "request"]) {
            Self::Request
        } else if any(&["issue", "problem", "error", "bug", "broken", "not working", "fix"]) {
            Self::Problem
        } else if any(&["urgent", "asap", "immediately", "now"]) {
            Self::Urgent
        } else if text.contains('?') || any(&["question", "ask", "wonder"]) {
            Self::Question
        } else if any(&["meeting", "appointment", "schedule", "when", "time"]) {
            Self::Meeting
        } else if any_prefix(&["thank"]) || any(&["appreciate"]) {
            Self::Appreciation
        } else if any_prefix(&["congrat"]) || any(&["well done", "great job"]) {
            Self::Compliment
        } else {
            Self::General
        }
    }

    fn canned_replies(&self) -> &'static [&'static str] {
        match self {
            Self::Greeting => &[
                "Hello! How can I help you today?",
                "Hi! Thanks for reaching out. What can I assist you with?",
                "Hey! Good to hear from you. What do you need?",
            ],
            Self::Problem => &[
                "I understand you're experiencing an issue. Let me look into this and help you resolve it.",
                "Thanks for reporting this problem. I'll investigate and get back to you with a solution.",
                "I see there's an issue. Can you provide more details so I can help fix it?",
            ],
            Self::Request => &[
                "I'd be happy to help with that. Let me take care of it for you.",
                "Sure, I can assist with this request. I'll get started right away.",
                "Absolutely, I'll handle this for you. Give me a moment to process it.",
            ],
            Self::Urgent => &[
                "I acknowledge receipt of your urgent message. I will prioritize addressing this and get back to you shortly.",
                "Understood. I'm looking into this matter right away and will provide an update within the next hour.",
                "I've received your urgent request and am treating it with the highest priority.",
            ],
            Self::Question => &[
                "Thank you for your question. Let me look into this and get back to you with a detailed response.",
                "I understand you have a question. I'll review the details and provide an answer soon.",
                "Thanks for reaching out with this question. I need to gather some information before responding.",
            ],
            Self::Meeting => &[
                "I've noted the meeting request. I'll check my calendar and confirm my availability.",
                "Thank you for the meeting invitation. I'll review my schedule and respond shortly.",
                "I acknowledge the meeting request. I'll confirm my attendance once I've checked my availability.",
            ],
            Self::Appreciation => &[
                "Thank you for your kind words. I appreciate the recognition.",
                "I'm grateful for your appreciation. Thank you for taking the time to share this feedback.",
                "Your appreciation means a lot. Thank you for the positive feedback.",
            ],
            Self::Compliment => &[
                "Thank you for the compliment. I appreciate the recognition.",
                "I'm honored by your kind words. Thank you for taking the time to acknowledge this.",
                "Your feedback is much appreciated. Thank you for the encouraging words.",
            ],
            Self::General => &[
                "Thank you for your message. I have received it and will respond shortly.",
                "I acknowledge receipt of your message. I'm reviewing the details and will get back to you soon.",
                "Thank you for sharing this information. I'll process it and provide a response.",
                "I've received your message and understand the request. I'll address this as soon as possible.",
                "Thanks for the update. I'm reviewing the information and will follow up shortly.",
            ],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplySuggestions {
    pub message_type: MessageType,
    pub suggestions: Vec<String>,
    pub sender: Option<String>,
}

impl ReplySuggestions {
    pub fn best(&self) -> Option<&str> {
        self.suggestions.first().map(String::as_str)
    }
}

pub fn suggest_reply(text: &str, sender: Option<&str>) -> ReplySuggestions {
    let message_type = MessageType::detect(text);
    ReplySuggestions {
        message_type,
        suggestions: message_type
            .canned_replies()
            .iter()
            .take(MAX_SUGGESTIONS)
            .map(|reply| (*reply).to_string())
            .collect(),
        sender: sender.map(str::trim).filter(|sender| !sender.is_empty()).map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::{suggest_reply, MessageType};

    #[test]
    fn review_request_gets_a_request_reply() {
        let suggestions = suggest_reply("Can you review the report by Friday?", Some("Sarah"));
        assert_eq!(suggestions.message_type, MessageType::Request);
        assert_eq!(
            suggestions.best(),
            Some("I'd be happy to help with that. Let me take care of it for you.")
        );
        assert_eq!(suggestions.sender.as_deref(), Some("Sarah"));
    }

    #[test]
    fn detection_follows_precedence() {
        assert_eq!(MessageType::detect("Hello there, can you help?"), MessageType::Greeting);
        assert_eq!(MessageType::detect("The build is broken again"), MessageType::Problem);
        assert_eq!(MessageType::detect("Server down, respond ASAP"), MessageType::Urgent);
        assert_eq!(MessageType::detect("Is the report final?"), MessageType::Question);
        assert_eq!(MessageType::detect("Let's set up an appointment"), MessageType::Meeting);
        assert_eq!(MessageType::detect("Thanks for the notes"), MessageType::Appreciation);
        assert_eq!(MessageType::detect("Congratulations on the launch"), MessageType::Compliment);
        assert_eq!(MessageType::detect("FYI the office closes early"), MessageType::General);
    }

    #[test]
    fn short_words_do_not_match_inside_longer_ones() {
        // "this" contains "hi", "know" contains "now".
        assert_eq!(MessageType::detect("I know this works."), MessageType::General);
    }

    #[test]
    fn at_most_three_suggestions_are_offered() {
        let suggestions = suggest_reply("FYI the office closes early", None);
        assert_eq!(suggestions.suggestions.len(), 3);
        assert_eq!(suggestions.sender, None);
    }

    #[test]
    fn blank_sender_is_dropped() {
        assert_eq!(suggest_reply("hello", Some("  ")).sender, None);
    }
}
