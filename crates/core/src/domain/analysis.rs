use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::message::MessageId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }

    /// Lenient parse for labels coming back from tools or config files.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" | "urgent" => Some(Self::High),
            "medium" | "normal" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Work,
    Personal,
    Study,
    Finance,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Work => "WORK",
            Self::Personal => "PERSONAL",
            Self::Study => "STUDY",
            Self::Finance => "FINANCE",
            Self::Other => "OTHER",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "work" => Some(Self::Work),
            "personal" => Some(Self::Personal),
            "study" => Some(Self::Study),
            "finance" => Some(Self::Finance),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values used for any field no tool invocation populated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnalysisDefaults {
    pub priority: Priority,
    pub category: Category,
}

impl Default for AnalysisDefaults {
    fn default() -> Self {
        Self { priority: Priority::Medium, category: Category::Other }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub message_id: MessageId,
    pub summary: String,
    pub priority: Priority,
    pub category: Category,
    pub suggested_reply: Option<String>,
    pub tasks: Vec<String>,
    pub notes: String,
}

impl AnalysisResult {
    /// The full fallback analysis: nothing was learned from any tool.
    pub fn fallback(
        message_id: MessageId,
        body: &str,
        defaults: AnalysisDefaults,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            message_id,
            summary: crate::skills::first_sentence(body),
            priority: defaults.priority,
            category: defaults.category,
            suggested_reply: None,
            tasks: Vec::new(),
            notes: notes.into(),
        }
    }
}
