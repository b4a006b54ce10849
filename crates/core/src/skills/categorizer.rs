use serde::{Deserialize, Serialize};

use super::{matches_keyword, tokenize};
use crate::domain::analysis::Category;

const WORK: [&str; 26] = [
    "meeting", "colleague", "boss", "company", "project", "client", "deadline", "report",
    "presentation", "office", "team", "department", "employee", "employer", "schedule",
    "calendar", "work", "business", "corporate", "professional", "performance", "review", "task",
    "assignment", "agenda", "conference",
];

const PERSONAL: [&str; 22] = [
    "family", "friend", "parent", "child", "wife", "husband", "spouse", "relative", "birthday",
    "celebration", "vacation", "holiday", "weekend", "dinner", "party", "social", "personal",
    "relationship", "home", "hobby", "leisure", "fun",
];

const STUDY: [&str; 22] = [
    "lecture", "professor", "student", "assignment", "homework", "exam", "test", "course",
    "class", "school", "university", "college", "education", "learning", "research", "thesis",
    "paper", "study", "academic", "grade", "degree", "campus",
];

const FINANCE: [&str; 23] = [
    "money", "payment", "bill", "invoice", "bank", "account", "credit", "debit", "budget",
    "expense", "investment", "loan", "tax", "refund", "fee", "cost", "price", "financial",
    "finances", "cash", "salary", "income", "revenue",
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryAssessment {
    pub category: Category,
    pub confidence: f64,
    pub reasoning: String,
}

pub fn categorize(text: &str) -> CategoryAssessment {
    let tokens = tokenize(text);
    let scores: [(Category, usize); 4] = [
        (Category::Work, keyword_hits(&tokens, &WORK)),
        (Category::Personal, keyword_hits(&tokens, &PERSONAL)),
        (Category::Study, keyword_hits(&tokens, &STUDY)),
        (Category::Finance, keyword_hits(&tokens, &FINANCE)),
    ];

    // First category wins ties, in declaration order.
    let (mut category, max_score) = scores
        .iter()
        .fold((Category::Other, 0), |best, &(candidate, score)| {
            if score > best.1 {
                (candidate, score)
            } else {
                best
            }
        });

    let total_words = tokens.len();
    let mut confidence = if total_words == 0 {
        0.5
    } else {
        (max_score as f64 / (total_words as f64 * 0.1).max(1.0)).min(1.0)
    };

    if max_score == 0 {
        category = Category::Other;
        confidence = 0.3;
    } else if confidence < 0.2 {
        let average = scores.iter().map(|(_, score)| *score as f64).sum::<f64>() / 4.0;
        if (max_score as f64) < average * 1.5 {
            category = Category::Other;
            confidence = 0.4;
        }
    }

    let breakdown = scores
        .iter()
        .map(|(category, score)| format!("{}: {score}", category.as_str().to_ascii_lowercase()))
        .collect::<Vec<_>>()
        .join(", ");

    CategoryAssessment {
        category,
        confidence,
        reasoning: format!("Found {max_score} category-specific keywords. Scores: {breakdown}"),
    }
}

fn keyword_hits(tokens: &[String], keywords: &[&str]) -> usize {
    tokens
        .iter()
        .filter(|token| keywords.iter().any(|keyword| matches_keyword(token, keyword)))
        .count()
}
