//! Delaware corporate law vocabulary used for keyword scoring

use crate::error::{Error, Result};
use regex::{Regex, RegexSet};

/// Terms whose presence suggests a Delaware corporate law question
pub const LEGAL_KEYWORDS: &[&str] = &[
    // Corporate law concepts
    "fiduciary",
    "duty",
    "care",
    "loyalty",
    "good faith",
    "entire fairness",
    "business judgment",
    "revlon",
    "corwin",
    "caremark",
    "mfw",
    "unocal",
    "blasius",
    "schnell",
    // Entities and roles
    "director",
    "officer",
    "shareholder",
    "stockholder",
    "board",
    "corporation",
    "company",
    "merger",
    "acquisition",
    "controlling shareholder",
    "special committee",
    // Procedure
    "appraisal",
    "section 220",
    "books and records",
    "derivative",
    "class action",
    "injunction",
    "damages",
    "remedy",
    // Transactions
    "spac",
    "de-spac",
    "tender offer",
    "proxy",
    "buyout",
    "going private",
    "freeze-out",
    "squeeze-out",
    // Standards
    "standard of review",
    "burden of proof",
    "pleading stage",
    "motion to dismiss",
    "summary judgment",
    "trial",
    // Courts
    "delaware",
    "chancery",
    "supreme court",
    "court of chancery",
    // Case law
    "precedent",
    "case law",
    "opinion",
    "ruling",
    "holding",
    "decision",
    "judgment",
    "appeal",
];

/// Topic label and the terms that indicate it
pub const TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    ("fiduciary duty", &["fiduciary", "duty of care", "duty of loyalty"]),
    ("business judgment rule", &["business judgment", "bjr"]),
    ("entire fairness", &["entire fairness", "fair dealing", "fair price"]),
    ("revlon", &["revlon", "sale of control"]),
    ("corwin", &["corwin", "stockholder vote"]),
    ("caremark", &["caremark", "oversight", "monitoring"]),
    ("appraisal", &["appraisal", "fair value"]),
    ("section 220", &["section 220", "books and records", "220"]),
    ("merger", &["merger", "acquisition", "m&a"]),
    ("shareholder rights", &["shareholder", "stockholder", "voting"]),
];

/// Compiled, case-insensitive matchers anchored at the start of a word
#[derive(Debug, Clone)]
pub struct Vocabulary {
    keywords: RegexSet,
    topics: Vec<(&'static str, Regex)>,
}

impl Vocabulary {
    pub fn legal() -> Result<Self> {
        let keywords = RegexSet::new(LEGAL_KEYWORDS.iter().map(|k| bounded(k)))
            .map_err(|e| Error::Classification(format!("invalid keyword pattern: {}", e)))?;

        let topics = TOPIC_KEYWORDS
            .iter()
            .map(|(topic, terms)| {
                let alternation = terms
                    .iter()
                    .map(|t| regex::escape(t))
                    .collect::<Vec<_>>()
                    .join("|");
                Regex::new(&format!(r"(?i)\b(?:{})", alternation))
                    .map(|re| (*topic, re))
                    .map_err(|e| Error::Classification(format!("invalid topic pattern: {}", e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { keywords, topics })
    }

    /// Number of distinct vocabulary terms present in `text`
    pub fn count_matches(&self, text: &str) -> usize {
        self.keywords.matches(text).iter().count()
    }

    /// Topic labels indicated by `text`, in table order
    pub fn topics(&self, text: &str) -> Vec<String> {
        self.topics
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(topic, _)| topic.to_string())
            .collect()
    }
}

// Only the leading edge is anchored so plurals and inflections still count.
fn bounded(term: &str) -> String {
    format!(r"(?i)\b{}", regex::escape(term))
}
