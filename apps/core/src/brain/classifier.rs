//! Category classification using keyword patterns.
//!
//! Case-insensitive substring matching, one pattern group per category,
//! checked in priority order. No model required - pure Rust regex matching.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

use super::category::Category;
use crate::error::AppError;

/// Anything that can route free text to a [`Category`].
///
/// Implementations must be total and pure: every input maps to exactly one
/// category and the same input always maps to the same one.
pub trait Classifier: Send + Sync + 'static {
    fn classify(&self, text: &str) -> Category;

    /// Whether `text` asks what the assistant can do rather than a topic question.
    fn is_help_request(&self, _text: &str) -> bool {
        false
    }
}

/// Result of category classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMatch {
    /// Selected category
    pub category: Category,
    /// The keyword that matched, lowercased; `None` on fallback
    pub matched_keyword: Option<String>,
    /// True when no keyword matched and the default category was used
    pub fallback: bool,
}

/// Keyword list for one category, as found in configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub category: Category,
    pub keywords: Vec<String>,
}

/// Pattern definition for category matching
#[derive(Clone)]
struct CategoryPattern {
    category: Category,
    pattern: Regex,
}

/// Built-in keyword table, in priority order.
const DEFAULT_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Marketing,
        &[
            "market",
            "campaign",
            "trend",
            "social",
            "brand",
            "engagement",
            "audience",
            "hashtag",
            "influencer",
            "content",
        ],
    ),
    (
        Category::Competitor,
        &["competitor", "competition", "rival", "benchmark"],
    ),
    (
        Category::Website,
        &[
            "website",
            "web site",
            "traffic",
            "seo",
            "landing page",
            "bounce",
            "pageview",
            "visitor",
        ],
    ),
    (
        Category::Sales,
        &[
            "sales",
            "revenue",
            "quarter",
            "customer",
            "deal",
            "pipeline",
            "retention",
            "churn",
        ],
    ),
];

// Compile patterns once at startup
// NOTE: expect() is acceptable here: the table is a compile-time constant of escaped literals
static DEFAULT_PATTERNS: LazyLock<Vec<CategoryPattern>> = LazyLock::new(|| {
    DEFAULT_KEYWORDS
        .iter()
        .map(|(category, keywords)| {
            compile_pattern(*category, keywords.iter().copied())
                .expect("Invalid regex: built-in keyword table")
        })
        .collect()
});

static HELP_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)help").expect("Invalid regex: help pattern"));

/// Builds one alternation of escaped keywords so matching stays plain substring search.
fn compile_pattern<'a>(
    category: Category,
    keywords: impl IntoIterator<Item = &'a str>,
) -> Result<CategoryPattern, AppError> {
    let mut alternatives = Vec::new();
    for keyword in keywords {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(AppError::Validation(format!(
                "Blank keyword for category '{}'",
                category
            )));
        }
        alternatives.push(regex::escape(keyword));
    }

    if alternatives.is_empty() {
        return Err(AppError::Validation(format!(
            "No keywords configured for category '{}'",
            category
        )));
    }

    let pattern = Regex::new(&format!("(?i)(?:{})", alternatives.join("|")))?;
    Ok(CategoryPattern { category, pattern })
}

/// Category classifier using keyword patterns
#[derive(Clone)]
pub struct KeywordClassifier {
    patterns: Vec<CategoryPattern>,
    default: Category,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordClassifier {
    /// Create a classifier with the built-in keyword table and `sales` as fallback
    pub fn new() -> Self {
        Self {
            patterns: DEFAULT_PATTERNS.clone(),
            default: Category::default(),
        }
    }

    /// Create a classifier from a custom keyword table.
    ///
    /// Rules are checked in the order given. A category may appear in several
    /// rules; a category with no rule can only be reached as the fallback.
    pub fn with_keywords(default: Category, rules: &[KeywordRule]) -> Result<Self, AppError> {
        let patterns = rules
            .iter()
            .map(|rule| compile_pattern(rule.category, rule.keywords.iter().map(String::as_str)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns, default })
    }

    /// Replace the fallback category, keeping the keyword table
    pub fn with_default(mut self, default: Category) -> Self {
        self.default = default;
        self
    }

    /// The category returned when nothing matches
    pub fn default_category(&self) -> Category {
        self.default
    }

    /// Classify a text and report which keyword decided it
    pub fn classify_detailed(&self, text: &str) -> CategoryMatch {
        for group in &self.patterns {
            if let Some(m) = group.pattern.find(text) {
                return CategoryMatch {
                    category: group.category,
                    matched_keyword: Some(m.as_str().to_lowercase()),
                    fallback: false,
                };
            }
        }

        CategoryMatch {
            category: self.default,
            matched_keyword: None,
            fallback: true,
        }
    }
}

impl Classifier for KeywordClassifier {
    fn classify(&self, text: &str) -> Category {
        let result = self.classify_detailed(text);
        debug!(
            category = %result.category,
            keyword = ?result.matched_keyword,
            fallback = result.fallback,
            "Classified message"
        );
        result.category
    }

    /// Topic keywords win over "help": only unmatched text can be a help request.
    fn is_help_request(&self, text: &str) -> bool {
        HELP_PATTERN.is_match(text) && self.classify_detailed(text).fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marketing_detection() {
        let classifier = KeywordClassifier::new();

        assert_eq!(classifier.classify("How is our marketing campaign performing?"), Category::Marketing);
        assert_eq!(classifier.classify("Any new TRENDS this week?"), Category::Marketing);
        assert_eq!(classifier.classify("market update"), Category::Marketing);
    }

    #[test]
    fn test_priority_order() {
        let classifier = KeywordClassifier::new();

        // marketing is checked before competitor
        let result = classifier.classify_detailed("What is our competitor's campaign doing?");
        assert_eq!(result.category, Category::Marketing);
        assert_eq!(result.matched_keyword.as_deref(), Some("campaign"));

        assert_eq!(classifier.classify("Show me competitor pricing"), Category::Competitor);
        assert_eq!(classifier.classify("website traffic and revenue"), Category::Website);
    }

    #[test]
    fn test_fallback_detection() {
        let classifier = KeywordClassifier::new();

        let result = classifier.classify_detailed("xyz");
        assert_eq!(result.category, Category::Sales);
        assert!(result.fallback);
        assert!(result.matched_keyword.is_none());

        assert_eq!(classifier.classify(""), Category::Sales);
        assert_eq!(classifier.classify("   "), Category::Sales);
    }

    #[test]
    fn test_help_request_detection() {
        let classifier = KeywordClassifier::new();

        assert!(classifier.is_help_request("help"));
        assert!(classifier.is_help_request("Can you HELP me?"));
        // a topic keyword takes precedence
        assert!(!classifier.is_help_request("help with our campaign"));
        assert!(!classifier.is_help_request("xyz"));
        // classification itself is unchanged
        assert_eq!(classifier.classify("help"), Category::Sales);
    }

    #[test]
    fn test_custom_keywords() {
        let rules = vec![KeywordRule {
            category: Category::Website,
            keywords: vec!["checkout".to_string(), "c++".to_string()],
        }];
        let classifier = KeywordClassifier::with_keywords(Category::Marketing, &rules).unwrap();

        assert_eq!(classifier.classify("Checkout is slow"), Category::Website);
        // metacharacters are matched literally
        assert_eq!(classifier.classify("we use C++"), Category::Website);
        assert_eq!(classifier.classify("sales are up"), Category::Marketing);
        assert_eq!(classifier.default_category(), Category::Marketing);
    }

    #[test]
    fn test_custom_keywords_reject_blank_entries() {
        let empty = vec![KeywordRule {
            category: Category::Sales,
            keywords: vec![],
        }];
        assert!(matches!(
            KeywordClassifier::with_keywords(Category::Sales, &empty),
            Err(AppError::Validation(_))
        ));

        let blank = vec![KeywordRule {
            category: Category::Sales,
            keywords: vec!["  ".to_string()],
        }];
        assert!(KeywordClassifier::with_keywords(Category::Sales, &blank).is_err());
    }
}
