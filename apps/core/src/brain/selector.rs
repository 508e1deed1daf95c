//! Round-robin response selection.

use std::sync::Arc;

use super::category::Category;
use crate::bank::{RecommendationEntry, ResponseBank};

/// One entry from each sequence of a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedResponse<'a> {
    pub category: Category,
    /// The cursor value the entries were picked with
    pub index: usize,
    pub trend: &'a str,
    pub insight: &'a str,
    pub recommendation: &'a RecommendationEntry,
}

/// Picks responses from a shared [`ResponseBank`] by `index mod len`.
///
/// Each sequence wraps independently, so sequences of different lengths
/// cycle at their own period.
#[derive(Debug, Clone)]
pub struct ResponseSelector {
    bank: Arc<ResponseBank>,
}

impl ResponseSelector {
    pub fn new(bank: Arc<ResponseBank>) -> Self {
        Self { bank }
    }

    pub fn bank(&self) -> &ResponseBank {
        &self.bank
    }

    pub fn select(&self, category: Category, index: usize) -> SelectedResponse<'_> {
        let responses = self.bank.responses(category);
        // sequences are non-empty, checked when the bank was built
        SelectedResponse {
            category,
            index,
            trend: &responses.trends[index % responses.trends.len()],
            insight: &responses.insights[index % responses.insights.len()],
            recommendation: &responses.recommendations[index % responses.recommendations.len()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector() -> ResponseSelector {
        ResponseSelector::new(Arc::new(ResponseBank::builtin()))
    }

    #[test]
    fn test_round_robin_wraps() {
        let selector = selector();
        for category in Category::ALL {
            let len = selector.bank().responses(category).trends.len();
            for i in 0..len {
                let a = selector.select(category, i);
                let b = selector.select(category, i + len);
                assert_eq!(a.trend, b.trend);
            }
        }
    }

    #[test]
    fn test_consecutive_indices_advance() {
        let selector = selector();
        let first = selector.select(Category::Marketing, 0);
        let second = selector.select(Category::Marketing, 1);

        assert_eq!(first.trend, "Social media engagement has grown 78% month-over-month");
        assert_ne!(first.trend, second.trend);
        assert_ne!(first.insight, second.insight);
        assert_ne!(first.recommendation, second.recommendation);
    }
}
