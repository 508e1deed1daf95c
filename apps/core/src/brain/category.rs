//! Topic categories used to pick canned responses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Topic bucket a user message is routed to.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Campaigns, social, brand and audience engagement
    Marketing,
    /// Competitor activity and benchmarking
    Competitor,
    /// Site traffic, SEO and on-page behaviour
    Website,
    /// Revenue, customers and pipeline (declared default)
    #[default]
    Sales,
}

impl Category {
    /// Number of categories.
    pub const COUNT: usize = 4;

    /// Every category, in the order the response bank stores them.
    pub const ALL: [Category; Category::COUNT] = [
        Category::Marketing,
        Category::Competitor,
        Category::Website,
        Category::Sales,
    ];

    /// Returns a human-readable label for the category
    pub fn label(&self) -> &'static str {
        match self {
            Category::Marketing => "marketing",
            Category::Competitor => "competitor",
            Category::Website => "website",
            Category::Sales => "sales",
        }
    }

    /// Position of the category in [`Category::ALL`].
    pub(crate) fn index(&self) -> usize {
        match self {
            Category::Marketing => 0,
            Category::Competitor => 1,
            Category::Website => 2,
            Category::Sales => 3,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Category {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::Validation(format!("Unknown category: {}", s)))
    }
}
