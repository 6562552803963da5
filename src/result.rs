//! Harvest result types.

use serde::{Deserialize, Serialize};

/// A single listing from a result page.
///
/// Fields missing from the markup are `None`; the item is still counted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultItem {
    /// 1-based rank across every page of the harvest.
    pub position: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ResultItem {
    /// Creates an item with no extracted fields.
    pub fn new(position: usize) -> Self {
        Self {
            position,
            title: None,
            description: None,
            url: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Successful end of a harvest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum SearchOutcome {
    /// Target mode: the first item whose URL matched.
    Found(ResultItem),
    /// Target mode: pagination ended without a match.
    NotFound,
    /// Collection mode: items in rank order, at most `max_results`.
    Collected(Vec<ResultItem>),
}

impl SearchOutcome {
    /// Returns the matched item in target mode.
    pub fn found(&self) -> Option<&ResultItem> {
        match self {
            SearchOutcome::Found(item) => Some(item),
            _ => None,
        }
    }

    /// Returns every item carried by the outcome.
    pub fn items(&self) -> &[ResultItem] {
        match self {
            SearchOutcome::Found(item) => std::slice::from_ref(item),
            SearchOutcome::NotFound => &[],
            SearchOutcome::Collected(items) => items,
        }
    }

    pub fn into_items(self) -> Vec<ResultItem> {
        match self {
            SearchOutcome::Found(item) => vec![item],
            SearchOutcome::NotFound => Vec::new(),
            SearchOutcome::Collected(items) => items,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, SearchOutcome::Found(_))
    }
}
