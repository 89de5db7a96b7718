use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::types::{ArticleSummary, Cursor};

/// Items loaded so far plus the pagination cursor.
///
/// `cursor` is the only signal for further pages: `None` means the listing
/// is exhausted no matter how many items or pages have been seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleListingState {
    pub items: Vec<ArticleSummary>,
    pub cursor: Option<Cursor>,
    pub page_index: u32,
}

impl ArticleListingState {
    pub fn first_page(items: Vec<ArticleSummary>, cursor: Option<Cursor>) -> Self {
        Self {
            items,
            cursor,
            page_index: 1,
        }
    }

    pub fn has_more(&self) -> bool {
        self.cursor.is_some()
    }

    /// Appends a fetched page and advances the cursor. Uids already present
    /// are skipped; returns how many items were actually appended.
    pub(crate) fn merge_page(&mut self, page: Vec<ArticleSummary>, next: Option<Cursor>) -> usize {
        let mut seen: HashSet<String> = self.items.iter().map(|a| a.uid.clone()).collect();
        let before = self.items.len();

        for summary in page {
            if seen.insert(summary.uid.clone()) {
                self.items.push(summary);
            } else {
                tracing::warn!("Dropping duplicate article {} from page {}", summary.uid, self.page_index + 1);
            }
        }

        self.cursor = next;
        self.page_index += 1;
        self.items.len() - before
    }
}
