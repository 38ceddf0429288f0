use chrono::{DateTime, Utc};
use rand::rng;
use rand::seq::SliceRandom;

use vocab_core::due::due_items;
use vocab_core::model::ReviewItem;

/// Items picked for one drill, in presentation order.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPlan {
    pub items: Vec<ReviewItem>,
    pub new_selected: usize,
    pub due_selected: usize,
}

impl SessionPlan {
    /// Pick up to `limit` due items, most urgent first.
    ///
    /// With `shuffle_new`, the never-reviewed items (which always lead the
    /// urgency order) are shuffled before the cut, so large backlogs of new
    /// terms are introduced in random order. Reviewed items keep their order.
    #[must_use]
    pub fn build(
        items: &[ReviewItem],
        limit: usize,
        now: DateTime<Utc>,
        shuffle_new: bool,
    ) -> Self {
        let mut selected: Vec<ReviewItem> = due_items(items, usize::MAX, now)
            .into_iter()
            .cloned()
            .collect();

        if shuffle_new {
            let new_count = selected.iter().take_while(|i| i.is_new()).count();
            selected[..new_count].shuffle(&mut rng());
        }
        selected.truncate(limit);

        let new_selected = selected.iter().filter(|i| i.is_new()).count();
        let due_selected = selected.len() - new_selected;
        Self {
            items: selected,
            new_selected,
            due_selected,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
