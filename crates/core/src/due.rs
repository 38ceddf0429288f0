//! Selection of items that are due for review.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::model::ReviewItem;

/// Urgency order: never-reviewed items first (oldest first), then reviewed
/// items by how long ago they became due. Ties fall back to the id so the
/// order is total.
fn by_urgency(a: &ReviewItem, b: &ReviewItem) -> Ordering {
    match (a.is_new(), b.is_new()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a
            .next_review()
            .cmp(&b.next_review())
            .then_with(|| a.id().cmp(b.id())),
    }
}

/// Borrowing variant of [`get_items_due_for_review`].
#[must_use]
pub fn due_items(items: &[ReviewItem], limit: usize, now: DateTime<Utc>) -> Vec<&ReviewItem> {
    let mut due: Vec<&ReviewItem> = items.iter().filter(|item| item.is_due(now)).collect();
    due.sort_by(|a, b| by_urgency(a, b));
    due.truncate(limit);
    due
}

/// Items whose next review is at or before `now`, most urgent first, at most
/// `limit` of them.
///
/// Returns an empty vector when nothing is due.
///
/// ```
/// # use vocab_core::due::get_items_due_for_review;
/// # use vocab_core::time::fixed_now;
/// assert!(get_items_due_for_review(&[], 10, fixed_now()).is_empty());
/// ```
#[must_use]
pub fn get_items_due_for_review(
    items: &[ReviewItem],
    limit: usize,
    now: DateTime<Utc>,
) -> Vec<ReviewItem> {
    due_items(items, limit, now).into_iter().cloned().collect()
}

/// Number of due items, without a cap.
#[must_use]
pub fn count_due(items: &[ReviewItem], now: DateTime<Utc>) -> usize {
    items.iter().filter(|item| item.is_due(now)).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemId;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn new_item(id: &str, created_days_ago: i64) -> ReviewItem {
        ReviewItem::new(
            ItemId::new(id).unwrap(),
            id,
            "def",
            fixed_now() - Duration::days(created_days_ago),
        )
    }

    /// Reviewed item whose next review lies `due_in_days` from now (negative = overdue).
    fn reviewed_item(id: &str, due_in_days: i64) -> ReviewItem {
        let interval = 6_u32;
        let last = fixed_now() + Duration::days(due_in_days) - Duration::days(6);
        ReviewItem::from_persisted(
            ItemId::new(id).unwrap(),
            id.into(),
            "def".into(),
            2.5,
            interval,
            2,
            0,
            last - Duration::days(30),
            Some(last),
        )
    }

    #[test]
    fn empty_input_yields_empty_output() {
        for limit in [0, 1, 50] {
            assert!(get_items_due_for_review(&[], limit, fixed_now()).is_empty());
        }
    }

    #[test]
    fn never_reviewed_items_come_first_then_most_overdue() {
        let items = vec![
            reviewed_item("overdue-1d", -1),
            reviewed_item("future-1", 3),
            new_item("new-a", 2),
            reviewed_item("future-2", 10),
            reviewed_item("overdue-5d", -5),
            reviewed_item("future-3", 1),
            new_item("new-b", 1),
            reviewed_item("overdue-3d", -3),
            reviewed_item("future-4", 30),
            reviewed_item("future-5", 2),
        ];

        let due = get_items_due_for_review(&items, 3, fixed_now());
        let ids: Vec<&str> = due.iter().map(|i| i.id().as_str()).collect();
        assert_eq!(ids, vec!["new-a", "new-b", "overdue-5d"]);

        let all = get_items_due_for_review(&items, usize::MAX, fixed_now());
        let ids: Vec<&str> = all.iter().map(|i| i.id().as_str()).collect();
        assert_eq!(
            ids,
            vec!["new-a", "new-b", "overdue-5d", "overdue-3d", "overdue-1d"]
        );
        assert_eq!(count_due(&items, fixed_now()), 5);
    }

    #[test]
    fn item_due_exactly_now_is_included() {
        let items = vec![reviewed_item("edge", 0)];
        assert_eq!(get_items_due_for_review(&items, 5, fixed_now()).len(), 1);
    }

    #[test]
    fn returns_fewer_than_limit_when_few_are_due() {
        let items = vec![new_item("a", 0), reviewed_item("b", 4)];
        let due = get_items_due_for_review(&items, 10, fixed_now());
        assert_eq!(due.len(), 1);
    }

    #[test]
    fn zero_limit_returns_nothing() {
        let items = vec![new_item("a", 0)];
        assert!(get_items_due_for_review(&items, 0, fixed_now()).is_empty());
    }

    #[test]
    fn selection_is_deterministic_and_non_mutating() {
        let items = vec![
            reviewed_item("b", -2),
            reviewed_item("a", -2),
            new_item("c", 0),
        ];
        let snapshot = items.clone();
        let first = get_items_due_for_review(&items, 10, fixed_now());
        let second = get_items_due_for_review(&items, 10, fixed_now());
        assert_eq!(first, second);
        assert_eq!(items, snapshot);
        // equal due dates tie-break by id
        assert_eq!(first[1].id().as_str(), "a");
        assert_eq!(first[2].id().as_str(), "b");
    }
}
