//! Category reconciliation: the minimal link diff between what a book has and
//! what the caller asked for.

use std::collections::BTreeSet;

use crate::{
    error::{AppError, AppResult},
    models::{BookCategoryLink, BookId, CategoryId},
    repository::LinkChanges,
};

/// Compute the link changes that move `current` to exactly `requested`.
///
/// `requested` must already be resolved against the store. Links whose
/// category is in both sets are reported as unchanged and left alone, so a
/// second run with the same target yields an empty change set.
pub fn reconcile(
    book_id: BookId,
    current: &[BookCategoryLink],
    requested: &BTreeSet<CategoryId>,
) -> AppResult<LinkChanges> {
    if current.is_empty() {
        return Err(AppError::BookCategoryNotFound(book_id));
    }

    let current_ids: BTreeSet<CategoryId> = current.iter().map(|l| l.category_id).collect();
    let common: BTreeSet<CategoryId> = current_ids.intersection(requested).copied().collect();

    let to_delete = current
        .iter()
        .filter(|link| !common.contains(&link.category_id))
        .cloned()
        .collect();

    let to_insert = requested
        .iter()
        .filter(|id| !common.contains(id))
        .copied()
        .collect();

    Ok(LinkChanges {
        to_delete,
        to_insert,
        unchanged: common.into_iter().collect(),
    })
}
