//! Sort specs, the header-click toggle rule, and the row comparator.

use crate::table::{cell_at, Cell};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    #[serde(rename = "by")]
    pub field: usize,
    #[serde(rename = "order")]
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn ascending(field: usize) -> Self {
        Self {
            field,
            direction: SortDirection::Asc,
        }
    }

    pub fn descending(field: usize) -> Self {
        Self {
            field,
            direction: SortDirection::Desc,
        }
    }

    /// Next spec after clicking `field`: a new field sorts ascending, the current
    /// ascending field flips to descending, anything else goes back to ascending.
    pub fn toggled(current: Option<SortSpec>, field: usize) -> Self {
        match current {
            Some(spec) if spec.field == field && spec.direction == SortDirection::Asc => {
                Self::descending(field)
            }
            _ => Self::ascending(field),
        }
    }
}

/// Numeric when both sides parse as numbers, string order otherwise.
pub fn compare_cells(a: &Cell, b: &Cell) -> Ordering {
    match (a.number(), b.number()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.raw().cmp(b.raw()),
    }
}

/// Stable sort of data rows by `spec`.
///
/// The mixed numeric/string comparison is not a total order, so this uses a plain
/// merge sort that tolerates inconsistent comparisons instead of `slice::sort_by`.
pub fn sort_rows<R: AsRef<[Cell]>>(rows: Vec<R>, spec: SortSpec) -> Vec<R> {
    merge_sort(rows, &|a: &R, b: &R| {
        let ordering = compare_cells(cell_at(a.as_ref(), spec.field), cell_at(b.as_ref(), spec.field));
        match spec.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    })
}

fn merge_sort<T>(mut items: Vec<T>, cmp: &impl Fn(&T, &T) -> Ordering) -> Vec<T> {
    if items.len() <= 1 {
        return items;
    }
    let right = items.split_off(items.len() / 2);
    let mut left = merge_sort(items, cmp).into_iter().peekable();
    let mut right = merge_sort(right, cmp).into_iter().peekable();
    let mut merged = Vec::with_capacity(left.len() + right.len());
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => cmp(r, l) == Ordering::Less,
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        let next = if take_right { right.next() } else { left.next() };
        merged.extend(next);
    }
    merged
}
