use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use crate::domain::issue::{Issue, OrderAssignment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderRejected {
    SameIndex(usize),
    OutOfRange { index: usize, len: usize },
}

impl fmt::Display for ReorderRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReorderRejected::SameIndex(index) => {
                write!(f, "position {} is already where it was dropped", index)
            }
            ReorderRejected::OutOfRange { index, len } => {
                write!(f, "position {} is outside the {} displayed row(s)", index, len)
            }
        }
    }
}

/// Moves the displayed row at `from` to `to` and returns the new `order` for
/// every issue in `raw`.
///
/// Issues missing from `displayed` (filtered out) are pinned after every
/// displayed issue and keep their mutual order by their existing `order`
/// value (missing values last, then their position in `raw`). Ranks are
/// 0-based and contiguous across the whole collection.
pub fn plan_reorder(
    displayed: &[Issue],
    raw: &[Issue],
    from: usize,
    to: usize,
) -> Result<Vec<OrderAssignment>, ReorderRejected> {
    let len = displayed.len();
    for index in [from, to] {
        if index >= len {
            return Err(ReorderRejected::OutOfRange { index, len });
        }
    }
    if from == to {
        return Err(ReorderRejected::SameIndex(from));
    }

    let mut reordered: Vec<&Issue> = displayed.iter().collect();
    let dragged = reordered.remove(from);
    reordered.insert(to, dragged);

    let ranks: HashMap<&str, usize> = reordered
        .iter()
        .enumerate()
        .map(|(rank, issue)| (issue.id.as_str(), rank))
        .collect();

    let mut full: Vec<&Issue> = raw.iter().collect();
    full.sort_by(|left, right| {
        match (ranks.get(left.id.as_str()), ranks.get(right.id.as_str())) {
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => compare_hidden(left.order, right.order),
        }
    });

    Ok(full
        .into_iter()
        .enumerate()
        .map(|(index, issue)| OrderAssignment {
            issue_id: issue.id.clone(),
            order: index as i64,
        })
        .collect())
}

fn compare_hidden(left: Option<i64>, right: Option<i64>) -> Ordering {
    match (left, right) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
