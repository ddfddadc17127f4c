use std::error::Error;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    pub label: String,
    #[serde(rename = "isVisible")]
    pub visible: bool,
}

impl Column {
    fn new(id: &str, label: &str, visible: bool) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            visible,
        }
    }
}

const DEFAULT_LAYOUT: [(&str, &str, bool); 12] = [
    ("deviationNo", "#", true),
    ("title", "Title", true),
    ("author", "Created by", false),
    ("priority", "Priority", true),
    ("status", "Progress", true),
    ("assignedTo", "Assigned To", true),
    ("problemDescription", "Problem", false),
    ("solutionDescription", "Solution", false),
    ("technology", "Technology", false),
    ("dueDate", "Due", false),
    ("dueIn", "Due In", true),
    ("createdAt", "Created", false),
];

pub fn default_columns() -> Vec<Column> {
    DEFAULT_LAYOUT
        .iter()
        .map(|(id, label, visible)| Column::new(id, label, *visible))
        .collect()
}

pub fn visible_columns(columns: &[Column]) -> Vec<&Column> {
    columns.iter().filter(|column| column.visible).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnMoveRejected {
    OutOfRange { index: usize, len: usize },
    UnknownColumn(String),
}

impl fmt::Display for ColumnMoveRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnMoveRejected::OutOfRange { index, len } => write!(
                f,
                "column position {} is outside the {} visible column(s)",
                index, len
            ),
            ColumnMoveRejected::UnknownColumn(id) => write!(f, "unknown column '{}'", id),
        }
    }
}

impl Error for ColumnMoveRejected {}

/// Moves a column using positions among the visible columns only. The
/// dragged column is re-inserted directly before the drop target in the full
/// layout, so hidden columns keep their slots. Returns `false` when the
/// positions are equal.
pub fn move_visible_column(
    columns: &mut Vec<Column>,
    from: usize,
    to: usize,
) -> Result<bool, ColumnMoveRejected> {
    let (dragged_id, target_id) = {
        let visible = visible_columns(columns);
        let len = visible.len();
        for index in [from, to] {
            if index >= len {
                tracing::warn!(index, len, "column move outside visible columns");
                return Err(ColumnMoveRejected::OutOfRange { index, len });
            }
        }
        if from == to {
            return Ok(false);
        }
        (visible[from].id.clone(), visible[to].id.clone())
    };

    let Some(dragged_index) = columns.iter().position(|column| column.id == dragged_id) else {
        tracing::warn!(column = %dragged_id, "dragged column not found in layout");
        return Err(ColumnMoveRejected::UnknownColumn(dragged_id));
    };
    let dragged = columns.remove(dragged_index);
    let Some(target_index) = columns.iter().position(|column| column.id == target_id) else {
        tracing::warn!(column = %target_id, "drop target column not found in layout");
        columns.insert(dragged_index, dragged);
        return Err(ColumnMoveRejected::UnknownColumn(target_id));
    };
    columns.insert(target_index, dragged);
    tracing::debug!(column = %dragged_id, from, to, "moved column");
    Ok(true)
}

/// Flips visibility of one column and returns the new state.
pub fn toggle_column(columns: &mut [Column], id: &str) -> Result<bool, ColumnMoveRejected> {
    let column = columns
        .iter_mut()
        .find(|column| column.id == id)
        .ok_or_else(|| ColumnMoveRejected::UnknownColumn(id.to_string()))?;
    column.visible = !column.visible;
    Ok(column.visible)
}
