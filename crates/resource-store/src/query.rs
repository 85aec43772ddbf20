use serde_json::Value;

use crate::store::Row;

/// Builder for equality queries over a collection.
///
/// A row matches when every condition's column equals the given JSON
/// value. An absent column never matches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    /// Column/value pairs that must all match.
    pub conditions: Vec<(String, Value)>,

    /// Maximum number of rows to return.
    pub limit: Option<usize>,

    /// Number of matching rows to skip.
    pub offset: Option<usize>,
}

impl Filter {
    /// Creates a filter matching every row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality condition.
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((column.into(), value.into()));
        self
    }

    /// Limits the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips a number of results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if the row satisfies every condition.
    pub fn matches(&self, row: &Row) -> bool {
        self.conditions
            .iter()
            .all(|(column, expected)| row.get(column).is_some_and(|v| v == expected))
    }

    /// Conditions as a single JSON object, suitable for containment checks.
    pub fn as_object(&self) -> Row {
        self.conditions.iter().cloned().collect()
    }
}
