use std::collections::HashMap;

use crate::table::Value;

/// Tracks key values seen so far for unique-key enforcement.
///
/// Built once per validation pass. The first occurrence of a key value is
/// remembered with its row index; later occurrences are reported as
/// duplicates of that row, never the other way round.
pub struct UniqueTracker {
    /// Map from key columns to per-component value keys → first-seen row.
    constraints: HashMap<Vec<String>, HashMap<Vec<String>, usize>>,
}

impl UniqueTracker {
    pub fn new() -> Self {
        Self {
            constraints: HashMap::new(),
        }
    }

    /// Register a unique key to track.
    pub fn register_constraint(&mut self, columns: &[String]) {
        self.constraints.entry(columns.to_vec()).or_default();
    }

    /// Record a (possibly composite) key value seen at `row`.
    ///
    /// Returns `None` for a first occurrence and `Some(first_row)` for a
    /// duplicate. Keys with a missing component are not tracked: absence is a
    /// nullability concern, not a uniqueness one.
    pub fn observe(&mut self, columns: &[String], values: &[&Value], row: usize) -> Option<usize> {
        if values.iter().any(|v| v.is_missing()) {
            return None;
        }
        let seen = self.constraints.get_mut(columns)?;

        // One entry per component: no separator for a value to collide with.
        let value_key: Vec<String> = values.iter().map(|v| v.unique_key()).collect();

        match seen.get(&value_key) {
            Some(&first) => Some(first),
            None => {
                seen.insert(value_key, row);
                None
            }
        }
    }

    /// Number of distinct values tracked for a key.
    pub fn count(&self, columns: &[String]) -> usize {
        self.constraints
            .get(columns)
            .map(|s| s.len())
            .unwrap_or(0)
    }
}

impl Default for UniqueTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_tracking() {
        let mut tracker = UniqueTracker::new();
        let cols = vec!["customer_id".to_string()];
        tracker.register_constraint(&cols);

        let v1 = Value::Integer(1);
        assert_eq!(tracker.observe(&cols, &[&v1], 0), None);

        // Same value points back at the first row
        assert_eq!(tracker.observe(&cols, &[&v1], 3), Some(0));
        assert_eq!(tracker.observe(&cols, &[&v1], 5), Some(0));

        let v2 = Value::Integer(2);
        assert_eq!(tracker.observe(&cols, &[&v2], 6), None);
        assert_eq!(tracker.count(&cols), 2);
    }

    #[test]
    fn test_composite_unique() {
        let mut tracker = UniqueTracker::new();
        let cols = vec!["first_name".to_string(), "last_name".to_string()];
        tracker.register_constraint(&cols);

        let v1 = Value::Text("John".to_string());
        let v2 = Value::Text("Doe".to_string());
        assert_eq!(tracker.observe(&cols, &[&v1, &v2], 0), None);
        assert_eq!(tracker.observe(&cols, &[&v1, &v2], 1), Some(0));

        let v3 = Value::Text("Jane".to_string());
        assert_eq!(tracker.observe(&cols, &[&v3, &v2], 2), None);
    }

    #[test]
    fn test_composite_parts_containing_separators_stay_distinct() {
        let mut tracker = UniqueTracker::new();
        let cols = vec!["a".to_string(), "b".to_string()];
        tracker.register_constraint(&cols);

        let row0 = [Value::Text("x|s:y".into()), Value::Text("z".into())];
        let row1 = [Value::Text("x".into()), Value::Text("y|s:z".into())];
        assert_eq!(tracker.observe(&cols, &[&row0[0], &row0[1]], 0), None);
        assert_eq!(
            tracker.observe(&cols, &[&row1[0], &row1[1]], 1),
            None,
            "different component values must not collide"
        );
        assert_eq!(tracker.count(&cols), 2);
    }

    #[test]
    fn test_missing_component_is_not_tracked() {
        let mut tracker = UniqueTracker::new();
        let cols = vec!["customer_id".to_string()];
        tracker.register_constraint(&cols);

        assert_eq!(tracker.observe(&cols, &[&Value::Missing], 0), None);
        assert_eq!(tracker.observe(&cols, &[&Value::Missing], 1), None);
        assert_eq!(tracker.count(&cols), 0);
    }
}
