//! Schema difference between two descriptors of one table

use serde::Serialize;

use super::{StoreError, StoreResult};
use crate::models::{ForeignKeyConstraint, TableDescriptor};

/// Changes needed to turn one descriptor of a table into another
///
/// Only foreign-key changes are representable. Column changes are rejected
/// when the diff is computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDiff {
    /// Table being altered
    pub table: String,
    /// Constraints present only in the target descriptor
    pub added_foreign_keys: Vec<ForeignKeyConstraint>,
    /// Constraints present only in the source descriptor
    pub dropped_foreign_keys: Vec<ForeignKeyConstraint>,
}

impl TableDiff {
    /// Diff `before` against `after`; `None` when they are equivalent
    ///
    /// # Errors
    ///
    /// [`StoreError::UnsupportedAlteration`] when the descriptors name different
    /// tables or their columns differ.
    pub fn between(before: &TableDescriptor, after: &TableDescriptor) -> StoreResult<Option<Self>> {
        if before.name() != after.name() {
            return Err(StoreError::UnsupportedAlteration(format!(
                "cannot diff table '{}' against '{}'",
                before.name(),
                after.name()
            )));
        }
        if before.columns() != after.columns() {
            return Err(StoreError::UnsupportedAlteration(format!(
                "column changes on table '{}' are not supported",
                before.name()
            )));
        }

        let added_foreign_keys: Vec<_> = after
            .foreign_keys()
            .iter()
            .filter(|fk| !before.foreign_keys().iter().any(|b| b.same_reference(fk)))
            .cloned()
            .collect();
        let dropped_foreign_keys: Vec<_> = before
            .foreign_keys()
            .iter()
            .filter(|fk| !after.foreign_keys().iter().any(|a| a.same_reference(fk)))
            .cloned()
            .collect();

        let diff = Self {
            table: before.name().to_string(),
            added_foreign_keys,
            dropped_foreign_keys,
        };
        Ok(if diff.is_empty() { None } else { Some(diff) })
    }

    /// Whether the diff changes nothing
    pub fn is_empty(&self) -> bool {
        self.added_foreign_keys.is_empty() && self.dropped_foreign_keys.is_empty()
    }

    /// Foreign keys of `current` after applying this diff
    pub fn apply_to(&self, current: &TableDescriptor) -> Vec<ForeignKeyConstraint> {
        let mut foreign_keys: Vec<_> = current
            .foreign_keys()
            .iter()
            .filter(|fk| !self.dropped_foreign_keys.iter().any(|d| d.same_reference(fk)))
            .cloned()
            .collect();
        for added in &self.added_foreign_keys {
            if !foreign_keys.iter().any(|fk| fk.same_reference(added)) {
                foreign_keys.push(added.clone());
            }
        }
        foreign_keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnSpec, StorageType};

    fn bar() -> TableDescriptor {
        TableDescriptor::new(
            "bar",
            vec![
                ColumnSpec::primary_key(),
                ColumnSpec::nullable("foo", StorageType::Integer),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_identical_descriptors_have_no_diff() {
        assert_eq!(TableDiff::between(&bar(), &bar()).unwrap(), None);
    }

    #[test]
    fn test_added_foreign_key() {
        let fk = ForeignKeyConstraint::to_primary_key("bar", "foo", "foo");
        let linked = bar().with_foreign_key(fk.clone()).unwrap();

        let diff = TableDiff::between(&bar(), &linked).unwrap().unwrap();
        assert_eq!(diff.added_foreign_keys, vec![fk.clone()]);
        assert!(diff.dropped_foreign_keys.is_empty());
        assert_eq!(diff.apply_to(&bar()), vec![fk]);

        let reverse = TableDiff::between(&linked, &bar()).unwrap().unwrap();
        assert_eq!(reverse.dropped_foreign_keys.len(), 1);
        assert!(reverse.apply_to(&linked).is_empty());
    }

    #[test]
    fn test_column_changes_are_rejected() {
        let wider = TableDescriptor::new(
            "bar",
            vec![
                ColumnSpec::primary_key(),
                ColumnSpec::nullable("foo", StorageType::BigInt),
            ],
        )
        .unwrap();
        assert!(matches!(
            TableDiff::between(&bar(), &wider),
            Err(StoreError::UnsupportedAlteration(_))
        ));
    }
}
