//! Column resolution
//!
//! Maps the textual header of a raw log to positional indices using a fixed
//! dictionary of expected column names. The dictionary has a scalar part and
//! four per-block column families (`Con_<n>`, `Incon_<n>`, `InstCon_<n>`,
//! `InstIncon_<n>`).

use crate::error::ExtractError;
use crate::types::Congruency;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Scalar columns every log carries once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StaticColumn {
    Correct,
    Image,
    ExperimentType,
    ResponseTime,
    ResponseTimeMriTrigger,
    TimeMriTrigger,
}

/// Fixed dictionary of scalar columns and their header names
pub const STATIC_COLUMNS: [(StaticColumn, &str); 6] = [
    (StaticColumn::Correct, "Correct"),
    (StaticColumn::Image, "Image"),
    (StaticColumn::ExperimentType, "ExperimentType"),
    (StaticColumn::ResponseTime, "ResponseTime"),
    (StaticColumn::ResponseTimeMriTrigger, "ResponseTimeMriTrigger"),
    (StaticColumn::TimeMriTrigger, "TimeMriTrigger"),
];

/// Per-block column families: (condition, instructional, header prefix)
pub const BLOCK_FAMILIES: [(Congruency, bool, &str); 4] = [
    (Congruency::Congruent, false, "Con_"),
    (Congruency::Incongruent, false, "Incon_"),
    (Congruency::Congruent, true, "InstCon_"),
    (Congruency::Incongruent, true, "InstIncon_"),
];

impl StaticColumn {
    pub fn column_name(&self) -> &'static str {
        STATIC_COLUMNS
            .iter()
            .find(|(column, _)| column == self)
            .map(|(_, name)| *name)
            .unwrap_or_default()
    }
}

/// Logical label of a column the extraction reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColumnLabel {
    Static(StaticColumn),
    /// Onset column of one condition in one block. `instructional` selects the
    /// instruction-screen onset instead of the stimulus onset.
    Block {
        condition: Congruency,
        instructional: bool,
        block: u32,
    },
}

impl ColumnLabel {
    /// Header name this label is expected under
    pub fn column_name(&self) -> String {
        match self {
            ColumnLabel::Static(column) => column.column_name().to_string(),
            ColumnLabel::Block {
                condition,
                instructional,
                block,
            } => {
                let prefix = BLOCK_FAMILIES
                    .iter()
                    .find(|(c, i, _)| c == condition && i == instructional)
                    .map(|(_, _, prefix)| *prefix)
                    .unwrap_or_default();
                format!("{}{}", prefix, block)
            }
        }
    }

    /// Look a header name up in the dictionary.
    ///
    /// Block columns only match their canonical spelling: `Con_3` is a block
    /// column, `Con_03` and `Con_0` are not.
    pub fn from_column_name(name: &str) -> Option<Self> {
        if let Some((column, _)) = STATIC_COLUMNS.iter().find(|(_, n)| *n == name) {
            return Some(ColumnLabel::Static(*column));
        }

        BLOCK_FAMILIES
            .iter()
            .find_map(|(condition, instructional, prefix)| {
                let suffix = name.strip_prefix(*prefix)?;
                let block: u32 = suffix.parse().ok()?;
                (block >= 1 && block.to_string() == suffix).then_some(ColumnLabel::Block {
                    condition: *condition,
                    instructional: *instructional,
                    block,
                })
            })
    }
}

impl From<StaticColumn> for ColumnLabel {
    fn from(column: StaticColumn) -> Self {
        ColumnLabel::Static(column)
    }
}

impl fmt::Display for ColumnLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.column_name())
    }
}

impl Serialize for ColumnLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.column_name())
    }
}

/// Positions of the dictionary columns found in one header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnIndexMap {
    indices: HashMap<ColumnLabel, usize>,
}

impl ColumnIndexMap {
    /// Resolve a header row. Later duplicates overwrite earlier ones; names
    /// outside the dictionary are ignored.
    pub fn resolve<S: AsRef<str>>(header: &[S]) -> Self {
        tracing::debug!(columns = header.len(), "resolving column indices");

        let mut indices = HashMap::new();
        for (position, name) in header.iter().enumerate() {
            if let Some(label) = ColumnLabel::from_column_name(name.as_ref()) {
                indices.insert(label, position);
            }
        }

        Self { indices }
    }

    pub fn get(&self, label: impl Into<ColumnLabel>) -> Option<usize> {
        self.indices.get(&label.into()).copied()
    }

    pub fn contains(&self, label: impl Into<ColumnLabel>) -> bool {
        self.indices.contains_key(&label.into())
    }

    /// Position of a label that must be present
    pub fn require(&self, label: impl Into<ColumnLabel>) -> Result<usize, ExtractError> {
        let label = label.into();
        self.indices
            .get(&label)
            .copied()
            .ok_or_else(|| ExtractError::MissingColumn(label.column_name()))
    }

    /// Cell of `row` under `label`; `row_index` is only used for error reporting
    pub fn cell<'a, S: AsRef<str>>(
        &self,
        row: &'a [S],
        row_index: usize,
        label: impl Into<ColumnLabel>,
    ) -> Result<&'a str, ExtractError> {
        let label = label.into();
        let position = self.require(label)?;
        row.get(position)
            .map(AsRef::as_ref)
            .ok_or_else(|| ExtractError::MissingCell {
                row: row_index,
                label: label.column_name(),
                position,
            })
    }

    /// Scalar columns absent from the header
    pub fn missing_static(&self) -> Vec<StaticColumn> {
        STATIC_COLUMNS
            .iter()
            .map(|(column, _)| *column)
            .filter(|column| !self.contains(*column))
            .collect()
    }

    /// Highest block number with at least one resolved column
    pub fn max_block(&self) -> Option<u32> {
        self.indices
            .keys()
            .filter_map(|label| match label {
                ColumnLabel::Block { block, .. } => Some(*block),
                ColumnLabel::Static(_) => None,
            })
            .max()
    }

    /// Resolved labels ordered by header position
    pub fn entries(&self) -> Vec<(ColumnLabel, usize)> {
        let mut entries: Vec<(ColumnLabel, usize)> =
            self.indices.iter().map(|(l, p)| (*l, *p)).collect();
        entries.sort_by_key(|(label, position)| (*position, *label));
        entries
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn con(block: u32) -> ColumnLabel {
        ColumnLabel::Block {
            condition: Congruency::Congruent,
            instructional: false,
            block,
        }
    }

    #[test]
    fn test_resolves_present_columns() {
        let header = ["Subject", "Correct", "Image", "Con_1", "InstIncon_2"];
        let map = ColumnIndexMap::resolve(&header);

        assert_eq!(map.get(StaticColumn::Correct), Some(1));
        assert_eq!(map.get(StaticColumn::Image), Some(2));
        assert_eq!(map.get(con(1)), Some(3));
        assert_eq!(
            map.get(ColumnLabel::Block {
                condition: Congruency::Incongruent,
                instructional: true,
                block: 2,
            }),
            Some(4)
        );
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn test_absent_columns_are_omitted() {
        let map = ColumnIndexMap::resolve(&["Correct", "Image"]);

        assert_eq!(map.get(StaticColumn::ResponseTime), None);
        assert_eq!(map.get(con(1)), None);
        assert_eq!(
            map.missing_static(),
            vec![
                StaticColumn::ExperimentType,
                StaticColumn::ResponseTime,
                StaticColumn::ResponseTimeMriTrigger,
                StaticColumn::TimeMriTrigger,
            ]
        );
    }

    #[test]
    fn test_last_duplicate_wins() {
        let map = ColumnIndexMap::resolve(&["Correct", "Image", "Correct"]);
        assert_eq!(map.get(StaticColumn::Correct), Some(2));
    }

    #[test]
    fn test_block_names_must_be_canonical() {
        assert_eq!(ColumnLabel::from_column_name("Con_12"), Some(con(12)));
        assert_eq!(ColumnLabel::from_column_name("Con_012"), None);
        assert_eq!(ColumnLabel::from_column_name("Con_0"), None);
        assert_eq!(ColumnLabel::from_column_name("Con_"), None);
        assert_eq!(ColumnLabel::from_column_name("Con_+1"), None);
        assert_eq!(ColumnLabel::from_column_name("con_1"), None);
    }

    #[test]
    fn test_column_names_round_trip() {
        for name in ["Correct", "TimeMriTrigger", "Con_1", "Incon_4", "InstCon_2", "InstIncon_10"] {
            let label = ColumnLabel::from_column_name(name).unwrap();
            assert_eq!(label.column_name(), name);
        }
    }

    #[test]
    fn test_require_missing_column() {
        let map = ColumnIndexMap::resolve(&["Correct"]);
        let err = map.require(con(3)).unwrap_err();
        assert!(matches!(err, ExtractError::MissingColumn(ref name) if name == "Con_3"));
    }

    #[test]
    fn test_cell_on_short_row() {
        let map = ColumnIndexMap::resolve(&["Image", "Correct"]);
        let row = vec!["pos_01.jpg".to_string()];

        assert_eq!(map.cell(&row, 4, StaticColumn::Image).unwrap(), "pos_01.jpg");
        assert!(matches!(
            map.cell(&row, 4, StaticColumn::Correct),
            Err(ExtractError::MissingCell { row: 4, position: 1, .. })
        ));
    }

    #[test]
    fn test_entries_and_max_block() {
        let map = ColumnIndexMap::resolve(&["Incon_2", "Correct", "Con_1"]);
        let names: Vec<String> = map.entries().iter().map(|(l, _)| l.column_name()).collect();

        assert_eq!(names, vec!["Incon_2", "Correct", "Con_1"]);
        assert_eq!(map.max_block(), Some(2));
    }
}
