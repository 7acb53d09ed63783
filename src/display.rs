//! Console rendering of a result table

use crate::types::ResultTable;
use std::fmt;

/// Width each cell is centered in
pub const CELL_WIDTH: usize = 16;

const SEPARATOR: &str = " | ";
const RULE_WIDTH: usize = 189;
const MISSING: &str = ".";

/// Fixed-width view of a result table, framed by dashed rules
pub struct TableView<'a>(pub &'a ResultTable);

impl TableView<'_> {
    fn cell(f: &mut fmt::Formatter<'_>, value: impl fmt::Display) -> fmt::Result {
        write!(f, "{:^width$}{}", value, SEPARATOR, width = CELL_WIDTH)
    }

    fn rule(f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:-<width$}", "", width = RULE_WIDTH)
    }
}

impl fmt::Display for TableView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.0;

        Self::rule(f)?;
        for (category, _) in table.iter() {
            Self::cell(f, category)?;
        }
        writeln!(f)?;
        Self::rule(f)?;

        for index in 0..table.max_len() {
            for (_, values) in table.iter() {
                match values.get(index) {
                    Some(value) => Self::cell(f, value)?,
                    None => Self::cell(f, MISSING)?,
                }
            }
            writeln!(f)?;
        }
        Self::rule(f)
    }
}

/// Render `table` as a fixed-width text table framed by dashed rules.
pub fn render_table(table: &ResultTable) -> String {
    TableView(table).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, SeriesValue};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_layout() {
        let mut table = ResultTable::new();
        table.push(Category::InstOnset, SeriesValue::Seconds(1.5));
        table.push(Category::InstOnset, SeriesValue::Seconds(11.5));
        table.push(Category::Falses, SeriesValue::Seconds(3.0));

        let rendered = render_table(&table);
        let lines: Vec<&str> = rendered.lines().collect();

        // rule, header, rule, two rows, rule
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "-".repeat(RULE_WIDTH));
        assert_eq!(lines[2], lines[0]);
        assert_eq!(lines[5], lines[0]);

        assert!(lines[1].starts_with("   Inst Onset    | "));
        assert!(lines[3].starts_with("      1.5        |        .         | "));
        assert!(lines[3].ends_with("      3.0        | "));
        assert!(lines[4].ends_with("       .         | "));

        let cell_count = lines[1].matches(SEPARATOR).count();
        assert_eq!(cell_count, Category::ALL.len());
        assert_eq!(lines[1].len(), Category::ALL.len() * (CELL_WIDTH + SEPARATOR.len()));
    }

    #[test]
    fn test_table_view_matches_render() {
        let mut table = ResultTable::new();
        table.push(Category::NegIncongResp, SeriesValue::Text("812".into()));

        let rendered = format!("{}", TableView(&table));
        assert_eq!(rendered, render_table(&table));
        assert!(rendered.lines().nth(3).unwrap().contains("      812        | "));
    }

    #[test]
    fn test_render_empty_table() {
        let rendered = render_table(&ResultTable::new());
        assert_eq!(rendered.lines().count(), 4);
    }
}
