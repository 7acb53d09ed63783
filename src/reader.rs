//! Raw log reader
//!
//! Parses a comma-separated AAT log into rows of string cells. The header is
//! returned as row 0; interpreting it is left to the column resolver.
//!
//! Blank lines are kept as empty rows so that every row sits at the same index
//! as its line in the log. Trial indices drive the rotation phase and block
//! number, and the final row of a log is never classified, so a trailing blank
//! line must still occupy a row.

use crate::error::ExtractError;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const QUOTE: u8 = b'"';
const DELIMITER: u8 = b',';

/// Read every row of a CSV log, header included.
///
/// Rows may differ in length. A blank line yields an empty row.
pub fn read_log<R: Read>(mut reader: R) -> Result<Vec<Vec<String>>, ExtractError> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;

    let mut builder = csv::ReaderBuilder::new();
    builder.has_headers(false).flexible(true);

    let mut rows = Vec::new();
    for line in record_lines(&text) {
        if line.trim_end_matches('\r').is_empty() {
            rows.push(Vec::new());
            continue;
        }

        let row: Vec<String> = match builder.from_reader(line.as_bytes()).records().next() {
            Some(record) => record?.iter().map(str::to_string).collect(),
            None => Vec::new(),
        };
        rows.push(row);
    }

    tracing::trace!(rows = rows.len(), "parsed log");
    Ok(rows)
}

/// Split `text` into the source lines of its records. Line breaks inside a
/// quoted field belong to the field.
fn record_lines(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut field_start = true;
    let mut i = 0;

    while i < bytes.len() {
        let byte = bytes[i];
        if in_quotes {
            if byte == QUOTE {
                if bytes.get(i + 1) == Some(&QUOTE) {
                    i += 1;
                } else {
                    in_quotes = false;
                }
            }
            field_start = false;
        } else if byte == b'\n' {
            lines.push(&text[start..i]);
            start = i + 1;
            field_start = true;
        } else if byte == DELIMITER {
            field_start = true;
        } else {
            in_quotes = byte == QUOTE && field_start;
            field_start = false;
        }
        i += 1;
    }

    if start < bytes.len() {
        lines.push(&text[start..]);
    }
    lines
}

/// Read a CSV log from disk
pub fn read_log_file(path: impl AsRef<Path>) -> Result<Vec<Vec<String>>, ExtractError> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "reading log");
    let file = File::open(path)?;
    read_log(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reads_header_and_rows() {
        let input = "Correct,Image,ExperimentType\n1,pos_01.jpg,AAT_con\n0,neg_02.jpg,AAT_con\n";
        let rows = read_log(input.as_bytes()).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec!["Correct", "Image", "ExperimentType"]);
        assert_eq!(rows[2], vec!["0", "neg_02.jpg", "AAT_con"]);
    }

    #[test]
    fn test_ragged_rows_and_quotes() {
        let input = "A,B,C\n1,\"x, y\"\n2,3,4,5\n";
        let rows = read_log(input.as_bytes()).unwrap();

        assert_eq!(rows[1], vec!["1", "x, y"]);
        assert_eq!(rows[2].len(), 4);
    }

    #[test]
    fn test_blank_lines_are_empty_rows() {
        let input = "A,B\n1,2\n\n3,4\r\n\r\n";
        let rows = read_log(input.as_bytes()).unwrap();

        assert_eq!(rows.len(), 5);
        assert_eq!(rows[1], vec!["1", "2"]);
        assert!(rows[2].is_empty());
        assert_eq!(rows[3], vec!["3", "4"]);
        assert!(rows[4].is_empty());
    }

    #[test]
    fn test_line_break_inside_quotes() {
        let input = "A,B\n\"multi\nline\",2\n\"say \"\"hi\"\"\n\",3\nab\"c,4\n";
        let rows = read_log(input.as_bytes()).unwrap();

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1], vec!["multi\nline", "2"]);
        assert_eq!(rows[2], vec!["say \"hi\"\n", "3"]);
        assert_eq!(rows[3], vec!["ab\"c", "4"]);
    }

    #[test]
    fn test_no_final_newline() {
        let rows = read_log("A,B\n1,2".as_bytes()).unwrap();
        assert_eq!(rows, vec![vec!["A", "B"], vec!["1", "2"]]);
    }

    #[test]
    fn test_empty_input() {
        assert!(read_log("".as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_file() {
        let err = read_log_file("/nonexistent/aat/log.csv").unwrap_err();
        assert!(matches!(err, ExtractError::Io(_)));
    }
}
