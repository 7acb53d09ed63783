//! Core types for AAT Extract
//!
//! This module defines the data structures that flow through the extraction:
//! trial conditions, derived trial properties, and the per-file result table.

use crate::columns::ColumnLabel;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Stimulus valence, read from the image file name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Valence {
    Positive,
    Negative,
}

/// Trial congruency condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Congruency {
    Congruent,
    Incongruent,
}

impl Congruency {
    pub fn flipped(self) -> Self {
        match self {
            Congruency::Congruent => Congruency::Incongruent,
            Congruency::Incongruent => Congruency::Congruent,
        }
    }

    /// Congruency actually presented to the subject: a reversed rotation phase
    /// flips the condition recorded at block start.
    pub fn effective(self, reverse_rotation: bool) -> Self {
        if reverse_rotation {
            self.flipped()
        } else {
            self
        }
    }
}

/// What a per-condition series measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Measure {
    /// Stimulus onset, seconds after the MRI trigger
    Onset,
    /// Response time as logged
    Resp,
}

/// The ten output series of one analysed log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    InstOnset,
    PosCongOnset,
    PosCongResp,
    NegCongOnset,
    NegCongResp,
    PosIncongResp,
    PosIncongOnset,
    NegIncongResp,
    NegIncongOnset,
    Falses,
}

impl Category {
    /// All categories in export column order
    pub const ALL: [Category; 10] = [
        Category::InstOnset,
        Category::PosCongOnset,
        Category::PosCongResp,
        Category::NegCongOnset,
        Category::NegCongResp,
        Category::PosIncongResp,
        Category::PosIncongOnset,
        Category::NegIncongResp,
        Category::NegIncongOnset,
        Category::Falses,
    ];

    /// Series for a correctly answered trial of the given condition
    pub fn trial(valence: Valence, congruency: Congruency, measure: Measure) -> Self {
        use Congruency::*;
        use Measure::*;
        use Valence::*;

        match (valence, congruency, measure) {
            (Positive, Congruent, Onset) => Category::PosCongOnset,
            (Positive, Congruent, Resp) => Category::PosCongResp,
            (Negative, Congruent, Onset) => Category::NegCongOnset,
            (Negative, Congruent, Resp) => Category::NegCongResp,
            (Positive, Incongruent, Onset) => Category::PosIncongOnset,
            (Positive, Incongruent, Resp) => Category::PosIncongResp,
            (Negative, Incongruent, Onset) => Category::NegIncongOnset,
            (Negative, Incongruent, Resp) => Category::NegIncongResp,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::InstOnset => "Inst Onset",
            Category::PosCongOnset => "Pos Cong Onset",
            Category::PosCongResp => "Pos Cong Resp",
            Category::NegCongOnset => "Neg Cong Onset",
            Category::NegCongResp => "Neg Cong Resp",
            Category::PosIncongResp => "Pos Incong Resp",
            Category::PosIncongOnset => "Pos Incong Onset",
            Category::NegIncongResp => "Neg Incong Resp",
            Category::NegIncongOnset => "Neg Incong Onset",
            Category::Falses => "Falses",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Category::ALL.into_iter().find(|c| c.label() == label)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// One entry of a result series
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SeriesValue {
    /// Baseline-relative time in seconds
    Seconds(f64),
    /// Cell copied verbatim from the log
    Text(String),
}

impl fmt::Display for SeriesValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesValue::Seconds(v) => f.pad(&format_seconds(*v)),
            SeriesValue::Text(s) => f.pad(s),
        }
    }
}

/// Shortest round-trip rendering, keeping a `.0` on integral values.
pub fn format_seconds(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Per-file mapping from category to its ordered values.
///
/// Series are sized independently; no positional alignment across series is
/// implied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    series: [Vec<SeriesValue>; 10],
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, category: Category, value: SeriesValue) {
        self.series[category.index()].push(value);
    }

    pub fn series(&self, category: Category) -> &[SeriesValue] {
        &self.series[category.index()]
    }

    /// Series in export column order
    pub fn iter(&self) -> impl Iterator<Item = (Category, &[SeriesValue])> {
        Category::ALL
            .into_iter()
            .map(move |c| (c, self.series(c)))
    }

    /// Length of the longest series
    pub fn max_len(&self) -> usize {
        self.series.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn total_values(&self) -> usize {
        self.series.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_values() == 0
    }
}

impl Serialize for ResultTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Category::ALL.len()))?;
        for (category, values) in self.iter() {
            map.serialize_entry(category.label(), values)?;
        }
        map.end()
    }
}

/// Properties derived from one trial row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrialProperties {
    /// 1-based index of the row within the log (header is row 0)
    pub row: usize,
    /// Block whose onset columns were consulted
    pub block: u32,
    pub correct: bool,
    pub positive: bool,
    pub negative: bool,
    pub congruent_start: bool,
    pub incongruent_start: bool,
    pub reverse_rotation: bool,
    pub response_time: String,
    /// Column `onset_time` was read from
    pub onset_column: ColumnLabel,
    pub onset_time: String,
    /// Column `inst_onset` was read from
    pub inst_column: ColumnLabel,
    pub inst_onset: String,
}

impl TrialProperties {
    /// Valence with positive taking precedence when both substrings match
    pub fn valence(&self) -> Option<Valence> {
        if self.positive {
            Some(Valence::Positive)
        } else if self.negative {
            Some(Valence::Negative)
        } else {
            None
        }
    }

    /// Start congruency used to label the trial. Congruent takes precedence
    /// when both substrings match.
    pub fn labelled_congruency(&self) -> Option<Congruency> {
        if self.congruent_start {
            Some(Congruency::Congruent)
        } else if self.incongruent_start {
            Some(Congruency::Incongruent)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_category_order_and_labels() {
        let labels: Vec<&str> = Category::ALL.iter().map(|c| c.label()).collect();
        assert_eq!(
            labels,
            vec![
                "Inst Onset",
                "Pos Cong Onset",
                "Pos Cong Resp",
                "Neg Cong Onset",
                "Neg Cong Resp",
                "Pos Incong Resp",
                "Pos Incong Onset",
                "Neg Incong Resp",
                "Neg Incong Onset",
                "Falses",
            ]
        );
        for category in Category::ALL {
            assert_eq!(Category::from_label(category.label()), Some(category));
        }
        assert_eq!(Category::from_label("Pos Resp"), None);
    }

    #[test]
    fn test_trial_category_mapping() {
        assert_eq!(
            Category::trial(Valence::Positive, Congruency::Incongruent, Measure::Onset),
            Category::PosIncongOnset
        );
        assert_eq!(
            Category::trial(Valence::Negative, Congruency::Congruent, Measure::Resp),
            Category::NegCongResp
        );
    }

    #[test]
    fn test_effective_congruency() {
        assert_eq!(Congruency::Congruent.effective(false), Congruency::Congruent);
        assert_eq!(Congruency::Congruent.effective(true), Congruency::Incongruent);
        assert_eq!(Congruency::Incongruent.effective(true), Congruency::Congruent);
    }

    #[test]
    fn test_seconds_formatting() {
        assert_eq!(SeriesValue::Seconds(1.0).to_string(), "1.0");
        assert_eq!(SeriesValue::Seconds(0.15).to_string(), "0.15");
        assert_eq!(SeriesValue::Seconds(-0.15).to_string(), "-0.15");
        assert_eq!(SeriesValue::Text("734".to_string()).to_string(), "734");
        assert_eq!(format!("{:^6}", SeriesValue::Seconds(2.5)), " 2.5  ");
    }

    #[test]
    fn test_result_table_lengths() {
        let mut table = ResultTable::new();
        assert!(table.is_empty());

        table.push(Category::Falses, SeriesValue::Seconds(1.5));
        table.push(Category::Falses, SeriesValue::Seconds(2.5));
        table.push(Category::PosCongResp, SeriesValue::Text("512".into()));

        assert_eq!(table.max_len(), 2);
        assert_eq!(table.total_values(), 3);
        assert_eq!(table.series(Category::InstOnset).len(), 0);
    }

    #[test]
    fn test_result_table_json() {
        let mut table = ResultTable::new();
        table.push(Category::InstOnset, SeriesValue::Seconds(0.5));
        table.push(Category::PosCongResp, SeriesValue::Text("512".into()));

        let json: serde_json::Value = serde_json::to_value(&table).unwrap();
        assert_eq!(json["Inst Onset"][0], 0.5);
        assert_eq!(json["Pos Cong Resp"][0], "512");
        assert_eq!(json["Falses"].as_array().unwrap().len(), 0);
    }
}
