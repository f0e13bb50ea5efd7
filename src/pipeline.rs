//! Per-table cleaning pipeline.
//!
//! select column -> drop header echoes -> normalize -> dedup -> drop missing
//! -> project. Each call owns its table; the only state that outlives a call
//! is the [`CleaningReport`] the caller folds results into.

use rayon::prelude::*;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::DetectionConfig;
use crate::detect::{ColumnSelector, Selection};
use crate::domain_utils::DomainNormalizer;
use crate::org_normalizer::OrgNormalizer;
use crate::table::{Cell, ColumnClassification, Table};
use crate::vocabulary::Vocabulary;

/// Reasons a table is skipped. None of these abort a run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("table has no rows or columns")]
    EmptyTable,

    #[error("no column with usable identifiers")]
    NoSelectableColumn,

    #[error("could not read source: {0}")]
    MalformedSource(String),
}

/// One line of the summary report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub source_label: String,
    pub classification: ColumnClassification,
    /// Present values in the selected column after header echoes are dropped
    pub original_row_count: usize,
    pub cleaned_row_count: usize,
}

/// Report rows accumulated over one run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleaningReport {
    rows: Vec<ReportRow>,
}

impl CleaningReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one row into the report.
    #[must_use]
    pub fn record(mut self, row: ReportRow) -> Self {
        self.rows.push(row);
        self
    }

    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total_original_rows(&self) -> usize {
        self.rows.iter().map(|r| r.original_row_count).sum()
    }

    pub fn total_cleaned_rows(&self) -> usize {
        self.rows.iter().map(|r| r.cleaned_row_count).sum()
    }
}

/// Output of a successful pipeline run over one table.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedTable {
    /// Single-column projection of the selected column
    pub table: Table,
    pub selection: Selection,
    pub report: ReportRow,
}

impl CleanedTable {
    pub fn values(&self) -> Vec<&str> {
        self.table.values(0)
    }
}

#[derive(Debug, Clone)]
pub struct CleaningPipeline {
    selector: ColumnSelector,
    names: OrgNormalizer,
    domains: DomainNormalizer,
    vocabulary: Vocabulary,
}

impl Default for CleaningPipeline {
    fn default() -> Self {
        Self {
            selector: ColumnSelector::default(),
            names: OrgNormalizer::default(),
            domains: DomainNormalizer::default(),
            vocabulary: Vocabulary::builtin(),
        }
    }
}

impl CleaningPipeline {
    pub fn new(vocabulary: Vocabulary, detection: &DetectionConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            selector: ColumnSelector::new(&vocabulary, detection),
            names: OrgNormalizer::from_vocabulary(&vocabulary)?,
            domains: DomainNormalizer::from_vocabulary(&vocabulary),
            vocabulary,
        })
    }

    /// Word lists this pipeline was built from.
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Clean one table.
    pub fn clean(&self, mut table: Table, source_label: &str) -> Result<CleanedTable, TableError> {
        if table.is_empty() {
            return Err(TableError::EmptyTable);
        }

        let selection = self
            .selector
            .select(&table)
            .ok_or(TableError::NoSelectableColumn)?;
        let column = selection.column;

        let placeholders: Vec<bool> = table
            .column(column)
            .map(|c| {
                c.cells
                    .iter()
                    .map(|cell| cell.as_str().is_some_and(|v| self.vocabulary.is_placeholder(v)))
                    .collect()
            })
            .unwrap_or_default();
        let echoes = placeholders.iter().filter(|p| **p).count();
        if echoes > 0 {
            debug!("{}: dropping {} header echo row(s)", source_label, echoes);
            table.retain_rows(|row| !placeholders[row]);
        }

        let original_row_count = table.non_missing_count(column);
        if original_row_count == 0 {
            return Err(TableError::NoSelectableColumn);
        }

        let normalized = dedup(self.normalize_column(&table, column, selection.classification));
        let keep: Vec<bool> = normalized.iter().map(|cell| !cell.is_missing()).collect();
        table.replace_cells(column, normalized);
        table.retain_rows(|row| keep[row]);

        let projected = table.project(column);
        let cleaned_row_count = projected.row_count();

        info!(
            "{}: {} column, {} -> {} rows",
            source_label, selection.classification, original_row_count, cleaned_row_count
        );

        Ok(CleanedTable {
            table: projected,
            selection,
            report: ReportRow {
                source_label: source_label.to_string(),
                classification: selection.classification,
                original_row_count,
                cleaned_row_count,
            },
        })
    }

    /// Per-cell normalization; cells are independent so this runs in parallel.
    fn normalize_column(&self, table: &Table, column: usize, classification: ColumnClassification) -> Vec<Cell> {
        let Some(col) = table.column(column) else {
            return Vec::new();
        };

        col.cells
            .par_iter()
            .map(|cell| {
                let normalized = match classification {
                    ColumnClassification::Name => self.names.normalize_cell(cell),
                    ColumnClassification::Domain => self.domains.normalize_cell(cell),
                };
                normalized.into_cell()
            })
            .collect()
    }
}

/// Turn every repeat of an earlier value into `Missing`, keeping row alignment.
fn dedup(cells: Vec<Cell>) -> Vec<Cell> {
    let mut seen = HashSet::new();
    cells
        .into_iter()
        .map(|cell| match cell {
            Cell::Present(value) => {
                if seen.insert(value.clone()) {
                    Cell::Present(value)
                } else {
                    Cell::Missing
                }
            }
            Cell::Missing => Cell::Missing,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::SelectionRule;
    use crate::table::Column;

    fn single_column(header: Option<&str>, values: &[Option<&str>]) -> Table {
        Table::new(vec![Column::new(
            header.map(str::to_string),
            values.iter().map(|v| Cell::from(*v)).collect(),
        )])
    }

    #[test]
    fn test_account_name_scenario() {
        let table = single_column(
            Some("Account Name"),
            &[Some("Acme Inc."), Some("ACME"), Some("Acme Inc"), Some("Globex LLC")],
        );

        let cleaned = CleaningPipeline::default().clean(table, "accounts.csv").unwrap();

        assert_eq!(cleaned.selection.column, 0);
        assert_eq!(cleaned.selection.classification, ColumnClassification::Name);
        assert_eq!(cleaned.values(), vec!["Acme", "Globex"]);
        assert_eq!(
            cleaned.report,
            ReportRow {
                source_label: "accounts.csv".to_string(),
                classification: ColumnClassification::Name,
                original_row_count: 4,
                cleaned_row_count: 2,
            }
        );
    }

    #[test]
    fn test_dedup_keeps_first_seen_order() {
        let table = single_column(Some("Company"), &[Some("A"), Some("B"), Some("A"), Some("C")]);
        let cleaned = CleaningPipeline::default().clean(table, "t").unwrap();
        assert_eq!(cleaned.values(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_dedup_marks_repeats_missing() {
        let cells = dedup(vec![
            Cell::present("a"),
            Cell::Missing,
            Cell::present("a"),
            Cell::present("b"),
        ]);
        assert_eq!(cells, vec![Cell::present("a"), Cell::Missing, Cell::Missing, Cell::present("b")]);
    }

    #[test]
    fn test_header_echoes_dropped_before_counting() {
        let table = single_column(
            None,
            &[Some("Company Name"), Some("Acme Inc"), Some("company"), Some("Globex"), None],
        );

        let cleaned = CleaningPipeline::default().clean(table, "t").unwrap();
        assert_eq!(cleaned.report.original_row_count, 2);
        assert_eq!(cleaned.values(), vec!["Acme", "Globex"]);
    }

    #[test]
    fn test_domain_column_drops_unusable_values() {
        let table = single_column(
            Some("Website"),
            &[
                Some("https://www.acme.com/about"),
                Some("not a domain"),
                Some("shop.acme.com"),
                Some("globex.co.uk"),
                None,
            ],
        );

        let cleaned = CleaningPipeline::default().clean(table, "t").unwrap();
        assert_eq!(cleaned.selection.classification, ColumnClassification::Domain);
        assert_eq!(cleaned.values(), vec!["acme.com", "globex.co.uk"]);
        assert_eq!(cleaned.report.original_row_count, 4);
        assert_eq!(cleaned.report.cleaned_row_count, 2);
    }

    #[test]
    fn test_projection_keeps_only_selected_column() {
        let table = Table::new(vec![
            Column::new(Some("Id".into()), vec![Cell::present("1"), Cell::present("2")]),
            Column::new(Some("Company".into()), vec![Cell::present("Initech LLC"), Cell::present("Hooli")]),
        ]);

        let cleaned = CleaningPipeline::default().clean(table, "t").unwrap();
        assert_eq!(cleaned.table.column_count(), 1);
        assert_eq!(cleaned.selection.rule, SelectionRule::SingleCandidate);
        assert_eq!(cleaned.values(), vec!["Initech", "Hooli"]);
    }

    #[test]
    fn test_row_count_invariant() {
        let tables = vec![
            single_column(Some("Name"), &[Some("x"), Some("X"), None, Some("(tbd)")]),
            single_column(Some("Domain"), &[Some("a.com"), Some("b"), Some("www.a.com")]),
            single_column(None, &[Some("Foo"), Some("Bar"), Some("foo")]),
        ];

        for table in tables {
            let cleaned = CleaningPipeline::default().clean(table, "t").unwrap();
            assert!(cleaned.report.cleaned_row_count <= cleaned.report.original_row_count);
            assert_eq!(cleaned.report.cleaned_row_count, cleaned.table.row_count());
        }
    }

    #[test]
    fn test_skipped_tables() {
        let pipeline = CleaningPipeline::default();

        assert_eq!(pipeline.clean(Table::default(), "t"), Err(TableError::EmptyTable));

        let only_echoes = single_column(Some("Company"), &[Some("company"), Some("Company Name"), None]);
        assert_eq!(pipeline.clean(only_echoes, "t"), Err(TableError::NoSelectableColumn));
    }

    #[test]
    fn test_report_fold() {
        let pipeline = CleaningPipeline::default();
        let inputs = vec![
            ("a.csv", single_column(Some("Company"), &[Some("Acme"), Some("Acme Inc")])),
            ("b.csv", single_column(Some("Domain"), &[Some("a.com"), Some("b.com")])),
        ];

        let report = inputs
            .into_iter()
            .filter_map(|(label, table)| pipeline.clean(table, label).ok())
            .fold(CleaningReport::new(), |report, cleaned| report.record(cleaned.report));

        assert_eq!(report.len(), 2);
        assert_eq!(report.rows()[0].source_label, "a.csv");
        assert_eq!(report.total_original_rows(), 4);
        assert_eq!(report.total_cleaned_rows(), 3);
    }

    #[test]
    fn test_custom_vocabulary_pipeline() {
        let mut vocab = Vocabulary::builtin();
        vocab.placeholder_tokens.push("n/a".to_string());
        let pipeline = CleaningPipeline::new(vocab, &DetectionConfig::default()).unwrap();

        let table = single_column(Some("Company"), &[Some("N/A"), Some("Acme")]);
        let cleaned = pipeline.clean(table, "t").unwrap();
        assert_eq!(cleaned.report.original_row_count, 1);
    }
}
