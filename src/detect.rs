//! Identifier column detection.
//!
//! Picks the single column of a table that holds company identifiers and
//! classifies it as names or domains. Rules run top to bottom and the first
//! one that produces a selection wins:
//!
//! 1. [`SelectionRule::DualCandidate`]: header scan found both a name and a
//!    domain column; the domain column wins when it is populated at least
//!    `dual_candidate_ratio` times as densely as the name column.
//! 2. [`SelectionRule::SingleCandidate`]: header scan found exactly one.
//! 3. [`SelectionRule::ContentFallback`]: the most populated column,
//!    classified by how many of its values look like domains.
//!
//! Header scanning checks domain keywords before name keywords and keeps the
//! first candidate per class, so ambiguous headers such as "Company Website"
//! count as domain columns.

use std::fmt;
use tracing::debug;

use crate::config::DetectionConfig;
use crate::domain_utils::is_domain_like;
use crate::table::{Column, ColumnClassification, Table};
use crate::vocabulary::Vocabulary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionRule {
    DualCandidate,
    SingleCandidate,
    ContentFallback,
}

impl SelectionRule {
    /// Evaluation order.
    pub const CHAIN: [SelectionRule; 3] = [
        SelectionRule::DualCandidate,
        SelectionRule::SingleCandidate,
        SelectionRule::ContentFallback,
    ];
}

impl fmt::Display for SelectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SelectionRule::DualCandidate => "dual header candidates",
            SelectionRule::SingleCandidate => "single header candidate",
            SelectionRule::ContentFallback => "content fallback",
        };
        f.write_str(label)
    }
}

/// The chosen identifier column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub column: usize,
    pub classification: ColumnClassification,
    /// Which rule made the decision
    pub rule: SelectionRule,
}

/// First header match per classification.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct HeaderCandidates {
    name: Option<usize>,
    domain: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ColumnSelector {
    domain_keywords: Vec<String>,
    name_keywords: Vec<String>,
    dual_candidate_ratio: f64,
    content_domain_fraction: f64,
}

impl Default for ColumnSelector {
    fn default() -> Self {
        Self::new(&Vocabulary::builtin(), &DetectionConfig::default())
    }
}

impl ColumnSelector {
    pub fn new(vocab: &Vocabulary, detection: &DetectionConfig) -> Self {
        Self {
            domain_keywords: vocab.domain_keywords.iter().map(|k| k.to_lowercase()).collect(),
            name_keywords: vocab.name_keywords.iter().map(|k| k.to_lowercase()).collect(),
            dual_candidate_ratio: detection.dual_candidate_ratio,
            content_domain_fraction: detection.content_domain_fraction,
        }
    }

    /// Select the identifier column. `None` only for a table without columns.
    pub fn select(&self, table: &Table) -> Option<Selection> {
        if table.column_count() == 0 {
            return None;
        }

        let candidates = self.scan_headers(table);
        debug!(
            "Header scan: name candidate {:?}, domain candidate {:?}",
            candidates.name, candidates.domain
        );

        let selection = SelectionRule::CHAIN
            .iter()
            .find_map(|rule| self.apply(*rule, table, candidates))?;

        debug!(
            "Selected column {} as {} by {}",
            table
                .column(selection.column)
                .map(|c| c.display_name(selection.column))
                .unwrap_or_default(),
            selection.classification,
            selection.rule
        );
        Some(selection)
    }

    fn apply(&self, rule: SelectionRule, table: &Table, candidates: HeaderCandidates) -> Option<Selection> {
        match rule {
            SelectionRule::DualCandidate => {
                let (name, domain) = (candidates.name?, candidates.domain?);
                let (column, classification) = self.resolve_dual(table, name, domain);
                Some(Selection { column, classification, rule })
            }
            SelectionRule::SingleCandidate => match (candidates.name, candidates.domain) {
                (Some(column), None) => Some(Selection {
                    column,
                    classification: ColumnClassification::Name,
                    rule,
                }),
                (None, Some(column)) => Some(Selection {
                    column,
                    classification: ColumnClassification::Domain,
                    rule,
                }),
                _ => None,
            },
            SelectionRule::ContentFallback => {
                let column = most_populated_column(table)?;
                let classification = table
                    .column(column)
                    .map(|c| self.classify_content(c))
                    .unwrap_or(ColumnClassification::Name);
                Some(Selection { column, classification, rule })
            }
        }
    }

    fn scan_headers(&self, table: &Table) -> HeaderCandidates {
        let mut candidates = HeaderCandidates::default();

        for (index, column) in table.columns().iter().enumerate() {
            let Some(header) = &column.header else {
                continue;
            };
            let header = header.to_lowercase();

            if self.domain_keywords.iter().any(|k| header.contains(k.as_str())) {
                candidates.domain.get_or_insert(index);
            } else if self.name_keywords.iter().any(|k| header.contains(k.as_str())) {
                candidates.name.get_or_insert(index);
            }
        }

        candidates
    }

    fn resolve_dual(&self, table: &Table, name: usize, domain: usize) -> (usize, ColumnClassification) {
        let name_count = table.non_missing_count(name);
        let domain_count = table.non_missing_count(domain);

        if name_count == 0 {
            debug!("Name column is empty; using domain column");
            return (domain, ColumnClassification::Domain);
        }

        let ratio = domain_count as f64 / name_count as f64;
        debug!(
            "Domain/name ratio {:.2} ({} / {}), threshold {:.2}",
            ratio, domain_count, name_count, self.dual_candidate_ratio
        );

        if ratio < self.dual_candidate_ratio {
            (name, ColumnClassification::Name)
        } else {
            (domain, ColumnClassification::Domain)
        }
    }

    /// Domains when enough present values are domain-shaped. An empty column
    /// counts as names.
    pub fn classify_content(&self, column: &Column) -> ColumnClassification {
        let values: Vec<&str> = column.cells.iter().filter_map(|c| c.as_str()).collect();
        if values.is_empty() {
            return ColumnClassification::Name;
        }

        let domain_like = values.iter().filter(|v| is_domain_like(v)).count();
        let fraction = domain_like as f64 / values.len() as f64;

        if fraction >= self.content_domain_fraction {
            ColumnClassification::Domain
        } else {
            ColumnClassification::Name
        }
    }
}

/// Leftmost column with the most present cells.
fn most_populated_column(table: &Table) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (index, column) in table.columns().iter().enumerate() {
        let count = column.non_missing_count();
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((index, count)),
        }
    }
    best.map(|(index, _)| index)
}
