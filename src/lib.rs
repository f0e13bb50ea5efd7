pub mod batch;
pub mod cli;
pub mod config;
pub mod detect;
pub mod domain_utils;
pub mod export;
pub mod logger;
pub mod org_normalizer;
pub mod pipeline;
pub mod table;
pub mod vocabulary;

pub use detect::{ColumnSelector, Selection, SelectionRule};
pub use domain_utils::{is_domain_like, normalize_domain, DomainNormalizer};
pub use org_normalizer::{normalize_name, OrgNormalizer};
pub use pipeline::{CleanedTable, CleaningPipeline, CleaningReport, ReportRow, TableError};
pub use table::{Cell, Column, ColumnClassification, Normalized, Table};
pub use vocabulary::Vocabulary;
