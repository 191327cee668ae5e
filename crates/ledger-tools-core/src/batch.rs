//! Batch processing of statement rows
//!
//! Rows are classified one after another. Row-level problems never stop the
//! batch: they are recorded against the row and the next row is processed.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classify::TransactionClassifier;
use crate::config::ProcessingOptions;
use crate::error::{Error, Result};
use crate::models::{Classification, Transaction};

/// One statement row as handed to the batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputRow {
    /// `Sr No` cell; rows without one are empty sheet rows
    pub serial: Option<String>,
    /// Confidence already written to the row by an earlier run (0 when blank)
    pub existing_confidence: f64,
    pub transaction: Transaction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoSerial,
    HighConfidence,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoSerial => "no_serial",
            Self::HighConfidence => "high_confidence",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum RowOutcome {
    Classified(Classification),
    Skipped(SkipReason),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowReport {
    /// Position in the input
    pub index: usize,
    pub serial: Option<String>,
    pub outcome: RowOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub rows: Vec<RowReport>,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.rows.len()
    }

    pub fn summary(&self) -> String {
        let mut summary = format!("Processed {}/{} rows", self.processed, self.total());
        if self.skipped > 0 {
            summary.push_str(&format!(" ({} skipped)", self.skipped));
        }
        if self.failed > 0 {
            summary.push_str(&format!(", {} failed", self.failed));
        }
        summary
    }

    /// Non-empty entries in row order, separated by blank lines
    pub fn journal(&self) -> String {
        self.rows
            .iter()
            .filter_map(|r| match &r.outcome {
                RowOutcome::Classified(c) if !c.final_entry.is_empty() => {
                    Some(c.final_entry.as_str())
                }
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

pub struct BatchProcessor<'a> {
    classifier: &'a TransactionClassifier,
}

impl<'a> BatchProcessor<'a> {
    pub fn new(classifier: &'a TransactionClassifier) -> Self {
        Self { classifier }
    }

    /// Classify `rows` in order against `funding_account`
    pub fn process(
        &self,
        rows: &[InputRow],
        funding_account: &str,
        options: &ProcessingOptions,
    ) -> Result<BatchReport> {
        if funding_account.trim().is_empty() {
            return Err(Error::InvalidData(
                "Select a funding account before processing transactions".into(),
            ));
        }

        info!(
            rows = rows.len(),
            mode = %options.mode,
            "Processing statement rows"
        );

        let mut report = BatchReport::default();

        for (index, row) in rows.iter().enumerate() {
            let outcome = self.process_row(index, row, funding_account, options);
            match &outcome {
                RowOutcome::Classified(_) => report.processed += 1,
                RowOutcome::Skipped(_) => report.skipped += 1,
                RowOutcome::Failed(_) => report.failed += 1,
            }
            report.rows.push(RowReport {
                index,
                serial: row.serial.clone(),
                outcome,
            });
        }

        info!("{}", report.summary());
        Ok(report)
    }

    fn process_row(
        &self,
        index: usize,
        row: &InputRow,
        funding_account: &str,
        options: &ProcessingOptions,
    ) -> RowOutcome {
        if row.serial.as_deref().map_or(true, |s| s.trim().is_empty()) {
            debug!("Skipping row {}: no serial number", index);
            return RowOutcome::Skipped(SkipReason::NoSerial);
        }

        if options.ignore_high_confidence && row.existing_confidence > options.confidence_threshold {
            debug!(
                "Skipping row {}: confidence {} > threshold {}",
                index, row.existing_confidence, options.confidence_threshold
            );
            return RowOutcome::Skipped(SkipReason::HighConfidence);
        }

        match self
            .classifier
            .classify(&row.transaction, funding_account, options.mode)
        {
            Ok(classification) => RowOutcome::Classified(classification),
            Err(e) => {
                warn!("Row {} failed: {}", index, e);
                RowOutcome::Failed(e.to_string())
            }
        }
    }
}
