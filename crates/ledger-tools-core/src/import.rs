//! Statement row import and result export
//!
//! Rows are read from a CSV export of the statement sheet. The caller names
//! the columns through a [`ColumnMapping`]; nothing is guessed from the data.

use std::io::{Read, Write};

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use tracing::debug;

use crate::batch::{InputRow, RowOutcome, RowReport};
use crate::error::{Error, Result};
use crate::models::Transaction;

/// Statement column headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub serial: String,
    pub date: String,
    pub narration: String,
    pub withdrawal: String,
    pub deposit: String,
    pub user_context: String,
    /// Optional; rows without it have no existing confidence
    pub confidence: Option<String>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            serial: "Sr No".into(),
            date: "Transaction Date".into(),
            narration: "Narration".into(),
            withdrawal: "Withdrawal".into(),
            deposit: "Deposit".into(),
            user_context: "User Context".into(),
            confidence: Some("LLM Confidence".into()),
        }
    }
}

struct ColumnIndices {
    serial: usize,
    date: usize,
    narration: usize,
    withdrawal: usize,
    deposit: usize,
    user_context: usize,
    confidence: Option<usize>,
}

impl ColumnMapping {
    fn locate(&self, headers: &StringRecord) -> Result<ColumnIndices> {
        let position = |name: &str| headers.iter().position(|h| h.trim() == name.trim());
        let require = |name: &str| {
            position(name)
                .ok_or_else(|| Error::InvalidData(format!("Statement is missing column '{}'", name)))
        };

        Ok(ColumnIndices {
            serial: require(&self.serial)?,
            date: require(&self.date)?,
            narration: require(&self.narration)?,
            withdrawal: require(&self.withdrawal)?,
            deposit: require(&self.deposit)?,
            user_context: require(&self.user_context)?,
            confidence: self.confidence.as_deref().and_then(position),
        })
    }
}

/// Read statement rows using `mapping`
pub fn read_rows<R: Read>(reader: R, mapping: &ColumnMapping) -> Result<Vec<InputRow>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let columns = mapping.locate(&headers)?;
    let mut rows = Vec::new();

    for result in rdr.records() {
        let record = result?;
        let cell = |index: usize| record.get(index).unwrap_or("").trim();

        let transaction = Transaction {
            narration: cell(columns.narration).to_string(),
            user_context: cell(columns.user_context).to_string(),
            withdrawal: parse_amount(cell(columns.withdrawal)),
            deposit: parse_amount(cell(columns.deposit)),
            date: parse_date(cell(columns.date)),
        };

        rows.push(InputRow {
            serial: Some(cell(columns.serial).to_string()).filter(|s| !s.is_empty()),
            existing_confidence: columns
                .confidence
                .map(|i| parse_amount(cell(i)))
                .unwrap_or(0.0),
            transaction,
        });
    }

    debug!("Read {} statement rows", rows.len());
    Ok(rows)
}

/// Write `Sr No, Tags, LLM Confidence, Final Entry, Status` for every row
pub fn write_outcomes<W: Write>(writer: W, reports: &[RowReport]) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(writer);
    wtr.write_record(["Sr No", "Tags", "LLM Confidence", "Final Entry", "Status"])?;

    for report in reports {
        let serial = report.serial.as_deref().unwrap_or("");
        match &report.outcome {
            RowOutcome::Classified(c) => {
                let confidence = c.confidence.to_string();
                let status = if c.is_skip() { "empty" } else { "ok" };
                wtr.write_record([
                    serial,
                    c.tags.as_str(),
                    confidence.as_str(),
                    c.final_entry.as_str(),
                    status,
                ])?;
            }
            RowOutcome::Skipped(reason) => {
                wtr.write_record([serial, "", "", "", reason.as_str()])?;
            }
            RowOutcome::Failed(message) => {
                let status = format!("error: {}", message);
                wtr.write_record([serial, "", "", "", status.as_str()])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}

/// Parse a statement date; `None` when no known format fits
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let formats = [
        "%Y-%m-%d", // 2024-01-15
        "%Y/%m/%d", // 2024/01/15
        "%d/%m/%Y", // 15/01/2024
        "%d-%m-%Y", // 15-01-2024
        "%d-%b-%Y", // 15-Jan-2024
    ];

    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Parse an amount cell, dropping thousands separators; blank or junk is 0
pub fn parse_amount(s: &str) -> f64 {
    let cleaned = s.trim().replace(',', "");
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}
