//! Rule store: reading and writing rule records
//!
//! Two formats are supported:
//! - JSON: an array of [`RuleRecord`] objects
//! - CSV: the rule sheet export with headers
//!   `ID, Priority, Active, Condition, Pattern / Value, Action Type, Action Value`

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{parse_active, parse_priority, RuleOrder, RuleRecord};

use super::RuleSet;

/// Rule sheet column headers, in sheet order
pub const SHEET_HEADERS: [&str; 7] = [
    "ID",
    "Priority",
    "Active",
    "Condition",
    "Pattern / Value",
    "Action Type",
    "Action Value",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFormat {
    Json,
    Csv,
}

impl StoreFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("json") => Ok(Self::Json),
            Some("csv") => Ok(Self::Csv),
            _ => Err(Error::InvalidData(format!(
                "Unsupported rule store: {} (expected .json or .csv)",
                path.display()
            ))),
        }
    }
}

/// Read a JSON array of records; entries that are not records are skipped
pub fn read_json<R: Read>(reader: R) -> Result<Vec<RuleRecord>> {
    let values: Vec<serde_json::Value> = serde_json::from_reader(reader)?;
    let mut records = Vec::with_capacity(values.len());

    for (index, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<RuleRecord>(value) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping rule store entry {}: {}", index, e),
        }
    }

    debug!("Read {} rule records from JSON", records.len());
    Ok(records)
}

pub fn read_csv<R: Read>(reader: R) -> Result<Vec<RuleRecord>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let columns = SheetColumns::locate(&headers)?;
    let mut records = Vec::new();

    for result in rdr.records() {
        let row = result?;
        let id = columns.get(&row, columns.id);
        // Trailing blank sheet rows
        if id.is_empty() {
            continue;
        }

        records.push(RuleRecord {
            id: id.to_string(),
            priority: parse_priority(columns.get(&row, columns.priority)),
            active: parse_active(columns.get(&row, columns.active)),
            condition: columns.get(&row, columns.condition).to_string(),
            pattern: columns.get(&row, columns.pattern).to_string(),
            action_type: columns.get(&row, columns.action_type).to_string(),
            action_value: columns.get(&row, columns.action_value).to_string(),
        });
    }

    debug!("Read {} rule records from CSV", records.len());
    Ok(records)
}

struct SheetColumns {
    id: usize,
    priority: usize,
    active: usize,
    condition: usize,
    pattern: usize,
    action_type: usize,
    action_value: usize,
}

impl SheetColumns {
    fn locate(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
                .ok_or_else(|| Error::InvalidData(format!("Rule sheet is missing column '{}'", name)))
        };

        Ok(Self {
            id: find(SHEET_HEADERS[0])?,
            priority: find(SHEET_HEADERS[1])?,
            active: find(SHEET_HEADERS[2])?,
            condition: find(SHEET_HEADERS[3])?,
            pattern: find(SHEET_HEADERS[4])?,
            action_type: find(SHEET_HEADERS[5])?,
            action_value: find(SHEET_HEADERS[6])?,
        })
    }

    fn get<'r>(&self, row: &'r StringRecord, index: usize) -> &'r str {
        row.get(index).unwrap_or("")
    }
}

pub fn write_json<W: Write>(writer: W, records: &[RuleRecord]) -> Result<()> {
    serde_json::to_writer_pretty(writer, records)?;
    Ok(())
}

pub fn write_csv<W: Write>(writer: W, records: &[RuleRecord]) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(writer);
    wtr.write_record(SHEET_HEADERS)?;

    for record in records {
        let priority = record.priority.to_string();
        wtr.write_record([
            record.id.as_str(),
            priority.as_str(),
            if record.active { "TRUE" } else { "FALSE" },
            record.condition.as_str(),
            record.pattern.as_str(),
            record.action_type.as_str(),
            record.action_value.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Read every record from a `.json` or `.csv` store
pub fn load_records(path: &Path) -> Result<Vec<RuleRecord>> {
    let format = StoreFormat::from_path(path)?;
    let reader = BufReader::new(File::open(path)?);
    match format {
        StoreFormat::Json => read_json(reader),
        StoreFormat::Csv => read_csv(reader),
    }
}

/// Load and compile a store into a rule set
pub fn load_rule_set(path: &Path, order: RuleOrder) -> Result<RuleSet> {
    let records = load_records(path)?;
    Ok(RuleSet::compile(&records).with_order(order))
}

pub fn save_records(path: &Path, records: &[RuleRecord]) -> Result<()> {
    let format = StoreFormat::from_path(path)?;
    let writer = BufWriter::new(File::create(path)?);
    match format {
        StoreFormat::Json => write_json(writer, records),
        StoreFormat::Csv => write_csv(writer, records),
    }
}

/// Add a new record, or replace the record with the same id when `is_edit`
pub fn upsert(records: &mut Vec<RuleRecord>, record: RuleRecord, is_edit: bool) -> Result<()> {
    let existing = records.iter().position(|r| r.id == record.id);

    match (existing, is_edit) {
        (Some(index), true) => records[index] = record,
        (None, true) => return Err(Error::NotFound(format!("rule {}", record.id))),
        (Some(_), false) => {
            return Err(Error::InvalidData(format!("Rule {} already exists", record.id)))
        }
        (None, false) => records.push(record),
    }
    Ok(())
}

pub fn remove(records: &mut Vec<RuleRecord>, id: &str) -> Result<RuleRecord> {
    let index = records
        .iter()
        .position(|r| r.id == id)
        .ok_or_else(|| Error::NotFound(format!("rule {}", id)))?;
    Ok(records.remove(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &str = "\
ID,Priority,Active,Condition,Pattern / Value,Action Type,Action Value
R001,1,TRUE,Narration CONTAINS,swiggy,CREATE_ENTRY,\"{'account': 'Expenses:Household:Food', 'tags': 'food'}\"
R002,,no,Narration CONTAINS,uber,CREATE_ENTRY,\"{'account': 'Expenses:Transport:Taxis'}\"
,,,,,,
R003,2.0,1,Narration CONTAINS AND Amount >,upi;500,CREATE_ENTRY,\"{'account': 'Expenses:Others:Other Charges'}\"
";

    fn record(id: &str) -> RuleRecord {
        RuleRecord {
            id: id.into(),
            priority: 0,
            active: true,
            condition: "Narration CONTAINS".into(),
            pattern: "x".into(),
            action_type: "CREATE_ENTRY".into(),
            action_value: "{}".into(),
        }
    }

    #[test]
    fn test_read_csv_sheet() {
        let records = read_csv(SHEET.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].id, "R001");
        assert_eq!(records[0].priority, 1);
        assert!(records[0].active);
        assert!(records[0].action_value.contains("Expenses:Household:Food"));

        assert_eq!(records[1].priority, 0);
        assert!(!records[1].active);

        assert_eq!(records[2].priority, 2);
        assert!(records[2].active);
        assert_eq!(records[2].pattern, "upi;500");
    }

    #[test]
    fn test_read_csv_missing_column() {
        let err = read_csv("ID,Priority,Active\nR001,1,TRUE\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Condition"));
    }

    #[test]
    fn test_active_cells() {
        for cell in ["TRUE", "true", "Yes", "1"] {
            assert!(parse_active(cell), "{}", cell);
        }
        for cell in ["FALSE", "no", "0", ""] {
            assert!(!parse_active(cell), "{}", cell);
        }
    }

    #[test]
    fn test_incomplete_json_record_is_rejected_alone() {
        let json = r#"[
  {"id": "R001", "active": "TRUE", "condition": "Narration CONTAINS", "pattern": "swiggy",
   "action_type": "CREATE_ENTRY", "action_value": "{'account': 'Expenses:Household:Food'}"},
  {"id": "R002", "condition": "Narration CONTAINS",
   "action_type": "CREATE_ENTRY", "action_value": "{'account': 'Expenses:Transport:Taxis'}"},
  {"pattern": "no id"},
  "not a rule"
]"#;
        let records = read_json(json.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, json).unwrap();

        let set = load_rule_set(&path, RuleOrder::List).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.rejected().len(), 1);
        assert_eq!(set.rejected()[0].id, "R002");
        assert!(set.rejected()[0].reason.contains("pattern"));
    }

    #[test]
    fn test_json_store_must_be_an_array() {
        assert!(read_json(r#"{"id": "R001"}"#.as_bytes()).is_err());
    }

    #[test]
    fn test_csv_write_then_read() {
        let records = read_csv(SHEET.as_bytes()).unwrap();
        let mut out = Vec::new();
        write_csv(&mut out, &records).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("ID,Priority,Active,Condition,Pattern / Value,Action Type,Action Value\n"));
        assert_eq!(read_csv(text.as_bytes()).unwrap(), records);
    }

    #[test]
    fn test_load_and_save_files() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("rules.csv");
        std::fs::write(&csv_path, SHEET).unwrap();

        let set = load_rule_set(&csv_path, RuleOrder::Priority).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.order(), RuleOrder::Priority);

        let json_path = dir.path().join("rules.json");
        let records = load_records(&csv_path).unwrap();
        save_records(&json_path, &records).unwrap();
        assert_eq!(load_records(&json_path).unwrap(), records);

        assert!(load_records(&dir.path().join("rules.txt")).is_err());
    }

    #[test]
    fn test_upsert_and_remove() {
        let mut records = vec![record("R001")];

        upsert(&mut records, record("R002"), false).unwrap();
        assert!(upsert(&mut records, record("R002"), false).is_err());

        let mut edited = record("R001");
        edited.pattern = "zomato".into();
        upsert(&mut records, edited, true).unwrap();
        assert_eq!(records[0].pattern, "zomato");
        assert!(matches!(
            upsert(&mut records, record("R009"), true),
            Err(Error::NotFound(_))
        ));

        assert_eq!(remove(&mut records, "R001").unwrap().id, "R001");
        assert!(remove(&mut records, "R001").is_err());
        assert_eq!(records.len(), 1);
    }
}
