//! Domain models for Ledger Tools

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Payee used when neither the rule, the suggestion nor the user context names one
pub const DEFAULT_PAYEE: &str = "Misc Expense";

/// Target account used when nothing more specific is known
pub const OTHER_CHARGES_ACCOUNT: &str = "Expenses:Others:Other Charges";

/// A bank statement row after column mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Free-text bank description
    pub narration: String,
    /// Note typed by the user next to the row
    #[serde(default)]
    pub user_context: String,
    #[serde(default)]
    pub withdrawal: f64,
    #[serde(default)]
    pub deposit: f64,
    pub date: Option<NaiveDate>,
}

impl Transaction {
    pub fn new(date: NaiveDate, narration: impl Into<String>) -> Self {
        Self {
            narration: narration.into(),
            date: Some(date),
            ..Default::default()
        }
    }

    pub fn with_withdrawal(mut self, amount: f64) -> Self {
        self.withdrawal = amount;
        self
    }

    pub fn with_deposit(mut self, amount: f64) -> Self {
        self.deposit = amount;
        self
    }

    pub fn with_user_context(mut self, context: impl Into<String>) -> Self {
        self.user_context = context.into();
        self
    }

    /// Deposit if there is one, otherwise the withdrawal
    pub fn amount(&self) -> f64 {
        if self.deposit != 0.0 {
            self.deposit
        } else {
            self.withdrawal
        }
    }

    pub fn is_credit(&self) -> bool {
        self.deposit > 0.0
    }

    /// Rows without a narration, an amount or a date are skipped rather than classified
    pub fn is_processable(&self) -> bool {
        !self.narration.trim().is_empty()
            && !(self.withdrawal == 0.0 && self.deposit == 0.0)
            && self.date.is_some()
    }
}

/// How a row is classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum ProcessingMode {
    /// Rules only; unmatched rows stay empty
    Rules,
    /// Rules first, suggestion engine for everything else
    #[default]
    RulesLlm,
    /// Suggestion engine only
    LlmOnly,
}

impl ProcessingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rules => "rules",
            Self::RulesLlm => "rules_llm",
            Self::LlmOnly => "llm_only",
        }
    }

    /// Parse a mode name, treating anything unknown as `rules_llm`
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| {
            tracing::warn!(mode = %s, "Unknown processing mode, falling back to rules_llm");
            Self::RulesLlm
        })
    }
}

impl std::str::FromStr for ProcessingMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rules" => Ok(Self::Rules),
            "rules_llm" => Ok(Self::RulesLlm),
            "llm_only" | "llm" => Ok(Self::LlmOnly),
            _ => Err(format!("Unknown processing mode: {}", s)),
        }
    }
}

impl From<String> for ProcessingMode {
    fn from(s: String) -> Self {
        Self::parse_lenient(&s)
    }
}

impl std::fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Order in which rules are evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleOrder {
    /// Rule store order, top to bottom
    #[default]
    List,
    /// Ascending priority number; ties keep store order
    Priority,
}

/// Confidence written back to the row; blank for skipped rows
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Confidence {
    #[default]
    Blank,
    Score(f64),
}

impl Confidence {
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Blank => None,
            Self::Score(v) => Some(*v),
        }
    }
}

impl Serialize for Confidence {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Blank => serializer.serialize_str(""),
            Self::Score(v) => serializer.serialize_f64(*v),
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank => Ok(()),
            Self::Score(v) => write!(f, "{}", v),
        }
    }
}

/// Result of classifying one row
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub tags: String,
    pub confidence: Confidence,
    pub final_entry: String,
}

impl Classification {
    /// The empty result written for rows that are not classified
    pub fn skip() -> Self {
        Self::default()
    }

    pub fn is_skip(&self) -> bool {
        self.final_entry.is_empty() && self.confidence == Confidence::Blank
    }
}

/// Where a suggestion came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionSource {
    Llm,
    Heuristic,
}

/// Categorization produced when no rule matched
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub account: String,
    pub payee: Option<String>,
    pub tags: String,
    pub confidence: f64,
    pub source: SuggestionSource,
}

/// `{field, operator}` pair of a rule condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    NarrationContains,
    NarrationRegex,
    AmountEq,
    AmountGt,
    AmountLt,
    UserContextContains,
}

impl ConditionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NarrationContains => "Narration CONTAINS",
            Self::NarrationRegex => "Narration REGEX",
            Self::AmountEq => "Amount ==",
            Self::AmountGt => "Amount >",
            Self::AmountLt => "Amount <",
            Self::UserContextContains => "User_Context CONTAINS",
        }
    }
}

impl std::str::FromStr for ConditionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_uppercase().as_str() {
            "NARRATION CONTAINS" => Ok(Self::NarrationContains),
            "NARRATION REGEX" => Ok(Self::NarrationRegex),
            "AMOUNT ==" => Ok(Self::AmountEq),
            "AMOUNT >" => Ok(Self::AmountGt),
            "AMOUNT <" => Ok(Self::AmountLt),
            "USER_CONTEXT CONTAINS" => Ok(Self::UserContextContains),
            _ => Err(format!("Unknown condition: {}", s)),
        }
    }
}

impl std::fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a matching rule creates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    CreateEntry,
    CreateTransfer,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateEntry => "CREATE_ENTRY",
            Self::CreateTransfer => "CREATE_TRANSFER",
        }
    }
}

impl std::str::FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CREATE_ENTRY" => Ok(Self::CreateEntry),
            "CREATE_TRANSFER" => Ok(Self::CreateTransfer),
            _ => Err(format!("Unknown action type: {}", s)),
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One partner's share in a custom split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitShare {
    pub account: String,
    pub percent: f64,
}

/// Expense sharing applied to the target posting
#[derive(Debug, Clone, PartialEq)]
pub enum Split {
    /// Half each; you take the odd unit
    FiftyFifty { account: String },
    /// A third each; you take the rounding
    ThreeWay { accounts: [String; 2] },
    /// Percentages; the last share absorbs the rounding
    Custom {
        your_share_percent: f64,
        shares: Vec<SplitShare>,
    },
}

impl Split {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FiftyFifty { .. } => "fifty_fifty",
            Self::ThreeWay { .. } => "three_way",
            Self::Custom { .. } => "custom",
        }
    }
}

/// Parsed rule action
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub action_type: ActionType,
    /// Target account (`to_account` for transfers)
    pub account: String,
    pub payee: Option<String>,
    pub tags: String,
    pub include_user_context: bool,
    pub include_narration: bool,
    pub split: Option<Split>,
}

/// A rule as it sits in the rule store, before compilation
///
/// Every field but `id` is optional when deserializing, so an incomplete record
/// still loads and is rejected by rule compilation instead of failing the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub id: String,
    #[serde(default, deserialize_with = "lenient_priority")]
    pub priority: i64,
    #[serde(default = "default_active", deserialize_with = "lenient_active")]
    pub active: bool,
    /// Conditions joined by ` AND `, e.g. `Narration CONTAINS AND Amount >`
    #[serde(default)]
    pub condition: String,
    /// Patterns joined by `;`, one per condition
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub action_type: String,
    /// JSON payload; single quotes are accepted
    #[serde(default)]
    pub action_value: String,
}

fn default_active() -> bool {
    true
}

/// Sheet cell or JSON scalar
#[derive(Deserialize)]
#[serde(untagged)]
enum CellValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

fn lenient_active<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    Ok(match Option::<CellValue>::deserialize(deserializer)? {
        None => default_active(),
        Some(CellValue::Bool(b)) => b,
        Some(CellValue::Int(i)) => i == 1,
        Some(CellValue::Float(f)) => f == 1.0,
        Some(CellValue::Text(s)) => parse_active(&s),
    })
}

fn lenient_priority<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i64, D::Error> {
    Ok(match Option::<CellValue>::deserialize(deserializer)? {
        Some(CellValue::Int(i)) => i,
        Some(CellValue::Float(f)) if f.is_finite() => f as i64,
        Some(CellValue::Text(s)) => parse_priority(&s),
        _ => 0,
    })
}

/// Unchecked or unrecognized cells are inactive
pub(crate) fn parse_active(cell: &str) -> bool {
    matches!(
        cell.trim().to_lowercase().as_str(),
        "true" | "yes" | "y" | "1"
    )
}

pub(crate) fn parse_priority(cell: &str) -> i64 {
    let cell = cell.trim();
    cell.parse::<i64>()
        .ok()
        .or_else(|| cell.parse::<f64>().ok().filter(|p| p.is_finite()).map(|p| p as i64))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    #[test]
    fn test_amount_prefers_deposit() {
        let tx = Transaction::new(date(), "NEFT").with_withdrawal(10.0).with_deposit(25.0);
        assert_eq!(tx.amount(), 25.0);
        assert!(tx.is_credit());

        let tx = Transaction::new(date(), "UPI").with_withdrawal(40.0);
        assert_eq!(tx.amount(), 40.0);
        assert!(!tx.is_credit());
    }

    #[test]
    fn test_is_processable() {
        assert!(Transaction::new(date(), "UPI").with_withdrawal(1.0).is_processable());
        assert!(!Transaction::new(date(), "").with_withdrawal(1.0).is_processable());
        assert!(!Transaction::new(date(), "UPI").is_processable());

        let mut no_date = Transaction::new(date(), "UPI").with_withdrawal(1.0);
        no_date.date = None;
        assert!(!no_date.is_processable());
    }

    #[test]
    fn test_processing_mode_parse() {
        assert_eq!("rules".parse::<ProcessingMode>().unwrap(), ProcessingMode::Rules);
        assert_eq!("llm_only".parse::<ProcessingMode>().unwrap(), ProcessingMode::LlmOnly);
        assert!("everything".parse::<ProcessingMode>().is_err());
        assert_eq!(ProcessingMode::parse_lenient("everything"), ProcessingMode::RulesLlm);
        assert_eq!(ProcessingMode::default(), ProcessingMode::RulesLlm);
    }

    #[test]
    fn test_condition_kind_parse() {
        assert_eq!(
            "Narration CONTAINS".parse::<ConditionKind>().unwrap(),
            ConditionKind::NarrationContains
        );
        assert_eq!(
            "  user_context   contains ".parse::<ConditionKind>().unwrap(),
            ConditionKind::UserContextContains
        );
        assert_eq!("Amount >".parse::<ConditionKind>().unwrap(), ConditionKind::AmountGt);
        assert!("Amount >=".parse::<ConditionKind>().is_err());
        assert!("User_Context REGEX".parse::<ConditionKind>().is_err());
    }

    #[test]
    fn test_confidence_serialization() {
        let skip = Classification::skip();
        let json = serde_json::to_value(&skip).unwrap();
        assert_eq!(json["confidence"], "");
        assert_eq!(json["finalEntry"], "");
        assert!(skip.is_skip());

        let scored = Classification {
            tags: "food".into(),
            confidence: Confidence::Score(0.7),
            final_entry: "entry".into(),
        };
        let json = serde_json::to_value(&scored).unwrap();
        assert_eq!(json["confidence"], 0.7);
        assert_eq!(scored.confidence.to_string(), "0.7");
    }

    #[test]
    fn test_rule_record_defaults() {
        let record: RuleRecord = serde_json::from_str(
            r#"{"id": "R001", "condition": "Narration CONTAINS", "pattern": "swiggy",
                "action_type": "CREATE_ENTRY", "action_value": "{}"}"#,
        )
        .unwrap();
        assert!(record.active);
        assert_eq!(record.priority, 0);
    }

    #[test]
    fn test_rule_record_lenient_fields() {
        let record: RuleRecord = serde_json::from_str(
            r#"{"id": "R002", "priority": "3", "active": "TRUE", "condition": "Narration CONTAINS"}"#,
        )
        .unwrap();
        assert!(record.active);
        assert_eq!(record.priority, 3);
        assert_eq!(record.pattern, "");
        assert_eq!(record.action_value, "");

        let record: RuleRecord =
            serde_json::from_str(r#"{"id": "R003", "priority": 2.0, "active": "no"}"#).unwrap();
        assert!(!record.active);
        assert_eq!(record.priority, 2);

        let record: RuleRecord =
            serde_json::from_str(r#"{"id": "R004", "priority": null, "active": null}"#).unwrap();
        assert!(record.active);
        assert_eq!(record.priority, 0);
    }
}
