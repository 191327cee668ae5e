//! Ledger Tools Core Library
//!
//! Turns bank statement rows into ledger-cli entries:
//! - Rule engine with AND-ed narration / amount / user-context conditions
//! - Rule store loading from JSON or the CSV rule sheet, plus authoring helpers
//! - Pluggable LLM backend for categorizing rows no rule matched
//! - Keyword heuristic fallback when the LLM is missing or misbehaves
//! - Ledger formatter with exact expense-split arithmetic
//! - Prompt library with override files
//! - Batch processing of statement CSV exports

pub mod accounts;
pub mod ai;
pub mod batch;
pub mod classify;
pub mod config;
pub mod error;
pub mod import;
pub mod ledger;
pub mod models;
pub mod prompts;
pub mod rules;
pub mod suggest;

pub use accounts::{AccountKind, AccountList};
pub use ai::{LlmBackend, MockBackend};
pub use batch::{BatchProcessor, BatchReport, InputRow, RowOutcome, RowReport, SkipReason};
pub use classify::TransactionClassifier;
pub use config::{Config, LedgerConfig, LlmConfig, ProcessingOptions};
pub use error::{Error, Result};
pub use import::{read_rows, write_outcomes, ColumnMapping};
pub use ledger::{EntryDraft, EntryOptions, LedgerEntry, LedgerFormatter, Posting};
pub use models::{
    Action, ActionType, Classification, ConditionKind, Confidence, ProcessingMode, RuleOrder,
    RuleRecord, Split, SplitShare, Suggestion, SuggestionSource, Transaction,
};
pub use prompts::{Prompt, PromptId, PromptLibrary};
pub use rules::{RejectedRule, Rule, RuleEngine, RuleMatch, RuleSet};
pub use suggest::{heuristic_suggestion, SuggestionEngine};
