//! Helpers for authoring rules: dry runs, previews and id allocation

use chrono::{Local, NaiveDate};

use crate::error::Result;
use crate::ledger::{EntryDraft, EntryOptions, LedgerFormatter};
use crate::models::{ActionType, ConditionKind, RuleRecord, Transaction};

use super::Rule;

pub const PREVIEW_FUNDING_ACCOUNT: &str = "Assets:Checking:Punjab National Bank";
pub const PREVIEW_AMOUNT: f64 = 100.0;
pub const PREVIEW_PAYEE: &str = "Sample Transaction";
const PREVIEW_USER_CONTEXT: &str = "Sample User Context";
const PREVIEW_NARRATION: &str = "Sample Narration";

/// Outcome of dry-running one rule against one transaction
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTestResult {
    pub matches: bool,
    pub failed_condition: Option<ConditionKind>,
    pub failed_pattern: Option<String>,
}

/// Check whether `record` would match `tx`, regardless of its `active` flag
pub fn test_rule(record: &RuleRecord, tx: &Transaction) -> Result<RuleTestResult> {
    let rule = Rule::compile(record)?;

    Ok(match rule.failing_condition(tx) {
        Some(condition) => RuleTestResult {
            matches: false,
            failed_condition: Some(condition.kind),
            failed_pattern: Some(condition.pattern.clone()),
        },
        None => RuleTestResult {
            matches: true,
            failed_condition: None,
            failed_pattern: None,
        },
    })
}

/// Render the entry `record` would produce, filling gaps with sample values
///
/// The sample's date is used when present, otherwise today.
pub fn preview_rule(
    record: &RuleRecord,
    sample: Option<&Transaction>,
    formatter: &LedgerFormatter,
) -> Result<String> {
    let rule = Rule::compile(record)?;
    let action = &rule.action;

    let amount = sample
        .map(Transaction::amount)
        .filter(|a| *a != 0.0)
        .unwrap_or(PREVIEW_AMOUNT);
    let is_credit = match action.action_type {
        ActionType::CreateEntry => sample.is_some_and(Transaction::is_credit),
        ActionType::CreateTransfer => false,
    };
    let date = sample
        .and_then(|s| s.date)
        .unwrap_or_else(today);

    let user_context = action.include_user_context.then(|| {
        sample
            .map(|s| s.user_context.trim())
            .filter(|c| !c.is_empty())
            .unwrap_or(PREVIEW_USER_CONTEXT)
    });
    let narration = action.include_narration.then(|| {
        sample
            .map(|s| s.narration.trim())
            .filter(|n| !n.is_empty())
            .unwrap_or(PREVIEW_NARRATION)
    });

    Ok(formatter.format(&EntryDraft {
        date,
        payee: action.payee.as_deref().unwrap_or(PREVIEW_PAYEE),
        target_account: &action.account,
        amount,
        funding_account: PREVIEW_FUNDING_ACCOUNT,
        is_credit,
        tags: &action.tags,
        options: EntryOptions {
            user_context,
            narration,
            split: action.split.as_ref(),
        },
    }))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Next free `R###` id after the highest existing one
pub fn next_rule_id<'a, I>(records: I) -> String
where
    I: IntoIterator<Item = &'a RuleRecord>,
{
    let max = records
        .into_iter()
        .filter_map(|r| r.id.trim().strip_prefix('R'))
        .map(|digits| {
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                digits.parse::<u64>().unwrap_or(0)
            } else {
                0
            }
        })
        .max()
        .unwrap_or(0);

    format!("R{:03}", max + 1)
}
