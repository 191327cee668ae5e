//! Rule engine
//!
//! Rule records are compiled once into a [`RuleSet`]: conditions are parsed,
//! regexes built and action payloads validated. Records that fail compilation
//! are kept aside as [`RejectedRule`]s so one bad row in the rule sheet never
//! stops the others from being evaluated.
//!
//! Evaluation walks the set in order and returns the first rule whose
//! conditions all hold (AND, short-circuit).

mod action;
pub mod builder;
pub mod store;

pub use action::parse_action;

use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::ledger::{EntryDraft, EntryOptions, LedgerFormatter};
use crate::models::{Action, ActionType, ConditionKind, RuleOrder, RuleRecord, Transaction};

/// Confidence reported for every rule match
pub const RULE_CONFIDENCE: f64 = 1.0;

const CONDITION_SEPARATOR: &str = " AND ";
const PATTERN_SEPARATOR: char = ';';

#[derive(Debug, Clone)]
enum Matcher {
    /// Lowercased needle
    Contains(String),
    Regex(Regex),
    /// Pattern that failed to compile; never met
    InvalidRegex,
    /// `None` when the pattern is not a number; never met
    Amount(Option<f64>),
}

/// A single compiled `{field operator pattern}` check
#[derive(Debug, Clone)]
pub struct Condition {
    pub kind: ConditionKind,
    pub pattern: String,
    matcher: Matcher,
}

impl Condition {
    fn compile(rule_id: &str, kind: ConditionKind, pattern: &str) -> Self {
        let matcher = match kind {
            ConditionKind::NarrationContains | ConditionKind::UserContextContains => {
                Matcher::Contains(pattern.to_lowercase())
            }
            ConditionKind::NarrationRegex => {
                match RegexBuilder::new(pattern).case_insensitive(true).build() {
                    Ok(re) => Matcher::Regex(re),
                    Err(e) => {
                        warn!("Rule {}: invalid regex '{}': {}", rule_id, pattern, e);
                        Matcher::InvalidRegex
                    }
                }
            }
            ConditionKind::AmountEq | ConditionKind::AmountGt | ConditionKind::AmountLt => {
                let target = pattern.trim().parse::<f64>().ok();
                if target.is_none() {
                    warn!("Rule {}: amount pattern '{}' is not a number", rule_id, pattern);
                }
                Matcher::Amount(target)
            }
        };

        Self {
            kind,
            pattern: pattern.to_string(),
            matcher,
        }
    }

    pub fn is_met(&self, tx: &Transaction) -> bool {
        match &self.matcher {
            Matcher::Contains(needle) => {
                let haystack = match self.kind {
                    ConditionKind::UserContextContains => &tx.user_context,
                    _ => &tx.narration,
                };
                haystack.to_lowercase().contains(needle.as_str())
            }
            Matcher::Regex(re) => re.is_match(&tx.narration),
            Matcher::InvalidRegex | Matcher::Amount(None) => false,
            Matcher::Amount(Some(target)) => {
                let amount = tx.amount();
                match self.kind {
                    ConditionKind::AmountEq => cents(amount) == cents(*target),
                    ConditionKind::AmountGt => amount > *target,
                    ConditionKind::AmountLt => amount < *target,
                    _ => false,
                }
            }
        }
    }
}

fn cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// A compiled rule
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: String,
    pub priority: i64,
    pub active: bool,
    pub conditions: Vec<Condition>,
    pub action: Action,
}

impl Rule {
    /// Compile a record, ignoring its `active` flag
    pub fn compile(record: &RuleRecord) -> Result<Self> {
        let id = record.id.trim();
        let required = [
            ("condition", &record.condition),
            ("pattern", &record.pattern),
            ("action_type", &record.action_type),
            ("action_value", &record.action_value),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::invalid_rule(id, format!("missing {}", field)));
            }
        }

        let kinds = record
            .condition
            .split(CONDITION_SEPARATOR)
            .map(|c| c.parse::<ConditionKind>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::invalid_rule(id, e))?;
        let patterns: Vec<&str> = record.pattern.split(PATTERN_SEPARATOR).map(str::trim).collect();

        if kinds.len() != patterns.len() {
            return Err(Error::invalid_rule(
                id,
                format!(
                    "{} conditions but {} patterns",
                    kinds.len(),
                    patterns.len()
                ),
            ));
        }

        let conditions = kinds
            .into_iter()
            .zip(patterns)
            .map(|(kind, pattern)| Condition::compile(id, kind, pattern))
            .collect();

        let action_type: ActionType = record
            .action_type
            .parse()
            .map_err(|e: String| Error::invalid_rule(id, e))?;
        let action = parse_action(id, action_type, &record.action_value)?;

        Ok(Self {
            id: id.to_string(),
            priority: record.priority,
            active: record.active,
            conditions,
            action,
        })
    }

    /// First condition that does not hold for `tx`
    pub fn failing_condition(&self, tx: &Transaction) -> Option<&Condition> {
        self.conditions.iter().find(|c| !c.is_met(tx))
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        self.failing_condition(tx).is_none()
    }
}

/// A record that could not be compiled
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRule {
    pub id: String,
    pub reason: String,
}

/// Active, compiled rules in evaluation order
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
    rejected: Vec<RejectedRule>,
    order: RuleOrder,
}

impl RuleSet {
    /// Compile records, skipping inactive ones and collecting rejects
    pub fn compile<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a RuleRecord>,
    {
        let mut set = Self::default();

        for record in records {
            if !record.active {
                debug!("Rule {} is inactive, skipping", record.id);
                continue;
            }
            match Rule::compile(record) {
                Ok(rule) => set.rules.push(rule),
                Err(e) => {
                    warn!("Skipping rule {}: {}", record.id, e);
                    let reason = match e {
                        Error::InvalidRule { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    set.rejected.push(RejectedRule {
                        id: record.id.clone(),
                        reason,
                    });
                }
            }
        }

        debug!(
            active = set.rules.len(),
            rejected = set.rejected.len(),
            "Compiled rule set"
        );
        set
    }

    pub fn with_order(mut self, order: RuleOrder) -> Self {
        self.order = order;
        self
    }

    pub fn order(&self) -> RuleOrder {
        self.order
    }

    /// Rules in evaluation order
    pub fn ordered(&self) -> Vec<&Rule> {
        let mut rules: Vec<&Rule> = self.rules.iter().collect();
        if self.order == RuleOrder::Priority {
            rules.sort_by_key(|r| r.priority);
        }
        rules
    }

    /// First rule whose conditions all hold
    pub fn find_match(&self, tx: &Transaction) -> Option<&Rule> {
        self.ordered().into_iter().find(|rule| rule.matches(tx))
    }

    pub fn rejected(&self) -> &[RejectedRule] {
        &self.rejected
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Entry produced by a matching rule
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub rule_id: String,
    pub final_entry: String,
    pub tags: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    formatter: LedgerFormatter,
}

impl RuleEngine {
    pub fn new(formatter: LedgerFormatter) -> Self {
        Self { formatter }
    }

    /// Evaluate `rules` against `tx`; `None` when nothing matches or the row has no date
    pub fn evaluate(&self, tx: &Transaction, funding_account: &str, rules: &RuleSet) -> Option<RuleMatch> {
        let date = tx.date?;
        let rule = rules.find_match(tx)?;
        debug!("Rule {} matched '{}'", rule.id, tx.narration);

        Some(RuleMatch {
            rule_id: rule.id.clone(),
            final_entry: self.render(rule, tx, date, funding_account),
            tags: rule.action.tags.clone(),
            confidence: RULE_CONFIDENCE,
        })
    }

    /// Render the entry `rule` produces for `tx`, whether or not it matches
    pub fn render(
        &self,
        rule: &Rule,
        tx: &Transaction,
        date: chrono::NaiveDate,
        funding_account: &str,
    ) -> String {
        let action = &rule.action;
        let is_credit = match action.action_type {
            ActionType::CreateEntry => tx.is_credit(),
            ActionType::CreateTransfer => false,
        };
        let payee = action.payee.as_deref().unwrap_or(&tx.narration);

        let options = EntryOptions {
            user_context: action.include_user_context.then_some(tx.user_context.as_str()),
            narration: action.include_narration.then_some(tx.narration.as_str()),
            split: action.split.as_ref(),
        };

        self.formatter.format(&EntryDraft {
            date,
            payee,
            target_account: &action.account,
            amount: tx.amount(),
            funding_account,
            is_credit,
            tags: &action.tags,
            options,
        })
    }
}
