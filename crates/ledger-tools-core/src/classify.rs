//! Row classification: rules first, suggestions second, formatting last
//!
//! The flow for one row:
//! 1. Skip rows without a narration, an amount or a date
//! 2. Try the rule set (unless the mode is `llm_only`)
//! 3. Ask the suggestion engine (unless the mode is `rules`)
//! 4. Render the suggestion as a plain, non-split entry

use tracing::debug;

use crate::error::{Error, Result};
use crate::ledger::{EntryDraft, EntryOptions, LedgerFormatter};
use crate::models::{Classification, Confidence, ProcessingMode, Transaction};
use crate::rules::{RuleEngine, RuleSet};
use crate::suggest::SuggestionEngine;

pub struct TransactionClassifier {
    rules: RuleSet,
    engine: RuleEngine,
    suggestions: SuggestionEngine,
    formatter: LedgerFormatter,
}

impl TransactionClassifier {
    pub fn new(rules: RuleSet, suggestions: SuggestionEngine) -> Self {
        Self::with_formatter(rules, suggestions, LedgerFormatter::default())
    }

    pub fn with_formatter(
        rules: RuleSet,
        suggestions: SuggestionEngine,
        formatter: LedgerFormatter,
    ) -> Self {
        Self {
            rules,
            engine: RuleEngine::new(formatter.clone()),
            suggestions,
            formatter,
        }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn suggestions(&self) -> &SuggestionEngine {
        &self.suggestions
    }

    /// Classify one row
    ///
    /// Fails only when `funding_account` is blank; unclassifiable rows yield
    /// [`Classification::skip`].
    pub fn classify(
        &self,
        tx: &Transaction,
        funding_account: &str,
        mode: ProcessingMode,
    ) -> Result<Classification> {
        let funding_account = funding_account.trim();
        if funding_account.is_empty() {
            return Err(Error::InvalidData("Funding account is required".into()));
        }

        let Some(date) = tx.date.filter(|_| tx.is_processable()) else {
            debug!("Skipping row with missing narration, amount or date");
            return Ok(Classification::skip());
        };

        if mode != ProcessingMode::LlmOnly {
            if let Some(m) = self.engine.evaluate(tx, funding_account, &self.rules) {
                return Ok(Classification {
                    tags: m.tags,
                    confidence: Confidence::Score(m.confidence),
                    final_entry: m.final_entry,
                });
            }
            if mode == ProcessingMode::Rules {
                debug!("No rule matched '{}' in rules mode", tx.narration);
                return Ok(Classification::skip());
            }
        }

        let amount = tx.amount();
        let suggestion = self.suggestions.suggest(&tx.narration, amount, &tx.user_context);

        let context = tx.user_context.trim();
        let payee = suggestion
            .payee
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(if context.is_empty() {
                self.suggestions.default_payee()
            } else {
                context
            });

        let final_entry = self.formatter.format(&EntryDraft {
            date,
            payee,
            target_account: &suggestion.account,
            amount,
            funding_account,
            is_credit: tx.is_credit(),
            tags: &suggestion.tags,
            options: EntryOptions::default(),
        });

        Ok(Classification {
            tags: suggestion.tags,
            confidence: Confidence::Score(suggestion.confidence),
            final_entry,
        })
    }
}
