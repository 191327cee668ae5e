//! Categorization for rows no rule matched
//!
//! Priority:
//! 1. LLM backend (if configured and injected)
//! 2. Keyword heuristic on user context, then narration
//!
//! `suggest` never fails: every LLM problem is logged and absorbed by the
//! heuristic.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use regex::RegexBuilder;
use tracing::{debug, warn};

use crate::accounts::AccountList;
use crate::ai::parsing::{parse_regex_reply, parse_suggestion};
use crate::ai::LlmBackend;
use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::models::{Suggestion, SuggestionSource, DEFAULT_PAYEE, OTHER_CHARGES_ACCOUNT};
use crate::prompts::{PromptId, PromptLibrary};

/// Highest confidence an LLM suggestion may carry
pub const MAX_LLM_CONFIDENCE: f64 = 0.95;

const LLM_DEFAULT_CONFIDENCE: f64 = 0.7;
const LLM_DEFAULT_TAGS: &str = "ai";

pub struct SuggestionEngine {
    config: LlmConfig,
    backend: Option<Arc<dyn LlmBackend>>,
    accounts: Option<AccountList>,
    prompts: Mutex<PromptLibrary>,
    default_payee: String,
}

impl SuggestionEngine {
    /// The backend is only used when `config` names a provider and an API key
    pub fn new(config: LlmConfig, backend: Option<Arc<dyn LlmBackend>>) -> Self {
        Self {
            config,
            backend,
            accounts: None,
            prompts: Mutex::new(PromptLibrary::new()),
            default_payee: DEFAULT_PAYEE.to_string(),
        }
    }

    pub fn heuristic_only() -> Self {
        Self::new(LlmConfig::default(), None)
    }

    /// Offer these accounts to the model in addition to the common shortlist
    pub fn with_accounts(mut self, accounts: AccountList) -> Self {
        self.accounts = Some(accounts).filter(|a| !a.is_empty());
        self
    }

    pub fn with_prompt_library(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = Mutex::new(prompts);
        self
    }

    /// Payee used when neither the model nor the user context names one
    pub fn with_default_payee(mut self, payee: impl Into<String>) -> Self {
        let payee = payee.into();
        if !payee.trim().is_empty() {
            self.default_payee = payee.trim().to_string();
        }
        self
    }

    pub fn default_payee(&self) -> &str {
        &self.default_payee
    }

    pub fn llm_enabled(&self) -> bool {
        self.backend.is_some() && self.config.is_configured()
    }

    fn backend(&self) -> Option<&dyn LlmBackend> {
        if !self.config.is_configured() {
            return None;
        }
        self.backend.as_deref()
    }

    /// Suggest account, payee, tags and confidence for a row
    pub fn suggest(&self, narration: &str, amount: f64, user_context: &str) -> Suggestion {
        match self.backend() {
            Some(backend) => match self.llm_suggestion(backend, narration, amount, user_context) {
                Ok(suggestion) => return suggestion,
                Err(e) => warn!("LLM suggestion failed for '{}', using heuristic: {}", narration, e),
            },
            None => debug!("LLM not configured, using heuristic for '{}'", narration),
        }

        heuristic_with_payee(narration, amount, user_context, &self.default_payee)
    }

    fn llm_suggestion(
        &self,
        backend: &dyn LlmBackend,
        narration: &str,
        amount: f64,
        user_context: &str,
    ) -> Result<Suggestion> {
        let amount_text = amount.to_string();
        let context = user_context.trim();
        let accounts = self
            .accounts
            .as_ref()
            .map(AccountList::prompt_listing)
            .unwrap_or_default();

        let mut vars = HashMap::new();
        vars.insert("narration", narration);
        vars.insert("amount", amount_text.as_str());
        vars.insert("user_context", if context.is_empty() { "none" } else { context });
        vars.insert("accounts", accounts.as_str());
        let prompt = self.render(PromptId::CategorizeTransaction, &vars)?;

        let start = Instant::now();
        let response = backend.complete(&prompt, self.config.temperature, self.config.max_tokens);
        debug!(
            model = backend.model(),
            latency_ms = start.elapsed().as_millis() as u64,
            ok = response.is_ok(),
            "LLM categorization call"
        );

        let response = response?;
        if response.trim().is_empty() {
            return Err(Error::Llm("Empty LLM response".into()));
        }

        let reply = parse_suggestion(&response)?;
        let confidence = reply
            .confidence
            .filter(|c| *c != 0.0 && c.is_finite())
            .unwrap_or(LLM_DEFAULT_CONFIDENCE)
            .clamp(0.0, MAX_LLM_CONFIDENCE);

        Ok(Suggestion {
            account: reply
                .account
                .unwrap_or_else(|| OTHER_CHARGES_ACCOUNT.to_string()),
            payee: Some(
                reply
                    .payee
                    .unwrap_or_else(|| payee_or_default(user_context, &self.default_payee)),
            ),
            tags: reply.tags.unwrap_or_else(|| LLM_DEFAULT_TAGS.to_string()),
            confidence,
            source: SuggestionSource::Llm,
        })
    }

    /// Ask the model for a regex matching the merchant in `narration`
    ///
    /// Unlike [`suggest`](Self::suggest), failures are returned: this backs
    /// interactive rule authoring, where the user needs to see what went wrong.
    pub fn suggest_regex(&self, narration: &str) -> Result<String> {
        let backend = self.backend().ok_or(Error::NotConfigured)?;

        let mut vars = HashMap::new();
        vars.insert("narration", narration);
        let prompt = self.render(PromptId::GenerateRegex, &vars)?;

        let response = backend.complete(&prompt, self.config.temperature, self.config.max_tokens)?;
        let pattern = parse_regex_reply(&response)?;

        RegexBuilder::new(&pattern).case_insensitive(true).build()?;
        debug!("Generated regex '{}' for '{}'", pattern, narration);
        Ok(pattern)
    }

    /// Send a tiny prompt to confirm the provider answers
    pub fn check_connection(&self) -> Result<String> {
        let backend = self.backend().ok_or(Error::NotConfigured)?;
        let reply = backend.complete("Test message", 0.1, 10)?;
        if reply.trim().is_empty() {
            return Err(Error::Llm("Empty LLM response".into()));
        }
        Ok(reply)
    }

    fn render(&self, id: PromptId, vars: &HashMap<&str, &str>) -> Result<String> {
        let mut prompts = lock(&self.prompts);
        Ok(prompts.get(id)?.render(vars))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn payee_or_default(user_context: &str, default_payee: &str) -> String {
    let context = user_context.trim();
    if context.is_empty() {
        default_payee.to_string()
    } else {
        context.to_string()
    }
}

/// Keyword categorization used when the LLM is unavailable or fails
pub fn heuristic_suggestion(narration: &str, amount: f64, user_context: &str) -> Suggestion {
    heuristic_with_payee(narration, amount, user_context, DEFAULT_PAYEE)
}

fn heuristic_with_payee(
    narration: &str,
    amount: f64,
    user_context: &str,
    default_payee: &str,
) -> Suggestion {
    let context = user_context.to_lowercase();
    let narration = narration.to_lowercase();

    let (account, tags, confidence) = if context.contains("food") {
        ("Expenses:Household:Food", "food", 0.7)
    } else if ["transport", "taxi", "auto"].iter().any(|k| context.contains(k)) {
        ("Expenses:Transport:Taxis", "transport", 0.7)
    } else if context.contains("thadi") {
        ("Expenses:Household:Other Household", "thadi", 0.7)
    } else if narration.contains("upi") && amount.abs() < 100.0 {
        ("Expenses:Household:Other Household", "thadi", 0.6)
    } else if narration.contains("salary") {
        ("Income:Employer:Salary", "salary", 0.8)
    } else {
        (OTHER_CHARGES_ACCOUNT, "other", 0.3)
    };

    Suggestion {
        account: account.to_string(),
        payee: Some(payee_or_default(user_context, default_payee)),
        tags: tags.to_string(),
        confidence,
        source: SuggestionSource::Heuristic,
    }
}
