//! Chart of accounts offered to the LLM and to rule authors

use serde::{Deserialize, Serialize};

use crate::models::OTHER_CHARGES_ACCOUNT;

/// Top-level ledger account class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountKind {
    Expense,
    Income,
    Asset,
    Liability,
    Equity,
}

impl AccountKind {
    /// Classify an account name by its first segment
    pub fn from_account(name: &str) -> Option<Self> {
        match name.split(':').next()?.trim() {
            "Expenses" => Some(Self::Expense),
            "Income" => Some(Self::Income),
            "Assets" => Some(Self::Asset),
            "Liabilities" => Some(Self::Liability),
            "Equity" => Some(Self::Equity),
            _ => None,
        }
    }
}

/// Seed chart used when the user has not supplied one
const DEFAULT_CHART: &[(&str, AccountKind)] = &[
    ("Expenses:Entertainment:Dining Out", AccountKind::Expense),
    ("Expenses:Entertainment:Movies & Shows", AccountKind::Expense),
    ("Expenses:Entertainment:Other Entertainment", AccountKind::Expense),
    ("Expenses:Entertainment:Parties", AccountKind::Expense),
    ("Expenses:Household:Alcohol", AccountKind::Expense),
    ("Expenses:Household:Food", AccountKind::Expense),
    ("Expenses:Household:Groceries", AccountKind::Expense),
    ("Expenses:Household:Health and Wellness", AccountKind::Expense),
    ("Expenses:Household:Help", AccountKind::Expense),
    ("Expenses:Household:Medicines", AccountKind::Expense),
    ("Expenses:Household:Other Household", AccountKind::Expense),
    ("Expenses:Household:Biduiee", AccountKind::Expense),
    ("Expenses:Rent:House", AccountKind::Expense),
    ("Expenses:Rent:Internet and Phone", AccountKind::Expense),
    ("Expenses:Rent:Washing Machine", AccountKind::Expense),
    ("Expenses:Shopping:Clothes and Apparels", AccountKind::Expense),
    ("Expenses:Shopping:Electronics and Accessories", AccountKind::Expense),
    ("Expenses:Shopping:Gifts", AccountKind::Expense),
    ("Expenses:Shopping:Other Shopping", AccountKind::Expense),
    ("Expenses:Shopping:Subscriptions and Digital Purchases", AccountKind::Expense),
    ("Expenses:Transport:Fuel", AccountKind::Expense),
    ("Expenses:Transport:Taxis", AccountKind::Expense),
    ("Expenses:Travel", AccountKind::Expense),
    ("Expenses:Travel:General", AccountKind::Expense),
    ("Expenses:Travel:Stay", AccountKind::Expense),
    ("Expenses:Travel:Misc. Expenses", AccountKind::Expense),
    ("Expenses:Travel:Trains and Flights", AccountKind::Expense),
    ("Expenses:Travel:Buses and Cabs", AccountKind::Expense),
    ("Expenses:Utilities:Electricity", AccountKind::Expense),
    ("Expenses:Utilities:Gas", AccountKind::Expense),
    ("Expenses:Utilities:Other Utilities", AccountKind::Expense),
    ("Expenses:Utilities:Water", AccountKind::Expense),
    ("Expenses:Others:To Family", AccountKind::Expense),
    ("Expenses:Others:Other Charges", AccountKind::Expense),
    ("Expenses:Others:Insurance Premium", AccountKind::Expense),
    ("Expenses:Others:Taxes", AccountKind::Expense),
    ("Income:Employer:Salary", AccountKind::Income),
    ("Income:Employer:Bonus", AccountKind::Income),
    ("Income:Others", AccountKind::Income),
    ("Income:Reimbursements", AccountKind::Income),
    ("Income:Refund:Credit Card:SBI", AccountKind::Income),
    ("Assets:Checking", AccountKind::Asset),
    ("Assets:Checking:Bank of Baroda", AccountKind::Asset),
    ("Assets:Checking:Punjab National Bank", AccountKind::Asset),
    ("Assets:Checking:Wallet", AccountKind::Asset),
    ("Assets:Mutual Funds:Canara Robeco ELSS", AccountKind::Asset),
    ("Assets:Mutual Funds:Liquid Fund", AccountKind::Asset),
    ("Assets:Mutual Funds:Mirae ELSS", AccountKind::Asset),
    ("Assets:Mutual Funds:Quant ELSS", AccountKind::Asset),
    ("Assets:Mutual Funds:DSP ELSS", AccountKind::Asset),
    ("Assets:Mutual Funds:Quant Active", AccountKind::Asset),
    ("Assets:Other Investments:Employee Provident Fund", AccountKind::Asset),
    ("Assets:Other Investments:NPS", AccountKind::Asset),
    ("Assets:Other Investments:Public Provident Fund", AccountKind::Asset),
    ("Assets:Receivables:Misc Receivables", AccountKind::Asset),
    ("Assets:Receivables:Advance Payments", AccountKind::Asset),
    ("Assets:Shares:AU Bank", AccountKind::Asset),
    ("Assets:Shares:LIC", AccountKind::Asset),
    ("Assets:Other Assets:Secutity Deposit", AccountKind::Asset),
    ("Liabilities:Payables:Akshu", AccountKind::Liability),
    ("Liabilities:Payables:Ananya", AccountKind::Liability),
    ("Liabilities:Payables:Anna", AccountKind::Liability),
    ("Liabilities:Payables:Misc Payables", AccountKind::Liability),
    ("Liabilities:Payables:Mummy", AccountKind::Liability),
    ("Liabilities:Other Liabilities:Akshara Investment", AccountKind::Liability),
    ("Liabilities:Other Liabilities:Akshu Investment", AccountKind::Liability),
    ("Liabilities:Credit Card:SBI", AccountKind::Liability),
    ("Equity", AccountKind::Equity),
];

/// Ordered, de-duplicated list of account names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountList {
    accounts: Vec<String>,
}

impl AccountList {
    pub fn new<I, S>(accounts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Self::default();
        for account in accounts {
            list.push(account.into());
        }
        list
    }

    pub fn default_chart() -> Self {
        Self::new(DEFAULT_CHART.iter().map(|(name, _)| *name))
    }

    /// Three accounts that are always valid targets
    pub fn fallback() -> Self {
        Self::new([
            OTHER_CHARGES_ACCOUNT,
            "Expenses:Household:Food",
            "Expenses:Transport:Taxis",
        ])
    }

    /// One account per line; blank lines are ignored
    pub fn from_lines(text: &str) -> Self {
        Self::new(text.lines())
    }

    fn push(&mut self, account: String) {
        let account = account.trim();
        if account.is_empty() || self.contains(account) {
            return;
        }
        self.accounts.push(account.to_string());
    }

    pub fn contains(&self, account: &str) -> bool {
        self.accounts.iter().any(|a| a == account.trim())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.accounts.iter().map(String::as_str)
    }

    pub fn of_kind(&self, kind: AccountKind) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(move |a| AccountKind::from_account(a) == Some(kind))
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// `- account` lines for the categorization prompt
    pub fn prompt_listing(&self) -> String {
        self.iter()
            .map(|a| format!("- {}", a))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
