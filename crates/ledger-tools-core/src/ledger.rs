//! ledger-cli entry rendering
//!
//! Amounts are handled as integer minor units (cents/paise) so split postings always
//! add back up to the statement amount. Share rounding works on whole currency units,
//! matching how the entries have always been produced: "your" share takes the odd
//! unit on even splits, and the last custom share absorbs whatever is left.

use chrono::NaiveDate;

use crate::models::{Split, SplitShare};

/// Default currency prefix for posting amounts
pub const DEFAULT_CURRENCY_SYMBOL: &str = "₹";

const INDENT: &str = "    ";
const AMOUNT_GAP: &str = "    ";

/// Convert a statement amount into absolute minor units
pub fn to_cents(amount: f64) -> i64 {
    (amount.abs() * 100.0).round() as i64
}

/// One account line of an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub account: String,
    /// Explicit amount in minor units; `None` is the balancing posting
    pub amount_cents: Option<i64>,
}

impl Posting {
    fn with_amount(account: &str, cents: i64) -> Self {
        Self {
            account: account.to_string(),
            amount_cents: Some(cents),
        }
    }

    fn balancing(account: &str) -> Self {
        Self {
            account: account.to_string(),
            amount_cents: None,
        }
    }
}

/// Optional parts of an entry
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryOptions<'a> {
    /// Written as the first comment line when non-blank
    pub user_context: Option<&'a str>,
    /// Written as a comment after the user context when non-blank
    pub narration: Option<&'a str>,
    pub split: Option<&'a Split>,
}

/// Everything needed to render one transaction
#[derive(Debug, Clone, Copy)]
pub struct EntryDraft<'a> {
    pub date: NaiveDate,
    pub payee: &'a str,
    pub target_account: &'a str,
    pub amount: f64,
    pub funding_account: &'a str,
    pub is_credit: bool,
    /// Comma-separated tags
    pub tags: &'a str,
    pub options: EntryOptions<'a>,
}

/// A built entry, ready to render
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub date: NaiveDate,
    pub payee: String,
    pub comments: Vec<String>,
    pub tags: Vec<String>,
    pub postings: Vec<Posting>,
}

impl LedgerEntry {
    /// Sum of all postings that carry an explicit amount
    pub fn explicit_total_cents(&self) -> i64 {
        self.postings.iter().filter_map(|p| p.amount_cents).sum()
    }

    pub fn render(&self, currency_symbol: &str) -> String {
        let mut out = format!("{} {}", self.date.format("%Y/%m/%d"), self.payee);

        for comment in &self.comments {
            out.push('\n');
            out.push_str(INDENT);
            out.push(';');
            out.push_str(comment);
        }

        if !self.tags.is_empty() {
            let line = self
                .tags
                .iter()
                .map(|t| format!(";{}", t))
                .collect::<Vec<_>>()
                .join(" ");
            out.push('\n');
            out.push_str(INDENT);
            out.push_str(&line);
        }

        for posting in &self.postings {
            out.push('\n');
            out.push_str(INDENT);
            out.push_str(&posting.account);
            if let Some(cents) = posting.amount_cents {
                out.push_str(AMOUNT_GAP);
                out.push_str(&format_amount(cents, currency_symbol));
            }
        }

        out
    }
}

/// Format minor units as `<symbol>1234.50`
pub fn format_amount(cents: i64, currency_symbol: &str) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.abs();
    format!("{}{}{}.{:02}", sign, currency_symbol, abs / 100, abs % 100)
}

/// Renders transaction decisions as ledger-cli text
#[derive(Debug, Clone)]
pub struct LedgerFormatter {
    currency_symbol: String,
}

impl Default for LedgerFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_CURRENCY_SYMBOL)
    }
}

impl LedgerFormatter {
    pub fn new(currency_symbol: impl Into<String>) -> Self {
        Self {
            currency_symbol: currency_symbol.into(),
        }
    }

    pub fn currency_symbol(&self) -> &str {
        &self.currency_symbol
    }

    /// Build and render an entry
    pub fn format(&self, draft: &EntryDraft<'_>) -> String {
        self.build(draft).render(&self.currency_symbol)
    }

    /// Build the structured entry without rendering it
    pub fn build(&self, draft: &EntryDraft<'_>) -> LedgerEntry {
        let total = to_cents(draft.amount);

        let mut comments = Vec::new();
        if let Some(context) = non_blank(draft.options.user_context) {
            comments.push(context.to_string());
        }
        if let Some(narration) = non_blank(draft.options.narration) {
            comments.push(narration.to_string());
        }

        let tags = draft
            .tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        let postings = match draft.options.split {
            // Splits model shared expenses; income is never shared
            Some(split) if !draft.is_credit => split_postings(
                split,
                draft.target_account,
                draft.funding_account,
                total,
            ),
            _ => simple_postings(draft, total),
        };

        LedgerEntry {
            date: draft.date,
            payee: draft.payee.to_string(),
            comments,
            tags,
            postings,
        }
    }
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

fn simple_postings(draft: &EntryDraft<'_>, total: i64) -> Vec<Posting> {
    if draft.is_credit {
        vec![
            Posting::with_amount(draft.funding_account, total),
            Posting::balancing(draft.target_account),
        ]
    } else {
        vec![
            Posting::with_amount(draft.target_account, total),
            Posting::balancing(draft.funding_account),
        ]
    }
}

fn split_postings(split: &Split, target: &str, funding: &str, total: i64) -> Vec<Posting> {
    let mut postings = Vec::new();

    match split {
        Split::FiftyFifty { account } => {
            let yours = ceil_share(total, 2);
            postings.push(Posting::with_amount(target, yours));
            postings.push(Posting::with_amount(account, total - yours));
        }
        Split::ThreeWay { accounts } => {
            let yours = ceil_share(total, 3);
            let remaining = total - yours;
            let first = floor_units(remaining / 2);
            postings.push(Posting::with_amount(target, yours));
            postings.push(Posting::with_amount(&accounts[0], first));
            postings.push(Posting::with_amount(&accounts[1], remaining - first));
        }
        Split::Custom {
            your_share_percent,
            shares,
        } => {
            let yours = percent_share(total, *your_share_percent);
            postings.push(Posting::with_amount(target, yours));
            postings.extend(custom_shares(shares, total, total - yours));
        }
    }

    postings.push(Posting::balancing(funding));
    postings
}

fn custom_shares(shares: &[SplitShare], total: i64, mut remaining: i64) -> Vec<Posting> {
    let last = shares.len().saturating_sub(1);
    shares
        .iter()
        .enumerate()
        .map(|(i, share)| {
            let amount = if i == last {
                remaining
            } else {
                let amount = percent_share(total, share.percent);
                remaining -= amount;
                amount
            };
            Posting::with_amount(&share.account, amount)
        })
        .collect()
}

/// `ceil(total / parts)` in whole units, capped at the total
fn ceil_share(total: i64, parts: i64) -> i64 {
    let unit = parts * 100;
    let units = total / unit + i64::from(total % unit != 0);
    units.saturating_mul(100).min(total)
}

/// Round minor units down to whole units
fn floor_units(cents: i64) -> i64 {
    cents / 100 * 100
}

/// `floor(total * percent / 100)` in whole units
fn percent_share(total: i64, percent: f64) -> i64 {
    let units = (total as f64 / 100.0) * percent / 100.0;
    (units.floor() as i64).saturating_mul(100).clamp(0, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 9).unwrap()
    }

    fn draft<'a>(amount: f64, is_credit: bool, split: Option<&'a Split>) -> EntryDraft<'a> {
        EntryDraft {
            date: date(),
            payee: "Swiggy",
            target_account: "Expenses:Household:Food",
            amount,
            funding_account: "Assets:Checking:X",
            is_credit,
            tags: "",
            options: EntryOptions {
                split,
                ..Default::default()
            },
        }
    }

    fn amounts(entry: &LedgerEntry) -> Vec<Option<i64>> {
        entry.postings.iter().map(|p| p.amount_cents).collect()
    }

    #[test]
    fn test_expense_entry() {
        let formatter = LedgerFormatter::default();
        let text = formatter.format(&draft(250.0, false, None));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "2024/07/09 Swiggy");
        assert_eq!(lines[1], "    Expenses:Household:Food    ₹250.00");
        assert_eq!(lines[2], "    Assets:Checking:X");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_credit_entry_puts_funding_first() {
        let formatter = LedgerFormatter::default();
        let mut d = draft(45000.5, true, None);
        d.target_account = "Income:Employer:Salary";
        let text = formatter.format(&d);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "    Assets:Checking:X    ₹45000.50");
        assert_eq!(lines[2], "    Income:Employer:Salary");
    }

    #[test]
    fn test_negative_amount_uses_absolute_value() {
        let entry = LedgerFormatter::default().build(&draft(-99.99, false, None));
        assert_eq!(entry.postings[0].amount_cents, Some(9999));
    }

    #[test]
    fn test_comments_and_tags() {
        let formatter = LedgerFormatter::default();
        let mut d = draft(120.0, false, None);
        d.tags = "food, swiggy,,late night";
        d.options.user_context = Some("  dinner with team ");
        d.options.narration = Some("UPI/SWIGGY/1234");
        let text = formatter.format(&d);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "    ;dinner with team");
        assert_eq!(lines[2], "    ;UPI/SWIGGY/1234");
        assert_eq!(lines[3], "    ;food ;swiggy ;late night");
        assert_eq!(lines[4], "    Expenses:Household:Food    ₹120.00");
    }

    #[test]
    fn test_blank_comments_are_dropped() {
        let mut d = draft(10.0, false, None);
        d.options.user_context = Some("   ");
        d.tags = " ";
        let entry = LedgerFormatter::default().build(&d);
        assert!(entry.comments.is_empty());
        assert!(entry.tags.is_empty());
    }

    #[test]
    fn test_fifty_fifty_odd_total() {
        let split = Split::FiftyFifty {
            account: "Liabilities:Payables:Ananya".into(),
        };
        let entry = LedgerFormatter::default().build(&draft(101.0, false, Some(&split)));
        assert_eq!(amounts(&entry), vec![Some(5100), Some(5000), None]);
        assert_eq!(entry.postings[1].account, "Liabilities:Payables:Ananya");
        assert_eq!(entry.postings[2].account, "Assets:Checking:X");
        assert_eq!(entry.explicit_total_cents(), 10100);
    }

    #[test]
    fn test_fifty_fifty_with_fraction() {
        let split = Split::FiftyFifty {
            account: "Liabilities:Payables:Anna".into(),
        };
        let entry = LedgerFormatter::default().build(&draft(101.5, false, Some(&split)));
        assert_eq!(amounts(&entry), vec![Some(5100), Some(5050), None]);
        assert_eq!(entry.explicit_total_cents(), 10150);
    }

    #[test]
    fn test_three_way() {
        let split = Split::ThreeWay {
            accounts: ["Liabilities:Payables:Akshu".into(), "Liabilities:Payables:Anna".into()],
        };
        let entry = LedgerFormatter::default().build(&draft(100.0, false, Some(&split)));
        assert_eq!(amounts(&entry), vec![Some(3400), Some(3300), Some(3300), None]);

        let entry = LedgerFormatter::default().build(&draft(1001.0, false, Some(&split)));
        // 334 for you, 667 left: 333 + 334
        assert_eq!(amounts(&entry), vec![Some(33400), Some(33300), Some(33400), None]);
        assert_eq!(entry.explicit_total_cents(), 100100);
    }

    #[test]
    fn test_custom_last_share_absorbs_rounding() {
        let split = Split::Custom {
            your_share_percent: 40.0,
            shares: vec![
                SplitShare {
                    account: "Liabilities:Payables:Akshu".into(),
                    percent: 35.0,
                },
                SplitShare {
                    account: "Liabilities:Payables:Anna".into(),
                    percent: 25.0,
                },
            ],
        };
        let entry = LedgerFormatter::default().build(&draft(999.0, false, Some(&split)));
        // floor(399.6) = 399, floor(349.65) = 349, last gets 999 - 399 - 349 = 251
        assert_eq!(amounts(&entry), vec![Some(39900), Some(34900), Some(25100), None]);
        assert_eq!(entry.explicit_total_cents(), 99900);
    }

    #[test]
    fn test_custom_fractional_percent_sums_exactly() {
        let split = Split::Custom {
            your_share_percent: 33.3,
            shares: vec![
                SplitShare {
                    account: "A".into(),
                    percent: 33.3,
                },
                SplitShare {
                    account: "B".into(),
                    percent: 33.4,
                },
            ],
        };
        for amount in [1000.0, 777.77, 12.34, 5.0, 100000.01] {
            let entry = LedgerFormatter::default().build(&draft(amount, false, Some(&split)));
            assert_eq!(entry.explicit_total_cents(), to_cents(amount), "amount {}", amount);
            assert_eq!(entry.postings.len(), 4);
        }
    }

    #[test]
    fn test_split_ignored_for_credit() {
        let split = Split::FiftyFifty {
            account: "Liabilities:Payables:Ananya".into(),
        };
        let entry = LedgerFormatter::default().build(&draft(500.0, true, Some(&split)));
        assert_eq!(entry.postings.len(), 2);
        assert_eq!(entry.postings[0].account, "Assets:Checking:X");
        assert_eq!(entry.postings[0].amount_cents, Some(50000));
    }

    #[test]
    fn test_split_sums_for_many_totals() {
        let fifty = Split::FiftyFifty { account: "P".into() };
        let three = Split::ThreeWay {
            accounts: ["P1".into(), "P2".into()],
        };
        for cents in [1_i64, 99, 100, 101, 250, 1001, 33333, 1_000_001] {
            let amount = cents as f64 / 100.0;
            for split in [&fifty, &three] {
                let entry = LedgerFormatter::default().build(&draft(amount, false, Some(split)));
                assert_eq!(entry.explicit_total_cents(), cents);
                assert!(entry.postings.iter().all(|p| p.amount_cents.unwrap_or(0) >= 0));
            }
        }
    }

    #[test]
    fn test_huge_amounts_do_not_overflow() {
        let custom = Split::Custom {
            your_share_percent: 50.0,
            shares: vec![SplitShare {
                account: "P".into(),
                percent: 50.0,
            }],
        };
        let three = Split::ThreeWay {
            accounts: ["P1".into(), "P2".into()],
        };
        let fifty = Split::FiftyFifty { account: "P".into() };

        for split in [&fifty, &three, &custom] {
            let entry = LedgerFormatter::default().build(&draft(1e300, false, Some(split)));
            let total = to_cents(1e300);
            assert_eq!(total, i64::MAX);
            for posting in &entry.postings {
                let cents = posting.amount_cents.unwrap_or(0);
                assert!((0..=total).contains(&cents), "{}", split.kind());
            }
        }
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(25000, "₹"), "₹250.00");
        assert_eq!(format_amount(5, "$"), "$0.05");
        assert_eq!(format_amount(-150, "₹"), "-₹1.50");
    }

    #[test]
    fn test_custom_currency_symbol() {
        let text = LedgerFormatter::new("$").format(&draft(12.5, false, None));
        assert!(text.contains("Expenses:Household:Food    $12.50"));
    }
}
