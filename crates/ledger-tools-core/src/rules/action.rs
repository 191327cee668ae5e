//! Rule action payloads
//!
//! Payloads are stored as JSON; single-quoted JSON is accepted by swapping
//! every `'` for `"` before parsing.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::{Action, ActionType, Split, SplitShare};

const PERCENT_EPSILON: f64 = 1e-6;

/// Payload format understood by this version of the rule engine
pub const ACTION_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
struct ActionPayload {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    account: Option<String>,
    #[serde(default)]
    to_account: Option<String>,
    #[serde(default)]
    payee: Option<String>,
    #[serde(default)]
    tags: Option<String>,
    #[serde(default)]
    include_user_context: bool,
    #[serde(default)]
    include_narration: bool,
    #[serde(default)]
    split_type: Option<String>,
    #[serde(default)]
    split_config: Option<SplitConfigPayload>,
}

#[derive(Debug, Default, Deserialize)]
struct SplitConfigPayload {
    #[serde(default)]
    split_account: Option<String>,
    #[serde(default)]
    split_accounts: Vec<String>,
    #[serde(default)]
    your_share_percent: Option<f64>,
    #[serde(default)]
    custom_splits: Vec<SplitShare>,
}

/// Parse and validate an action payload for rule `id`
pub fn parse_action(id: &str, action_type: ActionType, value: &str) -> Result<Action> {
    let cleaned = value.replace('\'', "\"");
    let payload: ActionPayload = serde_json::from_str(&cleaned)
        .map_err(|e| Error::invalid_rule(id, format!("invalid action JSON: {}", e)))?;

    if payload.version != ACTION_FORMAT_VERSION {
        return Err(Error::invalid_rule(
            id,
            format!("unsupported action format version {}", payload.version),
        ));
    }

    let account = match action_type {
        ActionType::CreateEntry => non_blank(payload.account),
        ActionType::CreateTransfer => non_blank(payload.to_account).or(non_blank(payload.account)),
    }
    .ok_or_else(|| {
        let field = match action_type {
            ActionType::CreateEntry => "account",
            ActionType::CreateTransfer => "to_account",
        };
        Error::invalid_rule(id, format!("{} requires `{}`", action_type, field))
    })?;

    let split = match payload.split_type.as_deref().map(str::trim) {
        None | Some("") | Some("none") => None,
        Some(kind) => Some(parse_split(
            id,
            kind,
            payload.split_config.unwrap_or_default(),
        )?),
    };

    Ok(Action {
        action_type,
        account,
        payee: non_blank(payload.payee),
        tags: payload.tags.unwrap_or_default(),
        include_user_context: payload.include_user_context,
        include_narration: payload.include_narration,
        split,
    })
}

fn parse_split(id: &str, kind: &str, config: SplitConfigPayload) -> Result<Split> {
    match kind {
        "fifty_fifty" => {
            let account = non_blank(config.split_account)
                .ok_or_else(|| Error::invalid_rule(id, "fifty_fifty split requires `split_account`"))?;
            Ok(Split::FiftyFifty { account })
        }
        "three_way" => {
            let accounts: Vec<String> = config
                .split_accounts
                .into_iter()
                .filter_map(|a| non_blank(Some(a)))
                .collect();
            match <[String; 2]>::try_from(accounts) {
                Ok(accounts) => Ok(Split::ThreeWay { accounts }),
                Err(_) => Err(Error::invalid_rule(
                    id,
                    "three_way split requires two `split_accounts`",
                )),
            }
        }
        "custom" => {
            let your_share_percent = config
                .your_share_percent
                .ok_or_else(|| Error::invalid_rule(id, "custom split requires `your_share_percent`"))?;
            if !(0.0..=100.0).contains(&your_share_percent) {
                return Err(Error::invalid_rule(
                    id,
                    format!("your_share_percent out of range: {}", your_share_percent),
                ));
            }
            if config.custom_splits.is_empty() {
                return Err(Error::invalid_rule(id, "custom split requires `custom_splits`"));
            }

            let mut shares = Vec::with_capacity(config.custom_splits.len());
            for share in config.custom_splits {
                let account = share.account.trim();
                if account.is_empty() || share.percent <= 0.0 {
                    return Err(Error::invalid_rule(
                        id,
                        "custom split entries need an account and a positive percent",
                    ));
                }
                shares.push(SplitShare {
                    account: account.to_string(),
                    percent: share.percent,
                });
            }

            let total = your_share_percent + shares.iter().map(|s| s.percent).sum::<f64>();
            if (total - 100.0).abs() > PERCENT_EPSILON {
                return Err(Error::invalid_rule(
                    id,
                    format!("custom split percentages total {} instead of 100", total),
                ));
            }

            Ok(Split::Custom {
                your_share_percent,
                shares,
            })
        }
        other => Err(Error::invalid_rule(id, format!("unknown split_type `{}`", other))),
    }
}

fn default_version() -> u32 {
    ACTION_FORMAT_VERSION
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(err: Error) -> String {
        match err {
            Error::InvalidRule { reason, .. } => reason,
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_single_quoted_payload() {
        let action = parse_action(
            "R001",
            ActionType::CreateEntry,
            "{'account': 'Expenses:Household:Food', 'payee': 'Swiggy', 'tags': 'food,delivery', 'include_narration': true}",
        )
        .unwrap();

        assert_eq!(action.account, "Expenses:Household:Food");
        assert_eq!(action.payee.as_deref(), Some("Swiggy"));
        assert_eq!(action.tags, "food,delivery");
        assert!(action.include_narration);
        assert!(!action.include_user_context);
        assert_eq!(action.split, None);
    }

    #[test]
    fn test_transfer_uses_to_account() {
        let action = parse_action(
            "R002",
            ActionType::CreateTransfer,
            r#"{"to_account": "Assets:Checking:Wallet", "account": "ignored"}"#,
        )
        .unwrap();
        assert_eq!(action.account, "Assets:Checking:Wallet");

        let action =
            parse_action("R002", ActionType::CreateTransfer, r#"{"account": "Assets:Checking:Wallet"}"#)
                .unwrap();
        assert_eq!(action.account, "Assets:Checking:Wallet");
    }

    #[test]
    fn test_format_version() {
        let action = parse_action(
            "R011",
            ActionType::CreateEntry,
            "{'version': 1, 'account': 'Expenses:Household:Food'}",
        )
        .unwrap();
        assert_eq!(action.account, "Expenses:Household:Food");

        let err = parse_action(
            "R012",
            ActionType::CreateEntry,
            r#"{"version": 99, "account": "Expenses:Household:Food"}"#,
        )
        .unwrap_err();
        assert!(reason(err).contains("version 99"));
    }

    #[test]
    fn test_missing_account() {
        let err = parse_action("R003", ActionType::CreateEntry, r#"{"payee": "x"}"#).unwrap_err();
        assert!(reason(err).contains("`account`"));
    }

    #[test]
    fn test_bad_json() {
        let err = parse_action("R004", ActionType::CreateEntry, "not json").unwrap_err();
        assert!(reason(err).contains("invalid action JSON"));
    }

    #[test]
    fn test_splits() {
        let action = parse_action(
            "R005",
            ActionType::CreateEntry,
            r#"{"account": "Expenses:Rent:House", "split_type": "fifty_fifty",
                "split_config": {"split_account": "Liabilities:Payables:Ananya"}}"#,
        )
        .unwrap();
        assert_eq!(
            action.split,
            Some(Split::FiftyFifty {
                account: "Liabilities:Payables:Ananya".into()
            })
        );

        let action = parse_action(
            "R006",
            ActionType::CreateEntry,
            r#"{"account": "Expenses:Rent:House", "split_type": "none"}"#,
        )
        .unwrap();
        assert_eq!(action.split, None);

        let err = parse_action(
            "R007",
            ActionType::CreateEntry,
            r#"{"account": "Expenses:Rent:House", "split_type": "three_way",
                "split_config": {"split_accounts": ["Liabilities:Payables:Anna", " "]}}"#,
        )
        .unwrap_err();
        assert!(reason(err).contains("three_way"));

        let err = parse_action(
            "R008",
            ActionType::CreateEntry,
            r#"{"account": "Expenses:Rent:House", "split_type": "quarters"}"#,
        )
        .unwrap_err();
        assert!(reason(err).contains("quarters"));
    }

    #[test]
    fn test_custom_split_must_total_100() {
        let ok = parse_action(
            "R009",
            ActionType::CreateEntry,
            r#"{"account": "Expenses:Travel:Stay", "split_type": "custom",
                "split_config": {"your_share_percent": 40,
                    "custom_splits": [{"account": "Liabilities:Payables:Anna", "percent": 35},
                                      {"account": "Liabilities:Payables:Akshu", "percent": 25}]}}"#,
        )
        .unwrap();
        match ok.split {
            Some(Split::Custom { your_share_percent, shares }) => {
                assert_eq!(your_share_percent, 40.0);
                assert_eq!(shares.len(), 2);
            }
            other => panic!("unexpected split: {:?}", other),
        }

        let err = parse_action(
            "R010",
            ActionType::CreateEntry,
            r#"{"account": "Expenses:Travel:Stay", "split_type": "custom",
                "split_config": {"your_share_percent": 50,
                    "custom_splits": [{"account": "Liabilities:Payables:Anna", "percent": 30}]}}"#,
        )
        .unwrap_err();
        assert!(reason(err).contains("total 80"));
    }
}
