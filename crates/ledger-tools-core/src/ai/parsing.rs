//! JSON parsing helpers for LLM responses
//!
//! Models often wrap the requested JSON in prose or code fences, so the first
//! `{...}` object in the reply is extracted before deserializing.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{Error, Result};

/// Raw categorization as returned by the model; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SuggestionReply {
    #[serde(default, deserialize_with = "non_empty_string")]
    pub account: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub payee: Option<String>,
    #[serde(default, deserialize_with = "tag_list")]
    pub tags: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub confidence: Option<f64>,
}

/// Parse a categorization reply
pub fn parse_suggestion(response: &str) -> Result<SuggestionReply> {
    let json_str = first_json_object(response).ok_or_else(|| {
        Error::InvalidData(format!(
            "No JSON found in LLM response | Raw: {}",
            truncate(response.trim(), 200)
        ))
    })?;

    serde_json::from_str(json_str).map_err(|e| {
        Error::InvalidData(format!(
            "Invalid JSON from LLM: {} | Raw: {}",
            e,
            truncate(json_str, 200)
        ))
    })
}

/// Clean a regex reply: first non-empty line, without code fences or wrapping quotes
pub fn parse_regex_reply(response: &str) -> Result<String> {
    let line = response
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with("```"))
        .ok_or_else(|| Error::InvalidData("Empty regex reply from LLM".into()))?;

    let cleaned = line
        .trim_matches('`')
        .trim_start_matches(['"', '\''])
        .trim_end_matches(['"', '\''])
        .trim();

    if cleaned.is_empty() {
        return Err(Error::InvalidData(format!(
            "No regex pattern in LLM reply | Raw: {}",
            truncate(response.trim(), 200)
        )));
    }
    Ok(cleaned.to_string())
}

/// The first `{` up to the first `}` after it, if the object is non-empty
fn first_json_object(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let len = response[start..].find('}')?;
    if len < 2 {
        return None;
    }
    Some(&response[start..=start + len])
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}...", s.chars().take(max).collect::<String>())
    } else {
        s.to_string()
    }
}

fn non_empty_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// Tags may come back as `"a,b"` or `["a", "b"]`
fn tag_list<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    let tags = match Value::deserialize(deserializer)? {
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(","),
        _ => String::new(),
    };
    Ok(Some(tags).filter(|t| !t.is_empty()))
}

/// Confidence may come back as a number or a numeric string
fn lenient_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_suggestion() {
        let response = r#"{"account":"Expenses:Household:Food","payee":"Swiggy","tags":"food","confidence":0.8}"#;
        let reply = parse_suggestion(response).unwrap();
        assert_eq!(reply.account.as_deref(), Some("Expenses:Household:Food"));
        assert_eq!(reply.payee.as_deref(), Some("Swiggy"));
        assert_eq!(reply.tags.as_deref(), Some("food"));
        assert_eq!(reply.confidence, Some(0.8));
    }

    #[test]
    fn test_parse_suggestion_with_text() {
        let response = r#"Sure! Here is the categorization:
{"account": "Expenses:Transport:Taxis", "payee": "Uber", "tags": "transport", "confidence": 0.9}
Let me know if you need anything else."#;
        let reply = parse_suggestion(response).unwrap();
        assert_eq!(reply.account.as_deref(), Some("Expenses:Transport:Taxis"));
    }

    #[test]
    fn test_parse_suggestion_missing_fields() {
        let reply = parse_suggestion(r#"{"payee": "  "}"#).unwrap();
        assert_eq!(reply, SuggestionReply::default());
    }

    #[test]
    fn test_parse_suggestion_lenient_types() {
        let reply =
            parse_suggestion(r#"{"tags": ["food", " dining "], "confidence": "0.65"}"#).unwrap();
        assert_eq!(reply.tags.as_deref(), Some("food,dining"));
        assert_eq!(reply.confidence, Some(0.65));
    }

    #[test]
    fn test_parse_suggestion_no_json() {
        let err = parse_suggestion("I think this is food").unwrap_err();
        assert!(err.to_string().contains("No JSON found"));
        assert!(parse_suggestion("{}").is_err());
    }

    #[test]
    fn test_parse_suggestion_invalid_json() {
        let err = parse_suggestion(r#"{account: food}"#).unwrap_err();
        assert!(err.to_string().contains("Invalid JSON"));
    }

    #[test]
    fn test_parse_regex_reply() {
        assert_eq!(parse_regex_reply("swiggy").unwrap(), "swiggy");
        assert_eq!(parse_regex_reply("  \"zomato\"\n").unwrap(), "zomato");
        assert_eq!(
            parse_regex_reply("```\nUPI/.*SWIGGY\n```").unwrap(),
            "UPI/.*SWIGGY"
        );
        assert_eq!(parse_regex_reply("`blinkit`").unwrap(), "blinkit");
        assert!(parse_regex_reply("   \n ").is_err());
    }
}
