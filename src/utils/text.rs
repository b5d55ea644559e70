// src/utils/text.rs

//! Text cleanup for scraped labels and values.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::StatValue;

/// `{count, plural, one {Card} other {Cards}}` style localization templates.
static PLURAL_TEMPLATE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"\{count, plural, one \{.+\} other \{(.+)\}\}"));

/// Compile a pattern literal owned by this crate.
pub(crate) fn static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {pattern}: {e}"))
}

/// Best-effort typing of a scraped value.
///
/// Thousands separators are ignored. Values that are neither integers nor
/// finite decimals are kept as trimmed text.
pub fn coerce(text: &str) -> StatValue {
    let trimmed = text.trim();
    let candidate = trimmed.replace(',', "");

    if let Ok(value) = candidate.parse::<i64>() {
        return StatValue::Integer(value);
    }

    if looks_numeric(&candidate) {
        if let Ok(value) = candidate.parse::<f64>() {
            if value.is_finite() {
                return StatValue::Float(value);
            }
        }
    }

    StatValue::Text(trimmed.to_string())
}

/// Rejects words like `inf` or `NaN` that `f64::from_str` accepts.
fn looks_numeric(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        && s.chars().any(|c| c.is_ascii_digit())
}

/// Parse an integer that may carry `%` or thousands separators, 0 on failure.
pub fn parse_int_lenient(text: &str) -> i64 {
    text.trim()
        .trim_end_matches('%')
        .replace(',', "")
        .trim()
        .parse()
        .unwrap_or(0)
}

/// Parse a decimal that may carry thousands separators.
///
/// Failures and non-finite values such as `NaN` or `inf` give 0.0.
pub fn parse_float_lenient(text: &str) -> f64 {
    text.trim()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

/// Convert a display label into a camelCase field token.
///
/// `"Time Played"` becomes `"timePlayed"`, `"Eliminations - Avg per 10 Min"`
/// becomes `"eliminationsAvgPer10Min"`.
pub fn normalize_key(label: &str) -> String {
    let mut s = label.split_whitespace().collect::<Vec<_>>().join(" ");

    if s.contains("} other {") {
        if let Some(other) = PLURAL_TEMPLATE
            .captures(&s)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
        {
            s = PLURAL_TEMPLATE.replace_all(&s, other.as_str()).into_owned();
        }
    }

    let cleaned: String = s
        .chars()
        .filter(|&c| c != '\'')
        .map(|c| match c {
            'ú' => 'u',
            'ö' => 'o',
            c if c.is_ascii_punctuation() && c != '_' => ' ',
            c => c,
        })
        .collect();

    let mut titled = String::with_capacity(cleaned.len());
    let mut at_word_start = true;
    for c in cleaned.to_lowercase().chars() {
        if c.is_alphanumeric() || c == '_' {
            if at_word_start {
                titled.extend(c.to_uppercase());
            } else {
                titled.push(c);
            }
            at_word_start = false;
        } else {
            titled.push(c);
            at_word_start = true;
        }
    }

    let joined: String = titled.chars().filter(|c| !c.is_whitespace()).collect();

    let mut chars = joined.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_integer_with_separator() {
        assert_eq!(coerce("1,234"), StatValue::Integer(1234));
        assert_eq!(coerce(" 42 "), StatValue::Integer(42));
    }

    #[test]
    fn test_coerce_float() {
        assert_eq!(coerce("12.5"), StatValue::Float(12.5));
        assert_eq!(coerce("1,024.75"), StatValue::Float(1024.75));
    }

    #[test]
    fn test_coerce_text() {
        assert_eq!(coerce("N/A"), StatValue::Text("N/A".into()));
        assert_eq!(coerce("12:34:56"), StatValue::Text("12:34:56".into()));
        assert_eq!(coerce("57%"), StatValue::Text("57%".into()));
        assert_eq!(coerce("NaN"), StatValue::Text("NaN".into()));
        assert_eq!(coerce(" inf "), StatValue::Text("inf".into()));
        assert_eq!(coerce(""), StatValue::Text(String::new()));
    }

    #[test]
    fn test_normalize_key_simple() {
        assert_eq!(normalize_key("Time Played"), "timePlayed");
        assert_eq!(normalize_key("GAMES WON"), "gamesWon");
        assert_eq!(normalize_key("Hero Specific"), "heroSpecific");
        assert_eq!(normalize_key(""), "");
    }

    #[test]
    fn test_normalize_key_punctuation() {
        assert_eq!(
            normalize_key("Eliminations - Avg per 10 Min"),
            "eliminationsAvgPer10Min"
        );
        assert_eq!(normalize_key("Multikill - Best"), "multikillBest");
        assert_eq!(normalize_key("Soldier: 76"), "soldier76");
        assert_eq!(normalize_key("D.Va"), "dVa");
        assert_eq!(normalize_key("Wrecking Ball's Piledriver"), "wreckingBallsPiledriver");
    }

    #[test]
    fn test_normalize_key_accents_and_whitespace() {
        assert_eq!(normalize_key("Lúcio"), "lucio");
        assert_eq!(normalize_key("Torbjörn"), "torbjorn");
        assert_eq!(normalize_key("\n   All\n   Heroes  "), "allHeroes");
    }

    #[test]
    fn test_normalize_key_plural_template() {
        assert_eq!(
            normalize_key("{count, plural, one {Card} other {Cards}}"),
            "cards"
        );
        assert_eq!(
            normalize_key("{count, plural, one {Medal} other {Medals}} - Gold"),
            "medalsGold"
        );
    }

    #[test]
    fn test_lenient_parsers() {
        assert_eq!(parse_int_lenient("37%"), 37);
        assert_eq!(parse_int_lenient("1,234"), 1234);
        assert_eq!(parse_int_lenient("--"), 0);
        assert_eq!(parse_float_lenient("2.15"), 2.15);
        assert_eq!(parse_float_lenient("n/a"), 0.0);
    }

    #[test]
    fn test_float_parser_rejects_non_finite() {
        assert_eq!(parse_float_lenient("NaN"), 0.0);
        assert_eq!(parse_float_lenient("inf"), 0.0);
        assert_eq!(parse_float_lenient("-infinity"), 0.0);
        assert_eq!(parse_float_lenient("1,000.5"), 1000.5);

        let json = serde_json::to_string(&parse_float_lenient("NaN")).unwrap();
        assert_eq!(serde_json::from_str::<f64>(&json).unwrap(), 0.0);
    }
}
