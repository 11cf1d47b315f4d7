use std::sync::LazyLock;

use regex::Regex;

use crate::schema::{parse_date, CharClass, PiiCategory};
use crate::table::Value;

/// How much of a value a detector matched.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// The whole value is the sensitive item.
    Full,
    /// The sensitive item is embedded in a longer value.
    Substring(String),
}

/// Whole-value email structure: local `@` domain `.` tld.
static EMAIL_FULL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$").unwrap()
});

/// The same structure, unanchored, for emails buried in free text.
static EMAIL_EMBEDDED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b").unwrap()
});

const PHONE_SEPARATORS: &[char] = &[' ', '.', '-', '(', ')'];

/// Run the detector for `category` against one value.
///
/// Never fails: anything the detector cannot make sense of is a non-match.
pub fn detect(category: PiiCategory, value: &Value) -> Option<MatchKind> {
    if value.is_missing() {
        return None;
    }
    let text = value.render();
    let text = text.trim();
    let matched = match category {
        PiiCategory::Email => return detect_email(text),
        PiiCategory::Phone => is_phone(text),
        PiiCategory::Name => CharClass::Alphabetic.matches(text),
        PiiCategory::Address => !text.is_empty(),
        PiiCategory::DateOfBirth => {
            matches!(value, Value::Date(_)) || parse_date(text).is_some()
        }
    };
    matched.then_some(MatchKind::Full)
}

fn detect_email(text: &str) -> Option<MatchKind> {
    if EMAIL_FULL.is_match(text) {
        return Some(MatchKind::Full);
    }
    EMAIL_EMBEDDED
        .find(text)
        .map(|m| MatchKind::Substring(m.as_str().to_string()))
}

/// Rewrite every email embedded in `text` with `mask`, leaving the rest as is.
pub fn replace_embedded_emails<F>(text: &str, mask: F) -> String
where
    F: Fn(&str) -> String,
{
    EMAIL_EMBEDDED
        .replace_all(text, |caps: &regex::Captures<'_>| mask(&caps[0]))
        .into_owned()
}

/// Exactly ten digits once the accepted separators are removed.
fn is_phone(text: &str) -> bool {
    if !text
        .chars()
        .all(|c| c.is_ascii_digit() || PHONE_SEPARATORS.contains(&c))
    {
        return false;
    }
    text.chars().filter(|c| c.is_ascii_digit()).count() == 10
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn test_email_full_and_substring() {
        assert_eq!(
            detect(PiiCategory::Email, &text("John@Example.COM")),
            Some(MatchKind::Full)
        );
        assert_eq!(
            detect(PiiCategory::Email, &text("contact: bob@example.com please")),
            Some(MatchKind::Substring("bob@example.com".to_string()))
        );
        assert_eq!(detect(PiiCategory::Email, &text("not-an-email")), None);
    }

    #[test]
    fn test_phone_accepted_forms() {
        for raw in ["555-123-4567", "(555) 234-5678", "555.987.6543", "5554356789"] {
            assert!(
                detect(PiiCategory::Phone, &text(raw)).is_some(),
                "{} should be detected as a phone",
                raw
            );
        }
        assert!(detect(PiiCategory::Phone, &text("555-1234")).is_none());
        assert!(detect(PiiCategory::Phone, &text("ext 555-123-4567")).is_none());
    }

    #[test]
    fn test_name_and_address_are_column_semantic() {
        assert!(detect(PiiCategory::Name, &text("Mary")).is_some());
        assert!(detect(PiiCategory::Name, &text("R2D2")).is_none());
        assert!(detect(PiiCategory::Address, &text("123 Main St")).is_some());
        assert!(detect(PiiCategory::Address, &text("   ")).is_none());
    }

    #[test]
    fn test_dob_needs_a_parseable_date() {
        let d = Value::Date(NaiveDate::from_ymd_opt(1985, 3, 15).unwrap());
        assert!(detect(PiiCategory::DateOfBirth, &d).is_some());
        assert!(detect(PiiCategory::DateOfBirth, &text("05/10/1975")).is_some());
        assert!(detect(PiiCategory::DateOfBirth, &text("invalid_date")).is_none());
    }

    #[test]
    fn test_missing_is_never_exposure() {
        for category in PiiCategory::ALL {
            assert!(detect(category, &Value::Missing).is_none());
        }
    }
}
