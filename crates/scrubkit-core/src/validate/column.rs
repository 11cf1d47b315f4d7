use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::error::{Result, ScrubKitError};
use crate::schema::{parse_date, ColumnSpec, Constraint, LogicalType, DATE_FORMATS};
use crate::table::Value;

use super::Rule;

/// A column spec with its patterns compiled, ready to check values.
pub struct ColumnChecker<'a> {
    pub spec: &'a ColumnSpec,
    /// One compiled regex per `Constraint::Pattern`, in declaration order.
    patterns: Vec<Regex>,
}

impl<'a> ColumnChecker<'a> {
    pub fn compile(spec: &'a ColumnSpec) -> Result<Self> {
        let mut patterns = Vec::new();
        for constraint in &spec.constraints {
            if let Constraint::Pattern(source) = constraint {
                let anchored = format!("^(?:{})$", source);
                let re = Regex::new(&anchored).map_err(|e| ScrubKitError::Config {
                    message: format!("column '{}': invalid pattern '{}': {}", spec.name, source, e),
                })?;
                patterns.push(re);
            }
        }
        Ok(Self { spec, patterns })
    }

    /// Every rule `value` breaks, with a human-readable reason.
    ///
    /// All applicable constraints are evaluated; a failure never hides a later
    /// one. Constraints that need a typed value (range, plausibility) are
    /// inapplicable when the value failed its type check.
    pub fn check(&self, value: &Value, as_of: NaiveDate) -> Vec<(Rule, String)> {
        let mut failures = Vec::new();
        let spec = self.spec;

        if value.is_missing() {
            if !spec.nullable {
                failures.push((Rule::Nullability, "required value is missing".to_string()));
            }
            return failures;
        }

        let mut number: Option<f64> = None;
        let mut date: Option<NaiveDate> = None;
        let mut text: Option<String> = None;

        match spec.logical_type {
            LogicalType::Integer => match value {
                Value::Integer(i) => number = Some(*i as f64),
                other => failures.push((Rule::Type, format!("'{}' is not an integer", other))),
            },
            LogicalType::Decimal => match value.as_f64() {
                Some(n) => number = Some(n),
                None => failures.push((Rule::Type, format!("'{}' is not a number", value))),
            },
            LogicalType::Date => match value {
                Value::Date(d) => date = Some(*d),
                Value::Text(s) => match parse_date(s) {
                    Some(d) => date = Some(d),
                    None => failures.push((
                        Rule::DateParse,
                        format!(
                            "'{}' does not parse as a date (accepted: {})",
                            s,
                            DATE_FORMATS.join(", ")
                        ),
                    )),
                },
                other => failures.push((Rule::Type, format!("'{}' is not a date", other))),
            },
            LogicalType::String | LogicalType::Categorical => text = Some(value.render()),
        }

        let mut patterns = self.patterns.iter();
        for constraint in &spec.constraints {
            match constraint {
                Constraint::Range { min, max } => {
                    if let Some(n) = number {
                        if min.is_some_and(|m| n < m) || max.is_some_and(|m| n > m) {
                            failures.push((
                                Rule::Range,
                                format!("{} is outside [{}, {}]", n, bound(*min), bound(*max)),
                            ));
                        }
                    }
                }
                Constraint::Length { min, max } => {
                    if let Some(ref s) = text {
                        let len = s.chars().count();
                        if min.is_some_and(|m| len < m) || max.is_some_and(|m| len > m) {
                            failures.push((
                                Rule::Length,
                                format!(
                                    "length {} is outside [{}, {}]",
                                    len,
                                    min.map(|m| m.to_string()).unwrap_or_else(|| "-".into()),
                                    max.map(|m| m.to_string()).unwrap_or_else(|| "-".into())
                                ),
                            ));
                        }
                    }
                }
                Constraint::Pattern(source) => {
                    let re = patterns.next();
                    if let (Some(s), Some(re)) = (text.as_deref(), re) {
                        if !re.is_match(s) {
                            failures.push((
                                Rule::Pattern,
                                format!("'{}' does not match pattern {}", s, source),
                            ));
                        }
                    }
                }
                Constraint::CharClass(class) => {
                    if let Some(ref s) = text {
                        if !class.matches(s) {
                            failures.push((Rule::CharClass, format!("'{}' is not {}", s, class)));
                        }
                    }
                }
                Constraint::AllowedValues(allowed) => {
                    if let Some(ref s) = text {
                        if !allowed.iter().any(|a| a == s) {
                            failures.push((
                                Rule::AllowedValues,
                                format!("'{}' is not one of {{{}}}", s, allowed.join(", ")),
                            ));
                        }
                    }
                }
                Constraint::MaxAge { years } => {
                    if let Some(d) = date {
                        let age = age_at(d, as_of);
                        if age > i64::from(*years) {
                            failures.push((
                                Rule::Plausibility,
                                format!("{} implies an age of {} (max {})", d, age, years),
                            ));
                        }
                    }
                }
                Constraint::NotInFuture => {
                    if let Some(d) = date {
                        if d > as_of {
                            failures.push((
                                Rule::Plausibility,
                                format!("{} is after the reference date {}", d, as_of),
                            ));
                        }
                    }
                }
            }
        }

        failures
    }
}

/// Whole years between `born` and `as_of`.
fn age_at(born: NaiveDate, as_of: NaiveDate) -> i64 {
    let mut age = i64::from(as_of.year()) - i64::from(born.year());
    if (as_of.month(), as_of.day()) < (born.month(), born.day()) {
        age -= 1;
    }
    age
}

fn bound(b: Option<f64>) -> String {
    b.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
