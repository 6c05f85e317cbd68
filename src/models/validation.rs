use std::collections::HashMap;
use std::fmt::Display;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ApiError;

/// A request field taken as whatever JSON arrived. The typed readers on
/// [`FieldErrors`] turn a wrong type into a field error instead of
/// rejecting the whole body.
pub type Raw = Option<Value>;

/// The raw value as it appears in cast messages. Strings are shown without
/// their quotes.
fn shown(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Collects every violated field of one document so they can be reported
/// together instead of stopping at the first problem.
#[derive(Debug)]
pub struct FieldErrors {
    entity: &'static str,
    errors: Vec<(String, String)>,
}

impl FieldErrors {
    pub fn new(entity: &'static str) -> Self {
        Self {
            entity,
            errors: Vec::new(),
        }
    }

    pub fn push(&mut self, field: &str, reason: impl Into<String>) {
        self.errors.push((field.to_string(), reason.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|(f, _)| f == field)
    }

    /// A field that already failed to cast is not reported missing too.
    pub fn required<T>(&mut self, field: &str, value: Option<T>) -> Option<T> {
        if value.is_none() && !self.has(field) {
            self.push(field, format!("`{}` is required", field));
        }
        value
    }

    /// Like `required`, but blank strings count as missing.
    pub fn required_text(&mut self, field: &str, value: Option<String>) -> Option<String> {
        let value = value.filter(|v| !v.trim().is_empty());
        self.required(field, value)
    }

    fn cast_failed(&mut self, field: &str, value: &Value, kind: &str) {
        self.push(field, format!("`{}` (`{}`) is not {}", field, shown(value), kind));
    }

    /// Numbers and numeric strings. `null` and blank strings count as absent.
    pub fn number(&mut self, field: &str, raw: Raw) -> Option<f64> {
        let parsed = match &raw {
            None | Some(Value::Null) => return None,
            Some(Value::String(s)) if s.trim().is_empty() => return None,
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            Some(_) => None,
        };
        if parsed.is_none() {
            if let Some(value) = &raw {
                self.cast_failed(field, value, "a number");
            }
        }
        parsed
    }

    pub fn integer(&mut self, field: &str, raw: Raw) -> Option<i32> {
        let original = raw.clone();
        let value = self.number(field, raw)?;
        if value.fract() == 0.0 && value >= f64::from(i32::MIN) && value <= f64::from(i32::MAX) {
            return Some(value as i32);
        }
        if let Some(original) = &original {
            self.cast_failed(field, original, "an integer");
        }
        None
    }

    pub fn flag(&mut self, field: &str, raw: Raw) -> Option<bool> {
        let parsed = match &raw {
            None | Some(Value::Null) => return None,
            Some(Value::String(s)) if s.trim().is_empty() => return None,
            Some(Value::Bool(b)) => Some(*b),
            Some(Value::String(s)) => match s.trim() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            Some(Value::Number(n)) => match n.as_i64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            },
            Some(_) => None,
        };
        if parsed.is_none() {
            if let Some(value) = &raw {
                self.cast_failed(field, value, "a boolean");
            }
        }
        parsed
    }

    /// Strings, with numbers and booleans taken as their text.
    pub fn text(&mut self, field: &str, raw: Raw) -> Option<String> {
        match raw {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(value @ (Value::Number(_) | Value::Bool(_))) => Some(value.to_string()),
            Some(value) => {
                self.cast_failed(field, &value, "a string");
                None
            }
        }
    }

    /// Strings only, and a wrong type is reported without echoing the value.
    pub fn secret(&mut self, field: &str, raw: Raw) -> Option<String> {
        match raw {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(_) => {
                self.push(field, format!("`{}` is not a string", field));
                None
            }
        }
    }

    pub fn id(&mut self, field: &str, raw: Raw) -> Option<Uuid> {
        let parsed = match &raw {
            None | Some(Value::Null) => return None,
            Some(Value::String(s)) if s.trim().is_empty() => return None,
            Some(Value::String(s)) => Uuid::parse_str(s.trim()).ok(),
            Some(_) => None,
        };
        if parsed.is_none() {
            if let Some(value) = &raw {
                self.cast_failed(field, value, "a valid id");
            }
        }
        parsed
    }

    /// RFC 3339 timestamps, plain `YYYY-MM-DD` dates (midnight UTC) and
    /// epoch milliseconds.
    pub fn date(&mut self, field: &str, raw: Raw) -> Option<DateTime<Utc>> {
        let parsed = match &raw {
            None | Some(Value::Null) => return None,
            Some(Value::String(s)) if s.trim().is_empty() => return None,
            Some(Value::String(s)) => parse_date(s.trim()),
            Some(Value::Number(n)) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
            Some(_) => None,
        };
        if parsed.is_none() {
            if let Some(value) = &raw {
                self.cast_failed(field, value, "a valid date");
            }
        }
        parsed
    }

    pub fn range<T>(&mut self, field: &str, value: T, min: T, max: T)
    where
        T: PartialOrd + Display + Copy,
    {
        if value < min {
            self.push(
                field,
                format!("`{}` ({}) is less than minimum allowed value ({})", field, value, min),
            );
        } else if value > max {
            self.push(
                field,
                format!("`{}` ({}) is more than maximum allowed value ({})", field, value, max),
            );
        }
    }

    pub fn min<T>(&mut self, field: &str, value: T, min: T)
    where
        T: PartialOrd + Display + Copy,
    {
        if value < min {
            self.push(
                field,
                format!("`{}` ({}) is less than minimum allowed value ({})", field, value, min),
            );
        }
    }

    /// Length check that echoes the value back, for public fields.
    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min {
            self.push(
                field,
                format!("`{}` (`{}`) is shorter than the minimum allowed length ({})", field, value, min),
            );
        } else if len > max {
            self.push(
                field,
                format!("`{}` (`{}`) is longer than the maximum allowed length ({})", field, value, max),
            );
        }
    }

    /// Length check that never echoes the value (passwords).
    pub fn secret_length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min {
            self.push(field, format!("`{}` is shorter than the minimum allowed length ({})", field, min));
        } else if len > max {
            self.push(field, format!("`{}` is longer than the maximum allowed length ({})", field, max));
        }
    }

    pub fn max_length(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.push(field, format!("`{}` is longer than the maximum allowed length ({})", field, max));
        }
    }

    pub fn date_window(&mut self, field: &str, value: DateTime<Utc>) {
        let (earliest, latest) = date_window();
        if value < earliest {
            self.push(
                field,
                format!(
                    "`{}` ({}) is before minimum allowed value ({})",
                    field,
                    value.to_rfc3339(),
                    earliest.to_rfc3339()
                ),
            );
        } else if value > latest {
            self.push(
                field,
                format!(
                    "`{}` ({}) is after maximum allowed value ({})",
                    field,
                    value.to_rfc3339(),
                    latest.to_rfc3339()
                ),
            );
        }
    }

    pub fn unique(&mut self, field: &str) {
        self.push(field, format!("expected `{}` to be unique", field));
    }

    pub fn into_result(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            return Ok(());
        }
        Err(self.into_error())
    }

    pub fn into_error(self) -> ApiError {
        let message = format!(
            "{} validation failed: {}",
            self.entity,
            self.errors
                .iter()
                .map(|(_, reason)| reason.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut field_errors = HashMap::new();
        for (field, reason) in self.errors {
            field_errors.entry(field).or_insert(reason);
        }

        ApiError::validation_error(message, Some(field_errors))
    }
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(s) {
        return Some(date.with_timezone(&Utc));
    }
    let midnight = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight))
}

/// Plausible calendar window for bottle dates.
pub fn date_window() -> (DateTime<Utc>, DateTime<Utc>) {
    // 1990-01-01T00:00:00Z ..= 2050-12-31T23:59:59Z
    (
        DateTime::<Utc>::from_timestamp(631_152_000, 0).unwrap_or(DateTime::<Utc>::MIN_UTC),
        DateTime::<Utc>::from_timestamp(2_556_143_999, 0).unwrap_or(DateTime::<Utc>::MAX_UTC),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collects_every_violation() {
        let mut errors = FieldErrors::new("Bottle");
        errors.required::<i64>("count", None);
        errors.range("volume", -0.75, 0.0, 10.0);
        errors.range("price", 501.0, 0.0, 500.0);

        let err = errors.into_error();
        let message = err.message().to_string();
        assert!(message.starts_with("Bottle validation failed: "));
        assert!(message.contains("`count` is required"));
        assert!(message.contains("`volume` (-0.75) is less than minimum allowed value (0)"));
        assert!(message.contains("`price` (501) is more than maximum allowed value (500)"));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn blank_text_is_missing() {
        let mut errors = FieldErrors::new("User");
        assert!(errors.required_text("name", Some("   ".to_string())).is_none());
        assert!(errors.has("name"));
    }

    #[test]
    fn dates_outside_window_are_rejected() {
        let mut errors = FieldErrors::new("Bottle");
        errors.date_window("bottled", Utc.with_ymd_and_hms(1989, 8, 31, 0, 0, 0).unwrap());
        errors.date_window("expiration", Utc.with_ymd_and_hms(2051, 11, 2, 0, 0, 0).unwrap());
        errors.date_window("added", Utc.with_ymd_and_hms(2019, 8, 31, 0, 0, 0).unwrap());

        let message = errors.into_error().message().to_string();
        assert!(message.contains("`bottled` (1989-08-31T00:00:00+00:00) is before minimum"));
        assert!(message.contains("`expiration` (2051-11-02T00:00:00+00:00) is after maximum"));
        assert!(!message.contains("`added`"));
    }

    #[test]
    fn window_bounds_are_calendar_dates() {
        let (earliest, latest) = date_window();
        assert_eq!(earliest, Utc.with_ymd_and_hms(1990, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(latest, Utc.with_ymd_and_hms(2050, 12, 31, 23, 59, 59).unwrap());
    }

    #[test]
    fn wrong_types_join_the_other_violations() {
        let mut errors = FieldErrors::new("Bottle");
        let count = errors.integer("count", Some(json!("two")));
        assert!(errors.required("count", count).is_none());
        if let Some(volume) = errors.number("volume", Some(json!(11))) {
            errors.range("volume", volume, 0.0, 10.0);
        }
        errors.id("beer", Some(json!(42)));
        errors.date("bottled", Some(json!("last summer")));

        let message = errors.into_error().message().to_string();
        assert!(message.contains("`count` (`two`) is not a number"));
        assert!(!message.contains("`count` is required"));
        assert!(message.contains("`volume` (11) is more than maximum allowed value (10)"));
        assert!(message.contains("`beer` (`42`) is not a valid id"));
        assert!(message.contains("`bottled` (`last summer`) is not a valid date"));
    }

    #[test]
    fn loose_values_are_cast() {
        let mut errors = FieldErrors::new("Rating");
        assert_eq!(errors.number("aroma", Some(json!("7.5"))), Some(7.5));
        assert_eq!(errors.integer("count", Some(json!(3.0))), Some(3));
        assert_eq!(errors.flag("hidden", Some(json!("true"))), Some(true));
        assert_eq!(errors.text("city", Some(json!(90100))).as_deref(), Some("90100"));
        assert_eq!(
            errors.date("added", Some(json!("2019-08-31"))),
            Some(Utc.with_ymd_and_hms(2019, 8, 31, 0, 0, 0).unwrap())
        );
        assert_eq!(errors.number("price", Some(Value::Null)), None);
        assert!(errors.into_result().is_ok());
    }

    #[test]
    fn fractional_count_is_not_an_integer() {
        let mut errors = FieldErrors::new("Bottle");
        assert_eq!(errors.integer("count", Some(json!(2.5))), None);
        assert!(errors.into_error().message().contains("`count` (`2.5`) is not an integer"));
    }

    #[test]
    fn empty_collector_passes() {
        assert!(FieldErrors::new("Beer").into_result().is_ok());
    }
}
