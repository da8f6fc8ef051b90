use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

pub const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$";

pub static EMAIL_RX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EMAIL_PATTERN).expect("EMAIL_PATTERN is a valid regex"));

/// Collects field-level violations. The first message recorded for a field
/// is the one that is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Validator {
    errors: BTreeMap<String, String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.errors
            .entry(field.to_string())
            .or_insert_with(|| message.to_string());
    }

    /// Record `message` against `field` unless `ok` holds.
    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add_error(field, message);
        }
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn into_errors(self) -> BTreeMap<String, String> {
        self.errors
    }
}

pub fn permitted_value<T: PartialEq + ?Sized>(value: &T, permitted: &[&T]) -> bool {
    permitted.iter().any(|p| *p == value)
}

pub fn matches(value: &str, rx: &Regex) -> bool {
    rx.is_match(value)
}

pub fn unique<T: Eq + Hash>(values: &[T]) -> bool {
    let mut seen = HashSet::with_capacity(values.len());
    values.iter().all(|v| seen.insert(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_message_per_field_wins() {
        let mut v = Validator::new();
        v.check(false, "year", "must be provided");
        v.check(false, "year", "must be greater than 1888");
        v.check(true, "title", "never recorded");

        assert!(!v.valid());
        assert_eq!(v.errors().len(), 1);
        assert_eq!(v.error("year"), Some("must be provided"));
    }

    #[test]
    fn serializes_as_flat_object() {
        let mut v = Validator::new();
        v.add_error("email", "must be a valid email address");
        assert_eq!(
            serde_json::to_value(&v).unwrap(),
            serde_json::json!({ "email": "must be a valid email address" })
        );
    }

    #[test]
    fn email_pattern() {
        for ok in ["alice@example.com", "a.b+c@sub.example.co.uk", "x@localhost"] {
            assert!(matches(ok, &EMAIL_RX), "{ok}");
        }
        for bad in ["", "alice", "alice@", "@example.com", "alice@-example.com", "a b@example.com"] {
            assert!(!matches(bad, &EMAIL_RX), "{bad}");
        }
    }

    #[test]
    fn unique_and_permitted() {
        assert!(unique(&["drama", "comedy"]));
        assert!(!unique(&["drama", "comedy", "drama"]));
        assert!(unique::<&str>(&[]));

        assert!(permitted_value("-year", &["year", "-year"]));
        assert!(!permitted_value("year; DROP TABLE movies", &["year", "-year"]));
    }
}
