//! Input checks shared by the public forms.
//!
//! Every check is a plain predicate or parser; turning a failure into a
//! user-facing message is left to the form that runs it.

use std::{fmt, str::FromStr};

pub const MAX_COMMENT_CHARS: usize = 500;
pub const USN_LENGTH: usize = 10;

pub const MIN_RATING: i16 = 1;
pub const MAX_RATING: i16 = 5;

/// How a USN must look before it is looked up in the student table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UsnPolicy {
    /// Exactly ten uppercase letters or digits, e.g. `1RV21CS001`.
    #[default]
    Alphanumeric,
    /// Digits only.
    Numeric,
}

impl UsnPolicy {
    pub fn requirement(self) -> &'static str {
        match self {
            UsnPolicy::Alphanumeric => "USN must be 10 uppercase letters or digits",
            UsnPolicy::Numeric => "USN must be numeric, matching the student table",
        }
    }
}

impl FromStr for UsnPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alphanumeric" => Ok(UsnPolicy::Alphanumeric),
            "numeric" => Ok(UsnPolicy::Numeric),
            other => Err(format!(
                "unknown USN format '{other}', expected 'alphanumeric' or 'numeric'"
            )),
        }
    }
}

impl fmt::Display for UsnPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsnPolicy::Alphanumeric => f.write_str("alphanumeric"),
            UsnPolicy::Numeric => f.write_str("numeric"),
        }
    }
}

pub fn is_valid_numeric(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// Parses a numeric form field into an `INT` column value.
pub fn parse_id(value: &str) -> Option<i32> {
    if is_valid_numeric(value) {
        value.parse().ok()
    } else {
        None
    }
}

pub fn is_valid_usn(value: &str, policy: UsnPolicy) -> bool {
    match policy {
        UsnPolicy::Alphanumeric => {
            value.len() == USN_LENGTH
                && value
                    .bytes()
                    .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        }
        UsnPolicy::Numeric => is_valid_numeric(value),
    }
}

pub fn parse_rating(value: &str) -> Option<i16> {
    value
        .trim()
        .parse::<i16>()
        .ok()
        .filter(|rating| (MIN_RATING..=MAX_RATING).contains(rating))
}

pub fn is_valid_comment(comment: &str) -> bool {
    comment.chars().count() <= MAX_COMMENT_CHARS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_fields() {
        assert!(is_valid_numeric("0"));
        assert!(is_valid_numeric("20240117"));
        assert!(!is_valid_numeric(""));
        assert!(!is_valid_numeric("12a"));
        assert!(!is_valid_numeric("-4"));
        assert!(!is_valid_numeric(" 4"));
        assert!(!is_valid_numeric("٣"));
    }

    #[test]
    fn test_parse_id_rejects_overflow() {
        assert_eq!(parse_id("42"), Some(42));
        assert_eq!(parse_id("99999999999"), None);
        assert_eq!(parse_id("x"), None);
    }

    #[test]
    fn test_alphanumeric_usn() {
        assert!(is_valid_usn("1RV21CS001", UsnPolicy::Alphanumeric));
        assert!(!is_valid_usn("1rv21cs001", UsnPolicy::Alphanumeric));
        assert!(!is_valid_usn("1RV21CS01", UsnPolicy::Alphanumeric));
        assert!(!is_valid_usn("1RV21CS0011", UsnPolicy::Alphanumeric));
        assert!(!is_valid_usn("1RV21-S001", UsnPolicy::Alphanumeric));
    }

    #[test]
    fn test_numeric_usn() {
        assert!(is_valid_usn("1001", UsnPolicy::Numeric));
        assert!(!is_valid_usn("1RV21CS001", UsnPolicy::Numeric));
    }

    #[test]
    fn test_rating_range() {
        for accepted in ["1", "2", "3", "4", "5"] {
            assert!(parse_rating(accepted).is_some(), "{accepted} should be accepted");
        }
        for rejected in ["0", "6", "abc", "", "-1", "4.5"] {
            assert_eq!(parse_rating(rejected), None, "{rejected} should be rejected");
        }
    }

    #[test]
    fn test_comment_length_boundary() {
        assert!(is_valid_comment(""));
        assert!(is_valid_comment(&"a".repeat(500)));
        assert!(!is_valid_comment(&"a".repeat(501)));
        // counted in characters, not bytes
        assert!(is_valid_comment(&"é".repeat(500)));
    }

    #[test]
    fn test_usn_policy_parsing() {
        assert_eq!("Numeric".parse::<UsnPolicy>(), Ok(UsnPolicy::Numeric));
        assert_eq!(" alphanumeric ".parse::<UsnPolicy>(), Ok(UsnPolicy::Alphanumeric));
        assert!("roman".parse::<UsnPolicy>().is_err());
        assert_eq!(UsnPolicy::Numeric.to_string(), "numeric");
    }
}
