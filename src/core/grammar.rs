//! Field grammars for specification attributes
//!
//! Each [`FieldGrammar`] is a regular expression applied to one attribute
//! value. Validation never stops at the first mismatch; callers collect
//! every failure across the document (see [`crate::core::format`]).

use regex::Regex;
use std::sync::OnceLock;

use crate::core::version::CONSTRAINT_PATTERN;

/// Grammar of an attribute value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldGrammar {
    /// Patch strip level, a positive integer
    Strip,
    /// Source or binary package name
    PackageName,
    /// Constraint on a runtime dependency, `==` allowed
    BinaryDependency,
    /// Constraint on a build dependency
    BuildDependency,
    /// Changelog epoch
    Epoch,
    /// Changelog version, optionally with revision
    ReleaseVersion,
    /// Changelog revision
    Revision,
    /// Maintainer email
    Email,
    /// Changelog timestamp
    Date,
}

const ALL: [FieldGrammar; 9] = [
    FieldGrammar::Strip,
    FieldGrammar::PackageName,
    FieldGrammar::BinaryDependency,
    FieldGrammar::BuildDependency,
    FieldGrammar::Epoch,
    FieldGrammar::ReleaseVersion,
    FieldGrammar::Revision,
    FieldGrammar::Email,
    FieldGrammar::Date,
];

impl FieldGrammar {
    /// The regular expression a value must match
    pub fn pattern(&self) -> &'static str {
        match self {
            Self::Strip => r"^[1-9][0-9]*$",
            Self::PackageName => r"^[a-zA-Z0-9]+(?:[-+.][a-zA-Z0-9]+)*$",
            Self::BinaryDependency => {
                r"^(?:(?:<<|<=|=|>=|>>)\s*(?:[0-9]+:)?[-.+~a-zA-Z0-9]+?(?:-[.~+a-zA-Z0-9]+)?|==)$"
            }
            Self::BuildDependency => CONSTRAINT_PATTERN,
            Self::Epoch => r"^[0-9]+$",
            Self::ReleaseVersion => r"^[-.+~a-zA-Z0-9]+?(?:-[.~+a-zA-Z0-9]+)?$",
            Self::Revision => r"^[.~+a-zA-Z0-9]+$",
            Self::Email => r"^[-_%.a-zA-Z0-9]+@[-.a-z0-9]+\.[a-z]{2,4}$",
            Self::Date => {
                r"^[0-9]{4}-[0-9]{2}-[0-9]{2}\s+[0-9]{2}:[0-9]{2}:[0-9]{2}\s*(?:[-+][0-9]{2}:?[0-9]{2}|(?:GMT|UTC)(?:[-+][0-9]{1,2})?|[a-zA-Z]+)$"
            }
        }
    }

    fn index(self) -> usize {
        ALL.iter().position(|g| *g == self).unwrap_or(0)
    }

    fn regex(self) -> &'static Regex {
        static COMPILED: OnceLock<Vec<Regex>> = OnceLock::new();
        let compiled = COMPILED.get_or_init(|| {
            ALL.iter()
                .map(|g| Regex::new(g.pattern()).expect("field grammar pattern is valid"))
                .collect()
        });
        &compiled[self.index()]
    }

    /// Check a value against the grammar
    pub fn matches(&self, value: &str) -> bool {
        self.regex().is_match(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::MIN_PROPTEST_ITERATIONS;
    use proptest::prelude::*;

    #[test]
    fn test_strip_levels() {
        assert!(FieldGrammar::Strip.matches("1"));
        assert!(FieldGrammar::Strip.matches("12"));
        assert!(!FieldGrammar::Strip.matches("0"));
        assert!(!FieldGrammar::Strip.matches("01"));
        assert!(!FieldGrammar::Strip.matches("-1"));
    }

    #[test]
    fn test_package_names() {
        for ok in ["busybox", "libc6", "gtk+3.0", "python3.11", "lib-foo"] {
            assert!(FieldGrammar::PackageName.matches(ok), "{ok} should be valid");
        }
        for bad in ["", "-foo", "foo-", "foo..bar", "foo_bar", "foo bar", ".foo"] {
            assert!(!FieldGrammar::PackageName.matches(bad), "{bad} should be invalid");
        }
    }

    #[test]
    fn test_dependency_grammars() {
        assert!(FieldGrammar::BinaryDependency.matches("=="));
        assert!(FieldGrammar::BinaryDependency.matches(">= 1:2.0-1"));
        assert!(!FieldGrammar::BuildDependency.matches("=="));
        assert!(FieldGrammar::BuildDependency.matches("<< 3.0"));
        assert!(!FieldGrammar::BuildDependency.matches("3.0"));
    }

    #[test]
    fn test_release_fields() {
        assert!(FieldGrammar::Epoch.matches("0"));
        assert!(!FieldGrammar::Epoch.matches("1a"));
        assert!(FieldGrammar::ReleaseVersion.matches("2.3~beta1"));
        assert!(FieldGrammar::ReleaseVersion.matches("2.3-1"));
        assert!(!FieldGrammar::ReleaseVersion.matches("2.3:1"));
        assert!(FieldGrammar::Revision.matches("1+b2"));
        assert!(!FieldGrammar::Revision.matches("1-2"));
    }

    #[test]
    fn test_emails() {
        assert!(FieldGrammar::Email.matches("jane.doe@example.org"));
        assert!(FieldGrammar::Email.matches("dev%list@lists.example.info"));
        assert!(!FieldGrammar::Email.matches("jane.doe@example"));
        assert!(!FieldGrammar::Email.matches("jane@Example.ORG"));
        assert!(!FieldGrammar::Email.matches("@example.org"));
    }

    #[test]
    fn test_dates() {
        for ok in [
            "2021-03-04 12:30:00 +0100",
            "2021-03-04 12:30:00 -01:00",
            "2021-03-04 12:30:00+0100",
            "2021-03-04  12:30:00 UTC",
            "2021-03-04 12:30:00 GMT+2",
            "2021-03-04 12:30:00 UTC-11",
            "2021-03-04 12:30:00 CEST",
        ] {
            assert!(FieldGrammar::Date.matches(ok), "{ok} should be valid");
        }
        for bad in [
            "2021-03-04",
            "2021-3-4 12:30:00 UTC",
            "2021-03-04 12:30 UTC",
            "2021-03-04 12:30:00",
            "2021-03-04 12:30:00 +1",
            "2021-03-04 12:30:00 UTC+123",
        ] {
            assert!(!FieldGrammar::Date.matches(bad), "{bad} should be invalid");
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(MIN_PROPTEST_ITERATIONS))]

        #[test]
        fn prop_numeric_offsets_accepted(
            date in (2000u32..2100, 1u32..13, 1u32..29),
            time in (0u32..24, 0u32..60, 0u32..60),
            sign in prop_oneof![Just('+'), Just('-')],
            offset in 0u32..15,
            colon in prop_oneof![Just(""), Just(":")],
        ) {
            let value = format!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02} {sign}{offset:02}{colon}00",
                date.0, date.1, date.2, time.0, time.1, time.2
            );
            prop_assert!(FieldGrammar::Date.matches(&value), "{} should be valid", value);
        }
    }
}
