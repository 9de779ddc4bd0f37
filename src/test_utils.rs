//! Test utilities for property-based testing
//!
//! This module provides generators and helpers for proptest.

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;

    /// Generate a valid package name (alphanumeric runs joined by `-`, `+` or `.`)
    pub fn package_name() -> impl Strategy<Value = String> {
        (
            "[a-z][a-z0-9]{0,10}",
            proptest::collection::vec(("[-+.]", "[a-z0-9]{1,6}"), 0..3),
        )
            .prop_map(|(head, tail)| {
                tail.into_iter()
                    .fold(head, |name, (sep, part)| format!("{name}{sep}{part}"))
            })
    }

    /// Generate an upstream version such as `2.31.1` or `1.0~rc2`
    pub fn upstream_version() -> impl Strategy<Value = String> {
        (
            proptest::collection::vec(0u32..100, 1..4),
            proptest::option::of("~[a-z]{1,4}[0-9]"),
        )
            .prop_map(|(parts, suffix)| {
                let version = parts
                    .iter()
                    .map(u32::to_string)
                    .collect::<Vec<_>>()
                    .join(".");
                format!("{version}{}", suffix.unwrap_or_default())
            })
    }

    /// Generate a package revision such as `1` or `2+b1`
    pub fn revision() -> impl Strategy<Value = String> {
        "[0-9]{1,2}(\\+b[0-9])?"
    }

    /// Generate a maintainer email address
    pub fn email() -> impl Strategy<Value = String> {
        ("[a-z][-_.a-z0-9]{0,10}", "[a-z][a-z0-9]{0,8}", "[a-z]{2,4}")
            .prop_map(|(user, domain, tld)| format!("{user}@{domain}.{tld}"))
    }

    /// Generate a changelog timestamp with a numeric offset
    pub fn changelog_date() -> impl Strategy<Value = String> {
        (
            (2000u32..2100, 1u32..13, 1u32..29),
            (0u32..24, 0u32..60, 0u32..60),
            prop_oneof![Just('+'), Just('-')],
            0u32..15,
        )
            .prop_map(|((y, mo, d), (h, mi, s), sign, offset)| {
                format!("{y:04}-{mo:02}-{d:02} {h:02}:{mi:02}:{s:02} {sign}{offset:02}00")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use crate::config::defaults::MIN_PROPTEST_ITERATIONS;
    use crate::core::grammar::FieldGrammar;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(MIN_PROPTEST_ITERATIONS))]

        #[test]
        fn test_package_name_generator(name in package_name()) {
            prop_assert!(FieldGrammar::PackageName.matches(&name), "{} should be valid", name);
        }

        #[test]
        fn test_version_generators(version in upstream_version(), rev in revision()) {
            prop_assert!(FieldGrammar::ReleaseVersion.matches(&version));
            prop_assert!(FieldGrammar::Revision.matches(&rev));
        }

        #[test]
        fn test_email_generator(address in email()) {
            prop_assert!(FieldGrammar::Email.matches(&address), "{} should be valid", address);
        }

        #[test]
        fn test_changelog_date_generator(date in changelog_date()) {
            prop_assert!(FieldGrammar::Date.matches(&date), "{} should be valid", date);
        }
    }
}
