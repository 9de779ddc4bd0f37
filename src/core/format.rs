//! Field format checks
//!
//! Runs after the structural pass. Every rule is applied to every matching
//! attribute in the document; all mismatches are returned together.

use crate::core::element::Element;
use crate::core::grammar::FieldGrammar;
use crate::error::Violation;

/// Where an element must sit for a rule to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Any position in the tree
    Anywhere,
    /// Directly inside the named element
    Parent(&'static str),
    /// Somewhere below the named element
    Ancestor(&'static str),
}

impl Scope {
    fn contains(self, ancestors: &[&str]) -> bool {
        match self {
            Self::Anywhere => true,
            Self::Parent(name) => ancestors.last() == Some(&name),
            Self::Ancestor(name) => ancestors.contains(&name),
        }
    }
}

/// One attribute check
#[derive(Debug, Clone, Copy)]
pub struct FormatRule {
    /// Element names the rule applies to
    pub elements: &'static [&'static str],
    /// Required position of the element
    pub scope: Scope,
    /// Attribute to check
    pub attribute: &'static str,
    /// Grammar the value must match
    pub grammar: FieldGrammar,
}

/// Rules in the order they are reported
pub const FORMAT_RULES: &[FormatRule] = &[
    FormatRule {
        elements: &["patchset"],
        scope: Scope::Anywhere,
        attribute: "strip",
        grammar: FieldGrammar::Strip,
    },
    FormatRule {
        elements: &["file"],
        scope: Scope::Parent("patchset"),
        attribute: "strip",
        grammar: FieldGrammar::Strip,
    },
    FormatRule {
        elements: &["source", "package"],
        scope: Scope::Anywhere,
        attribute: "name",
        grammar: FieldGrammar::PackageName,
    },
    FormatRule {
        elements: &["package"],
        scope: Scope::Ancestor("package"),
        attribute: "version",
        grammar: FieldGrammar::BinaryDependency,
    },
    FormatRule {
        elements: &["package"],
        scope: Scope::Ancestor("source"),
        attribute: "version",
        grammar: FieldGrammar::BuildDependency,
    },
    FormatRule {
        elements: &["release"],
        scope: Scope::Parent("changelog"),
        attribute: "epoch",
        grammar: FieldGrammar::Epoch,
    },
    FormatRule {
        elements: &["release"],
        scope: Scope::Parent("changelog"),
        attribute: "version",
        grammar: FieldGrammar::ReleaseVersion,
    },
    FormatRule {
        elements: &["release"],
        scope: Scope::Parent("changelog"),
        attribute: "revision",
        grammar: FieldGrammar::Revision,
    },
    FormatRule {
        elements: &["release"],
        scope: Scope::Parent("changelog"),
        attribute: "email",
        grammar: FieldGrammar::Email,
    },
    FormatRule {
        elements: &["release"],
        scope: Scope::Parent("changelog"),
        attribute: "date",
        grammar: FieldGrammar::Date,
    },
];

/// Apply [`FORMAT_RULES`] to the document
pub fn validate_format(document: &Element) -> Vec<Violation> {
    validate_with(document, FORMAT_RULES)
}

/// Apply a custom rule set to the document
pub fn validate_with(document: &Element, rules: &[FormatRule]) -> Vec<Violation> {
    let mut violations = Vec::new();

    for rule in rules {
        document.walk(&mut |element, ancestors| {
            if !rule.elements.contains(&element.name()) || !rule.scope.contains(ancestors) {
                return;
            }
            let Some(value) = element.attribute(rule.attribute) else {
                return;
            };
            if !rule.grammar.matches(value) {
                let location = element.location().clone();
                let message = format!(
                    "{}/@{} on line {}: '{value}' does not match '{}'.",
                    element.name(),
                    rule.attribute,
                    location.line,
                    rule.grammar.pattern()
                );
                violations.push(Violation::new(location, message));
            }
        });
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::MIN_PROPTEST_ITERATIONS;
    use crate::core::element::parse_str;
    use crate::test_utils::generators;
    use proptest::prelude::*;
    use std::path::Path;

    fn check(text: &str) -> Vec<Violation> {
        validate_format(&parse_str(text, Path::new("spec.toml")).unwrap())
    }

    const VALID: &str = r#"
[source]
name = "hello"
[[source.requires.package]]
name = "gcc"
version = ">= 9.0"

[[package]]
name = "hello"
[[package.requires.package]]
name = "libc"
version = "=="

[changelog]
[[changelog.release]]
version = "2.3"
epoch = 1
revision = "4"
email = "jane@example.org"
date = "2021-03-04 12:30:00 +0100"

[[patchset]]
strip = 1
[[patchset.file]]
src = "fix.patch"
strip = 2
"#;

    #[test]
    fn test_valid_document_has_no_violations() {
        assert!(check(VALID).is_empty());
    }

    #[test]
    fn test_two_bad_fields_two_violations() {
        let text = VALID
            .replace("jane@example.org", "jane-at-example")
            .replace("2021-03-04 12:30:00 +0100", "yesterday");
        let violations = check(&text);
        assert_eq!(violations.len(), 2);
        assert!(violations[0].message.starts_with("release/@email on line 15: 'jane-at-example'"));
        assert!(violations[1].message.starts_with("release/@date on line 15: 'yesterday'"));
    }

    #[test]
    fn test_any_version_only_for_runtime_dependencies() {
        let text = VALID.replace(">= 9.0", "==");
        let violations = check(&text);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("package/@version"));
        assert_eq!(violations[0].location.line, 4);
    }

    #[test]
    fn test_strip_levels_checked_in_both_places() {
        let text = VALID.replace("strip = 1", "strip = 0").replace("strip = 2", "strip = \"x\"");
        let messages: Vec<String> = check(&text).into_iter().map(|v| v.message).collect();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("patchset/@strip"));
        assert!(messages[1].starts_with("file/@strip"));
    }

    #[test]
    fn test_rules_report_in_rule_order() {
        let text = VALID
            .replace("date = \"2021-03-04 12:30:00 +0100\"", "date = \"bad\"")
            .replace("name = \"hello\"\n[[source", "name = \"-hello\"\n[[source");
        let violations = check(&text);
        assert_eq!(violations.len(), 2);
        assert!(violations[0].message.starts_with("source/@name"));
        assert!(violations[1].message.starts_with("release/@date"));
    }

    #[test]
    fn test_message_names_pattern() {
        let text = VALID.replace("epoch = 1", "epoch = \"one\"");
        let violations = check(&text);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.ends_with(&format!("does not match '{}'.", FieldGrammar::Epoch.pattern())));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(MIN_PROPTEST_ITERATIONS))]

        #[test]
        fn prop_generated_releases_are_well_formed(
            name in generators::package_name(),
            version in generators::upstream_version(),
            revision in generators::revision(),
            email in generators::email(),
            date in generators::changelog_date(),
        ) {
            let text = format!(
                "[source]\nname = \"{name}\"\n[changelog]\n[[changelog.release]]\n\
                 version = \"{version}\"\nrevision = \"{revision}\"\n\
                 email = \"{email}\"\ndate = \"{date}\"\n"
            );
            let violations = check(&text);
            prop_assert!(violations.is_empty(), "{:?}", violations);
        }
    }
}
