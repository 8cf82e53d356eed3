//! Placeholder substitution over free-text rationale.
//!
//! Two token forms are recognised:
//! - `{{NAME}}`: replaced when bound, otherwise kept verbatim and reported.
//! - `[NAME]`: replaced only when bound, never reported. Bracketed prose such
//!   as `[PASSED]` is common in rationale text.
//!
//! Names match the client's control columns in any spelling (see
//! [`crate::controls::placeholder_key`]).

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::controls::ControlSet;

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}|\[([A-Za-z0-9 _\-]+)\]").expect("token pattern")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    /// Unbound `{{NAME}}` tokens, once each, in order of first appearance.
    pub unresolved: Vec<String>,
}

pub fn render(template: &str, bindings: &ControlSet) -> Rendered {
    let mut unresolved: Vec<String> = Vec::new();

    let text = TOKEN_RE.replace_all(template, |caps: &Captures| {
        if let Some(name) = caps.get(1) {
            let name = name.as_str();
            if let Some(value) = bindings.get(name) {
                return value.to_string();
            }
            if !name.trim().is_empty() && !unresolved.iter().any(|u| u == name) {
                unresolved.push(name.to_string());
            }
            return caps[0].to_string();
        }
        bindings
            .get(&caps[2])
            .map(str::to_string)
            .unwrap_or_else(|| caps[0].to_string())
    });

    Rendered {
        text: text.into_owned(),
        unresolved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings() -> ControlSet {
        [("CLOUD_PROVIDER", "AWS"), ("Log Retention", "90 days")]
            .into_iter()
            .collect()
    }

    #[test]
    fn double_brace_token_is_replaced() {
        let r = render("Hosted on {{CLOUD_PROVIDER}}", &bindings());
        assert_eq!(r.text, "Hosted on AWS");
        assert!(r.unresolved.is_empty());
    }

    #[test]
    fn token_spelling_is_normalized() {
        let r = render("{{ cloud provider }} keeps logs {{log_retention}}", &bindings());
        assert_eq!(r.text, "AWS keeps logs 90 days");
    }

    #[test]
    fn bracket_token_is_replaced_when_bound() {
        let r = render("Provider [cloud_provider] result [PASSED]", &bindings());
        assert_eq!(r.text, "Provider AWS result [PASSED]");
        assert!(r.unresolved.is_empty());
    }

    #[test]
    fn unbound_tokens_are_kept_and_reported_once() {
        let r = render("{{REGION}} and {{REGION}} on {{CLOUD_PROVIDER}} {{TEAM}}", &bindings());
        assert_eq!(r.text, "{{REGION}} and {{REGION}} on AWS {{TEAM}}");
        assert_eq!(r.unresolved, vec!["REGION", "TEAM"]);
    }

    #[test]
    fn text_without_tokens_is_untouched() {
        let r = render("Nothing to see {here}", &ControlSet::new());
        assert_eq!(r.text, "Nothing to see {here}");
        assert!(r.unresolved.is_empty());
    }
}
