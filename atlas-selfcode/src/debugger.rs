//! Heuristic root-cause analysis and bounded auto-fix for failed candidates.
//!
//! Classifies failures by matching rustc-style diagnostic text against a
//! category table rather than parsing the candidate, the same line-oriented
//! approach `analyzer.rs` takes to source scans.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{DebugReport, FixConfidence, FixSuggestion};

struct ErrorCategory {
    name: &'static str,
    pattern: Regex,
    root_cause: &'static str,
}

static ERROR_CATEGORIES: Lazy<Vec<ErrorCategory>> = Lazy::new(|| {
    vec![
        ErrorCategory {
            name: "borrow-checker",
            pattern: Regex::new(r"(?i)cannot borrow|already (?:mutably )?borrowed|does not live long enough")
                .unwrap(),
            root_cause: "a value is borrowed in conflicting ways or outlives its owner",
        },
        ErrorCategory {
            name: "type-mismatch",
            pattern: Regex::new(r"(?i)mismatched types|expected .*,? found").unwrap(),
            root_cause: "an expression's type does not match what the surrounding context expects",
        },
        ErrorCategory {
            name: "unresolved-name",
            pattern: Regex::new(r"(?i)cannot find (?:value|function|type) `([^`]+)`").unwrap(),
            root_cause: "an identifier is referenced before it is declared or imported",
        },
        ErrorCategory {
            name: "missing-import",
            pattern: Regex::new(r"(?i)unresolved import|no matching (?:crate|package)").unwrap(),
            root_cause: "a module or crate path does not resolve",
        },
        ErrorCategory {
            name: "panic",
            pattern: Regex::new(r"(?i)panicked at|index out of bounds|attempt to (?:add|subtract|multiply|divide)")
                .unwrap(),
            root_cause: "the candidate panics at runtime rather than returning an error",
        },
        ErrorCategory {
            name: "assertion-failure",
            pattern: Regex::new(r"(?i)assertion (?:failed|`left == right`)").unwrap(),
            root_cause: "a test assertion did not hold for the generated candidate",
        },
        ErrorCategory {
            name: "missing-semicolon",
            pattern: Regex::new(r"(?i)expected `;`|missing semicolon").unwrap(),
            root_cause: "a statement is missing its terminating semicolon",
        },
    ]
});

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([A-Za-z_][A-Za-z0-9_]*)`").unwrap());
static LOCATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"-->[^:]+:(\d+):\d+").unwrap());
static IDENT_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Za-z_][A-Za-z0-9_]*\b").unwrap());

fn category(name: &str) -> Option<&'static ErrorCategory> {
    ERROR_CATEGORIES.iter().find(|c| c.name == name)
}

fn classify(error_text: &str) -> Option<&'static ErrorCategory> {
    ERROR_CATEGORIES.iter().find(|c| c.pattern.is_match(error_text))
}

/// Inspects rustc/test-failure text and suggests (and, within a confidence
/// gate, applies) fixes against the candidate source.
#[derive(Debug, Clone, Copy)]
pub struct AutoDebugger {
    /// Minimum confidence a [`FixSuggestion`] needs before [`Self::auto_fix`] applies it.
    pub auto_fix_threshold: FixConfidence,
}

impl Default for AutoDebugger {
    fn default() -> Self {
        Self {
            auto_fix_threshold: FixConfidence::High,
        }
    }
}

impl AutoDebugger {
    /// Builds a debugger that only auto-applies high-confidence fixes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Extracts a stable category name and the first line of `error_text`.
    #[must_use]
    pub fn parse_error(&self, error_text: &str) -> (String, String) {
        let error_type = classify(error_text).map_or_else(|| "unknown".to_string(), |c| c.name.to_string());
        let message = error_text.lines().next().unwrap_or(error_text).trim().to_string();
        (error_type, message)
    }

    /// A short narrative describing why the failure likely happened.
    #[must_use]
    pub fn find_root_cause(&self, error_text: &str) -> String {
        classify(error_text).map_or_else(
            || {
                format!(
                    "no known category matched: {}",
                    error_text.lines().next().unwrap_or_default()
                )
            },
            |c| c.root_cause.to_string(),
        )
    }

    /// Surfaces candidate fixes for `error_text` against `source`, most confident last to first.
    #[must_use]
    pub fn suggest_fixes(&self, error_text: &str, source: &str) -> Vec<FixSuggestion> {
        let mut suggestions = Vec::new();

        if category("unresolved-name").is_some_and(|c| c.pattern.is_match(error_text)) {
            if let Some(caps) = IDENTIFIER.captures(error_text) {
                let missing = &caps[1];
                if let Some(close) = Self::closest_identifier(missing, source) {
                    suggestions.push(FixSuggestion {
                        description: format!("`{missing}` is undefined; did you mean `{close}`?"),
                        confidence: FixConfidence::Medium,
                        code_before: Some(missing.to_string()),
                        code_after: Some(close),
                        line: 0,
                        auto_fixable: false,
                    });
                }
            }
        }

        if category("borrow-checker").is_some_and(|c| c.pattern.is_match(error_text)) {
            suggestions.push(FixSuggestion {
                description: "clone the value instead of moving it, or restructure the borrow".into(),
                confidence: FixConfidence::Low,
                code_before: None,
                code_after: None,
                line: 0,
                auto_fixable: false,
            });
        }

        if category("panic").is_some_and(|c| c.pattern.is_match(error_text)) {
            suggestions.push(FixSuggestion {
                description: "guard the index or arithmetic with a bounds/overflow check".into(),
                confidence: FixConfidence::Low,
                code_before: None,
                code_after: None,
                line: 0,
                auto_fixable: false,
            });
        }

        if category("missing-semicolon").is_some_and(|c| c.pattern.is_match(error_text)) {
            if let Some(line_no) = Self::parse_location(error_text) {
                if let Some(line) = source.lines().nth(line_no.saturating_sub(1)) {
                    let trimmed = line.trim_end();
                    if !trimmed.is_empty()
                        && !trimmed.ends_with(';')
                        && !trimmed.ends_with('{')
                        && !trimmed.ends_with('}')
                    {
                        suggestions.push(FixSuggestion {
                            description: format!("line {line_no} is missing a trailing semicolon"),
                            confidence: FixConfidence::Certain,
                            code_before: Some(line.to_string()),
                            code_after: Some(format!("{trimmed};")),
                            line: line_no,
                            auto_fixable: true,
                        });
                    }
                }
            }
        }

        suggestions
    }

    /// Runs [`Self::parse_error`], [`Self::find_root_cause`] and [`Self::suggest_fixes`] together.
    #[must_use]
    pub fn debug(&self, error_text: &str, source: &str) -> DebugReport {
        let (error_type, error_message) = self.parse_error(error_text);
        let root_cause = self.find_root_cause(error_text);
        let suggestions = self.suggest_fixes(error_text, source);
        DebugReport {
            error_type,
            error_message,
            root_cause,
            suggestions,
            auto_fixed: false,
        }
    }

    /// Applies the first suggestion that both meets the confidence gate and
    /// leaves the source brace-balanced. Returns `None` if nothing qualifies.
    #[must_use]
    pub fn auto_fix(&self, report: &DebugReport, source: &str) -> Option<String> {
        report
            .suggestions
            .iter()
            .filter(|s| s.auto_fixable && s.confidence >= self.auto_fix_threshold)
            .find_map(|s| {
                let before = s.code_before.as_ref()?;
                let after = s.code_after.as_ref()?;
                if !source.contains(before.as_str()) {
                    return None;
                }
                let candidate = source.replacen(before.as_str(), after, 1);
                Self::is_structurally_sound(&candidate).then_some(candidate)
            })
    }

    fn parse_location(error_text: &str) -> Option<usize> {
        LOCATION
            .captures(error_text)
            .and_then(|caps| caps[1].parse::<usize>().ok())
    }

    fn closest_identifier(target: &str, source: &str) -> Option<String> {
        IDENT_TOKEN
            .find_iter(source)
            .map(|m| m.as_str())
            .filter(|candidate| *candidate != target)
            .map(|candidate| (candidate, Self::edit_distance(target, candidate)))
            .filter(|(_, distance)| *distance <= 2)
            .min_by_key(|(_, distance)| *distance)
            .map(|(candidate, _)| candidate.to_string())
    }

    fn edit_distance(a: &str, b: &str) -> usize {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let mut row: Vec<usize> = (0..=b.len()).collect();
        for (i, ca) in a.iter().enumerate() {
            let mut prev_diag = row[0];
            row[0] = i + 1;
            for (j, cb) in b.iter().enumerate() {
                let temp = row[j + 1];
                row[j + 1] = if ca == cb {
                    prev_diag
                } else {
                    1 + prev_diag.min(row[j]).min(row[j + 1])
                };
                prev_diag = temp;
            }
        }
        row[b.len()]
    }

    fn is_structurally_sound(candidate: &str) -> bool {
        candidate.matches('{').count() == candidate.matches('}').count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_unresolved_name() {
        let debugger = AutoDebugger::new();
        let (error_type, _) = debugger.parse_error("error[E0425]: cannot find value `coutn` in this scope");
        assert_eq!(error_type, "unresolved-name");
    }

    #[test]
    fn suggests_closest_identifier_for_typo() {
        let debugger = AutoDebugger::new();
        let source = "pub fn run(count: usize) -> usize {\n    count + 1\n}\n";
        let suggestions = debugger.suggest_fixes("error[E0425]: cannot find value `coutn` in this scope", source);
        assert!(suggestions.iter().any(|s| s.description.contains("count")));
    }

    #[test]
    fn auto_fixes_missing_semicolon_when_confident() {
        let debugger = AutoDebugger::new();
        let source = "pub fn run() -> usize {\n    let value = 1\n    value\n}\n";
        let error_text = "error: expected `;`\n --> candidate.rs:2:18";
        let report = debugger.debug(error_text, source);
        let fixed = debugger.auto_fix(&report, source).expect("auto-fix applies");
        assert!(fixed.contains("let value = 1;"));
    }

    #[test]
    fn low_confidence_suggestions_are_never_auto_applied() {
        let debugger = AutoDebugger::new();
        let source = "pub fn run(x: usize) -> usize {\n    x\n}\n";
        let report = debugger.debug("thread panicked at index out of bounds", source);
        assert!(debugger.auto_fix(&report, source).is_none());
    }
}
