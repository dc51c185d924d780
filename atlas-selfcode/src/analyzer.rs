//! Static analysis of candidate source: complexity, code smells and a
//! dangerous-pattern security scan, scored into a single 0-100 number.
//!
//! Works line-by-line over language-neutral tokens (brace depth, branch
//! keywords, comment prefixes) rather than a full parser, so it applies to
//! whatever the generator happens to produce.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{AnalysisIssue, AnalysisSeverity, CodeAnalysisReport, ComplexityMetrics};

struct SecurityPattern {
    rule: &'static str,
    regex: Regex,
    message: &'static str,
}

static SECURITY_PATTERNS: Lazy<Vec<SecurityPattern>> = Lazy::new(|| {
    vec![
        SecurityPattern {
            rule: "shell-invocation",
            regex: Regex::new(r"(?i)\bCommand::new\s*\(\s*[\"'](?:sh|bash|cmd)[\"']").unwrap(),
            message: "spawns a shell directly",
        },
        SecurityPattern {
            rule: "arbitrary-eval",
            regex: Regex::new(r"\beval\s*\(").unwrap(),
            message: "calls eval on untrusted input",
        },
        SecurityPattern {
            rule: "unsafe-block",
            regex: Regex::new(r"\bunsafe\s*\{").unwrap(),
            message: "contains an unsafe block",
        },
        SecurityPattern {
            rule: "recursive-delete",
            regex: Regex::new(r"remove_dir_all\s*\(").unwrap(),
            message: "recursively deletes a directory tree",
        },
        SecurityPattern {
            rule: "hardcoded-secret",
            regex: Regex::new(r#"(?i)(password|secret|api_key)\s*=\s*"[^"]{4,}""#).unwrap(),
            message: "looks like a hardcoded credential",
        },
    ]
});

static BRANCH_KEYWORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(if|else if|match|while|for|&&|\|\|)\b").unwrap());

static FN_DECL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bfn\s+\w+").unwrap());

/// Analyzes source text, producing complexity metrics, smells and a score.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeAnalyzer {
    /// Length above which a function is flagged as a long-function smell.
    pub long_function_lines: usize,
}

impl CodeAnalyzer {
    /// Builds an analyzer with the default long-function threshold (spec-neutral: 40).
    #[must_use]
    pub fn new() -> Self {
        Self {
            long_function_lines: 40,
        }
    }

    /// Runs the full analysis pass.
    #[must_use]
    pub fn analyze(&self, source: &str, file_path: &str) -> CodeAnalysisReport {
        let complexity = self.calculate_complexity(source);
        let mut issues = self.detect_code_smells(source, &complexity);
        let security_issues = self.detect_security_issues(source);
        issues.extend(security_issues.iter().cloned());

        let score = Self::score(&complexity, &issues);

        CodeAnalysisReport {
            file_path: file_path.to_string(),
            issues,
            complexity,
            security_issues,
            score,
        }
    }

    /// Cyclomatic/cognitive complexity and line count for the given source.
    #[must_use]
    pub fn calculate_complexity(&self, source: &str) -> ComplexityMetrics {
        let mut cyclomatic = 1u32;
        let mut cognitive = 0u32;
        let mut depth = 0u32;
        let mut lines_of_code = 0usize;

        for raw_line in source.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            lines_of_code += 1;

            let branch_hits = BRANCH_KEYWORDS.find_iter(line).count();
            if branch_hits > 0 {
                #[allow(clippy::cast_possible_truncation)]
                let branch_hits = branch_hits as u32;
                cyclomatic += branch_hits;
                cognitive += branch_hits * (1 + depth);
            }
            #[allow(clippy::cast_possible_truncation)]
            let opens = line.matches('{').count() as u32;
            #[allow(clippy::cast_possible_truncation)]
            let closes = line.matches('}').count() as u32;
            depth += opens;
            depth = depth.saturating_sub(closes);
        }

        ComplexityMetrics {
            cyclomatic,
            cognitive,
            lines_of_code,
        }
    }

    /// Flags long functions and overly nested branches.
    #[must_use]
    pub fn detect_code_smells(
        &self,
        source: &str,
        complexity: &ComplexityMetrics,
    ) -> Vec<AnalysisIssue> {
        let mut issues = Vec::new();

        let mut current_fn: Option<(String, usize)> = None;
        let mut fn_lines = 0usize;
        for (idx, raw_line) in source.lines().enumerate() {
            if let Some(found) = FN_DECL.find(raw_line) {
                if let Some((name, start)) = current_fn.take() {
                    if fn_lines > self.long_function_lines {
                        issues.push(AnalysisIssue {
                            message: format!("function `{name}` is {fn_lines} lines long"),
                            severity: AnalysisSeverity::Warning,
                            line: start,
                            rule: "long-function".into(),
                            suggestion: Some("extract a helper function".into()),
                        });
                    }
                }
                current_fn = Some((found.as_str().to_string(), idx + 1));
                fn_lines = 0;
            } else if current_fn.is_some() {
                fn_lines += 1;
            }
        }
        if let Some((name, start)) = current_fn {
            if fn_lines > self.long_function_lines {
                issues.push(AnalysisIssue {
                    message: format!("function `{name}` is {fn_lines} lines long"),
                    severity: AnalysisSeverity::Warning,
                    line: start,
                    rule: "long-function".into(),
                    suggestion: Some("extract a helper function".into()),
                });
            }
        }

        if complexity.cognitive > 25 {
            issues.push(AnalysisIssue {
                message: format!("cognitive complexity is {}", complexity.cognitive),
                severity: AnalysisSeverity::Warning,
                line: 0,
                rule: "high-cognitive-complexity".into(),
                suggestion: Some("flatten nested branches".into()),
            });
        }

        issues
    }

    /// Matches source text against the dangerous-pattern table.
    #[must_use]
    pub fn detect_security_issues(&self, source: &str) -> Vec<AnalysisIssue> {
        SECURITY_PATTERNS
            .iter()
            .filter_map(|pattern| {
                pattern.regex.find(source).map(|m| {
                    let line = source[..m.start()].lines().count().max(1);
                    AnalysisIssue {
                        message: pattern.message.to_string(),
                        severity: AnalysisSeverity::Critical,
                        line,
                        rule: pattern.rule.to_string(),
                        suggestion: None,
                    }
                })
            })
            .collect()
    }

    fn score(complexity: &ComplexityMetrics, issues: &[AnalysisIssue]) -> f64 {
        let mut score = 100.0;
        for issue in issues {
            score -= match issue.severity {
                AnalysisSeverity::Info => 1.0,
                AnalysisSeverity::Warning => 5.0,
                AnalysisSeverity::Error => 15.0,
                AnalysisSeverity::Critical => 30.0,
            };
        }
        score -= f64::from(complexity.cognitive.saturating_sub(10)) * 0.5;
        score.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_source_scores_near_perfect() {
        let analyzer = CodeAnalyzer::new();
        let report = analyzer.analyze("fn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n", "gen.rs");
        assert!(report.score > 95.0);
        assert!(report.security_issues.is_empty());
    }

    #[test]
    fn shell_invocation_is_flagged_critical() {
        let analyzer = CodeAnalyzer::new();
        let source = "fn run() {\n    std::process::Command::new(\"sh\").arg(\"-c\").spawn().unwrap();\n}\n";
        let report = analyzer.analyze(source, "gen.rs");
        assert_eq!(report.security_issues.len(), 1);
        assert_eq!(report.security_issues[0].rule, "shell-invocation");
        assert!(report.score < 100.0);
    }

    #[test]
    fn long_function_is_flagged_as_smell() {
        let analyzer = CodeAnalyzer {
            long_function_lines: 2,
        };
        let source = "fn f() {\n    let a = 1;\n    let b = 2;\n    let c = 3;\n}\n";
        let report = analyzer.analyze(source, "gen.rs");
        assert!(report.issues.iter().any(|i| i.rule == "long-function"));
    }
}
