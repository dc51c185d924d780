//! Dead-code removal and light simplification for finished candidates.
//!
//! Finds statements after an unconditional `return` and merges nested
//! conditionals by tracking brace depth line-by-line, the same approach
//! `analyzer.rs` takes to source scans, so it never needs to parse the
//! candidate as Rust.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::RefactorResult;

static RETURN_STMT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*return\b").unwrap());
static IF_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s*)if\s+([^\n{]+?)\s*\{\s*$").unwrap());

/// Two-pass cleanup: drop unreachable statements, then simplify what's left.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeRefactorer;

impl CodeRefactorer {
    /// Builds a refactorer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Removes statements that follow a `return` within the same block.
    #[must_use]
    pub fn remove_dead_code(&self, source: &str) -> RefactorResult {
        let lines: Vec<&str> = source.lines().collect();
        let mut output: Vec<&str> = Vec::with_capacity(lines.len());
        let mut i = 0;
        while i < lines.len() {
            output.push(lines[i]);
            let is_return = RETURN_STMT.is_match(lines[i]);
            i += 1;
            if !is_return {
                continue;
            }
            let mut region_depth: i32 = 0;
            while i < lines.len() {
                let trimmed = lines[i].trim();
                #[allow(clippy::cast_possible_wrap)]
                let opens = trimmed.matches('{').count() as i32;
                #[allow(clippy::cast_possible_wrap)]
                let closes = trimmed.matches('}').count() as i32;
                if region_depth + opens - closes < 0 {
                    break;
                }
                region_depth += opens - closes;
                i += 1;
            }
        }
        let refactored = output.join("\n") + "\n";
        Self::build_result(source, refactored)
    }

    /// Collapses a redundant `else` after an unconditional `return`, and
    /// merges a nested `if` that is the sole statement of an outer `if`.
    #[must_use]
    pub fn simplify(&self, source: &str) -> RefactorResult {
        let without_else = Self::remove_redundant_else(source);
        let merged = Self::merge_nested_if(&without_else);
        Self::build_result(source, merged)
    }

    /// Runs [`Self::remove_dead_code`] then [`Self::simplify`] and combines
    /// their counts into one result ("combine counts and return
    /// final text").
    #[must_use]
    pub fn refactor(&self, source: &str) -> RefactorResult {
        let dead_code_pass = self.remove_dead_code(source);
        let simplify_pass = self.simplify(&dead_code_pass.refactored_code);
        RefactorResult {
            success: dead_code_pass.success && simplify_pass.success,
            original_code: source.to_string(),
            refactored_code: simplify_pass.refactored_code,
            changes_count: dead_code_pass.changes_count + simplify_pass.changes_count,
            lines_added: dead_code_pass.lines_added + simplify_pass.lines_added,
            lines_removed: dead_code_pass.lines_removed + simplify_pass.lines_removed,
        }
    }

    fn remove_redundant_else(source: &str) -> String {
        let lines: Vec<String> = source.lines().map(str::to_owned).collect();
        let mut output: Vec<String> = Vec::with_capacity(lines.len());
        let mut i = 0;
        while i < lines.len() {
            output.push(lines[i].clone());
            let is_return = RETURN_STMT.is_match(&lines[i]);
            i += 1;
            if !is_return || i >= lines.len() {
                continue;
            }
            let next_trim = lines[i].trim();
            if !(next_trim.starts_with('}') && next_trim.contains("else")) {
                continue;
            }
            let indent: String = lines[i].chars().take_while(|c| c.is_whitespace()).collect();
            output.push(format!("{indent}}}"));
            i += 1;

            let mut depth = 1i32;
            while i < lines.len() && depth > 0 {
                let trimmed = lines[i].trim();
                #[allow(clippy::cast_possible_wrap)]
                let opens = trimmed.matches('{').count() as i32;
                #[allow(clippy::cast_possible_wrap)]
                let closes = trimmed.matches('}').count() as i32;
                depth += opens;
                depth -= closes;
                if depth == 0 {
                    i += 1;
                    break;
                }
                output.push(lines[i].clone());
                i += 1;
            }
        }
        output.join("\n") + "\n"
    }

    fn merge_nested_if(source: &str) -> String {
        let lines: Vec<String> = source.lines().map(str::to_owned).collect();
        let mut output: Vec<String> = Vec::with_capacity(lines.len());
        let mut i = 0;
        while i < lines.len() {
            if let (Some(outer), Some(next)) = (IF_OPEN.captures(&lines[i]), lines.get(i + 1)) {
                if let Some(inner) = IF_OPEN.captures(next) {
                    output.push(format!("{}if {} && {} {{", &outer[1], &outer[2], &inner[2]));
                    i += 2;

                    let mut body = Vec::new();
                    let mut depth = 1i32;
                    while i < lines.len() && depth > 0 {
                        let trimmed = lines[i].trim();
                        #[allow(clippy::cast_possible_wrap)]
                        let opens = trimmed.matches('{').count() as i32;
                        #[allow(clippy::cast_possible_wrap)]
                        let closes = trimmed.matches('}').count() as i32;
                        depth += opens;
                        depth -= closes;
                        if depth == 0 {
                            i += 1;
                            break;
                        }
                        body.push(lines[i].clone());
                        i += 1;
                    }
                    output.extend(body);

                    if i < lines.len() && lines[i].trim() == "}" {
                        output.push(lines[i].clone());
                        i += 1;
                    }
                    continue;
                }
            }
            output.push(lines[i].clone());
            i += 1;
        }
        output.join("\n") + "\n"
    }

    fn build_result(original: &str, refactored: String) -> RefactorResult {
        let original_lines = original.lines().count();
        let refactored_lines = refactored.lines().count();
        let (lines_added, lines_removed) = if refactored_lines >= original_lines {
            (refactored_lines - original_lines, 0)
        } else {
            (0, original_lines - refactored_lines)
        };
        RefactorResult {
            success: true,
            original_code: original.to_string(),
            refactored_code: refactored,
            changes_count: lines_added + lines_removed,
            lines_added,
            lines_removed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_statements_after_return() {
        let refactorer = CodeRefactorer::new();
        let source = "fn f() -> i32 {\n    return 1;\n    let x = 2;\n    do_thing(x);\n}\n";
        let result = refactorer.remove_dead_code(source);
        assert!(!result.refactored_code.contains("do_thing"));
        assert!(result.refactored_code.contains("return 1;"));
        assert!(result.lines_removed > 0);
    }

    #[test]
    fn collapses_else_after_unconditional_return() {
        let refactorer = CodeRefactorer::new();
        let source = "fn f(cond: bool) {\n    if cond {\n        return;\n    } else {\n        fallback();\n    }\n}\n";
        let result = refactorer.simplify(source);
        assert!(!result.refactored_code.contains("else"));
        assert!(result.refactored_code.contains("fallback();"));
        let opens = result.refactored_code.matches('{').count();
        let closes = result.refactored_code.matches('}').count();
        assert_eq!(opens, closes);
    }

    #[test]
    fn merges_sole_nested_if() {
        let refactorer = CodeRefactorer::new();
        let source = "fn f(a: bool, b: bool) {\n    if a {\n        if b {\n            act();\n        }\n    }\n}\n";
        let result = refactorer.simplify(source);
        assert!(result.refactored_code.contains("if a && b {"));
        let opens = result.refactored_code.matches('{').count();
        let closes = result.refactored_code.matches('}').count();
        assert_eq!(opens, closes);
    }

    #[test]
    fn refactor_combines_both_passes() {
        let refactorer = CodeRefactorer::new();
        let source = "fn f() -> i32 {\n    return 1;\n    unreachable_call();\n}\n";
        let result = refactorer.refactor(source);
        assert!(result.success);
        assert!(!result.refactored_code.contains("unreachable_call"));
        assert_eq!(result.changes_count, result.lines_added + result.lines_removed);
    }
}
