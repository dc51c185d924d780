//! Synthesizes a [`TestSuite`] from generated source.
//!
//! Scans `pub fn` signatures with a regex, the same line-oriented approach
//! the rest of this crate takes to avoid depending on a full Rust parser,
//! and maps each parameter's type hint to a small table of representative
//! values.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{TestCase, TestSuite};

static FN_SIGNATURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"pub(?:\s+async)?\s+fn\s+(\w+)\s*\(([^)]*)\)").unwrap());

static EXTERNAL_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:reqwest|tokio::process|std::net|rusqlite)::").unwrap()
});

/// Generates unit and edge-case tests for every `pub fn` found in a candidate.
#[derive(Debug, Clone, Copy)]
pub struct TestGenerator {
    /// Maximum number of test cases emitted per function.
    pub max_tests_per_function: usize,
    /// Whether edge-case tests (extremes per type) are included.
    pub include_edge_cases: bool,
}

impl Default for TestGenerator {
    fn default() -> Self {
        Self {
            max_tests_per_function: 5,
            include_edge_cases: true,
        }
    }
}

impl TestGenerator {
    /// Builds a generator with the default coverage knobs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Synthesizes a suite covering every `pub fn` in `source`.
    #[must_use]
    pub fn generate_tests(&self, source: &str) -> TestSuite {
        let mut suite = TestSuite {
            imports: vec!["use super::*;".to_string()],
            fixtures_code: String::new(),
            tests: Vec::new(),
        };

        for caps in FN_SIGNATURE.captures_iter(source) {
            let name = &caps[1];
            let params = Self::parse_params(&caps[2]);
            suite.tests.extend(self.cases_for(name, &params));
        }

        if EXTERNAL_CALL.is_match(source) {
            suite.fixtures_code =
                "    // external dependency detected; candidate is exercised without network access".to_string();
        }

        suite
    }

    fn parse_params(raw: &str) -> Vec<(String, String)> {
        raw.split(',')
            .filter_map(|part| {
                let part = part.trim();
                if part.is_empty() || part == "&self" || part == "self" {
                    return None;
                }
                let (name, ty) = part.split_once(':')?;
                Some((name.trim().to_string(), ty.trim().to_string()))
            })
            .collect()
    }

    fn cases_for(&self, name: &str, params: &[(String, String)]) -> Vec<TestCase> {
        let mut cases = Vec::new();
        let args = params
            .iter()
            .map(|(_, ty)| Self::sample_value(ty))
            .collect::<Vec<_>>()
            .join(", ");
        cases.push(TestCase {
            name: format!("{name}_handles_typical_input"),
            code: format!(
                "    #[test]\n    fn {name}_handles_typical_input() {{\n        let _ = {name}({args});\n    }}\n"
            ),
        });

        if self.include_edge_cases && cases.len() < self.max_tests_per_function {
            let edge_args = params
                .iter()
                .map(|(_, ty)| Self::edge_value(ty))
                .collect::<Vec<_>>()
                .join(", ");
            cases.push(TestCase {
                name: format!("{name}_handles_edge_values"),
                code: format!(
                    "    #[test]\n    fn {name}_handles_edge_values() {{\n        let _ = {name}({edge_args});\n    }}\n"
                ),
            });
        }

        cases.truncate(self.max_tests_per_function);
        cases
    }

    fn sample_value(ty: &str) -> &'static str {
        match ty {
            "usize" | "u32" | "u64" | "i32" | "i64" => "1",
            "f64" | "f32" => "1.0",
            "bool" => "true",
            "&str" => "\"test\"",
            "String" => "\"test\".to_string()",
            _ => "Default::default()",
        }
    }

    fn edge_value(ty: &str) -> &'static str {
        match ty {
            "usize" | "u32" | "u64" => "0",
            "i32" | "i64" => "-1",
            "f64" | "f32" => "0.0",
            "bool" => "false",
            "&str" => "\"\"",
            "String" => "String::new()",
            _ => "Default::default()",
        }
    }
}
