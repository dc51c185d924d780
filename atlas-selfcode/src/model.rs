use serde::{Deserialize, Serialize};

/// Request driving one run of the self-coding pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfCodeRequest {
    /// Free-text description of the code to produce.
    pub description: String,
    /// Optional seed source the analyze stage should inspect.
    pub source: Option<String>,
    /// Optional style/context hints (paths, naming conventions, ...).
    pub context: serde_json::Value,
    /// Whether the test/debug stages are entered at all.
    pub require_tests: bool,
    /// Maximum auto-fix iterations inside the debug stage.
    pub max_iterations: u32,
}

impl SelfCodeRequest {
    /// Builds a request with tests required and a default iteration budget.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            source: None,
            context: serde_json::Value::Null,
            require_tests: true,
            max_iterations: 3,
        }
    }

    /// Supplies seed source for the analyze stage.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets whether the test/debug stages run.
    #[must_use]
    pub fn with_require_tests(mut self, require_tests: bool) -> Self {
        self.require_tests = require_tests;
        self
    }

    /// Caps the debug stage's auto-fix retry budget.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// One stage of the self-coding pipeline, in the order they can complete.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Analyze seed source, if any, and score it.
    Analyze,
    /// Generate a candidate implementation.
    Generate,
    /// Synthesize and execute a test suite against the candidate.
    Test,
    /// Inspect a test failure and attempt bounded auto-fixes.
    Debug,
    /// Remove dead code and simplify the final candidate.
    Refactor,
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Stages that completed, in order, with no gaps.
    pub stages_completed: Vec<PipelineStage>,
    /// 5 when tests are required, 3 otherwise.
    pub total_stages: usize,
    /// Whether the pipeline produced usable output with no stage errors.
    pub success: bool,
    /// Named artifacts produced along the way (`generated_code`, `refactored_code`, ...).
    pub artifacts: indexmap::IndexMap<String, String>,
    /// Errors recorded by whichever stage halted progression.
    pub errors: Vec<String>,
    /// Wall-clock duration in seconds.
    pub duration: f64,
}

/// Severity of an [`AnalysisIssue`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSeverity {
    /// Informational only.
    Info,
    /// Worth fixing but not urgent.
    Warning,
    /// Should be fixed before shipping.
    Error,
    /// Security-relevant; blocks execution downstream.
    Critical,
}

/// One finding surfaced by [`crate::analyzer::CodeAnalyzer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisIssue {
    /// Human-readable description.
    pub message: String,
    /// Severity.
    pub severity: AnalysisSeverity,
    /// 1-based source line, 0 if not localized.
    pub line: usize,
    /// Stable rule identifier.
    pub rule: String,
    /// Suggested remediation, if any.
    pub suggestion: Option<String>,
}

/// Coarse complexity metrics for a piece of source.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ComplexityMetrics {
    /// `1 + branch points`.
    pub cyclomatic: u32,
    /// Nesting-weighted branch count.
    pub cognitive: u32,
    /// Non-blank, non-comment line count.
    pub lines_of_code: usize,
}

/// Full report produced by [`crate::analyzer::CodeAnalyzer::analyze`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeAnalysisReport {
    /// Path the source came from, if any.
    pub file_path: String,
    /// Findings.
    pub issues: Vec<AnalysisIssue>,
    /// Complexity metrics.
    pub complexity: ComplexityMetrics,
    /// Patterns matched by the security scan.
    pub security_issues: Vec<AnalysisIssue>,
    /// Overall score in `[0, 100]`.
    pub score: f64,
}

impl CodeAnalysisReport {
    /// Builds a trivially perfect report for a request with no seed source.
    #[must_use]
    pub fn empty(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            issues: Vec::new(),
            complexity: ComplexityMetrics::default(),
            security_issues: Vec::new(),
            score: 100.0,
        }
    }
}

/// Candidate implementation produced by [`crate::generator::CodeGenerator`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedCode {
    /// Generated source text.
    pub code: String,
    /// Self-reported confidence in `[0, 1]`.
    pub confidence: f64,
    /// Short human-readable rationale.
    pub notes: String,
}

/// One synthesized test case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    /// Test function name.
    pub name: String,
    /// Test body source.
    pub code: String,
}

/// A generated test suite, ready to hand to the safe executor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestSuite {
    /// Import/use lines the test body needs.
    pub imports: Vec<String>,
    /// Shared fixtures emitted once, ahead of the test cases.
    pub fixtures_code: String,
    /// Individual test cases.
    pub tests: Vec<TestCase>,
}

/// Terminal state of an [`ExecutionResult`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Not yet started.
    Pending,
    /// In flight (real mode only).
    Running,
    /// Finished with exit code 0.
    Completed,
    /// Finished with a non-zero exit code, or rejected before running.
    Failed,
    /// Exceeded the wall-clock budget.
    Timeout,
}

/// Resource caps and mode switches for [`crate::executor::SafeExecutor`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Wall-clock timeout in seconds.
    pub timeout_secs: u64,
    /// Memory cap in megabytes (advisory in sandbox mode).
    pub max_memory_mb: u64,
    /// Output is truncated past this many lines.
    pub max_output_lines: usize,
    /// Whether the child process may reach the network (real mode only).
    pub allow_network: bool,
    /// Working directory for real-mode subprocesses.
    pub working_dir: Option<String>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_memory_mb: 256,
            max_output_lines: 200,
            allow_network: false,
            working_dir: None,
        }
    }
}

/// Result of one [`crate::executor::SafeExecutor`] invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Short opaque identifier.
    pub id: String,
    /// Terminal status.
    pub status: ExecutionStatus,
    /// Captured standard output (possibly truncated).
    pub stdout: String,
    /// Captured standard error (possibly truncated).
    pub stderr: String,
    /// Process exit code, `-1` if never started.
    pub exit_code: i32,
    /// Wall-clock duration in seconds.
    pub duration: f64,
    /// Whether the timeout fired.
    pub timed_out: bool,
}

impl ExecutionResult {
    fn pending(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: ExecutionStatus::Pending,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: -1,
            duration: 0.0,
            timed_out: false,
        }
    }

    /// Builds a fresh pending result with a random-looking but deterministic id.
    #[must_use]
    pub fn new(seed: &str) -> Self {
        Self::pending(format!("exec-{:x}", simple_hash(seed)))
    }
}

fn simple_hash(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in s.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
    }
    hash
}

/// Confidence tier attached to an auto-fix suggestion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FixConfidence {
    /// Speculative; never auto-applied.
    Low,
    /// Plausible; not auto-applied by default.
    Medium,
    /// Strong match; auto-applied when the gate allows.
    High,
    /// Unambiguous; always auto-applied when found.
    Certain,
}

/// One candidate fix surfaced by [`crate::debugger::AutoDebugger`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixSuggestion {
    /// Human-readable description.
    pub description: String,
    /// Confidence tier.
    pub confidence: FixConfidence,
    /// Snippet to search for, required for auto-fix.
    pub code_before: Option<String>,
    /// Replacement snippet, required for auto-fix.
    pub code_after: Option<String>,
    /// 1-based source line, 0 if unknown.
    pub line: usize,
    /// Whether [`crate::debugger::AutoDebugger::auto_fix`] may apply this automatically.
    pub auto_fixable: bool,
}

/// Report produced by one debug-stage pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugReport {
    /// Parsed error type/class name, empty if unrecognized.
    pub error_type: String,
    /// Parsed error message.
    pub error_message: String,
    /// Root-cause narrative.
    pub root_cause: String,
    /// Suggested fixes, most confident first.
    pub suggestions: Vec<FixSuggestion>,
    /// Whether an auto-fix was applied and the suite passed afterward.
    pub auto_fixed: bool,
}

/// Result of one refactor-stage pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefactorResult {
    /// Whether the pass completed without error.
    pub success: bool,
    /// Source before the pass.
    pub original_code: String,
    /// Source after the pass.
    pub refactored_code: String,
    /// Total changed lines (added + removed + modified).
    pub changes_count: usize,
    /// Lines added.
    pub lines_added: usize,
    /// Lines removed.
    pub lines_removed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_defaults_require_tests_with_three_iterations() {
        let request = SelfCodeRequest::new("add an adder");
        assert!(request.require_tests);
        assert_eq!(request.max_iterations, 3);
        assert!(request.source.is_none());
    }

    #[test]
    fn execution_result_ids_are_stable_for_same_seed() {
        let a = ExecutionResult::new("seed");
        let b = ExecutionResult::new("seed");
        assert_eq!(a.id, b.id);
    }
}
