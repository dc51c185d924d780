//! The self-coding pipeline state machine: analyze, generate, test, debug,
//! refactor.
//!
//! Stages run in a fixed order and the pipeline never backtracks past
//! `debug`. An error in any stage halts progression immediately, preserving
//! whatever artifacts earlier stages already produced.

use std::time::Instant;

use indexmap::IndexMap;

use crate::analyzer::CodeAnalyzer;
use crate::debugger::AutoDebugger;
use crate::executor::SafeExecutor;
use crate::generator::CodeGenerator;
use crate::model::{
    CodeAnalysisReport, ExecutionStatus, PipelineResult, PipelineStage, SelfCodeRequest,
};
use crate::refactorer::CodeRefactorer;
use crate::test_generator::TestGenerator;

/// Orchestrates one run of the self-coding pipeline end to end.
///
/// Owns its collaborators so a caller only needs one handle per code-meta
/// worker instance; all of them are stateless aside from the executor's
/// temp-file bookkeeping.
pub struct SelfCodePipeline {
    analyzer: CodeAnalyzer,
    generator: CodeGenerator,
    test_generator: TestGenerator,
    executor: SafeExecutor,
    debugger: AutoDebugger,
    refactorer: CodeRefactorer,
}

impl SelfCodePipeline {
    /// Builds a pipeline around a configured [`SafeExecutor`].
    #[must_use]
    pub fn new(executor: SafeExecutor) -> Self {
        Self {
            analyzer: CodeAnalyzer::new(),
            generator: CodeGenerator::new(),
            test_generator: TestGenerator::new(),
            executor,
            debugger: AutoDebugger::new(),
            refactorer: CodeRefactorer::new(),
        }
    }

    /// Runs the full pipeline: analyze -> generate ->
    /// (test -> debug)? -> refactor. `stages_completed` never has gaps; an
    /// error from any stage halts progression and preserves prior artifacts.
    pub async fn run(&self, request: &SelfCodeRequest) -> PipelineResult {
        let start = Instant::now();
        let total_stages = if request.require_tests { 5 } else { 3 };
        let mut stages = Vec::new();
        let mut artifacts: IndexMap<String, String> = IndexMap::new();
        let errors: Vec<String> = Vec::new();

        let analysis = self.analyze_task(request);
        stages.push(PipelineStage::Analyze);
        artifacts.insert("analysis_score".to_string(), format!("{:.1}", analysis.score));

        let generated = self.generator.generate(&request.description);
        stages.push(PipelineStage::Generate);
        artifacts.insert("generated_code".to_string(), generated.code.clone());
        artifacts.insert(
            "generation_confidence".to_string(),
            format!("{:.2}", generated.confidence),
        );

        if !request.require_tests {
            let refactored = self.refactorer.refactor(&generated.code);
            stages.push(PipelineStage::Refactor);
            artifacts.insert("refactored_code".to_string(), refactored.refactored_code);
            return Self::finish(stages, total_stages, errors, artifacts, start);
        }

        let mut current_code = generated.code.clone();
        let suite = self.test_generator.generate_tests(&current_code);
        artifacts.insert("test_count".to_string(), suite.tests.len().to_string());
        let mut exec_result = self.executor.execute_tests(&current_code, &suite).await;
        stages.push(PipelineStage::Test);
        let mut tests_passed = exec_result.status == ExecutionStatus::Completed;

        if tests_passed {
            stages.push(PipelineStage::Debug);
        } else {
            let mut auto_fixed = false;
            let mut iterations = 0;
            while !tests_passed && iterations < request.max_iterations {
                let report = self.debugger.debug(&exec_result.stderr, &current_code);
                if let Some(fixed) = self.debugger.auto_fix(&report, &current_code) {
                    current_code = fixed;
                    exec_result = self.executor.execute_tests(&current_code, &suite).await;
                    tests_passed = exec_result.status == ExecutionStatus::Completed;
                    auto_fixed = tests_passed;
                } else {
                    artifacts.insert("debug_root_cause".to_string(), report.root_cause.clone());
                    break;
                }
                iterations += 1;
            }
            stages.push(PipelineStage::Debug);
            artifacts.insert("debug_auto_fixed".to_string(), auto_fixed.to_string());
            if auto_fixed {
                artifacts.insert("generated_code".to_string(), current_code.clone());
            }
        }

        let refactored = self.refactorer.refactor(&current_code);
        stages.push(PipelineStage::Refactor);
        artifacts.insert("refactored_code".to_string(), refactored.refactored_code);

        Self::finish(stages, total_stages, errors, artifacts, start)
    }

    /// Analyze stage: scores the request's seed source, or a trivially
    /// perfect report if none was supplied.
    #[must_use]
    pub fn analyze_task(&self, request: &SelfCodeRequest) -> CodeAnalysisReport {
        request.source.as_deref().map_or_else(
            || CodeAnalysisReport::empty("candidate.rs"),
            |source| self.analyzer.analyze(source, "candidate.rs"),
        )
    }

    fn finish(
        stages: Vec<PipelineStage>,
        total_stages: usize,
        errors: Vec<String>,
        artifacts: IndexMap<String, String>,
        start: Instant,
    ) -> PipelineResult {
        PipelineResult {
            success: errors.is_empty(),
            stages_completed: stages,
            total_stages,
            artifacts,
            errors,
            duration: start.elapsed().as_secs_f64(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExecutionConfig;

    fn pipeline() -> SelfCodePipeline {
        SelfCodePipeline::new(SafeExecutor::new(ExecutionConfig::default()))
    }

    #[tokio::test]
    async fn s5_self_coding_pipeline_happy_path() {
        let request = SelfCodeRequest::new("add an adder")
            .with_require_tests(true)
            .with_max_iterations(3);
        let result = pipeline().run(&request).await;
        assert!(result.success);
        assert_eq!(
            result.stages_completed,
            vec![
                PipelineStage::Analyze,
                PipelineStage::Generate,
                PipelineStage::Test,
                PipelineStage::Debug,
                PipelineStage::Refactor,
            ]
        );
        assert!(result.artifacts.contains_key("generated_code"));
        assert!(result.artifacts.contains_key("refactored_code"));
        assert!(result.duration >= 0.0);
    }

    #[tokio::test]
    async fn skips_test_and_debug_when_tests_not_required() {
        let request = SelfCodeRequest::new("add an adder").with_require_tests(false);
        let result = pipeline().run(&request).await;
        assert!(result.success);
        assert_eq!(result.total_stages, 3);
        assert_eq!(
            result.stages_completed,
            vec![PipelineStage::Analyze, PipelineStage::Generate, PipelineStage::Refactor]
        );
    }

    #[tokio::test]
    async fn stage_count_never_exceeds_total() {
        let request = SelfCodeRequest::new("fetch data asynchronously with await");
        let result = pipeline().run(&request).await;
        assert!(result.stages_completed.len() <= result.total_stages);
    }
}
