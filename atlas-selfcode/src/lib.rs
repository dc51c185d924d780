#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]
#![allow(clippy::module_name_repetitions)]

//! Self-coding pipeline state machine and sandboxed safe executor for ATLAS:
//! analyze, generate, test, debug and refactor a candidate implementation,
//! with every execution step gated by a pattern-blocked, resource-capped
//! sandbox.

pub mod analyzer;
pub mod debugger;
pub mod error;
pub mod executor;
pub mod generator;
pub mod model;
pub mod pipeline;
pub mod refactorer;
pub mod test_generator;

pub use analyzer::CodeAnalyzer;
pub use debugger::AutoDebugger;
pub use error::SelfCodeError;
pub use executor::SafeExecutor;
pub use generator::CodeGenerator;
pub use model::{
    AnalysisIssue, AnalysisSeverity, CodeAnalysisReport, ComplexityMetrics, DebugReport,
    ExecutionConfig, ExecutionResult, ExecutionStatus, FixConfidence, FixSuggestion, GeneratedCode,
    PipelineResult, PipelineStage, RefactorResult, SelfCodeRequest, TestCase, TestSuite,
};
pub use pipeline::SelfCodePipeline;
pub use refactorer::CodeRefactorer;
pub use test_generator::TestGenerator;
