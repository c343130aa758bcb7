pub mod job;
pub mod pipeline;
pub mod scoring;

#[cfg(feature = "desktop")]
pub mod commands;

pub use job::{AnalysisJob, JobId, JobState};
pub use pipeline::{AnalysisPipeline, Completion, ResultView};
pub use scoring::{
    AnalysisResult, FixedScoringPolicy, RandomScoringPolicy, ScoringPolicy, AI_INDICATORS,
    CONFIDENCE_RANGE,
};
