pub mod criterion;
pub mod decode;
pub mod detailed_analysis;
pub mod history;
pub mod report;
pub mod run_record;

pub use criterion::{Criterion, CriterionMap, CriterionScore, MAX_CRITERION_SCORE};
pub use decode::{Decoded, FieldOutcome};
pub use detailed_analysis::{DetailedAnalysis, DetailedAnalysisItem};
pub use history::{HistoryEntry, StoredHistoryEntry};
pub use report::AssessmentReport;
pub use run_record::{PipelineStage, RunRecord};
