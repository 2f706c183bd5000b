pub mod assessment;
pub mod detailed_analysis;
pub mod encouragement;
pub mod history_store;
pub mod pacing;
pub mod run_logger;
pub mod task_understanding;
pub mod text_extraction;

pub use assessment::Assessor;
pub use detailed_analysis::DetailedAnalysisService;
pub use encouragement::EncouragementService;
pub use history_store::HistoryStore;
pub use pacing::{FixedIntervalPacer, NoPacing, Pacer};
pub use run_logger::{LoggerState, RunLogger};
pub use task_understanding::TaskUnderstandingService;
pub use text_extraction::TextExtractor;
