use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::criterion::{Criterion, CriterionMap, CriterionScore};
use crate::models::detailed_analysis::DetailedAnalysis;

/// 一次完整评估的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentReport {
    pub run_id: String,
    pub task: String,
    pub extracted_text: String,
    pub task_understanding: Value,
    pub analysis: CriterionMap<String>,
    pub criterion_scores: CriterionMap<CriterionScore>,
    pub general_comment: String,
    pub detailed_analysis: DetailedAnalysis,
    pub encouraging_comment: String,
    /// 使用了哨兵值的字段
    #[serde(default)]
    pub defaulted_fields: Vec<String>,
}

impl AssessmentReport {
    pub fn total_score(&self) -> u32 {
        self.criterion_scores.total_score()
    }

    pub fn max_score(&self) -> u32 {
        Criterion::max_total_score()
    }

    pub fn score_percentage(&self) -> f64 {
        self.total_score() as f64 / self.max_score() as f64 * 100.0
    }
}
