use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::models::criterion::CriterionMap;
use crate::models::detailed_analysis::DetailedAnalysis;
use crate::models::report::AssessmentReport;

/// 历史记录条目
///
/// 评分以 `[score, justification]` 数组保存
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub task_description: String,
    pub general_comment: String,
    pub criterion_scores: CriterionMap<(u8, String)>,
    pub detailed_analysis: DetailedAnalysis,
    pub extracted_text: String,
    #[serde(default)]
    pub encouraging_comment: String,
    pub total_score: u32,
    pub max_score: u32,
}

impl HistoryEntry {
    pub fn from_report(report: &AssessmentReport) -> Self {
        Self {
            task_description: report.task.clone(),
            general_comment: report.general_comment.clone(),
            criterion_scores: report
                .criterion_scores
                .map(|_, s| (s.score, s.justification.clone())),
            detailed_analysis: report.detailed_analysis.clone(),
            extracted_text: report.extracted_text.clone(),
            encouraging_comment: report.encouraging_comment.clone(),
            total_score: report.total_score(),
            max_score: report.max_score(),
        }
    }
}

/// 从磁盘读取的历史记录，附带文件名信息
#[derive(Debug, Clone, PartialEq)]
pub struct StoredHistoryEntry {
    /// 文件名（不含扩展名）
    pub id: String,
    pub saved_at: DateTime<Local>,
    pub entry: HistoryEntry,
}
