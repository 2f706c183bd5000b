//! 运行记录
//!
//! 一次流水线运行的完整记录，由 `RunLogger` 独占持有，每个阶段完成后落盘

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::criterion::{CriterionMap, CriterionScore};
use crate::models::detailed_analysis::DetailedAnalysis;

/// 流水线阶段，名称同时用作 `step_timings` 的键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    UnderstandSolution,
    TaskUnderstanding,
    Analysis,
    CriterionScoring,
    GeneralComment,
    DetailedAnalysis,
    EncouragingComment,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::UnderstandSolution => "understand_solution",
            PipelineStage::TaskUnderstanding => "task_understanding",
            PipelineStage::Analysis => "analysis",
            PipelineStage::CriterionScoring => "criterion_scoring",
            PipelineStage::GeneralComment => "general_comment",
            PipelineStage::DetailedAnalysis => "detailed_analysis",
            PipelineStage::EncouragingComment => "encouraging_comment",
        }
    }

    /// 日志中显示的阶段描述
    pub fn label(&self) -> &'static str {
        match self {
            PipelineStage::UnderstandSolution => "识别手写文字",
            PipelineStage::TaskUnderstanding => "理解题目要求",
            PipelineStage::Analysis => "逐维度分析",
            PipelineStage::CriterionScoring => "逐维度打分",
            PipelineStage::GeneralComment => "生成总评",
            PipelineStage::DetailedAnalysis => "生成详细改进建议",
            PipelineStage::EncouragingComment => "生成鼓励评语",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub timestamp: DateTime<Local>,
    pub task: String,
    pub student_solution: Option<String>,
    pub task_understanding: Option<Value>,
    pub analysis: Option<CriterionMap<String>>,
    pub criterion_scores: Option<CriterionMap<CriterionScore>>,
    pub general_comment: Option<String>,
    pub detailed_analysis: Option<DetailedAnalysis>,
    pub encouraging_comment: Option<String>,
    /// 阶段名 -> 耗时（秒）
    #[serde(default)]
    pub step_timings: BTreeMap<String, f64>,
    /// 模型没有返回、使用了哨兵值的字段
    #[serde(default)]
    pub defaulted_fields: Vec<String>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Local>>,
}

impl RunRecord {
    pub fn new(run_id: String, task: impl Into<String>, timestamp: DateTime<Local>) -> Self {
        Self {
            run_id,
            timestamp,
            task: task.into(),
            student_solution: None,
            task_understanding: None,
            analysis: None,
            criterion_scores: None,
            general_comment: None,
            detailed_analysis: None,
            encouraging_comment: None,
            step_timings: BTreeMap::new(),
            defaulted_fields: Vec::new(),
            completed: false,
            completed_at: None,
        }
    }
}
