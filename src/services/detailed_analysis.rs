//! 详细改进建议服务

use std::sync::Arc;

use tracing::info;

use crate::clients::{complete_json, CompletionGateway, CompletionRequest, ModelSettings};
use crate::error::AppResult;
use crate::models::decode::{field_improvement_areas, Decoded};
use crate::models::DetailedAnalysis;
use crate::prompts::render;

pub const NO_DETAILED_ANALYSIS: &str = "No detailed analysis found";

pub struct DetailedAnalysisService {
    gateway: Arc<dyn CompletionGateway>,
    settings: ModelSettings,
    template: String,
}

impl DetailedAnalysisService {
    pub fn new(gateway: Arc<dyn CompletionGateway>, settings: ModelSettings, template: String) -> Self {
        Self {
            gateway,
            settings,
            template,
        }
    }

    /// 生成按原文定位的改进建议列表
    ///
    /// # 参数
    /// - `task`: 原始题目
    /// - `task_understanding`: 题目理解（JSON 文本）
    /// - `solution`: 学生作答
    /// - `analysis`: 各维度分析（JSON 文本）
    ///
    /// # 返回
    /// `improvement_areas` 不是列表时返回 `DetailedAnalysis::Unavailable`
    pub async fn detail(
        &self,
        task: &str,
        task_understanding: &str,
        solution: &str,
        analysis: &str,
    ) -> AppResult<Decoded<DetailedAnalysis>> {
        info!("🔎 正在生成详细改进建议...");

        let prompt = render(
            &self.template,
            &[
                ("Task", task),
                ("Task-Understanding", task_understanding),
                ("Candidates-Solution", solution),
                ("Analysis", analysis),
            ],
        );

        let response = complete_json(
            self.gateway.as_ref(),
            CompletionRequest::json(prompt, &self.settings),
        )
        .await?;

        let mut defaulted = Vec::new();
        let detailed = field_improvement_areas(&response, "improvement_areas").or_sentinel(
            DetailedAnalysis::Unavailable(NO_DETAILED_ANALYSIS.to_string()),
            "improvement_areas",
            &mut defaulted,
        );

        info!("✓ 共找到 {} 条改进建议", detailed.items().len());
        Ok(Decoded::new(detailed, defaulted))
    }
}
